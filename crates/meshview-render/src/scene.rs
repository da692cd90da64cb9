//! Per-frame scene uniforms

use glam::{Mat4, Vec3, Vec4};

/// Camera placement and projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
    /// Horizontal field of view in radians.
    pub horizontal_fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(64.0, 48.0, 64.0),
            look_at: Vec3::ZERO,
            horizontal_fov: std::f32::consts::FRAC_PI_2,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Right-handed view matrix looking from `position` at `look_at`.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }

    /// Reverse-Z perspective projection: the near plane maps to depth 1 and
    /// the far plane to depth 0.
    pub fn projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let vertical_fov = 2.0 * ((self.horizontal_fov * 0.5).tan() / aspect).atan();
        Mat4::perspective_rh(vertical_fov, aspect, self.far, self.near)
    }
}

/// Point light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: Vec4,
    pub color: Vec4,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec4::ZERO,
            // Pale yellow.
            color: Vec4::new(0.9, 0.9, 0.7, 1.0),
        }
    }
}

/// Uniform block consumed by the model shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub projection_view: [[f32; 4]; 4],
    pub light_position: [f32; 4],
    pub light_color: [f32; 4],
}

impl SceneUniforms {
    pub fn new(camera: &Camera, light: &Light, width: u32, height: u32) -> Self {
        let projection_view = camera.projection(width, height) * camera.view();
        Self {
            projection_view: projection_view.to_cols_array_2d(),
            light_position: light.position.to_array(),
            light_color: light.color.to_array(),
        }
    }

    pub fn projection_view(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.projection_view)
    }
}
