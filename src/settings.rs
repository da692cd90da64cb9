//! Viewer settings
//!
//! Settings are read from `~/.config/meshview/settings.toml`. Every field is
//! optional in the file; missing ones keep their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};
use meshview_render::{Camera, Light};
use serde::Deserialize;
use tracing::{info, warn};

/// All viewer settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub model: ModelSettings,
    pub window: WindowSettings,
    pub camera: CameraSettings,
    pub light: LightSettings,
}

impl ViewerSettings {
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("meshview"))
    }

    /// Default settings file location
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from the default location, or return defaults
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("Could not determine config directory");
                Self::default()
            }
        }
    }

    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or malformed
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file at {:?}, using defaults", path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model loaded when none is given on the command line
    pub path: Option<PathBuf>,
}

/// Render target settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    pub look_at: Vec3,
    /// Horizontal field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            position: camera.position,
            look_at: camera.look_at,
            fov_degrees: camera.horizontal_fov.to_degrees(),
            near: camera.near,
            far: camera.far,
        }
    }
}

impl CameraSettings {
    pub fn camera(&self) -> Camera {
        Camera {
            position: self.position,
            look_at: self.look_at,
            horizontal_fov: self.fov_degrees.to_radians(),
            near: self.near,
            far: self.far,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub position: Vec4,
    pub color: Vec4,
}

impl Default for LightSettings {
    fn default() -> Self {
        let light = Light::default();
        Self {
            position: light.position,
            color: light.color,
        }
    }
}

impl LightSettings {
    pub fn light(&self) -> Light {
        Light {
            position: self.position,
            color: self.color,
        }
    }
}
