//! Viewer context: owns the GPU, the loaded model and per-frame uniforms

use std::path::Path;

use anyhow::{Context, Result};
use meshview_assets::SceneImporter;
use meshview_render::{
    BufferHandle, BufferLoadDesc, CommandLog, GpuError, GpuResources, Model, SceneUniforms,
    VulkanResources,
};
use tracing::{debug, info, warn};
use vulkano::{
    device::{
        physical::PhysicalDeviceType, Device, DeviceCreateInfo, QueueCreateInfo, QueueFlags,
    },
    instance::{Instance, InstanceCreateInfo},
    VulkanLibrary,
};

use crate::settings::ViewerSettings;

/// Uniform buffers rotated across frames in flight.
pub const UNIFORM_BUFFER_COUNT: usize = 2;

/// Bring up a headless Vulkan device with a graphics queue.
pub fn create_vulkan_resources() -> Result<VulkanResources> {
    let library = VulkanLibrary::new().context("Failed to load Vulkan library")?;
    let instance = Instance::new(library, InstanceCreateInfo::default())
        .context("Failed to create Vulkan instance")?;

    let (physical_device, queue_family_index) = instance
        .enumerate_physical_devices()
        .context("Failed to enumerate physical devices")?
        .filter_map(|p| {
            p.queue_family_properties()
                .iter()
                .position(|q| q.queue_flags.contains(QueueFlags::GRAPHICS))
                .map(|i| (p, i as u32))
        })
        .min_by_key(|(p, _)| match p.properties().device_type {
            PhysicalDeviceType::DiscreteGpu => 0,
            PhysicalDeviceType::IntegratedGpu => 1,
            PhysicalDeviceType::VirtualGpu => 2,
            PhysicalDeviceType::Cpu => 3,
            _ => 4,
        })
        .context("No suitable GPU found")?;

    info!(
        "Using GPU: {} ({:?})",
        physical_device.properties().device_name,
        physical_device.properties().device_type
    );

    let (device, mut queues) = Device::new(
        physical_device,
        DeviceCreateInfo {
            queue_create_infos: vec![QueueCreateInfo {
                queue_family_index,
                ..Default::default()
            }],
            ..Default::default()
        },
    )
    .context("Failed to create logical device")?;
    let queue = queues.next().context("Device returned no queues")?;

    Ok(VulkanResources::new(device, queue))
}

pub struct Viewer<G: GpuResources> {
    settings: ViewerSettings,
    gpu: G,
    model: Model,
    uniform_buffers: Vec<BufferHandle>,
    frame_index: usize,
}

impl<G: GpuResources> Viewer<G> {
    /// Allocate the per-frame uniform buffers.
    pub fn new(settings: ViewerSettings, mut gpu: G) -> Result<Self, GpuError> {
        let initial = Self::uniforms(&settings);
        debug!("Scene uniforms: {:?}", initial);
        let mut uniform_buffers = Vec::with_capacity(UNIFORM_BUFFER_COUNT);

        for i in 0..UNIFORM_BUFFER_COUNT {
            let name = format!("SceneUniforms{}", i);
            let desc = BufferLoadDesc::uniform(&name, bytemuck::bytes_of(&initial));
            match gpu.add_buffer(&desc) {
                Ok(handle) => uniform_buffers.push(handle),
                Err(e) => {
                    for handle in uniform_buffers {
                        gpu.remove_buffer(handle);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            settings,
            gpu,
            model: Model::new(),
            uniform_buffers,
            frame_index: 0,
        })
    }

    fn uniforms(settings: &ViewerSettings) -> SceneUniforms {
        SceneUniforms::new(
            &settings.camera.camera(),
            &settings.light.light(),
            settings.window.width,
            settings.window.height,
        )
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Load a model. Failure is not fatal: the viewer keeps running with an
    /// empty model.
    pub fn load_model<I>(&mut self, path: &Path, importer: &I) -> bool
    where
        I: SceneImporter + ?Sized,
    {
        match self.model.load(path, importer, &mut self.gpu) {
            Ok(()) => {
                info!(
                    "Model ready: {} meshes, {} vertices, {} indices",
                    self.model.meshes().len(),
                    self.model.vertex_count(),
                    self.model.index_count()
                );
                true
            }
            Err(_) => {
                warn!("Continuing without a model");
                false
            }
        }
    }

    /// Update this frame's uniforms and record the model's draws.
    ///
    /// The uniform buffers rotate per frame in flight, but no pipeline binds
    /// them: frames are recorded into a [`CommandLog`] only, since shaders
    /// and presentation are not part of this viewer.
    pub fn render_frame(&mut self) -> Result<CommandLog, GpuError> {
        let uniforms = Self::uniforms(&self.settings);
        let slot = self.frame_index % self.uniform_buffers.len();
        self.gpu
            .update_buffer(self.uniform_buffers[slot], bytemuck::bytes_of(&uniforms))?;

        let mut commands = CommandLog::new();
        self.model.draw(&mut commands)?;
        debug!(
            "Frame {}: {} draws, {} indices",
            self.frame_index,
            commands.draw_count(),
            commands.index_count()
        );

        self.frame_index += 1;
        Ok(commands)
    }

    /// Release the model and uniform buffers, handing the GPU back.
    pub fn shutdown(mut self) -> G {
        self.model.release(&mut self.gpu);
        for handle in self.uniform_buffers.drain(..) {
            self.gpu.remove_buffer(handle);
        }
        info!("Viewer shut down");
        self.gpu
    }
}
