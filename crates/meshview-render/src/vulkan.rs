//! Vulkan implementation of [`GpuResources`]

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use vulkano::{
    buffer::{Buffer, BufferCreateInfo, BufferUsage, Subbuffer},
    command_buffer::{
        allocator::StandardCommandBufferAllocator, AutoCommandBufferBuilder, CommandBufferUsage,
        CopyBufferInfo, PrimaryAutoCommandBuffer, PrimaryCommandBufferAbstract,
    },
    device::{Device, Queue},
    memory::allocator::{AllocationCreateInfo, MemoryTypeFilter, StandardMemoryAllocator},
    sync::GpuFuture,
};

use crate::gpu::{BufferHandle, BufferKind, BufferLoadDesc, GpuError, GpuResources, MemoryUsage};

fn buffer_usage(kind: BufferKind) -> BufferUsage {
    match kind {
        BufferKind::Vertex => BufferUsage::VERTEX_BUFFER,
        BufferKind::Index => BufferUsage::INDEX_BUFFER,
        BufferKind::Uniform => BufferUsage::UNIFORM_BUFFER,
    }
}

/// Owns every buffer created through [`GpuResources`].
///
/// Device-local buffers are filled through host-visible staging buffers;
/// the copies are recorded into a pending command buffer that is submitted
/// by [`GpuResources::wait_for_uploads`].
pub struct VulkanResources {
    queue: Arc<Queue>,
    memory_allocator: Arc<StandardMemoryAllocator>,
    command_allocator: StandardCommandBufferAllocator,
    buffers: HashMap<BufferHandle, Subbuffer<[u8]>>,
    pending: Option<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>>,
    next_id: u64,
}

impl VulkanResources {
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> Self {
        Self {
            queue,
            memory_allocator: Arc::new(StandardMemoryAllocator::new_default(device.clone())),
            command_allocator: StandardCommandBufferAllocator::new(device, Default::default()),
            buffers: HashMap::new(),
            pending: None,
            next_id: 0,
        }
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    fn allocation_error(desc: &BufferLoadDesc<'_>, reason: impl ToString) -> GpuError {
        GpuError::Allocation {
            name: desc.name.to_string(),
            kind: desc.kind,
            reason: reason.to_string(),
        }
    }

    fn host_buffer(
        &self,
        desc: &BufferLoadDesc<'_>,
        usage: BufferUsage,
    ) -> Result<Subbuffer<[u8]>, GpuError> {
        Buffer::from_iter(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_HOST
                    | MemoryTypeFilter::HOST_SEQUENTIAL_WRITE,
                ..Default::default()
            },
            desc.data.iter().copied(),
        )
        .map_err(|e| Self::allocation_error(desc, e))
    }

    fn device_buffer(&mut self, desc: &BufferLoadDesc<'_>) -> Result<Subbuffer<[u8]>, GpuError> {
        let staging = self.host_buffer(desc, BufferUsage::TRANSFER_SRC)?;
        let device_local = Buffer::new_slice::<u8>(
            self.memory_allocator.clone(),
            BufferCreateInfo {
                usage: buffer_usage(desc.kind) | BufferUsage::TRANSFER_DST,
                ..Default::default()
            },
            AllocationCreateInfo {
                memory_type_filter: MemoryTypeFilter::PREFER_DEVICE,
                ..Default::default()
            },
            desc.size(),
        )
        .map_err(|e| Self::allocation_error(desc, e))?;

        let mut builder = match self.pending.take() {
            Some(builder) => builder,
            None => AutoCommandBufferBuilder::primary(
                &self.command_allocator,
                self.queue.queue_family_index(),
                CommandBufferUsage::OneTimeSubmit,
            )
            .map_err(|e| GpuError::Upload(e.to_string()))?,
        };
        let copied = builder
            .copy_buffer(CopyBufferInfo::buffers(staging, device_local.clone()))
            .map(|_| ())
            .map_err(|e| GpuError::Upload(e.to_string()));
        // Earlier copies stay queued even if this one was rejected.
        self.pending = Some(builder);
        copied?;

        Ok(device_local)
    }
}

impl GpuResources for VulkanResources {
    fn add_buffer(&mut self, desc: &BufferLoadDesc<'_>) -> Result<BufferHandle, GpuError> {
        if desc.data.is_empty() {
            return Err(Self::allocation_error(desc, "buffer would be empty"));
        }

        let buffer = match desc.memory {
            MemoryUsage::GpuOnly => self.device_buffer(desc)?,
            MemoryUsage::CpuToGpu => self.host_buffer(desc, buffer_usage(desc.kind))?,
        };

        self.next_id += 1;
        let handle = BufferHandle::from_raw(self.next_id);
        debug!("Created {} '{}' ({} bytes)", handle, desc.name, desc.size());
        self.buffers.insert(handle, buffer);
        Ok(handle)
    }

    fn wait_for_uploads(&mut self) -> Result<(), GpuError> {
        let Some(builder) = self.pending.take() else {
            return Ok(());
        };

        let command_buffer = builder
            .build()
            .map_err(|e| GpuError::Upload(e.to_string()))?;
        command_buffer
            .execute(self.queue.clone())
            .map_err(|e| GpuError::Upload(e.to_string()))?
            .then_signal_fence_and_flush()
            .map_err(|e| GpuError::Upload(e.to_string()))?
            .wait(None)
            .map_err(|e| GpuError::Upload(e.to_string()))
    }

    fn update_buffer(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), GpuError> {
        let buffer = self
            .buffers
            .get(&handle)
            .ok_or(GpuError::UnknownBuffer(handle))?;
        if data.len() as u64 > buffer.len() {
            return Err(GpuError::Update(format!(
                "{} bytes do not fit {} of {} bytes",
                data.len(),
                handle,
                buffer.len()
            )));
        }

        let mut guard = buffer
            .write()
            .map_err(|e| GpuError::Update(e.to_string()))?;
        guard[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn remove_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_none() {
            warn!("Ignoring removal of unknown {}", handle);
        }
    }
}
