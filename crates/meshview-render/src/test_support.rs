//! In-memory GPU collaborator and log capture for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::gpu::{BufferHandle, BufferKind, BufferLoadDesc, GpuError, GpuResources, MemoryUsage};
use crate::vertex::Vertex;

struct MockBuffer {
    kind: BufferKind,
    memory: MemoryUsage,
    data: Vec<u8>,
}

/// Records every call; buffers are plain byte vectors.
#[derive(Default)]
pub struct MockGpu {
    next_id: u64,
    buffers: HashMap<BufferHandle, MockBuffer>,
    fail_on: Option<usize>,
    /// Buffers created so far.
    pub allocations: usize,
    /// Successful removals.
    pub removed: usize,
    /// Uploads issued since the last wait.
    pub pending: usize,
    pub waits: usize,
    /// Handles removed while not live.
    pub double_frees: Vec<BufferHandle>,
}

impl MockGpu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th allocation (1-based).
    pub fn fail_on_allocation(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_live(&self, handle: BufferHandle) -> bool {
        self.buffers.contains_key(&handle)
    }

    pub fn kind(&self, handle: BufferHandle) -> BufferKind {
        self.buffers[&handle].kind
    }

    pub fn all_gpu_only(&self) -> bool {
        self.buffers
            .values()
            .all(|b| b.memory == MemoryUsage::GpuOnly)
    }

    pub fn bytes(&self, handle: BufferHandle) -> &[u8] {
        &self.buffers[&handle].data
    }

    pub fn vertices(&self, handle: BufferHandle) -> Vec<Vertex> {
        bytemuck::pod_collect_to_vec(self.bytes(handle))
    }

    pub fn indices(&self, handle: BufferHandle) -> Vec<u32> {
        bytemuck::pod_collect_to_vec(self.bytes(handle))
    }
}

impl GpuResources for MockGpu {
    fn add_buffer(&mut self, desc: &BufferLoadDesc<'_>) -> Result<BufferHandle, GpuError> {
        self.allocations += 1;
        if self.fail_on == Some(self.allocations) {
            return Err(GpuError::Allocation {
                name: desc.name.to_string(),
                kind: desc.kind,
                reason: "out of device memory".into(),
            });
        }
        // Vulkan has no zero-sized buffers.
        if desc.data.is_empty() {
            return Err(GpuError::Allocation {
                name: desc.name.to_string(),
                kind: desc.kind,
                reason: "buffer would be empty".into(),
            });
        }

        self.next_id += 1;
        let handle = BufferHandle::from_raw(self.next_id);
        self.buffers.insert(
            handle,
            MockBuffer {
                kind: desc.kind,
                memory: desc.memory,
                data: desc.data.to_vec(),
            },
        );
        self.pending += 1;
        Ok(handle)
    }

    fn wait_for_uploads(&mut self) -> Result<(), GpuError> {
        self.waits += 1;
        self.pending = 0;
        Ok(())
    }

    fn update_buffer(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), GpuError> {
        let buffer = self
            .buffers
            .get_mut(&handle)
            .ok_or(GpuError::UnknownBuffer(handle))?;
        buffer.data = data.to_vec();
        Ok(())
    }

    fn remove_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_some() {
            self.removed += 1;
        } else {
            self.double_frees.push(handle);
        }
    }
}

struct ErrorCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` with a thread-local subscriber and count the error events it
/// emits.
pub fn count_errors<R>(f: impl FnOnce() -> R) -> (R, usize) {
    let counter = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(ErrorCounter(counter.clone()));
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, counter.load(Ordering::SeqCst))
}
