//! Narrow interfaces to the GPU framework
//!
//! The model only ever talks to the GPU through [`GpuResources`] (buffer
//! lifetime) and [`DrawCommands`] (command recording).

use std::fmt;

use crate::vertex::Vertex;

/// Opaque handle to a buffer owned by a [`GpuResources`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u64);

impl BufferHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// How a buffer is bound by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
}

/// Where the buffer's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryUsage {
    /// Device-local; initial data is uploaded through a staging copy.
    GpuOnly,
    /// Host-visible and persistently writable, for per-frame data.
    CpuToGpu,
}

/// Index element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U32,
}

/// Request to create a buffer filled with initial data.
#[derive(Debug, Clone, Copy)]
pub struct BufferLoadDesc<'a> {
    pub name: &'a str,
    pub kind: BufferKind,
    pub memory: MemoryUsage,
    pub data: &'a [u8],
}

impl<'a> BufferLoadDesc<'a> {
    /// Device-local vertex buffer holding interleaved vertices.
    pub fn vertices(vertices: &'a [Vertex]) -> Self {
        Self {
            name: "VertexBuffer",
            kind: BufferKind::Vertex,
            memory: MemoryUsage::GpuOnly,
            data: bytemuck::cast_slice(vertices),
        }
    }

    /// Device-local index buffer of 32-bit indices.
    pub fn indices(indices: &'a [u32]) -> Self {
        Self {
            name: "IndexBuffer",
            kind: BufferKind::Index,
            memory: MemoryUsage::GpuOnly,
            data: bytemuck::cast_slice(indices),
        }
    }

    /// Host-writable uniform buffer.
    pub fn uniform(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            kind: BufferKind::Uniform,
            memory: MemoryUsage::CpuToGpu,
            data,
        }
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Errors reported by a GPU collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to allocate {kind:?} buffer '{name}': {reason}")]
    Allocation {
        name: String,
        kind: BufferKind,
        reason: String,
    },

    #[error("buffer upload failed: {0}")]
    Upload(String),

    #[error("unknown {0}")]
    UnknownBuffer(BufferHandle),

    #[error("buffer update failed: {0}")]
    Update(String),

    #[error("command recording failed: {0}")]
    Recording(String),

    #[error("{len} elements do not fit 32-bit counts")]
    TooLarge { len: usize },
}

/// Buffer creation and destruction.
///
/// `add_buffer` may complete asynchronously; the data is only guaranteed to
/// be resident after the next successful `wait_for_uploads`.
pub trait GpuResources {
    fn add_buffer(&mut self, desc: &BufferLoadDesc<'_>) -> Result<BufferHandle, GpuError>;

    /// Block until every upload issued so far has completed.
    fn wait_for_uploads(&mut self) -> Result<(), GpuError>;

    /// Overwrite the contents of a host-writable buffer.
    fn update_buffer(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), GpuError>;

    /// Release a buffer. Unknown handles are ignored.
    fn remove_buffer(&mut self, handle: BufferHandle);
}

/// Draw-time command recording.
pub trait DrawCommands {
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32) -> Result<(), GpuError>;

    fn bind_index_buffer(&mut self, buffer: BufferHandle, index_type: IndexType)
        -> Result<(), GpuError>;

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        first_vertex: i32,
    ) -> Result<(), GpuError>;
}

/// A recorded draw command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    BindVertexBuffer {
        buffer: BufferHandle,
        stride: u32,
    },
    BindIndexBuffer {
        buffer: BufferHandle,
        index_type: IndexType,
    },
    DrawIndexed {
        index_count: u32,
        first_index: u32,
        first_vertex: i32,
    },
}

/// [`DrawCommands`] implementation that records commands instead of
/// submitting them.
#[derive(Debug, Default, Clone)]
pub struct CommandLog {
    commands: Vec<DrawCommand>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of indexed draws recorded.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::DrawIndexed { .. }))
            .count()
    }

    /// Total indices submitted across all draws.
    pub fn index_count(&self) -> u64 {
        self.commands
            .iter()
            .map(|c| match c {
                DrawCommand::DrawIndexed { index_count, .. } => u64::from(*index_count),
                _ => 0,
            })
            .sum()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawCommands for CommandLog {
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, stride: u32) -> Result<(), GpuError> {
        self.commands
            .push(DrawCommand::BindVertexBuffer { buffer, stride });
        Ok(())
    }

    fn bind_index_buffer(
        &mut self,
        buffer: BufferHandle,
        index_type: IndexType,
    ) -> Result<(), GpuError> {
        self.commands
            .push(DrawCommand::BindIndexBuffer { buffer, index_type });
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        first_index: u32,
        first_vertex: i32,
    ) -> Result<(), GpuError> {
        self.commands.push(DrawCommand::DrawIndexed {
            index_count,
            first_index,
            first_vertex,
        });
        Ok(())
    }
}
