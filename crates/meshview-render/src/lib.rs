//! meshview Render - Scene flattening and GPU upload
//!
//! Turns an imported scene graph into a flat list of GPU meshes, each with
//! its own vertex and index buffer, and records the draws for them. GPU
//! access goes through the narrow traits in [`gpu`]; [`vulkan`] implements
//! buffer management on top of vulkano.

pub mod gpu;
pub mod mesh;
pub mod model;
pub mod scene;
pub mod vertex;
pub mod vulkan;

#[cfg(test)]
mod test_support;

pub use gpu::{
    BufferHandle, BufferKind, BufferLoadDesc, CommandLog, DrawCommand, DrawCommands, GpuError,
    GpuResources, IndexType, MemoryUsage,
};
pub use mesh::{FlattenedMesh, MeshData};
pub use model::{Model, ModelError};
pub use scene::{Camera, Light, SceneUniforms};
pub use vertex::Vertex;
pub use vulkan::VulkanResources;
