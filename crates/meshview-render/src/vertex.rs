//! Vertex layout for flattened meshes

use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;
use std::mem::{offset_of, size_of};

/// Interleaved model vertex: position, normal and texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    /// Byte stride of one vertex in a vertex buffer.
    pub const STRIDE: u32 = size_of::<Self>() as u32;

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// Vulkano vertex buffer description matching the model shader inputs
    /// (location 0 position, 1 normal, 2 uv).
    pub fn per_vertex() -> vulkano::pipeline::graphics::vertex_input::VertexBufferDescription {
        use vulkano::format::Format;
        use vulkano::pipeline::graphics::vertex_input::{
            VertexBufferDescription, VertexInputRate, VertexMemberInfo,
        };

        let member = |offset: usize, format: Format| VertexMemberInfo {
            offset,
            format,
            num_elements: 1,
        };

        VertexBufferDescription {
            stride: Self::STRIDE,
            input_rate: VertexInputRate::Vertex,
            members: HashMap::from([
                (
                    "position".to_string(),
                    member(offset_of!(Self, position), Format::R32G32B32_SFLOAT),
                ),
                (
                    "normal".to_string(),
                    member(offset_of!(Self, normal), Format::R32G32B32_SFLOAT),
                ),
                (
                    "uv".to_string(),
                    member(offset_of!(Self, uv), Format::R32G32_SFLOAT),
                ),
            ]),
        }
    }
}
