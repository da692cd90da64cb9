//! Mesh flattening

use meshview_assets::RawMesh;

use crate::gpu::BufferHandle;
use crate::vertex::Vertex;

/// CPU-side vertex and index data for one mesh, ready for upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Convert an imported mesh into interleaved vertices and a flat index
    /// list.
    ///
    /// Vertex `i` takes position `i`, normal `i` and texture coordinate `i`
    /// (or `(0, 0)` when the mesh has none). Face indices are appended in
    /// order. Materials are not carried over.
    pub fn from_raw(raw: &RawMesh) -> Self {
        debug_assert_eq!(
            raw.normals.len(),
            raw.positions.len(),
            "mesh '{}' needs one normal per position",
            raw.name
        );
        let tex_coords = raw.tex_coords.as_deref();

        let vertices = raw
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let normal = raw.normals.get(i).copied().unwrap_or_default();
                let uv = tex_coords
                    .and_then(|tc| tc.get(i).copied())
                    .unwrap_or_default();
                Vertex::new(position, normal, uv)
            })
            .collect();

        let indices = raw.faces.iter().flatten().copied().collect();

        Self { vertices, indices }
    }
}

/// A mesh whose vertex and index data live in GPU buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlattenedMesh {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub vertex_count: u32,
    pub index_count: u32,
}
