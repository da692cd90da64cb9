//! Import post-processing: triangulation and normal generation

use glam::Vec3;

use crate::scene::Triangle;

/// Primitive topology of an index stream before triangulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

/// Convert an index stream of the given topology into a triangle list.
///
/// Trailing indices that do not complete a triangle are dropped. Degenerate
/// strip triangles (used to stitch strips together) are dropped as well.
pub fn triangulate(topology: Topology, indices: &[u32]) -> Vec<Triangle> {
    match topology {
        Topology::TriangleList => indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect(),
        Topology::TriangleStrip => (0..indices.len().saturating_sub(2))
            .map(|i| {
                // Odd triangles swap their last two vertices to keep winding.
                let odd = i % 2;
                [indices[i], indices[i + 1 + odd], indices[i + 2 - odd]]
            })
            .filter(|&[a, b, c]| a != b && b != c && a != c)
            .collect(),
        Topology::TriangleFan => (0..indices.len().saturating_sub(2))
            .map(|i| [indices[i + 1], indices[i + 2], indices[0]])
            .collect(),
    }
}

/// Generate smooth per-vertex normals from triangle faces.
///
/// Each vertex accumulates the area-weighted normals of the faces that use
/// it. Vertices with no usable face get +Y. Faces with out-of-range indices
/// are ignored.
pub fn generate_normals(positions: &[[f32; 3]], faces: &[Triangle]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    for face in faces {
        let [a, b, c] = face.map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }

        let pa = Vec3::from(positions[a]);
        let pb = Vec3::from(positions[b]);
        let pc = Vec3::from(positions[c]);
        let face_normal = (pb - pa).cross(pc - pa);

        accum[a] += face_normal;
        accum[b] += face_normal;
        accum[c] += face_normal;
    }

    accum
        .into_iter()
        .map(|n| {
            let n = n.normalize_or_zero();
            if n == Vec3::ZERO {
                Vec3::Y.to_array()
            } else {
                n.to_array()
            }
        })
        .collect()
}
