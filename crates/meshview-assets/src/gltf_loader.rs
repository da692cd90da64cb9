use std::path::{Path, PathBuf};

use gltf::mesh::Mode;
use tracing::{debug, info, warn};

use crate::error::ImportError;
use crate::postprocess::{generate_normals, triangulate, Topology};
use crate::scene::{RawMesh, Scene, SceneNode};

/// Source of parsed scenes.
///
/// Implementations parse a model file with triangulation and normal
/// generation applied, so every [`RawMesh`] they return has triangle faces
/// and one normal per position.
pub trait SceneImporter {
    fn import(&self, path: &Path) -> Result<Scene, ImportError>;
}

/// glTF 2.0 importer (`.gltf` and `.glb`).
///
/// Each glTF primitive becomes one [`RawMesh`]. A node that references a
/// glTF mesh references all of that mesh's primitives, in order. A synthetic
/// root node groups the root nodes of the default scene.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfImporter;

impl GltfImporter {
    pub fn new() -> Self {
        Self
    }

    /// Import a glTF document held in memory. External buffer URIs cannot be
    /// resolved; embedded (data URI or GLB) buffers can.
    pub fn import_slice(&self, bytes: &[u8]) -> Result<Scene, ImportError> {
        let source = PathBuf::from("<memory>");
        let gltf = gltf::Gltf::from_slice(bytes)
            .map_err(|e| ImportError::Gltf(source.clone(), e.to_string()))?;
        let buffers = gltf::import_buffers(&gltf.document, None, gltf.blob)
            .map_err(|e| ImportError::Gltf(source, e.to_string()))?;

        Ok(build_scene(&gltf.document, &buffers))
    }
}

impl SceneImporter for GltfImporter {
    fn import(&self, path: &Path) -> Result<Scene, ImportError> {
        if !path.exists() {
            return Err(ImportError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if !matches!(extension.as_deref(), Some("gltf" | "glb")) {
            return Err(ImportError::UnsupportedFormat(path.to_path_buf()));
        }

        // Images are not decoded: materials are never resolved.
        let gltf = gltf::Gltf::open(path)
            .map_err(|e| ImportError::Gltf(path.to_path_buf(), e.to_string()))?;
        let buffers = gltf::import_buffers(&gltf.document, path.parent(), gltf.blob)
            .map_err(|e| ImportError::Gltf(path.to_path_buf(), e.to_string()))?;

        let scene = build_scene(&gltf.document, &buffers);

        info!(
            "Imported '{}': {} nodes, {} meshes{}",
            path.display(),
            scene.nodes.len(),
            scene.meshes.len(),
            if scene.incomplete { " (incomplete)" } else { "" }
        );

        Ok(scene)
    }
}

fn build_scene(document: &gltf::Document, buffers: &[gltf::buffer::Data]) -> Scene {
    let mut scene = Scene::new();

    // Mesh table: one entry per readable primitive.
    let mut primitives_of_mesh = Vec::new();
    for mesh in document.meshes() {
        let name = mesh.name().unwrap_or("unnamed");
        let mut ids = Vec::new();

        for primitive in mesh.primitives() {
            match read_primitive(name, &primitive, buffers) {
                Ok(Some(raw)) => ids.push(scene.add_mesh(raw)),
                Ok(None) => debug!(
                    "Skipping primitive {} of mesh '{}' ({:?}): no triangles",
                    primitive.index(),
                    name,
                    primitive.mode()
                ),
                Err(reason) => {
                    warn!(
                        "Dropping primitive {} of mesh '{}': {}",
                        primitive.index(),
                        name,
                        reason
                    );
                    scene.incomplete = true;
                }
            }
        }

        primitives_of_mesh.push(ids);
    }

    // Node ids match glTF node indices.
    for node in document.nodes() {
        scene.add_node(SceneNode {
            name: node.name().map(str::to_string),
            meshes: node
                .mesh()
                .map(|m| primitives_of_mesh[m.index()].clone())
                .unwrap_or_default(),
            children: node.children().map(|c| c.index()).collect(),
        });
    }

    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(gltf_scene) = gltf_scene {
        let root = scene.add_node(SceneNode {
            name: Some(gltf_scene.name().unwrap_or("root").to_string()),
            meshes: Vec::new(),
            children: gltf_scene.nodes().map(|n| n.index()).collect(),
        });
        scene.root = Some(root);
    }

    scene
}

/// Read one primitive into a [`RawMesh`].
///
/// Returns `Ok(None)` for point and line primitives and for primitives that
/// triangulate to nothing, and `Err` with a reason
/// for primitives whose data cannot be used.
fn read_primitive(
    mesh_name: &str,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Result<Option<RawMesh>, String> {
    let topology = match primitive.mode() {
        Mode::Triangles => Topology::TriangleList,
        Mode::TriangleStrip => Topology::TriangleStrip,
        Mode::TriangleFan => Topology::TriangleFan,
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => return Ok(None),
    };

    let reader = primitive.reader(|buffer| {
        buffers
            .get(buffer.index())
            .map(|data| data.0.as_slice())
    });

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or("missing POSITION attribute")?
        .collect();
    let vertex_count = positions.len();

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertex_count as u32).collect(),
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(format!(
            "index {} out of range for {} vertices",
            bad, vertex_count
        ));
    }

    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().collect());
    if let Some(tc) = &tex_coords {
        if tc.len() != vertex_count {
            return Err(format!(
                "{} texture coordinates for {} vertices",
                tc.len(),
                vertex_count
            ));
        }
    }

    let faces = triangulate(topology, &indices);
    if faces.is_empty() {
        debug!("Primitive of mesh '{}' has no triangles", mesh_name);
        return Ok(None);
    }

    let normals = match reader.read_normals() {
        Some(normals) => {
            let normals: Vec<[f32; 3]> = normals.collect();
            if normals.len() == vertex_count {
                normals
            } else {
                debug!("Regenerating mismatched normals for '{}'", mesh_name);
                generate_normals(&positions, &faces)
            }
        }
        None => generate_normals(&positions, &faces),
    };

    Ok(Some(RawMesh {
        name: mesh_name.to_string(),
        positions,
        normals,
        tex_coords,
        faces,
        material: primitive.material().index(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Pack a JSON document and binary chunk into a GLB container.
    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&0x004E_4942u32.to_le_bytes());
        out.extend_from_slice(&bin);
        out
    }

    fn push_f32s(bin: &mut Vec<u8>, values: &[f32]) {
        for v in values {
            bin.extend_from_slice(&v.to_le_bytes());
        }
    }

    fn push_u32s(bin: &mut Vec<u8>, values: &[u32]) {
        for v in values {
            bin.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Two nodes: "body" (indexed triangle) with child "wheel" (a triangle
    /// strip plus a point primitive). Bytes: positions A [0, 36), indices
    /// [36, 48), positions B [48, 96).
    fn two_node_glb(indices: [u32; 3]) -> Vec<u8> {
        let mut bin = Vec::new();
        push_f32s(&mut bin, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        push_u32s(&mut bin, &indices);
        push_f32s(
            &mut bin,
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
        );

        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [
                { "name": "body", "mesh": 0, "children": [1] },
                { "name": "wheel", "mesh": 1 }
            ],
            "meshes": [
                { "name": "body", "primitives": [
                    { "attributes": { "POSITION": 0 }, "indices": 1 }
                ] },
                { "name": "wheel", "primitives": [
                    { "attributes": { "POSITION": 2 }, "mode": 5 },
                    { "attributes": { "POSITION": 2 }, "mode": 0 }
                ] }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" },
                { "bufferView": 2, "componentType": 5126, "count": 4, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 12 },
                { "buffer": 0, "byteOffset": 48, "byteLength": 48 }
            ],
            "buffers": [ { "byteLength": 96 } ]
        }"#;

        glb(json, &bin)
    }

    #[test]
    fn imports_hierarchy_and_primitives() {
        let scene = GltfImporter::new()
            .import_slice(&two_node_glb([0, 1, 2]))
            .unwrap();

        assert!(!scene.incomplete);
        // The point primitive is skipped.
        assert_eq!(scene.meshes.len(), 2);

        let root = scene.root_node().unwrap();
        assert_eq!(root.children, vec![0]);

        let order: Vec<_> = scene
            .walk()
            .flat_map(|(_, node)| node.meshes.iter().copied())
            .collect();
        assert_eq!(order, vec![0, 1]);

        let body = &scene.meshes[0];
        assert_eq!(body.name, "body");
        assert_eq!(body.faces, vec![[0, 1, 2]]);
        assert!(!body.has_tex_coords());
        assert_eq!(body.material, None);
    }

    #[test]
    fn generates_missing_normals() {
        let scene = GltfImporter::new()
            .import_slice(&two_node_glb([0, 1, 2]))
            .unwrap();

        for mesh in &scene.meshes {
            assert_eq!(mesh.normals.len(), mesh.vertex_count());
        }
        assert_eq!(scene.meshes[0].normals, vec![[0.0, 0.0, 1.0]; 3]);
    }

    #[test]
    fn triangulates_strips() {
        let scene = GltfImporter::new()
            .import_slice(&two_node_glb([0, 1, 2]))
            .unwrap();

        let wheel = &scene.meshes[1];
        assert_eq!(wheel.faces, vec![[0, 1, 2], [1, 3, 2]]);
    }

    #[test]
    fn out_of_range_index_marks_scene_incomplete() {
        let scene = GltfImporter::new()
            .import_slice(&two_node_glb([0, 1, 7]))
            .unwrap();

        assert!(scene.incomplete);
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].name, "wheel");
    }

    /// One mesh with a valid triangle and a `Triangles` primitive of only
    /// two vertices.
    fn sliver_glb() -> Vec<u8> {
        let mut bin = Vec::new();
        push_f32s(&mut bin, &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        push_u32s(&mut bin, &[0, 1, 2]);

        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [ { "nodes": [0] } ],
            "nodes": [ { "name": "blade", "mesh": 0 } ],
            "meshes": [
                { "name": "blade", "primitives": [
                    { "attributes": { "POSITION": 0 }, "indices": 1 },
                    { "attributes": { "POSITION": 2 }, "mode": 4 }
                ] }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
                { "bufferView": 1, "componentType": 5125, "count": 3, "type": "SCALAR" },
                { "bufferView": 0, "componentType": 5126, "count": 2, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [1.0, 0.0, 0.0] }
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 12 }
            ],
            "buffers": [ { "byteLength": 48 } ]
        }"#;

        glb(json, &bin)
    }

    #[test]
    fn primitives_without_triangles_are_skipped() {
        let scene = GltfImporter::new().import_slice(&sliver_glb()).unwrap();

        assert!(!scene.incomplete);
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].faces, vec![[0, 1, 2]]);
        assert!(scene.meshes.iter().all(|m| !m.faces.is_empty()));
        assert_eq!(scene.nodes[0].meshes, vec![0]);
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let result = GltfImporter::new().import_slice(b"definitely not a model");
        assert!(matches!(result, Err(ImportError::Gltf(_, _))));
    }

    #[test]
    fn missing_file_returns_not_found() {
        let result = GltfImporter::new().import(Path::new("/nonexistent/castle.glb"));
        match result {
            Err(ImportError::NotFound(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/castle.glb"))
            }
            other => panic!("expected NotFound, got: {:?}", other),
        }
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".fbx").tempfile().unwrap();
        file.write_all(b"Kaydara FBX Binary").unwrap();

        let result = GltfImporter::new().import(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn imports_glb_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".glb").tempfile().unwrap();
        file.write_all(&two_node_glb([0, 1, 2])).unwrap();
        file.flush().unwrap();

        let scene = GltfImporter::new().import(file.path()).unwrap();
        assert_eq!(scene.reachable_mesh_count(), 2);
    }
}
