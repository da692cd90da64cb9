//! meshview Assets - Scene import
//!
//! Parses glTF 2.0 files into a renderer-agnostic scene graph, with
//! triangulation and normal generation applied to every mesh.

mod error;
mod gltf_loader;
pub mod postprocess;
mod scene;

pub use error::ImportError;
pub use gltf_loader::{GltfImporter, SceneImporter};
pub use scene::{NodeId, RawMesh, Scene, SceneNode, Triangle, Walk};
