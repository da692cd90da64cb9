use std::path::PathBuf;

/// Errors that can occur while importing a scene.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to import glTF file '{0}': {1}")]
    Gltf(PathBuf, String),

    #[error("unsupported model format '{0}' (expected .gltf or .glb)")]
    UnsupportedFormat(PathBuf),
}
