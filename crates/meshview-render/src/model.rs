//! Model loading and drawing
//!
//! A [`Model`] flattens an imported scene into GPU-resident meshes. Loading
//! is all-or-nothing: any failure leaves the model empty with no buffers
//! allocated, and the caller can keep drawing it (it draws nothing).

use std::path::Path;

use meshview_assets::{ImportError, RawMesh, Scene, SceneImporter};
use tracing::{debug, error, info, warn};

use crate::gpu::{BufferLoadDesc, DrawCommands, GpuError, GpuResources, IndexType};
use crate::mesh::{FlattenedMesh, MeshData};
use crate::vertex::Vertex;

/// Reasons a model failed to load.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("scene is incomplete: {0}")]
    IncompleteScene(String),

    #[error("scene contains no meshes")]
    EmptyScene,

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// An ordered set of GPU meshes built from one scene.
#[derive(Debug, Default)]
pub struct Model {
    meshes: Vec<FlattenedMesh>,
}

impl Model {
    /// Create an unloaded model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the model currently owns any GPU meshes.
    pub fn is_loaded(&self) -> bool {
        !self.meshes.is_empty()
    }

    /// Meshes in scene pre-order.
    pub fn meshes(&self) -> &[FlattenedMesh] {
        &self.meshes
    }

    /// Total vertices across all meshes.
    pub fn vertex_count(&self) -> u64 {
        self.meshes.iter().map(|m| u64::from(m.vertex_count)).sum()
    }

    /// Total indices across all meshes.
    pub fn index_count(&self) -> u64 {
        self.meshes.iter().map(|m| u64::from(m.index_count)).sum()
    }

    /// Import the file at `path` and upload its meshes.
    ///
    /// Any previously loaded meshes are released first. On failure the
    /// error is logged and returned, and the model is left empty.
    pub fn load<I, G>(&mut self, path: &Path, importer: &I, gpu: &mut G) -> Result<(), ModelError>
    where
        I: SceneImporter + ?Sized,
        G: GpuResources + ?Sized,
    {
        info!("Reading model from \"{}\"", path.display());
        self.release(gpu);

        let result = importer
            .import(path)
            .map_err(ModelError::from)
            .and_then(|scene| self.convert_scene(&scene, gpu));

        match &result {
            Ok(()) => info!(
                "Loaded \"{}\": {} meshes, {} vertices, {} indices",
                path.display(),
                self.meshes.len(),
                self.vertex_count(),
                self.index_count()
            ),
            Err(e) => error!("Error reading model \"{}\": {}", path.display(), e),
        }

        result
    }

    /// Upload the meshes of an already imported scene.
    ///
    /// Same contract as [`Model::load`].
    pub fn load_scene<G>(&mut self, scene: &Scene, gpu: &mut G) -> Result<(), ModelError>
    where
        G: GpuResources + ?Sized,
    {
        self.release(gpu);

        let result = self.convert_scene(scene, gpu);
        if let Err(e) = &result {
            error!("Error converting scene: {}", e);
        }

        result
    }

    /// Release every vertex and index buffer. Calling this on an unloaded
    /// model does nothing.
    pub fn release<G>(&mut self, gpu: &mut G)
    where
        G: GpuResources + ?Sized,
    {
        if self.meshes.is_empty() {
            return;
        }

        debug!("Releasing {} meshes", self.meshes.len());
        release_meshes(std::mem::take(&mut self.meshes), gpu);
    }

    /// Record one indexed draw per mesh, in order.
    pub fn draw<D>(&self, cmd: &mut D) -> Result<(), GpuError>
    where
        D: DrawCommands + ?Sized,
    {
        for mesh in &self.meshes {
            cmd.bind_vertex_buffer(mesh.vertex_buffer, Vertex::STRIDE)?;
            cmd.bind_index_buffer(mesh.index_buffer, IndexType::U32)?;
            cmd.draw_indexed(mesh.index_count, 0, 0)?;
        }
        Ok(())
    }

    fn convert_scene<G>(&mut self, scene: &Scene, gpu: &mut G) -> Result<(), ModelError>
    where
        G: GpuResources + ?Sized,
    {
        if scene.incomplete {
            return Err(ModelError::IncompleteScene(
                "importer flagged the scene as incomplete".into(),
            ));
        }
        if scene.root_node().is_none() {
            return Err(ModelError::IncompleteScene("missing root node".into()));
        }
        if let Some(child) = scene.missing_child() {
            return Err(ModelError::IncompleteScene(format!(
                "node references missing node {}",
                child
            )));
        }
        if scene.meshes.is_empty() {
            return Err(ModelError::EmptyScene);
        }

        let mut meshes = Vec::new();
        let mesh_refs = scene.walk().flat_map(|(_, node)| node.meshes.iter().copied());

        for mesh_index in mesh_refs {
            let uploaded = match scene.meshes.get(mesh_index) {
                Some(raw) => upload_mesh(raw, gpu).map_err(ModelError::from),
                None => Err(ModelError::IncompleteScene(format!(
                    "node references missing mesh {}",
                    mesh_index
                ))),
            };

            match uploaded {
                Ok(mesh) => meshes.push(mesh),
                Err(e) => {
                    release_meshes(meshes, gpu);
                    return Err(e);
                }
            }
        }

        if meshes.is_empty() {
            return Err(ModelError::EmptyScene);
        }

        self.meshes = meshes;
        Ok(())
    }
}

/// Flatten one mesh, upload it and wait for the upload to finish.
///
/// Buffers created here are released again if a later step fails.
fn upload_mesh<G>(raw: &RawMesh, gpu: &mut G) -> Result<FlattenedMesh, GpuError>
where
    G: GpuResources + ?Sized,
{
    let data = MeshData::from_raw(raw);
    let vertex_count = count_u32(data.vertices.len())?;
    let index_count = count_u32(data.indices.len())?;

    let vertex_buffer = gpu.add_buffer(&BufferLoadDesc::vertices(&data.vertices))?;
    let index_buffer = match gpu.add_buffer(&BufferLoadDesc::indices(&data.indices)) {
        Ok(handle) => handle,
        Err(e) => {
            gpu.remove_buffer(vertex_buffer);
            return Err(e);
        }
    };

    if let Err(e) = gpu.wait_for_uploads() {
        gpu.remove_buffer(vertex_buffer);
        gpu.remove_buffer(index_buffer);
        return Err(e);
    }

    debug!(
        "Uploaded mesh '{}': {} vertices, {} indices",
        raw.name, vertex_count, index_count
    );

    Ok(FlattenedMesh {
        vertex_buffer,
        index_buffer,
        vertex_count,
        index_count,
    })
}

fn release_meshes<G>(meshes: Vec<FlattenedMesh>, gpu: &mut G)
where
    G: GpuResources + ?Sized,
{
    for mesh in meshes {
        gpu.remove_buffer(mesh.vertex_buffer);
        gpu.remove_buffer(mesh.index_buffer);
    }
}

fn count_u32(len: usize) -> Result<u32, GpuError> {
    u32::try_from(len).map_err(|_| {
        warn!("Mesh with {} elements exceeds 32-bit counts", len);
        GpuError::TooLarge { len }
    })
}
