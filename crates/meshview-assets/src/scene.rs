//! Imported scene graph
//!
//! Nodes live in an arena and reference their children and meshes by index.
//! The importer owns the scene; consumers only read it.

use tracing::warn;

/// Index of a node in [`Scene::nodes`].
pub type NodeId = usize;

/// A triangle as three indices into a mesh's vertex arrays.
pub type Triangle = [u32; 3];

/// Source mesh data as produced by the importer, before flattening.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Parallel to `positions`.
    pub normals: Vec<[f32; 3]>,
    /// Parallel to `positions` when present.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub faces: Vec<Triangle>,
    /// Material slot in the source file. Carried through but never resolved.
    pub material: Option<usize>,
}

impl RawMesh {
    /// Number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether the first texture coordinate set is present.
    pub fn has_tex_coords(&self) -> bool {
        self.tex_coords.is_some()
    }
}

/// A node in the scene hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    /// Indices into [`Scene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<NodeId>,
}

impl SceneNode {
    /// A node that only groups children.
    pub fn group(children: Vec<NodeId>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// A leaf node referencing the given meshes.
    pub fn with_meshes(meshes: Vec<usize>) -> Self {
        Self {
            meshes,
            ..Default::default()
        }
    }
}

/// A parsed scene: node hierarchy plus the mesh table it indexes into.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub root: Option<NodeId>,
    pub meshes: Vec<RawMesh>,
    /// Set when the importer had to drop data it could not read.
    pub incomplete: bool,
}

impl Scene {
    /// Create an empty scene with no root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Append a mesh and return its index in the mesh table.
    pub fn add_mesh(&mut self, mesh: RawMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// The root node, if the scene has one.
    pub fn root_node(&self) -> Option<&SceneNode> {
        self.root.and_then(|id| self.node(id))
    }

    /// Walk the hierarchy depth-first in pre-order, starting at the root.
    ///
    /// A node is yielded before any of its children, and children are
    /// visited in the order they are listed. Uses an explicit stack so deep
    /// hierarchies cannot overflow the call stack. Nodes reachable more than
    /// once are yielded only the first time.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            scene: self,
            stack: self.root.into_iter().collect(),
            visited: vec![false; self.nodes.len()],
        }
    }

    /// First child id, among reachable nodes, that names no node.
    pub fn missing_child(&self) -> Option<NodeId> {
        self.walk()
            .flat_map(|(_, node)| node.children.iter().copied())
            .find(|&child| self.node(child).is_none())
    }

    /// Total number of mesh references over all reachable nodes.
    pub fn reachable_mesh_count(&self) -> usize {
        self.walk().map(|(_, node)| node.meshes.len()).sum()
    }
}

/// Pre-order iterator over a scene's nodes. See [`Scene::walk`].
pub struct Walk<'a> {
    scene: &'a Scene,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a SceneNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(node) = self.scene.nodes.get(id) else {
                warn!("Scene references missing node {}", id);
                continue;
            };

            if std::mem::replace(&mut self.visited[id], true) {
                warn!("Node {} is reachable more than once, skipping", id);
                continue;
            }

            // Reverse so the first child is popped next.
            self.stack.extend(node.children.iter().rev().copied());
            return Some((id, node));
        }

        None
    }
}
