//! Host scene interfaces.
//!
//! The exporter never owns the scene. It pulls hierarchy, transforms, mesh
//! data and materials through [`SceneGraph`] and [`MeshSource`], and drives
//! animation through [`PoseSampler`]. [`MemoryScene`] is a self-contained
//! implementation used by the CLI and tests.

pub mod memory;

pub use memory::MemoryScene;

use crate::config::ClipSource;
use crate::types::{BoneWeight, TextureChannel};
use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Identity of a node in the host scene graph.
///
/// Equality is object identity; two nodes may share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Identity of a host material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub usize);

/// Identity of a host animation clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub usize);

/// Mesh data of one renderable, in the renderable's local space.
///
/// Any per-vertex attribute slice may be empty. `bones`, `bind_poses` and
/// `bone_weights` are empty for unskinned renderables.
pub trait MeshSource {
    /// Scene node carrying this renderable's world transform.
    fn node(&self) -> NodeId;
    /// Name of the underlying mesh, used to name submeshes.
    fn mesh_name(&self) -> &str;

    fn positions(&self) -> &[Vec3];
    fn normals(&self) -> &[Vec3];
    fn tangents(&self) -> &[Vec4];
    fn uvs(&self) -> &[Vec2];
    fn colors(&self) -> &[Vec4];

    /// Bones referenced by `bone_weights`, by local index.
    fn bones(&self) -> &[NodeId];
    /// Authored bind pose per local bone.
    fn bind_poses(&self) -> &[Mat4];
    fn bone_weights(&self) -> &[BoneWeight];

    fn submesh_count(&self) -> usize;
    /// Triangle indices of one submesh, relative to this mesh's vertices.
    fn submesh_indices(&self, submesh: usize) -> &[u32];
    /// Materials by submesh. May be shorter or longer than the submesh count.
    fn materials(&self) -> &[MaterialId];

    fn vertex_count(&self) -> usize {
        self.positions().len()
    }
}

/// Read access to the host scene graph.
pub trait SceneGraph {
    type Renderable: MeshSource;

    fn name(&self, node: NodeId) -> &str;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn local_to_world(&self, node: NodeId) -> Mat4;

    fn world_to_local(&self, node: NodeId) -> Mat4 {
        self.local_to_world(node).inverse()
    }

    /// Number of ancestors between `node` and the scene root.
    fn depth(&self, node: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(node);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }

    /// Skinned renderables at or below `root`, in hierarchy order.
    fn skinned_renderables(&self, root: NodeId) -> Vec<&Self::Renderable>;
    /// Unskinned renderables at or below `root`, in hierarchy order.
    fn static_renderables(&self, root: NodeId) -> Vec<&Self::Renderable>;

    fn material_name(&self, material: MaterialId) -> &str;
    /// Asset path of the texture bound to `channel`, if any.
    fn texture_path(&self, material: MaterialId, channel: TextureChannel) -> Option<&str>;
}

/// An animation clip found on the export root.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub id: ClipId,
    pub name: String,
    /// Duration in seconds.
    pub length: f32,
    /// Samples per second.
    pub frame_rate: f32,
}

/// Poses the scene hierarchy from an animation clip.
pub trait PoseSampler: SceneGraph {
    /// Saved local transforms of the nodes a clip drives.
    type Pose;

    /// The clip attached to `root` for the given source, if any.
    fn clip(&self, root: NodeId, source: ClipSource) -> Option<ClipInfo>;

    /// Pose every node driven by `clip` at `time` seconds. Subsequent
    /// [`SceneGraph::local_to_world`] calls observe the new pose.
    fn sample(&mut self, clip: ClipId, time: f32);

    /// Snapshot the current local transforms of every node `clip` drives.
    fn capture_pose(&self, clip: ClipId) -> Self::Pose;

    /// Put back transforms saved by [`PoseSampler::capture_pose`].
    fn restore_pose(&mut self, pose: Self::Pose);
}
