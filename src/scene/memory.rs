//! In-memory scene graph.
//!
//! A small arena-backed host scene: named nodes with local TRS transforms,
//! renderables, materials and keyframed clips. It can be assembled in code or
//! loaded from a JSON description.

use super::{ClipId, ClipInfo, MaterialId, MeshSource, NodeId, PoseSampler, SceneGraph};
use crate::config::ClipSource;
use crate::error::{ExportError, Result};
use crate::types::{BoneWeight, TextureChannel};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Local translation, rotation and scale of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A node in the scene hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub transform: NodeTransform,
}

/// Raw mesh arrays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub bones: Vec<NodeId>,
    pub bind_poses: Vec<Mat4>,
    pub weights: Vec<BoneWeight>,
    /// Triangle indices per submesh.
    pub submeshes: Vec<Vec<u32>>,
}

/// A mesh placed on a node, with its materials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRenderable {
    pub node: NodeId,
    pub mesh: MeshData,
    #[serde(default)]
    pub skinned: bool,
    #[serde(default)]
    pub materials: Vec<MaterialId>,
}

impl MeshSource for MemoryRenderable {
    fn node(&self) -> NodeId {
        self.node
    }

    fn mesh_name(&self) -> &str {
        &self.mesh.name
    }

    fn positions(&self) -> &[Vec3] {
        &self.mesh.positions
    }

    fn normals(&self) -> &[Vec3] {
        &self.mesh.normals
    }

    fn tangents(&self) -> &[Vec4] {
        &self.mesh.tangents
    }

    fn uvs(&self) -> &[Vec2] {
        &self.mesh.uvs
    }

    fn colors(&self) -> &[Vec4] {
        &self.mesh.colors
    }

    fn bones(&self) -> &[NodeId] {
        &self.mesh.bones
    }

    fn bind_poses(&self) -> &[Mat4] {
        &self.mesh.bind_poses
    }

    fn bone_weights(&self) -> &[BoneWeight] {
        &self.mesh.weights
    }

    fn submesh_count(&self) -> usize {
        self.mesh.submeshes.len()
    }

    fn submesh_indices(&self, submesh: usize) -> &[u32] {
        self.mesh
            .submeshes
            .get(submesh)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn materials(&self) -> &[MaterialId] {
        &self.materials
    }
}

/// A material with optional texture channels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Asset path per channel.
    #[serde(default)]
    pub textures: BTreeMap<TextureChannel, String>,
}

/// A single keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Key<T> {
    pub time: f32,
    pub value: T,
}

/// Keyframed channels driving one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub node: NodeId,
    #[serde(default)]
    pub translations: Vec<Key<Vec3>>,
    #[serde(default)]
    pub rotations: Vec<Key<Quat>>,
    #[serde(default)]
    pub scales: Vec<Key<Vec3>>,
}

/// A keyframed animation clip attached to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    #[serde(default)]
    pub source: ClipSource,
    pub owner: NodeId,
    pub length: f32,
    pub frame_rate: f32,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// An in-memory scene.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryScene {
    pub nodes: Vec<SceneNode>,
    pub renderables: Vec<MemoryRenderable>,
    pub materials: Vec<Material>,
    pub clips: Vec<Clip>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON scene description.
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: MemoryScene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Load a JSON scene description from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        transform: NodeTransform,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            parent,
            transform,
        });
        id
    }

    pub fn add_material(&mut self, name: impl Into<String>) -> MaterialId {
        let id = MaterialId(self.materials.len());
        self.materials.push(Material {
            name: name.into(),
            textures: BTreeMap::new(),
        });
        id
    }

    pub fn set_texture(&mut self, material: MaterialId, channel: TextureChannel, path: impl Into<String>) {
        if let Some(m) = self.materials.get_mut(material.0) {
            m.textures.insert(channel, path.into());
        }
    }

    pub fn add_renderable(&mut self, renderable: MemoryRenderable) {
        self.renderables.push(renderable);
    }

    pub fn add_clip(&mut self, clip: Clip) -> ClipId {
        let id = ClipId(self.clips.len());
        self.clips.push(clip);
        id
    }

    /// First node with the given name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn transform(&self, node: NodeId) -> NodeTransform {
        self.nodes[node.0].transform
    }

    pub fn set_transform(&mut self, node: NodeId, transform: NodeTransform) {
        self.nodes[node.0].transform = transform;
    }

    /// True if `node` is `root` or one of its descendants.
    pub fn is_under(&self, node: NodeId, root: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(n) = current {
            if n == root {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }

    fn renderables_under(&self, root: NodeId, skinned: bool) -> Vec<&MemoryRenderable> {
        self.renderables
            .iter()
            .filter(|r| r.skinned == skinned && self.is_under(r.node, root))
            .collect()
    }

    /// Check that every index in the scene refers to something that exists.
    pub fn validate(&self) -> Result<()> {
        let node_count = self.nodes.len();
        let check_node = |id: NodeId, what: &str| -> Result<()> {
            if id.0 < node_count {
                Ok(())
            } else {
                Err(ExportError::InvalidScene(format!(
                    "{} references node {} but the scene has {} nodes",
                    what, id.0, node_count
                )))
            }
        };

        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                check_node(parent, &format!("node '{}'", node.name))?;
            }
            if !self.is_under_root_chain(NodeId(i)) {
                return Err(ExportError::InvalidScene(format!(
                    "node '{}' is part of a parent cycle",
                    node.name
                )));
            }
        }

        for r in &self.renderables {
            check_node(r.node, &format!("renderable '{}'", r.mesh.name))?;
            for &bone in &r.mesh.bones {
                check_node(bone, &format!("bones of mesh '{}'", r.mesh.name))?;
            }
            if let Some(m) = r.materials.iter().find(|m| m.0 >= self.materials.len()) {
                return Err(ExportError::InvalidScene(format!(
                    "renderable '{}' references material {} but the scene has {} materials",
                    r.mesh.name,
                    m.0,
                    self.materials.len()
                )));
            }
        }

        for clip in &self.clips {
            check_node(clip.owner, &format!("clip '{}'", clip.name))?;
            for track in &clip.tracks {
                check_node(track.node, &format!("track of clip '{}'", clip.name))?;
            }
        }

        Ok(())
    }

    /// Walks parents; false if the chain never terminates.
    fn is_under_root_chain(&self, node: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        for _ in 0..self.nodes.len() {
            match current {
                Some(p) if p.0 < self.nodes.len() => current = self.nodes[p.0].parent,
                _ => return true,
            }
        }
        false
    }
}

impl SceneGraph for MemoryScene {
    type Renderable = MemoryRenderable;

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.0].name
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn local_to_world(&self, node: NodeId) -> Mat4 {
        let mut world = self.nodes[node.0].transform.matrix();
        let mut current = self.nodes[node.0].parent;
        let mut steps = 0;
        while let Some(p) = current {
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            world = self.nodes[p.0].transform.matrix() * world;
            current = self.nodes[p.0].parent;
        }
        world
    }

    fn skinned_renderables(&self, root: NodeId) -> Vec<&MemoryRenderable> {
        self.renderables_under(root, true)
    }

    fn static_renderables(&self, root: NodeId) -> Vec<&MemoryRenderable> {
        self.renderables_under(root, false)
    }

    fn material_name(&self, material: MaterialId) -> &str {
        &self.materials[material.0].name
    }

    fn texture_path(&self, material: MaterialId, channel: TextureChannel) -> Option<&str> {
        self.materials[material.0]
            .textures
            .get(&channel)
            .map(String::as_str)
    }
}

impl PoseSampler for MemoryScene {
    type Pose = Vec<(NodeId, NodeTransform)>;

    fn clip(&self, root: NodeId, source: ClipSource) -> Option<ClipInfo> {
        self.clips
            .iter()
            .enumerate()
            .find(|(_, c)| c.owner == root && c.source == source)
            .map(|(i, c)| ClipInfo {
                id: ClipId(i),
                name: c.name.clone(),
                length: c.length,
                frame_rate: c.frame_rate,
            })
    }

    fn sample(&mut self, clip: ClipId, time: f32) {
        let Some(clip) = self.clips.get(clip.0) else {
            return;
        };

        for track in &clip.tracks {
            let node = &mut self.nodes[track.node.0];
            if let Some(t) = sample_keys(&track.translations, time, Vec3::lerp) {
                node.transform.translation = t;
            }
            if let Some(r) = sample_keys(&track.rotations, time, Quat::slerp) {
                node.transform.rotation = r;
            }
            if let Some(s) = sample_keys(&track.scales, time, Vec3::lerp) {
                node.transform.scale = s;
            }
        }
    }

    fn capture_pose(&self, clip: ClipId) -> Self::Pose {
        let Some(clip) = self.clips.get(clip.0) else {
            return Vec::new();
        };
        clip.tracks
            .iter()
            .map(|track| (track.node, self.transform(track.node)))
            .collect()
    }

    fn restore_pose(&mut self, pose: Self::Pose) {
        for (node, transform) in pose {
            self.set_transform(node, transform);
        }
    }
}

/// Interpolate a sorted keyframe list at `time`, clamping at both ends.
fn sample_keys<T: Copy>(keys: &[Key<T>], time: f32, interpolate: fn(T, T, f32) -> T) -> Option<T> {
    let first = keys.first()?;
    if keys.len() == 1 || time <= first.time {
        return Some(first.value);
    }

    let mut i = 0;
    while i < keys.len() - 1 && keys[i + 1].time < time {
        i += 1;
    }
    if i >= keys.len() - 1 {
        return keys.last().map(|k| k.value);
    }

    let (k0, k1) = (keys[i], keys[i + 1]);
    let factor = if k1.time > k0.time {
        ((time - k0.time) / (k1.time - k0.time)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some(interpolate(k0.value, k1.value, factor))
}
