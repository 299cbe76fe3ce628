//! Merged skeleton collection.
//!
//! Every renderable contributes bones to one global table: skinned meshes
//! contribute their bone lists, static meshes contribute their own node and
//! its parent so they can be rigidly bound. How the table is built depends on
//! the [`BindPoseStrategy`]:
//!
//! - [`BindPoseStrategy::LiveTransforms`]: bones are deduplicated by *name*
//!   (two distinct nodes with the same name collapse into one bone) and the
//!   table is stable-sorted by depth.
//! - [`BindPoseStrategy::MeshBindPoses`]: each skinned mesh appends all of its
//!   bones in order, even when another mesh already added them, and the table
//!   is never sorted. Entry `offset + i` is local bone `i` of that mesh.

use crate::config::BindPoseStrategy;
use crate::scene::{MeshSource, NodeId, SceneGraph};
use glam::Mat4;
use std::collections::HashMap;

/// Returned by [`Skeleton::bone_index_or_sentinel`] for nodes that are not bones.
pub const NOT_A_BONE: i32 = -1;

/// One bone of the merged skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneEntry {
    /// Scene node driving this bone.
    pub node: NodeId,
    pub name: String,
    /// Number of ancestors up to the scene root.
    pub depth: usize,
    /// Authored bind pose, only recorded under [`BindPoseStrategy::MeshBindPoses`].
    pub bind_pose: Option<Mat4>,
}

/// The merged, deduplicated bone table.
#[derive(Debug, Clone)]
pub struct Skeleton {
    strategy: BindPoseStrategy,
    bones: Vec<BoneEntry>,
    by_node: HashMap<NodeId, usize>,
    by_name: HashMap<String, usize>,
    mesh_offsets: Vec<usize>,
}

impl Skeleton {
    /// Build the bone table from skinned renderables, then static ones.
    pub fn collect<S: SceneGraph>(
        scene: &S,
        skinned: &[&S::Renderable],
        statics: &[&S::Renderable],
        strategy: BindPoseStrategy,
    ) -> Self {
        let mut skeleton = Skeleton {
            strategy,
            bones: Vec::new(),
            by_node: HashMap::new(),
            by_name: HashMap::new(),
            mesh_offsets: Vec::with_capacity(skinned.len()),
        };

        for renderable in skinned {
            skeleton.mesh_offsets.push(skeleton.bones.len());

            match strategy {
                BindPoseStrategy::LiveTransforms => {
                    for &bone in renderable.bones() {
                        skeleton.add_unique(scene, bone);
                    }
                }
                BindPoseStrategy::MeshBindPoses => {
                    let bind_poses = renderable.bind_poses();
                    if bind_poses.len() != renderable.bones().len() {
                        log::warn!(
                            "Mesh '{}' has {} bones but {} bind poses",
                            renderable.mesh_name(),
                            renderable.bones().len(),
                            bind_poses.len()
                        );
                    }
                    for (i, &bone) in renderable.bones().iter().enumerate() {
                        skeleton.push(scene, bone, bind_poses.get(i).copied());
                    }
                }
            }
        }

        for renderable in statics {
            let node = renderable.node();
            skeleton.add_unique(scene, node);
            if let Some(parent) = scene.parent(node) {
                skeleton.add_unique(scene, parent);
            }
        }

        if strategy == BindPoseStrategy::LiveTransforms {
            // Parents before children; stable so equal depths keep insertion order.
            skeleton.bones.sort_by_key(|b| b.depth);
            skeleton.reindex();
        }

        skeleton
    }

    fn push<S: SceneGraph>(&mut self, scene: &S, node: NodeId, bind_pose: Option<Mat4>) {
        let index = self.bones.len();
        let name = scene.name(node).to_string();
        self.by_node.entry(node).or_insert(index);
        self.by_name.entry(name.clone()).or_insert(index);
        self.bones.push(BoneEntry {
            node,
            name,
            depth: scene.depth(node),
            bind_pose,
        });
    }

    /// Add `node` unless a bone with the same name already exists.
    fn add_unique<S: SceneGraph>(&mut self, scene: &S, node: NodeId) {
        if !self.by_name.contains_key(scene.name(node)) {
            self.push(scene, node, None);
        }
    }

    fn reindex(&mut self) {
        self.by_node.clear();
        self.by_name.clear();
        for (i, bone) in self.bones.iter().enumerate() {
            self.by_node.entry(bone.node).or_insert(i);
            self.by_name.entry(bone.name.clone()).or_insert(i);
        }
    }

    pub fn strategy(&self) -> BindPoseStrategy {
        self.strategy
    }

    pub fn bones(&self) -> &[BoneEntry] {
        &self.bones
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Global index of the first bone driven by `node` (identity lookup).
    pub fn bone_index(&self, node: NodeId) -> Option<usize> {
        self.by_node.get(&node).copied()
    }

    /// [`bone_index`](Self::bone_index) with [`NOT_A_BONE`] for misses.
    pub fn bone_index_or_sentinel(&self, node: NodeId) -> i32 {
        self.bone_index(node)
            .map(|i| i as i32)
            .unwrap_or(NOT_A_BONE)
    }

    /// Global index of the first bone with this name.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// First global bone index of the `skinned_index`-th skinned renderable.
    pub fn mesh_offset(&self, skinned_index: usize) -> Option<usize> {
        self.mesh_offsets.get(skinned_index).copied()
    }

    /// Parent bone index per bone, [`NOT_A_BONE`] for roots and for parents
    /// that are not part of the skeleton.
    pub fn parent_indices<S: SceneGraph>(&self, scene: &S) -> Vec<i32> {
        self.bones
            .iter()
            .map(|b| match scene.parent(b.node) {
                Some(p) => self.bone_index_or_sentinel(p),
                None => NOT_A_BONE,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::memory::{MemoryRenderable, MeshData, NodeTransform};
    use crate::scene::MemoryScene;

    fn skinned(node: NodeId, bones: Vec<NodeId>) -> MemoryRenderable {
        let bind_poses = bones.iter().map(|_| Mat4::IDENTITY).collect();
        MemoryRenderable {
            node,
            mesh: MeshData {
                name: "Skin".to_string(),
                bones,
                bind_poses,
                ..MeshData::default()
            },
            skinned: true,
            materials: Vec::new(),
        }
    }

    fn collect(scene: &MemoryScene, root: NodeId, strategy: BindPoseStrategy) -> Skeleton {
        let skinned = scene.skinned_renderables(root);
        let statics = scene.static_renderables(root);
        Skeleton::collect(scene, &skinned, &statics, strategy)
    }

    /// Two rigs that share three bones by name: Hips > Spine > Chest, each
    /// with two unique leaf bones of their own.
    fn shared_rig_scene() -> (MemoryScene, NodeId) {
        let mut scene = MemoryScene::new();
        let root = scene.add_node("Character", None, NodeTransform::default());

        let rig = |scene: &mut MemoryScene, prefix: &str| -> Vec<NodeId> {
            // Leaves first so insertion order differs from depth order.
            let hips = scene.add_node("Hips", Some(root), NodeTransform::default());
            let spine = scene.add_node("Spine", Some(hips), NodeTransform::default());
            let chest = scene.add_node("Chest", Some(spine), NodeTransform::default());
            let a = scene.add_node(format!("{}_A", prefix), Some(chest), NodeTransform::default());
            let b = scene.add_node(format!("{}_B", prefix), Some(a), NodeTransform::default());
            vec![b, a, chest, spine, hips]
        };

        let body = rig(&mut scene, "Body");
        let cape = rig(&mut scene, "Cape");
        scene.add_renderable(skinned(root, body));
        scene.add_renderable(skinned(root, cape));
        (scene, root)
    }

    #[test]
    fn test_shared_bones_deduplicated_by_name_and_sorted() {
        let (scene, root) = shared_rig_scene();
        let skeleton = collect(&scene, root, BindPoseStrategy::LiveTransforms);

        assert_eq!(skeleton.len(), 7);
        let depths: Vec<usize> = skeleton.bones().iter().map(|b| b.depth).collect();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]), "{:?}", depths);

        let names: Vec<&str> = skeleton.bones().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Hips", "Spine", "Chest", "Body_A", "Cape_A", "Body_B", "Cape_B"]
        );
    }

    #[test]
    fn test_mesh_bind_poses_keep_insertion_order() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node("Root", None, NodeTransform::default());
        let mut chain = Vec::new();
        let mut parent = root;
        for i in 0..5 {
            parent = scene.add_node(format!("Bone{}", i), Some(parent), NodeTransform::default());
            chain.push(parent);
        }
        // Deepest first: a depth sort would reorder these.
        let first: Vec<NodeId> = chain[..4].iter().rev().copied().collect();
        let second: Vec<NodeId> = chain.iter().rev().copied().collect();
        scene.add_renderable(skinned(root, first.clone()));
        scene.add_renderable(skinned(root, second.clone()));

        let skeleton = collect(&scene, root, BindPoseStrategy::MeshBindPoses);
        assert_eq!(skeleton.len(), 9);

        let nodes: Vec<NodeId> = skeleton.bones().iter().map(|b| b.node).collect();
        let expected: Vec<NodeId> = first.iter().chain(second.iter()).copied().collect();
        assert_eq!(nodes, expected);
        assert_eq!(skeleton.mesh_offset(0), Some(0));
        assert_eq!(skeleton.mesh_offset(1), Some(4));
        assert!(skeleton.bones().iter().all(|b| b.bind_pose == Some(Mat4::IDENTITY)));
    }

    #[test]
    fn test_static_adds_self_and_parent() {
        let mut scene = MemoryScene::new();
        let root = scene.add_node("Root", None, NodeTransform::default());
        let arm = scene.add_node("Arm", Some(root), NodeTransform::default());
        let sword = scene.add_node("Sword", Some(arm), NodeTransform::default());
        scene.add_renderable(MemoryRenderable {
            node: sword,
            mesh: MeshData::default(),
            skinned: false,
            materials: Vec::new(),
        });

        let skeleton = collect(&scene, root, BindPoseStrategy::LiveTransforms);
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton.bone_index(arm), Some(0));
        assert_eq!(skeleton.bone_index(sword), Some(1));
        assert_eq!(skeleton.bone_index_or_sentinel(root), NOT_A_BONE);
        assert_eq!(skeleton.parent_indices(&scene), vec![NOT_A_BONE, 0]);
    }

    #[test]
    fn test_static_without_parent() {
        let mut scene = MemoryScene::new();
        let lone = scene.add_node("Lone", None, NodeTransform::default());
        scene.add_renderable(MemoryRenderable {
            node: lone,
            mesh: MeshData::default(),
            skinned: false,
            materials: Vec::new(),
        });

        let skeleton = collect(&scene, lone, BindPoseStrategy::LiveTransforms);
        assert_eq!(skeleton.len(), 1);
        assert_eq!(skeleton.bone_index(lone), Some(0));
    }

    #[test]
    fn test_collection_is_deterministic() {
        let (scene, root) = shared_rig_scene();
        let a = collect(&scene, root, BindPoseStrategy::LiveTransforms);
        let b = collect(&scene, root, BindPoseStrategy::LiveTransforms);
        assert_eq!(a.bones(), b.bones());
    }

    #[test]
    fn test_name_lookup_after_sort() {
        let (scene, root) = shared_rig_scene();
        let skeleton = collect(&scene, root, BindPoseStrategy::LiveTransforms);
        for (i, bone) in skeleton.bones().iter().enumerate() {
            assert_eq!(skeleton.index_of_name(&bone.name), Some(i));
            assert_eq!(skeleton.bone_index(bone.node), Some(i));
        }
    }
}
