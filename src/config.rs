//! Export configuration.

use serde::{Deserialize, Serialize};

/// How bind poses are derived for the merged skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindPoseStrategy {
    /// Bones are deduplicated by name, sorted by depth, and bound to their
    /// current world transforms.
    #[default]
    LiveTransforms,
    /// Every mesh keeps its authored bind poses. Bones are appended per mesh
    /// without deduplication or sorting so they line up with each mesh's
    /// bind-pose array.
    MeshBindPoses,
}

impl BindPoseStrategy {
    pub fn from_force_mesh_bind_pose(force: bool) -> Self {
        if force {
            BindPoseStrategy::MeshBindPoses
        } else {
            BindPoseStrategy::LiveTransforms
        }
    }
}

/// Which animation clip the pose sampler evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipSource {
    /// The clip currently driven by the host's animation controller.
    #[default]
    Animator,
    /// The explicit clip attached to the export root.
    Legacy,
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Mirror the Z axis: positions, matrices and triangle winding.
    pub flip_z: bool,
    /// Animation clip source.
    pub clip_source: ClipSource,
    /// Bind pose strategy.
    pub bind_pose: BindPoseStrategy,
    /// Basename for the animation artifact. Defaults to the export root's name.
    pub anim_name: Option<String>,
    /// Directory prefix removed from texture asset paths.
    pub asset_root: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            flip_z: false,
            clip_source: ClipSource::Animator,
            bind_pose: BindPoseStrategy::LiveTransforms,
            anim_name: None,
            asset_root: "Assets".to_string(),
        }
    }
}

impl ExportConfig {
    pub fn with_flip_z(mut self, flip_z: bool) -> Self {
        self.flip_z = flip_z;
        self
    }

    pub fn with_clip_source(mut self, source: ClipSource) -> Self {
        self.clip_source = source;
        self
    }

    pub fn with_bind_pose(mut self, strategy: BindPoseStrategy) -> Self {
        self.bind_pose = strategy;
        self
    }

    pub fn with_anim_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.anim_name = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<String>) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Basename of the animation artifact for an export root called `root_name`.
    pub fn anim_basename<'a>(&'a self, root_name: &'a str) -> &'a str {
        self.anim_name.as_deref().unwrap_or(root_name)
    }
}
