//! # Scene Exporter
//!
//! A Rust library for consolidating a scene hierarchy into a single exportable
//! asset.
//!
//! ## Overview
//!
//! Given a root node, the exporter merges every skinned and static renderable
//! under it into one mesh with a unified skeleton, then writes three text
//! artifacts:
//!
//! - `<root>.msh`: geometry, skin weights, joints and bind poses
//! - `<anim>.anm`: every bone's world transform sampled per frame
//! - `<root>.mat`: materials and the per-submesh material ids
//!
//! ## Quick Start
//!
//! ```ignore
//! use scene_exporter::{load_scene, ExportConfig, Exporter};
//!
//! // Load a scene description
//! let mut scene = load_scene("path/to/scene.json")?;
//! let root = scene.find_node("Character").unwrap();
//!
//! // Export with Z mirrored for a left-handed consumer
//! let exporter = Exporter::with_config(ExportConfig::default().with_flip_z(true));
//! let report = exporter.export(&mut scene, root, "out".as_ref());
//! ```
//!
//! ## Host Integration
//!
//! The exporter reads scenes through the [`SceneGraph`], [`MeshSource`] and
//! [`PoseSampler`] traits. [`MemoryScene`] is a ready-made implementation;
//! existing engines implement the traits over their own storage.

pub mod error;
pub mod types;
pub mod config;
pub mod scene;
pub mod skeleton;
pub mod aggregate;
pub mod capabilities;
pub mod export;
pub mod exporter;
pub mod reader;

// Re-export main types for convenience
pub use error::{ExportError, IntegrityWarning, Result};
pub use types::{relativize_asset_path, BoneWeight, TextureChannel};
pub use config::{BindPoseStrategy, ClipSource, ExportConfig};
pub use scene::{ClipId, ClipInfo, MaterialId, MemoryScene, MeshSource, NodeId, PoseSampler, SceneGraph};
pub use skeleton::{BoneEntry, Skeleton};
pub use aggregate::{Aggregate, MergedMesh, SkinningData};
pub use capabilities::{ChunkSet, ChunkType};
pub use exporter::{ExportReport, Exporter, PreparedExport};
pub use reader::{read_animation, read_geometry, read_materials, AnimationFile, GeometryFile, MaterialFile};

/// Load a scene description from a JSON file.
pub fn load_scene<P: AsRef<std::path::Path>>(path: P) -> Result<MemoryScene> {
    MemoryScene::load(path)
}

/// Find a node by name, for callers that address the export root by name.
pub fn find_root(scene: &MemoryScene, name: &str) -> Result<NodeId> {
    scene
        .find_node(name)
        .ok_or_else(|| ExportError::NodeNotFound(name.to_string()))
}
