//! Shared types used throughout the library.

mod channel;
mod transform;

pub use channel::TextureChannel;
pub use transform::{mirror_z, mirror_z_inverse, Z_MIRROR};

use serde::{Deserialize, Serialize};

/// Number of bone influences stored per vertex.
pub const INFLUENCES: usize = 4;

/// Per-vertex skin weights: four (bone index, weight) pairs.
///
/// Indices are local to the owning mesh's bone list until the aggregator
/// remaps them into the merged skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneWeight {
    pub indices: [u32; INFLUENCES],
    pub weights: [f32; INFLUENCES],
}

impl BoneWeight {
    pub fn new(indices: [u32; INFLUENCES], weights: [f32; INFLUENCES]) -> Self {
        Self { indices, weights }
    }

    /// A rigid binding: all weight on a single bone.
    pub fn rigid(bone: u32) -> Self {
        Self {
            indices: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }

    /// Sum of the four weights.
    pub fn total(&self) -> f32 {
        self.weights.iter().sum()
    }
}

/// Strip a leading asset-root directory from an asset path.
///
/// `Assets/Textures/a.png` relative to `Assets` becomes `/Textures/a.png`;
/// the separator is kept so the result stays rooted. Paths outside the root
/// are returned unchanged.
pub fn relativize_asset_path<'a>(path: &'a str, root: &str) -> &'a str {
    if root.is_empty() {
        return path;
    }
    match path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => path,
    }
}
