//! Geometry chunk selection.
//!
//! Decides, from aggregated data, which chunks the geometry artifact carries,
//! and checks the writer emitted exactly that many.

use crate::aggregate::Aggregate;
use crate::error::IntegrityWarning;

/// Chunk type tags of the geometry artifact. Each tag is a distinct bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ChunkType {
    Positions = 1 << 0,
    Normals = 1 << 1,
    Tangents = 1 << 2,
    Colors = 1 << 3,
    Tex0 = 1 << 4,
    /// Declared by the format, never written.
    Tex1 = 1 << 5,
    WeightValues = 1 << 6,
    WeightIndices = 1 << 7,
    Indices = 1 << 8,
    JointNames = 1 << 9,
    JointParents = 1 << 10,
    BindPose = 1 << 11,
    BindPoseInv = 1 << 12,
    /// Declared by the format, never written; materials live in their own artifact.
    Material = 1 << 13,
    SubMeshes = 1 << 14,
    SubMeshNames = 1 << 15,
}

impl ChunkType {
    /// All tags, in bit order.
    pub const ALL: [ChunkType; 16] = [
        ChunkType::Positions,
        ChunkType::Normals,
        ChunkType::Tangents,
        ChunkType::Colors,
        ChunkType::Tex0,
        ChunkType::Tex1,
        ChunkType::WeightValues,
        ChunkType::WeightIndices,
        ChunkType::Indices,
        ChunkType::JointNames,
        ChunkType::JointParents,
        ChunkType::BindPose,
        ChunkType::BindPoseInv,
        ChunkType::Material,
        ChunkType::SubMeshes,
        ChunkType::SubMeshNames,
    ];

    /// The order chunks appear in the artifact body.
    pub const WRITE_ORDER: [ChunkType; 14] = [
        ChunkType::Positions,
        ChunkType::Normals,
        ChunkType::Tangents,
        ChunkType::Colors,
        ChunkType::Tex0,
        ChunkType::Indices,
        ChunkType::SubMeshes,
        ChunkType::SubMeshNames,
        ChunkType::WeightValues,
        ChunkType::WeightIndices,
        ChunkType::JointNames,
        ChunkType::JointParents,
        ChunkType::BindPose,
        ChunkType::BindPoseInv,
    ];

    /// Chunks emitted together whenever any renderable is skinned.
    pub const SKINNING: [ChunkType; 6] = [
        ChunkType::WeightValues,
        ChunkType::WeightIndices,
        ChunkType::JointNames,
        ChunkType::JointParents,
        ChunkType::BindPose,
        ChunkType::BindPoseInv,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }
}

/// A set of chunk types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSet(u32);

impl ChunkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chunk: ChunkType) {
        self.0 |= chunk.tag();
    }

    pub fn insert_if(&mut self, chunk: ChunkType, present: bool) {
        if present {
            self.insert(chunk);
        }
    }

    pub fn contains(&self, chunk: ChunkType) -> bool {
        self.0 & chunk.tag() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Members in artifact order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkType> + '_ {
        ChunkType::WRITE_ORDER
            .into_iter()
            .filter(move |c| self.contains(*c))
    }

    pub fn has_skinning(&self) -> bool {
        ChunkType::SKINNING.iter().all(|c| self.contains(*c))
    }
}

/// Chunks to emit for `aggregate`.
pub fn resolve(aggregate: &Aggregate) -> ChunkSet {
    let mesh = &aggregate.mesh;
    let mut chunks = ChunkSet::new();

    chunks.insert_if(ChunkType::Positions, !mesh.positions.is_empty());
    chunks.insert_if(ChunkType::Normals, !mesh.normals.is_empty());
    chunks.insert_if(ChunkType::Tangents, !mesh.tangents.is_empty());
    chunks.insert_if(ChunkType::Colors, !mesh.colors.is_empty());
    chunks.insert_if(ChunkType::Tex0, !mesh.uvs.is_empty());
    chunks.insert_if(ChunkType::Indices, !mesh.indices.is_empty());
    chunks.insert_if(ChunkType::SubMeshes, !mesh.submeshes.is_empty());
    chunks.insert_if(ChunkType::SubMeshNames, !mesh.submesh_names.is_empty());

    if aggregate.is_skinned() {
        for chunk in ChunkType::SKINNING {
            chunks.insert(chunk);
        }
    }

    chunks
}

/// Counts chunks as they are written, for comparison with the declared set.
#[derive(Debug, Clone)]
pub struct ChunkCounter {
    expected: usize,
    written: usize,
}

impl ChunkCounter {
    pub fn new(expected: &ChunkSet) -> Self {
        Self {
            expected: expected.len(),
            written: 0,
        }
    }

    /// Count one chunk whose records have been written.
    pub fn record(&mut self) {
        self.written += 1;
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// A warning if the written count differs from the declared one.
    pub fn verify(&self) -> Option<IntegrityWarning> {
        (self.written != self.expected).then(|| IntegrityWarning::ChunkCountMismatch {
            expected: self.expected,
            written: self.written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregate, SubmeshRange};
    use glam::{Vec2, Vec3};

    #[test]
    fn test_tags_are_distinct_bits() {
        let mut seen = 0u32;
        for chunk in ChunkType::ALL {
            assert_eq!(chunk.tag().count_ones(), 1);
            assert_eq!(seen & chunk.tag(), 0);
            seen |= chunk.tag();
            assert_eq!(ChunkType::from_tag(chunk.tag()), Some(chunk));
        }
        assert_eq!(ChunkType::Indices.tag(), 256);
        assert_eq!(ChunkType::SubMeshNames.tag(), 32768);
        assert_eq!(ChunkType::from_tag(3), None);
    }

    #[test]
    fn test_static_mesh_has_no_skinning_chunks() {
        let mut aggregate = Aggregate::default();
        aggregate.static_count = 1;
        aggregate.mesh.positions = vec![Vec3::ZERO; 3];
        aggregate.mesh.uvs = vec![Vec2::ZERO; 3];
        aggregate.mesh.indices = vec![0, 1, 2];
        aggregate.mesh.submeshes = vec![SubmeshRange { start: 0, count: 3 }];
        aggregate.mesh.submesh_names = vec!["Cube_0".to_string()];

        let chunks = resolve(&aggregate);
        assert_eq!(chunks.len(), 5);
        assert!(!chunks.contains(ChunkType::Normals));
        assert!(!chunks.has_skinning());
        let order: Vec<ChunkType> = chunks.iter().collect();
        assert_eq!(
            order,
            vec![
                ChunkType::Positions,
                ChunkType::Tex0,
                ChunkType::Indices,
                ChunkType::SubMeshes,
                ChunkType::SubMeshNames
            ]
        );
    }

    #[test]
    fn test_skinning_block_added_as_a_whole() {
        let mut aggregate = Aggregate::default();
        aggregate.skinned_count = 1;
        aggregate.mesh.positions = vec![Vec3::ZERO];

        let chunks = resolve(&aggregate);
        assert!(chunks.has_skinning());
        assert_eq!(chunks.len(), 7);
    }

    #[test]
    fn test_counter_reports_mismatch() {
        let mut set = ChunkSet::new();
        set.insert(ChunkType::Positions);
        set.insert(ChunkType::Normals);

        let mut counter = ChunkCounter::new(&set);
        counter.record();
        assert_eq!(
            counter.verify(),
            Some(IntegrityWarning::ChunkCountMismatch {
                expected: 2,
                written: 1
            })
        );
        counter.record();
        assert_eq!(counter.written(), 2);
        assert_eq!(counter.verify(), None);
    }
}
