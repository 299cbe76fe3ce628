//! Attribute aggregation.
//!
//! Merges every renderable into one vertex/index buffer expressed in world
//! space (optionally Z-mirrored), one set of 4-influence skin weights indexed
//! into the merged [`Skeleton`], and one material table.
//!
//! Aggregation runs in two passes. [`Aggregator::preprocess`] only records
//! which optional attributes exist anywhere, so that renderables lacking an
//! attribute can be backfilled and every per-vertex array keeps exactly one
//! entry per vertex. The `process_*` calls then append data, skinned
//! renderables first.

use crate::config::{BindPoseStrategy, ExportConfig};
use crate::error::IntegrityWarning;
use crate::scene::{MaterialId, MeshSource, NodeId, SceneGraph};
use crate::skeleton::Skeleton;
use crate::types::{mirror_z, BoneWeight, INFLUENCES};
use glam::{Vec2, Vec3, Vec4};
use std::collections::HashMap;

/// Sentinel written for submeshes without a material.
pub const NO_MATERIAL: i32 = -1;

/// A contiguous range of the merged index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshRange {
    pub start: usize,
    pub count: usize,
}

impl SubmeshRange {
    pub fn end(&self) -> usize {
        self.start + self.count
    }
}

/// Merged geometry of all renderables.
///
/// Each optional attribute array is either empty or has one entry per position.
#[derive(Debug, Clone, Default)]
pub struct MergedMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    /// Triangle indices into the merged vertex arrays.
    pub indices: Vec<u32>,
    /// Index ranges in emission order; they tile `indices` exactly.
    pub submeshes: Vec<SubmeshRange>,
    /// `<mesh name>_<submesh index>` per submesh.
    pub submesh_names: Vec<String>,
}

impl MergedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }
}

/// Merged skin weights, one entry per vertex.
#[derive(Debug, Clone, Default)]
pub struct SkinningData {
    pub weights: Vec<[f32; INFLUENCES]>,
    /// Indices into the merged skeleton.
    pub indices: Vec<[u32; INFLUENCES]>,
}

impl SkinningData {
    fn push(&mut self, weight: BoneWeight) {
        self.weights.push(weight.weights);
        self.indices.push(weight.indices);
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Bone indices as a flat, stride-4 array.
    pub fn weight_indices_flat(&self) -> Vec<u32> {
        self.indices.iter().flatten().copied().collect()
    }
}

/// Unique materials in first-use order, plus the material slot of every submesh.
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<MaterialId>,
    lookup: HashMap<MaterialId, usize>,
    submesh_materials: Vec<Option<usize>>,
}

impl MaterialTable {
    /// Index of `material`, adding it if this is its first use.
    pub fn intern(&mut self, material: MaterialId) -> usize {
        if let Some(&index) = self.lookup.get(&material) {
            return index;
        }
        let index = self.materials.len();
        self.materials.push(material);
        self.lookup.insert(material, index);
        index
    }

    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Material table index per submesh; `None` when the mesh declared fewer
    /// materials than submeshes.
    pub fn submesh_materials(&self) -> &[Option<usize>] {
        &self.submesh_materials
    }

    /// Per-submesh material ids as written, [`NO_MATERIAL`] for missing ones.
    pub fn submesh_material_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.submesh_materials
            .iter()
            .map(|m| m.map(|i| i as i32).unwrap_or(NO_MATERIAL))
    }
}

/// Which optional attributes exist on at least one renderable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttributePresence {
    pub normals: bool,
    pub tangents: bool,
    pub uvs: bool,
    pub colors: bool,
}

/// Everything produced by aggregation.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    pub mesh: MergedMesh,
    pub skinning: SkinningData,
    pub materials: MaterialTable,
    pub presence: AttributePresence,
    pub skinned_count: usize,
    pub static_count: usize,
    pub warnings: Vec<IntegrityWarning>,
}

impl Aggregate {
    pub fn is_skinned(&self) -> bool {
        self.skinned_count > 0
    }
}

/// Aggregation context for one export.
pub struct Aggregator<'a, S: SceneGraph> {
    scene: &'a S,
    skeleton: &'a Skeleton,
    config: &'a ExportConfig,
    out: Aggregate,
}

impl<'a, S: SceneGraph> Aggregator<'a, S> {
    pub fn new(scene: &'a S, skeleton: &'a Skeleton, config: &'a ExportConfig) -> Self {
        Self {
            scene,
            skeleton,
            config,
            out: Aggregate::default(),
        }
    }

    /// First pass: note which optional attributes this renderable has.
    pub fn preprocess(&mut self, renderable: &S::Renderable) {
        let presence = &mut self.out.presence;
        presence.normals |= !renderable.normals().is_empty();
        presence.tangents |= !renderable.tangents().is_empty();
        presence.uvs |= !renderable.uvs().is_empty();
        presence.colors |= !renderable.colors().is_empty();
    }

    /// Second pass for a skinned renderable. `skinned_index` is its position
    /// among the skinned renderables handed to [`Skeleton::collect`].
    pub fn process_skinned(&mut self, skinned_index: usize, renderable: &S::Renderable) {
        self.out.skinned_count += 1;
        let start_vertex = self.append_vertices(renderable);

        let mesh = renderable.mesh_name();
        let vertex_count = renderable.vertex_count();
        let weights = renderable.bone_weights();
        if weights.len() != vertex_count {
            self.warn(IntegrityWarning::WeightCountMismatch {
                mesh: mesh.to_string(),
                vertices: vertex_count,
                weights: weights.len(),
            });
        }

        let remap = self.bone_remap(skinned_index, renderable);
        let mut out_of_range = 0;
        for i in 0..vertex_count {
            let Some(weight) = weights.get(i) else {
                self.out.skinning.push(BoneWeight::default());
                continue;
            };
            let mut indices = [0; INFLUENCES];
            for (slot, &local) in indices.iter_mut().zip(weight.indices.iter()) {
                *slot = match remap.get(local as usize) {
                    Some(&global) => global,
                    None => {
                        out_of_range += 1;
                        0
                    }
                };
            }
            self.out.skinning.push(BoneWeight::new(indices, weight.weights));
        }

        if out_of_range > 0 {
            self.warn(IntegrityWarning::BoneIndexOutOfRange {
                mesh: mesh.to_string(),
                count: out_of_range,
                bones: remap.len(),
            });
        }

        self.append_submeshes(renderable, start_vertex);
    }

    /// Second pass for an unskinned renderable: every vertex is rigidly bound
    /// to the bone of the renderable's own node.
    pub fn process_static(&mut self, renderable: &S::Renderable) {
        self.out.static_count += 1;
        let start_vertex = self.append_vertices(renderable);

        let bone = self.resolve_bone(renderable.mesh_name(), renderable.node());
        let rigid = BoneWeight::rigid(bone);
        for _ in 0..renderable.vertex_count() {
            self.out.skinning.push(rigid);
        }

        self.append_submeshes(renderable, start_vertex);
    }

    pub fn finish(self) -> Aggregate {
        self.out
    }

    fn warn(&mut self, warning: IntegrityWarning) {
        log::warn!("{}", warning);
        self.out.warnings.push(warning);
    }

    /// Global bone index for every local bone of a skinned renderable.
    fn bone_remap(&mut self, skinned_index: usize, renderable: &S::Renderable) -> Vec<u32> {
        let bones = renderable.bones();
        match self.skeleton.strategy() {
            BindPoseStrategy::MeshBindPoses => {
                let offset = self.skeleton.mesh_offset(skinned_index).unwrap_or(0);
                (0..bones.len()).map(|i| (offset + i) as u32).collect()
            }
            BindPoseStrategy::LiveTransforms => bones
                .iter()
                .map(|&bone| self.resolve_bone(renderable.mesh_name(), bone))
                .collect(),
        }
    }

    /// Identity lookup, then name lookup, then bone 0.
    fn resolve_bone(&mut self, mesh: &str, node: NodeId) -> u32 {
        let scene = self.scene;
        let name = scene.name(node);
        if let Some(index) = self
            .skeleton
            .bone_index(node)
            .or_else(|| self.skeleton.index_of_name(name))
        {
            return index as u32;
        }
        let bone = name.to_string();
        self.warn(IntegrityWarning::UnresolvedBone {
            mesh: mesh.to_string(),
            bone,
        });
        0
    }

    /// Append transformed vertex attributes; returns the first new vertex index.
    fn append_vertices(&mut self, renderable: &S::Renderable) -> u32 {
        let start_vertex = self.out.mesh.positions.len() as u32;
        let mesh = renderable.mesh_name();
        let vertex_count = renderable.vertex_count();
        log::debug!(
            "Mesh info: {} ({} vertices, {} weights)",
            mesh,
            vertex_count,
            renderable.bone_weights().len()
        );

        let world = mirror_z(
            self.scene.local_to_world(renderable.node()),
            self.config.flip_z,
        );
        let presence = self.out.presence;

        self.out
            .mesh
            .positions
            .extend(renderable.positions().iter().map(|&p| world.transform_point3(p)));

        if presence.normals {
            let normals = self.fit(mesh, "normals", renderable.normals(), vertex_count, Vec3::ZERO);
            self.out
                .mesh
                .normals
                .extend(normals.into_iter().map(|n| world.transform_vector3(n)));
        }
        if presence.tangents {
            let tangents = self.fit(mesh, "tangents", renderable.tangents(), vertex_count, Vec4::ZERO);
            self.out.mesh.tangents.extend(
                tangents
                    .into_iter()
                    .map(|t| world.transform_vector3(t.truncate()).extend(t.w)),
            );
        }
        if presence.uvs {
            let uvs = self.fit(mesh, "uvs", renderable.uvs(), vertex_count, Vec2::ZERO);
            self.out.mesh.uvs.extend(uvs);
        }
        if presence.colors {
            let colors = self.fit(mesh, "colors", renderable.colors(), vertex_count, Vec4::ZERO);
            self.out.mesh.colors.extend(colors);
        }

        start_vertex
    }

    /// Resize an attribute array to the vertex count. Missing arrays are
    /// backfilled silently; arrays of the wrong length are a warning.
    fn fit<T: Copy>(
        &mut self,
        mesh: &str,
        attribute: &'static str,
        values: &[T],
        vertex_count: usize,
        default: T,
    ) -> Vec<T> {
        if !values.is_empty() && values.len() != vertex_count {
            self.warn(IntegrityWarning::AttributeCountMismatch {
                mesh: mesh.to_string(),
                attribute,
                expected: vertex_count,
                found: values.len(),
            });
        }
        let mut fitted: Vec<T> = values.iter().take(vertex_count).copied().collect();
        fitted.resize(vertex_count, default);
        fitted
    }

    fn append_submeshes(&mut self, renderable: &S::Renderable, start_vertex: u32) {
        let materials = renderable.materials();

        for i in 0..renderable.submesh_count() {
            let slot = materials.get(i).map(|&m| self.out.materials.intern(m));
            self.out.materials.submesh_materials.push(slot);

            let name = format!("{}_{}", renderable.mesh_name(), i);
            let indices = renderable.submesh_indices(i);
            log::debug!("Submesh {}: {} indices", name, indices.len());

            let whole = indices.len() - indices.len() % 3;
            if whole != indices.len() {
                self.warn(IntegrityWarning::IncompleteTriangle {
                    submesh: name.clone(),
                    count: indices.len(),
                });
            }

            let start = self.out.mesh.indices.len();
            self.out
                .mesh
                .indices
                .extend(indices[..whole].iter().map(|&index| index + start_vertex));
            self.out.mesh.submeshes.push(SubmeshRange {
                start,
                count: whole,
            });
            self.out.mesh.submesh_names.push(name);
        }
    }
}

/// Run both aggregation passes over `skinned` then `statics`.
pub fn aggregate<S: SceneGraph>(
    scene: &S,
    skinned: &[&S::Renderable],
    statics: &[&S::Renderable],
    skeleton: &Skeleton,
    config: &ExportConfig,
) -> Aggregate {
    let mut aggregator = Aggregator::new(scene, skeleton, config);

    for &renderable in skinned.iter().chain(statics.iter()) {
        aggregator.preprocess(renderable);
    }
    for (i, &renderable) in skinned.iter().enumerate() {
        aggregator.process_skinned(i, renderable);
    }
    for &renderable in statics {
        aggregator.process_static(renderable);
    }

    aggregator.finish()
}
