//! Geometry artifact (`.msh`) writer.
//!
//! Layout:
//!
//! ```text
//! MeshGeometry
//! <version>
//! <submesh count>
//! <vertex count>
//! <index count>
//! <chunk count>
//! <chunk tag>
//! <chunk records...>
//! ...
//! ```

use super::{write_matrix, FORMAT_VERSION};
use crate::aggregate::Aggregate;
use crate::capabilities::{ChunkCounter, ChunkSet, ChunkType};
use crate::config::{BindPoseStrategy, ExportConfig};
use crate::error::{IntegrityWarning, Result};
use crate::scene::SceneGraph;
use crate::skeleton::Skeleton;
use crate::types::{mirror_z, mirror_z_inverse};
use glam::Mat4;
use std::io::Write;

pub const GEOMETRY_HEADER: &str = "MeshGeometry";

/// Bind-pose and inverse-bind-pose matrices, one per bone.
#[derive(Debug, Clone, Default)]
pub struct BindPoses {
    pub bind: Vec<Mat4>,
    pub inverse: Vec<Mat4>,
}

impl BindPoses {
    /// Compute both chunks for the skeleton's strategy.
    pub fn compute<S: SceneGraph>(scene: &S, skeleton: &Skeleton, flip_z: bool) -> Self {
        let mut poses = BindPoses {
            bind: Vec::with_capacity(skeleton.len()),
            inverse: Vec::with_capacity(skeleton.len()),
        };

        for bone in skeleton.bones() {
            let authored = match skeleton.strategy() {
                BindPoseStrategy::MeshBindPoses => bone.bind_pose,
                BindPoseStrategy::LiveTransforms => None,
            };

            match authored {
                Some(bind_pose) => {
                    // Authored bind poses are inverse-bind matrices already.
                    let mirrored = mirror_z(bind_pose, flip_z);
                    poses.bind.push(mirrored.inverse());
                    poses.inverse.push(mirrored);
                }
                None => {
                    let world = scene.local_to_world(bone.node);
                    poses.bind.push(mirror_z(world, flip_z));
                    poses.inverse.push(if flip_z {
                        mirror_z_inverse(world, true)
                    } else {
                        scene.world_to_local(bone.node)
                    });
                }
            }
        }

        poses
    }
}

/// Write the geometry artifact for an aggregated scene.
///
/// Returns a warning if the number of chunks written differs from the
/// declared count.
pub fn write_geometry<W: Write, S: SceneGraph>(
    out: &mut W,
    scene: &S,
    skeleton: &Skeleton,
    aggregate: &Aggregate,
    chunks: &ChunkSet,
    config: &ExportConfig,
) -> Result<Option<IntegrityWarning>> {
    let mesh = &aggregate.mesh;

    writeln!(out, "{}", GEOMETRY_HEADER)?;
    writeln!(out, "{}", FORMAT_VERSION)?;
    writeln!(out, "{}", mesh.submesh_count())?;
    writeln!(out, "{}", mesh.vertex_count())?;
    writeln!(out, "{}", mesh.index_count())?;
    writeln!(out, "{}", chunks.len())?;

    let mut counter = ChunkCounter::new(chunks);
    let bind_poses = if chunks.has_skinning() {
        BindPoses::compute(scene, skeleton, config.flip_z)
    } else {
        BindPoses::default()
    };

    for chunk in chunks.iter() {
        writeln!(out, "{}", chunk.tag())?;

        match chunk {
            ChunkType::Positions => {
                for v in &mesh.positions {
                    writeln!(out, "{} {} {}", v.x, v.y, v.z)?;
                }
            }
            ChunkType::Normals => {
                for v in &mesh.normals {
                    writeln!(out, "{} {} {}", v.x, v.y, v.z)?;
                }
            }
            ChunkType::Tangents => {
                for v in &mesh.tangents {
                    writeln!(out, "{} {} {} {}", v.x, v.y, v.z, v.w)?;
                }
            }
            ChunkType::Colors => {
                for c in &mesh.colors {
                    writeln!(out, "{} {} {} {}", c.x, c.y, c.z, c.w)?;
                }
            }
            ChunkType::Tex0 => {
                for uv in &mesh.uvs {
                    writeln!(out, "{} {}", uv.x, uv.y)?;
                }
            }
            ChunkType::Indices => {
                for tri in mesh.indices.chunks_exact(3) {
                    if config.flip_z {
                        // Mirroring flips handedness; swap to keep front faces.
                        writeln!(out, "{} {} {}", tri[0], tri[2], tri[1])?;
                    } else {
                        writeln!(out, "{} {} {}", tri[0], tri[1], tri[2])?;
                    }
                }
            }
            ChunkType::SubMeshes => {
                for range in &mesh.submeshes {
                    writeln!(out, "{} {}", range.start, range.count)?;
                }
            }
            ChunkType::SubMeshNames => {
                for name in &mesh.submesh_names {
                    writeln!(out, "{}", name)?;
                }
            }
            ChunkType::WeightValues => {
                for w in &aggregate.skinning.weights {
                    writeln!(out, "{} {} {} {}", w[0], w[1], w[2], w[3])?;
                }
            }
            ChunkType::WeightIndices => {
                for i in &aggregate.skinning.indices {
                    writeln!(out, "{} {} {} {}", i[0], i[1], i[2], i[3])?;
                }
            }
            ChunkType::JointNames => {
                writeln!(out, "{}", skeleton.len())?;
                for bone in skeleton.bones() {
                    writeln!(out, "{}", bone.name)?;
                }
            }
            ChunkType::JointParents => {
                writeln!(out, "{}", skeleton.len())?;
                for parent in skeleton.parent_indices(scene) {
                    writeln!(out, "{}", parent)?;
                }
            }
            ChunkType::BindPose => {
                writeln!(out, "{}", bind_poses.bind.len())?;
                for m in &bind_poses.bind {
                    write_matrix(out, m)?;
                }
            }
            ChunkType::BindPoseInv => {
                writeln!(out, "{}", bind_poses.inverse.len())?;
                for m in &bind_poses.inverse {
                    write_matrix(out, m)?;
                }
            }
            ChunkType::Tex1 | ChunkType::Material => {
                log::warn!("No records for chunk {:?}", chunk);
                continue;
            }
        }
        counter.record();
    }

    let warning = counter.verify();
    if let Some(w) = &warning {
        log::warn!("{}", w);
    }
    Ok(warning)
}
