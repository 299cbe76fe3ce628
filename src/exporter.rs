//! Export orchestration.
//!
//! One [`Exporter::export`] call collects the skeleton, aggregates all
//! renderables and writes up to three artifacts. Each artifact is written
//! through its own buffered file handle and succeeds or fails on its own.

use crate::aggregate::{aggregate, Aggregate};
use crate::capabilities::{resolve, ChunkSet};
use crate::config::ExportConfig;
use crate::error::{ExportError, IntegrityWarning, Result};
use crate::export::{
    write_animation, write_geometry, write_materials, AnimationSummary, ANIMATION_EXTENSION,
    GEOMETRY_EXTENSION, MATERIAL_EXTENSION,
};
use crate::scene::{NodeId, PoseSampler, SceneGraph};
use crate::skeleton::Skeleton;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Aggregated scene data, ready for the writers.
#[derive(Debug, Clone)]
pub struct PreparedExport {
    pub root: NodeId,
    pub root_name: String,
    pub skeleton: Skeleton,
    pub aggregate: Aggregate,
    pub chunks: ChunkSet,
}

/// Outcome of an export, per artifact.
#[derive(Debug)]
pub struct ExportReport {
    pub geometry: Result<PathBuf>,
    /// `Ok(None)` when no animation was exported.
    pub animation: Result<Option<PathBuf>>,
    pub materials: Result<PathBuf>,
    pub bone_count: usize,
    pub vertex_count: usize,
    pub submesh_count: usize,
    pub animation_summary: Option<AnimationSummary>,
    pub warnings: Vec<IntegrityWarning>,
}

impl ExportReport {
    /// True if every attempted artifact was written.
    pub fn is_ok(&self) -> bool {
        self.geometry.is_ok() && self.animation.is_ok() && self.materials.is_ok()
    }

    /// Collapse into the first artifact error, if any.
    pub fn into_result(self) -> Result<Self> {
        if let Err(e) = &self.geometry {
            return Err(ExportError::Export(format!("geometry: {}", e)));
        }
        if let Err(e) = &self.animation {
            return Err(ExportError::Export(format!("animation: {}", e)));
        }
        if let Err(e) = &self.materials {
            return Err(ExportError::Export(format!("materials: {}", e)));
        }
        Ok(self)
    }
}

/// The scene exporter.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    /// Create an exporter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exporter with custom configuration.
    pub fn with_config(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Collect the skeleton and aggregate every renderable under `root`.
    pub fn prepare<S: SceneGraph>(&self, scene: &S, root: NodeId) -> PreparedExport {
        let skinned = scene.skinned_renderables(root);
        let statics = scene.static_renderables(root);

        let skeleton = Skeleton::collect(scene, &skinned, &statics, self.config.bind_pose);
        let aggregate = aggregate(scene, &skinned, &statics, &skeleton, &self.config);
        let chunks = resolve(&aggregate);

        log::info!(
            "Prepared '{}': {} skinned + {} static renderables, {} bones, {} vertices, {} submeshes",
            scene.name(root),
            aggregate.skinned_count,
            aggregate.static_count,
            skeleton.len(),
            aggregate.mesh.vertex_count(),
            aggregate.mesh.submesh_count()
        );

        PreparedExport {
            root,
            root_name: scene.name(root).to_string(),
            skeleton,
            aggregate,
            chunks,
        }
    }

    /// Write the geometry artifact to any writer.
    pub fn export_geometry_to<W: Write, S: SceneGraph>(
        &self,
        out: &mut W,
        scene: &S,
        prepared: &PreparedExport,
    ) -> Result<Option<IntegrityWarning>> {
        write_geometry(
            out,
            scene,
            &prepared.skeleton,
            &prepared.aggregate,
            &prepared.chunks,
            &self.config,
        )
    }

    /// Write the material artifact to any writer.
    pub fn export_materials_to<W: Write, S: SceneGraph>(
        &self,
        out: &mut W,
        scene: &S,
        prepared: &PreparedExport,
    ) -> Result<()> {
        write_materials(
            out,
            scene,
            &prepared.aggregate.materials,
            &self.config.asset_root,
        )
    }

    /// Write the animation artifact to any writer. `Ok(None)` if the root
    /// has no clip for the configured source.
    pub fn export_animation_to<W: Write, S: PoseSampler>(
        &self,
        out: &mut W,
        scene: &mut S,
        prepared: &PreparedExport,
    ) -> Result<Option<AnimationSummary>> {
        let Some(clip) = scene.clip(prepared.root, self.config.clip_source) else {
            return Ok(None);
        };
        write_animation(out, scene, &clip, &prepared.skeleton, self.config.flip_z).map(Some)
    }

    /// Export all artifacts for `root` into `out_dir`.
    ///
    /// The animation artifact is only attempted when the export contains
    /// skinned renderables, and is skipped without error if the root has no
    /// clip for the configured source.
    pub fn export<S: PoseSampler>(
        &self,
        scene: &mut S,
        root: NodeId,
        out_dir: &Path,
    ) -> ExportReport {
        let prepared = self.prepare(&*scene, root);
        let mut warnings = prepared.aggregate.warnings.clone();

        let geometry_path = artifact_path(out_dir, &prepared.root_name, GEOMETRY_EXTENSION);
        let geometry = write_artifact(&geometry_path, |out| {
            self.export_geometry_to(out, &*scene, &prepared)
        })
        .map(|warning| {
            warnings.extend(warning);
            geometry_path
        });

        let mut animation_summary = None;
        let animation = if prepared.aggregate.is_skinned() {
            self.export_animation(scene, &prepared, out_dir)
                .map(|written| {
                    written.map(|(path, summary)| {
                        animation_summary = Some(summary);
                        path
                    })
                })
        } else {
            Ok(None)
        };

        let materials_path = artifact_path(out_dir, &prepared.root_name, MATERIAL_EXTENSION);
        let materials = write_artifact(&materials_path, |out| {
            self.export_materials_to(out, &*scene, &prepared)
        })
        .map(|()| materials_path);

        for (artifact, result) in [
            ("geometry", geometry.as_ref().err()),
            ("animation", animation.as_ref().err()),
            ("materials", materials.as_ref().err()),
        ] {
            if let Some(e) = result {
                log::error!("Failed to export {} for '{}': {}", artifact, prepared.root_name, e);
            }
        }

        ExportReport {
            geometry,
            animation,
            materials,
            bone_count: prepared.skeleton.len(),
            vertex_count: prepared.aggregate.mesh.vertex_count(),
            submesh_count: prepared.aggregate.mesh.submesh_count(),
            animation_summary,
            warnings,
        }
    }

    fn export_animation<S: PoseSampler>(
        &self,
        scene: &mut S,
        prepared: &PreparedExport,
        out_dir: &Path,
    ) -> Result<Option<(PathBuf, AnimationSummary)>> {
        // Checked before the file is created so a missing clip leaves no artifact.
        let Some(clip) = scene.clip(prepared.root, self.config.clip_source) else {
            log::info!(
                "No {:?} clip on '{}', skipping animation",
                self.config.clip_source,
                prepared.root_name
            );
            return Ok(None);
        };

        let basename = self.config.anim_basename(&prepared.root_name).to_string();
        let path = artifact_path(out_dir, &basename, ANIMATION_EXTENSION);
        let summary = write_artifact(&path, |out| {
            write_animation(out, scene, &clip, &prepared.skeleton, self.config.flip_z)
        })?;
        Ok(Some((path, summary)))
    }
}

fn artifact_path(out_dir: &Path, basename: &str, extension: &str) -> PathBuf {
    out_dir.join(format!("{}.{}", basename, extension))
}

/// Create `path`, run `write` against a buffered handle and flush it.
fn write_artifact<T>(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    let value = write(&mut out)?;
    out.flush()?;
    log::info!("Wrote {}", path.display());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BindPoseStrategy, ClipSource};
    use crate::scene::memory::{Clip, Key, MemoryRenderable, MeshData, NodeTransform, Track};
    use crate::scene::MemoryScene;
    use crate::types::{BoneWeight, TextureChannel};
    use glam::{Quat, Vec3};

    fn cube_scene() -> (MemoryScene, NodeId) {
        let mut scene = MemoryScene::new();
        let root = scene.add_node("Cube", None, NodeTransform::default());
        let red = scene.add_material("Red");
        scene.set_texture(red, TextureChannel::Diffuse, "Assets/red.png");
        scene.add_renderable(MemoryRenderable {
            node: root,
            mesh: MeshData {
                name: "Cube".to_string(),
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
                normals: vec![Vec3::Y; 4],
                submeshes: vec![vec![0, 1, 2], vec![0, 2, 3]],
                ..MeshData::default()
            },
            skinned: false,
            materials: vec![red, red],
        });
        (scene, root)
    }

    fn character_scene() -> (MemoryScene, NodeId) {
        let mut scene = MemoryScene::new();
        let root = scene.add_node("Hero", None, NodeTransform::default());
        let hips = scene.add_node("Hips", Some(root), NodeTransform::from_translation(Vec3::Y));
        let head = scene.add_node("Head", Some(hips), NodeTransform::from_translation(Vec3::Y));
        let bind_poses = vec![scene.world_to_local(hips), scene.world_to_local(head)];
        scene.add_renderable(MemoryRenderable {
            node: root,
            mesh: MeshData {
                name: "Body".to_string(),
                positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                bones: vec![hips, head],
                bind_poses,
                weights: vec![BoneWeight::new([0, 1, 0, 0], [0.7, 0.3, 0.0, 0.0]); 3],
                submeshes: vec![vec![0, 1, 2]],
                ..MeshData::default()
            },
            skinned: true,
            materials: Vec::new(),
        });
        scene.add_clip(Clip {
            name: "Nod".to_string(),
            source: ClipSource::Legacy,
            owner: root,
            length: 0.5,
            frame_rate: 10.0,
            tracks: vec![Track {
                node: head,
                translations: Vec::new(),
                rotations: vec![
                    Key { time: 0.0, value: Quat::IDENTITY },
                    Key { time: 0.5, value: Quat::from_rotation_x(0.5) },
                ],
                scales: Vec::new(),
            }],
        });
        (scene, root)
    }

    #[test]
    fn test_static_cube_exports_geometry_and_materials_only() {
        let (mut scene, root) = cube_scene();
        let dir = tempfile::tempdir().unwrap();

        let report = Exporter::new().export(&mut scene, root, dir.path());
        assert!(report.is_ok());
        assert!(report.warnings.is_empty());
        assert_eq!(report.animation.as_ref().unwrap(), &None);
        assert!(!dir.path().join("Cube.anm").exists());

        let geometry = std::fs::read_to_string(dir.path().join("Cube.msh")).unwrap();
        assert!(geometry.starts_with("MeshGeometry\n1\n2\n4\n6\n5\n"));
        assert!(!geometry.lines().any(|l| l == "64" || l == "2048"));

        let materials = std::fs::read_to_string(dir.path().join("Cube.mat")).unwrap();
        assert_eq!(materials, "MeshMat\n1\n1\n2\nRed\n1\nDiffuse:/red.png\n0\n0\n");
    }

    #[test]
    fn test_skinned_export_writes_animation() {
        let (mut scene, root) = character_scene();
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::default()
            .with_clip_source(ClipSource::Legacy)
            .with_anim_name("Hero_Nod");

        let report = Exporter::with_config(config).export(&mut scene, root, dir.path());
        let report = report.into_result().unwrap();

        let anim_path = dir.path().join("Hero_Nod.anm");
        assert_eq!(report.animation.as_ref().unwrap().as_deref(), Some(anim_path.as_path()));
        let summary = report.animation_summary.unwrap();
        assert_eq!(summary.frame_count, 5);
        assert_eq!(summary.bone_count, 2);

        let text = std::fs::read_to_string(anim_path).unwrap();
        assert!(text.starts_with("MeshAnim\n1\n5\n2\n10\n"));
        assert!(dir.path().join("Hero.msh").exists());
        assert!(dir.path().join("Hero.mat").exists());
    }

    #[test]
    fn test_repeated_export_is_identical() {
        let (mut scene, root) = character_scene();
        let hips = scene.find_node("Hips").unwrap();
        scene.add_clip(Clip {
            name: "Turn".to_string(),
            source: ClipSource::Animator,
            owner: root,
            length: 1.0,
            frame_rate: 4.0,
            tracks: vec![Track {
                node: hips,
                translations: Vec::new(),
                rotations: vec![
                    Key { time: 0.0, value: Quat::IDENTITY },
                    Key { time: 1.0, value: Quat::from_rotation_y(2.0) },
                ],
                scales: Vec::new(),
            }],
        });

        let exporter = Exporter::new();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        exporter.export(&mut scene, root, first.path()).into_result().unwrap();
        exporter.export(&mut scene, root, second.path()).into_result().unwrap();

        for file in ["Hero.msh", "Hero.anm", "Hero.mat"] {
            let a = std::fs::read_to_string(first.path().join(file)).unwrap();
            let b = std::fs::read_to_string(second.path().join(file)).unwrap();
            assert_eq!(a, b, "{} differs between exports", file);
        }
    }

    #[test]
    fn test_missing_clip_is_a_soft_skip() {
        let (mut scene, root) = character_scene();
        let dir = tempfile::tempdir().unwrap();

        // The character only has a legacy clip.
        let report = Exporter::new().export(&mut scene, root, dir.path());
        assert!(report.is_ok());
        assert_eq!(report.animation.as_ref().unwrap(), &None);
        assert!(!dir.path().join("Hero.anm").exists());
    }

    #[test]
    fn test_artifacts_fail_independently() {
        let (mut scene, root) = cube_scene();
        let dir = tempfile::tempdir().unwrap();
        // A directory where the geometry file should go makes that artifact fail.
        std::fs::create_dir(dir.path().join("Cube.msh")).unwrap();

        let report = Exporter::new().export(&mut scene, root, dir.path());
        assert!(matches!(report.geometry, Err(ExportError::Io(_))));
        assert!(report.materials.is_ok());
        assert!(!report.is_ok());
        assert!(report.into_result().is_err());
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let (scene, root) = character_scene();
        let exporter = Exporter::new();
        let a = exporter.prepare(&scene, root);
        let b = exporter.prepare(&scene, root);
        assert_eq!(a.skeleton.bones(), b.skeleton.bones());

        let mut first = Vec::new();
        let mut second = Vec::new();
        exporter.export_geometry_to(&mut first, &scene, &a).unwrap();
        exporter.export_geometry_to(&mut second, &scene, &b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mesh_bind_pose_export() {
        let (mut scene, root) = character_scene();
        let config = ExportConfig::default().with_bind_pose(BindPoseStrategy::MeshBindPoses);
        let exporter = Exporter::with_config(config);
        let prepared = exporter.prepare(&scene, root);
        assert_eq!(prepared.skeleton.len(), 2);

        let mut out = Vec::new();
        let warning = exporter.export_geometry_to(&mut out, &scene, &prepared).unwrap();
        assert_eq!(warning, None);

        let mut anim = Vec::new();
        let summary = exporter
            .export_animation_to(&mut anim, &mut scene, &prepared)
            .unwrap();
        assert!(summary.is_none());
    }
}
