//! Animation artifact (`.anm`) writer.
//!
//! The clip is sampled densely at its own frame rate. Every frame stores the
//! world transform of every bone, in skeleton order:
//!
//! ```text
//! MeshAnim
//! <version>
//! <frame count>
//! <bone count>
//! <frame rate>
//! <matrix per bone, per frame>
//! ```

use super::{write_matrix, FORMAT_VERSION};
use crate::error::Result;
use crate::scene::{ClipInfo, PoseSampler};
use crate::skeleton::Skeleton;
use crate::types::mirror_z;
use std::io::Write;

pub const ANIMATION_HEADER: &str = "MeshAnim";

/// Frame count and spacing for sampling a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    pub frame_count: usize,
    /// Seconds between consecutive frames.
    pub frame_time: f32,
}

impl FrameTiming {
    /// `floor(frame_rate * length)` frames spread evenly over the clip.
    pub fn for_clip(length: f32, frame_rate: f32) -> Self {
        // Saturating cast: negative and NaN products give zero frames.
        let frame_count = (frame_rate * length) as usize;
        let frame_time = if frame_count > 0 {
            length / frame_count as f32
        } else {
            0.0
        };
        Self {
            frame_count,
            frame_time,
        }
    }

    /// Sample time of frame `index`.
    pub fn time(&self, index: usize) -> f32 {
        self.frame_time * index as f32
    }
}

/// What was written to an animation artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSummary {
    pub clip: String,
    pub frame_count: usize,
    pub bone_count: usize,
    pub frame_rate: f32,
}

/// Sample `clip` on `scene` and write every bone's world transform per frame.
///
/// The local transforms the clip drives are restored afterwards, whether or
/// not writing succeeded.
pub fn write_animation<W: Write, S: PoseSampler>(
    out: &mut W,
    scene: &mut S,
    clip: &ClipInfo,
    skeleton: &Skeleton,
    flip_z: bool,
) -> Result<AnimationSummary> {
    let timing = FrameTiming::for_clip(clip.length, clip.frame_rate);

    writeln!(out, "{}", ANIMATION_HEADER)?;
    writeln!(out, "{}", FORMAT_VERSION)?;
    writeln!(out, "{}", timing.frame_count)?;
    writeln!(out, "{}", skeleton.len())?;
    writeln!(out, "{}", clip.frame_rate)?;

    let rest = scene.capture_pose(clip.id);
    let written = write_frames(out, scene, clip, &timing, skeleton, flip_z);
    scene.restore_pose(rest);
    written?;

    log::debug!(
        "Sampled clip '{}': {} frames x {} bones",
        clip.name,
        timing.frame_count,
        skeleton.len()
    );

    Ok(AnimationSummary {
        clip: clip.name.clone(),
        frame_count: timing.frame_count,
        bone_count: skeleton.len(),
        frame_rate: clip.frame_rate,
    })
}

fn write_frames<W: Write, S: PoseSampler>(
    out: &mut W,
    scene: &mut S,
    clip: &ClipInfo,
    timing: &FrameTiming,
    skeleton: &Skeleton,
    flip_z: bool,
) -> Result<()> {
    for frame in 0..timing.frame_count {
        scene.sample(clip.id, timing.time(frame));

        for bone in skeleton.bones() {
            let world = mirror_z(scene.local_to_world(bone.node), flip_z);
            write_matrix(out, &world)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BindPoseStrategy, ClipSource};
    use crate::scene::memory::{Clip, Key, MemoryRenderable, MeshData, NodeTransform, Track};
    use crate::scene::{MemoryScene, NodeId, SceneGraph};
    use glam::Vec3;

    #[test]
    fn test_frame_timing() {
        let timing = FrameTiming::for_clip(2.0, 30.0);
        assert_eq!(timing.frame_count, 60);
        assert!((timing.frame_time - 2.0 / 60.0).abs() < 1e-7);
        assert!((timing.time(30) - 1.0).abs() < 1e-5);

        // Partial trailing frames are dropped.
        assert_eq!(FrameTiming::for_clip(1.05, 10.0).frame_count, 10);
        assert_eq!(FrameTiming::for_clip(0.0, 30.0).frame_count, 0);
        assert_eq!(FrameTiming::for_clip(-1.0, 30.0).frame_count, 0);
    }

    fn sliding_bone() -> (MemoryScene, NodeId, Skeleton) {
        let mut scene = MemoryScene::new();
        let root = scene.add_node("Root", None, NodeTransform::default());
        let bone = scene.add_node("Bone", Some(root), NodeTransform::default());
        scene.add_renderable(MemoryRenderable {
            node: root,
            mesh: MeshData {
                name: "Skin".to_string(),
                bones: vec![bone],
                ..MeshData::default()
            },
            skinned: true,
            materials: Vec::new(),
        });
        scene.add_clip(Clip {
            name: "Slide".to_string(),
            source: ClipSource::Animator,
            owner: root,
            length: 1.0,
            frame_rate: 4.0,
            tracks: vec![Track {
                node: bone,
                translations: vec![
                    Key { time: 0.0, value: Vec3::ZERO },
                    Key { time: 1.0, value: Vec3::new(0.0, 0.0, 4.0) },
                ],
                rotations: Vec::new(),
                scales: Vec::new(),
            }],
        });

        let skinned = scene.skinned_renderables(root);
        let skeleton = Skeleton::collect(&scene, &skinned, &[], BindPoseStrategy::LiveTransforms);
        (scene, root, skeleton)
    }

    #[test]
    fn test_writes_dense_frames() {
        let (mut scene, root, skeleton) = sliding_bone();
        let clip = scene.clip(root, ClipSource::Animator).unwrap();

        let mut out = Vec::new();
        let summary = write_animation(&mut out, &mut scene, &clip, &skeleton, false).unwrap();
        assert_eq!(summary.frame_count, 4);
        assert_eq!(summary.bone_count, 1);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(&lines[..5], &["MeshAnim", "1", "4", "1", "4"]);
        // 4 frames x 1 bone x (4 rows + separator).
        assert_eq!(lines.len(), 5 + 4 * 5);
        // Translation column of frames 0 and 3.
        assert_eq!(lines[5 + 3], "0 0 0 1");
        assert_eq!(lines[5 + 3 * 5 + 3], "0 0 3 1");
    }

    /// Accepts `budget` bytes, then fails every write.
    struct FailingWriter {
        budget: usize,
    }

    impl Write for FailingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.budget < buf.len() {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            self.budget -= buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rest_pose_restored_after_sampling() {
        let (mut scene, root, skeleton) = sliding_bone();
        let bone = skeleton.bones()[0].node;
        let rest = scene.local_to_world(bone);
        let clip = scene.clip(root, ClipSource::Animator).unwrap();

        let mut out = Vec::new();
        write_animation(&mut out, &mut scene, &clip, &skeleton, false).unwrap();
        assert_eq!(scene.local_to_world(bone), rest);
    }

    #[test]
    fn test_rest_pose_restored_on_write_error() {
        let (mut scene, root, skeleton) = sliding_bone();
        let bone = skeleton.bones()[0].node;
        let rest = scene.local_to_world(bone);
        let clip = scene.clip(root, ClipSource::Animator).unwrap();

        // Room for the header and part of the second frame.
        let mut out = FailingWriter { budget: 60 };
        let result = write_animation(&mut out, &mut scene, &clip, &skeleton, false);
        assert!(result.is_err());
        assert_eq!(scene.local_to_world(bone), rest);
    }

    #[test]
    fn test_flip_mirrors_sampled_transforms() {
        let (mut scene, root, skeleton) = sliding_bone();
        let clip = scene.clip(root, ClipSource::Animator).unwrap();

        let mut out = Vec::new();
        write_animation(&mut out, &mut scene, &clip, &skeleton, true).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0 0 -2 1\n"));
    }
}
