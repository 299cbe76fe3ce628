//! Readers for the exported text artifacts.
//!
//! These parse what the writers in [`crate::export`] produce, for inspection
//! and for checking exports. Malformed input is reported as
//! [`ExportError::Parse`] with the 1-based line number.

use crate::aggregate::SubmeshRange;
use crate::capabilities::ChunkType;
use crate::error::{ExportError, Result};
use crate::export::animation::ANIMATION_HEADER;
use crate::export::geometry::GEOMETRY_HEADER;
use crate::export::material::MATERIAL_HEADER;
use crate::types::{TextureChannel, INFLUENCES};
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::str::FromStr;

/// Parsed geometry artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryFile {
    pub version: u32,
    pub submesh_count: usize,
    pub vertex_count: usize,
    pub index_count: usize,
    /// Chunks in the order they appeared.
    pub chunks: Vec<ChunkType>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub colors: Vec<Vec4>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubmeshRange>,
    pub submesh_names: Vec<String>,
    pub weights: Vec<[f32; INFLUENCES]>,
    pub weight_indices: Vec<[u32; INFLUENCES]>,
    pub joint_names: Vec<String>,
    pub joint_parents: Vec<i32>,
    pub bind_poses: Vec<Mat4>,
    pub inverse_bind_poses: Vec<Mat4>,
}

impl GeometryFile {
    pub fn has_chunk(&self, chunk: ChunkType) -> bool {
        self.chunks.contains(&chunk)
    }

    pub fn is_skinned(&self) -> bool {
        self.has_chunk(ChunkType::WeightValues)
    }
}

/// Parsed animation artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationFile {
    pub version: u32,
    pub bone_count: usize,
    pub frame_rate: f32,
    /// One world transform per bone, per frame.
    pub frames: Vec<Vec<Mat4>>,
}

impl AnimationFile {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// One material of a material artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialEntry {
    pub name: String,
    pub textures: Vec<(TextureChannel, String)>,
}

impl MaterialEntry {
    pub fn texture(&self, channel: TextureChannel) -> Option<&str> {
        self.textures
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, path)| path.as_str())
    }
}

/// Parsed material artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialFile {
    pub version: u32,
    pub materials: Vec<MaterialEntry>,
    /// Material index per submesh, `-1` for none.
    pub submesh_materials: Vec<i32>,
}

/// Line cursor that tracks position for error messages.
struct Cursor<'a> {
    artifact: &'static str,
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(artifact: &'static str, text: &'a str) -> Self {
        Self {
            artifact,
            lines: text.lines().enumerate(),
            line: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ExportError {
        ExportError::Parse {
            artifact: self.artifact,
            line: self.line,
            message: message.into(),
        }
    }

    fn next_line(&mut self) -> Result<&'a str> {
        match self.lines.next() {
            Some((i, line)) => {
                self.line = i + 1;
                Ok(line)
            }
            None => {
                self.line += 1;
                Err(self.error("unexpected end of file"))
            }
        }
    }

    fn expect(&mut self, literal: &str) -> Result<()> {
        let line = self.next_line()?;
        if line != literal {
            return Err(self.error(format!("expected '{}', found '{}'", literal, line)));
        }
        Ok(())
    }

    fn value<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let line = self.next_line()?;
        line.trim()
            .parse()
            .map_err(|_| self.error(format!("invalid {}: '{}'", what, line)))
    }

    fn values<T: FromStr, const N: usize>(&mut self, what: &str) -> Result<[T; N]>
    where
        T: Default + Copy,
    {
        let line = self.next_line()?;
        let mut out = [T::default(); N];
        let mut parts = line.split_whitespace();
        for slot in out.iter_mut() {
            *slot = parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| self.error(format!("invalid {}: '{}'", what, line)))?;
        }
        if parts.next().is_some() {
            return Err(self.error(format!("too many components in {}: '{}'", what, line)));
        }
        Ok(out)
    }

    fn matrix(&mut self) -> Result<Mat4> {
        let mut cols = [[0.0f32; 4]; 4];
        for col in cols.iter_mut() {
            *col = self.values("matrix column")?;
        }
        self.expect("")?;
        Ok(Mat4::from_cols_array_2d(&cols))
    }

    fn counted_matrices(&mut self) -> Result<Vec<Mat4>> {
        let count: usize = self.value("matrix count")?;
        (0..count).map(|_| self.matrix()).collect()
    }

    fn end(&mut self) -> Result<()> {
        match self.lines.next() {
            Some((i, line)) => {
                self.line = i + 1;
                Err(self.error(format!("trailing content: '{}'", line)))
            }
            None => Ok(()),
        }
    }
}

/// Parse a geometry artifact.
pub fn read_geometry(text: &str) -> Result<GeometryFile> {
    let mut lines = Cursor::new("geometry", text);
    lines.expect(GEOMETRY_HEADER)?;

    let mut file = GeometryFile {
        version: lines.value("version")?,
        submesh_count: lines.value("submesh count")?,
        vertex_count: lines.value("vertex count")?,
        index_count: lines.value("index count")?,
        ..GeometryFile::default()
    };
    let chunk_count: usize = lines.value("chunk count")?;

    for _ in 0..chunk_count {
        let tag: u32 = lines.value("chunk tag")?;
        let chunk = ChunkType::from_tag(tag)
            .ok_or_else(|| lines.error(format!("unknown chunk tag {}", tag)))?;
        if file.has_chunk(chunk) {
            return Err(lines.error(format!("duplicate chunk {:?}", chunk)));
        }
        file.chunks.push(chunk);

        let vertices = file.vertex_count;
        match chunk {
            ChunkType::Positions => {
                for _ in 0..vertices {
                    file.positions.push(Vec3::from_array(lines.values("position")?));
                }
            }
            ChunkType::Normals => {
                for _ in 0..vertices {
                    file.normals.push(Vec3::from_array(lines.values("normal")?));
                }
            }
            ChunkType::Tangents => {
                for _ in 0..vertices {
                    file.tangents.push(Vec4::from_array(lines.values("tangent")?));
                }
            }
            ChunkType::Colors => {
                for _ in 0..vertices {
                    file.colors.push(Vec4::from_array(lines.values("color")?));
                }
            }
            ChunkType::Tex0 => {
                for _ in 0..vertices {
                    file.uvs.push(Vec2::from_array(lines.values("uv")?));
                }
            }
            ChunkType::Indices => {
                if file.index_count % 3 != 0 {
                    return Err(lines.error(format!(
                        "index count {} is not a multiple of 3",
                        file.index_count
                    )));
                }
                for _ in 0..file.index_count / 3 {
                    let tri: [u32; 3] = lines.values("triangle")?;
                    file.indices.extend_from_slice(&tri);
                }
            }
            ChunkType::SubMeshes => {
                for _ in 0..file.submesh_count {
                    let [start, count]: [usize; 2] = lines.values("submesh range")?;
                    file.submeshes.push(SubmeshRange { start, count });
                }
            }
            ChunkType::SubMeshNames => {
                for _ in 0..file.submesh_count {
                    file.submesh_names.push(lines.next_line()?.to_string());
                }
            }
            ChunkType::WeightValues => {
                for _ in 0..vertices {
                    file.weights.push(lines.values("bone weights")?);
                }
            }
            ChunkType::WeightIndices => {
                for _ in 0..vertices {
                    file.weight_indices.push(lines.values("bone indices")?);
                }
            }
            ChunkType::JointNames => {
                let count: usize = lines.value("joint count")?;
                for _ in 0..count {
                    file.joint_names.push(lines.next_line()?.to_string());
                }
            }
            ChunkType::JointParents => {
                let count: usize = lines.value("joint count")?;
                for _ in 0..count {
                    file.joint_parents.push(lines.value("joint parent")?);
                }
            }
            ChunkType::BindPose => file.bind_poses = lines.counted_matrices()?,
            ChunkType::BindPoseInv => file.inverse_bind_poses = lines.counted_matrices()?,
            ChunkType::Tex1 | ChunkType::Material => {}
        }
    }

    lines.end()?;
    Ok(file)
}

/// Parse an animation artifact.
pub fn read_animation(text: &str) -> Result<AnimationFile> {
    let mut lines = Cursor::new("animation", text);
    lines.expect(ANIMATION_HEADER)?;

    let version = lines.value("version")?;
    let frame_count: usize = lines.value("frame count")?;
    let bone_count: usize = lines.value("bone count")?;
    let frame_rate = lines.value("frame rate")?;

    let mut frames = Vec::new();
    for _ in 0..frame_count {
        let frame = (0..bone_count)
            .map(|_| lines.matrix())
            .collect::<Result<Vec<_>>>()?;
        frames.push(frame);
    }

    lines.end()?;
    Ok(AnimationFile {
        version,
        bone_count,
        frame_rate,
        frames,
    })
}

/// Parse a material artifact.
pub fn read_materials(text: &str) -> Result<MaterialFile> {
    let mut lines = Cursor::new("material", text);
    lines.expect(MATERIAL_HEADER)?;

    let version = lines.value("version")?;
    let material_count: usize = lines.value("material count")?;
    let submesh_count: usize = lines.value("submesh count")?;

    let mut materials = Vec::new();
    for _ in 0..material_count {
        let name = lines.next_line()?.to_string();
        let texture_count: usize = lines.value("texture count")?;
        let mut textures = Vec::new();
        for _ in 0..texture_count {
            let line = lines.next_line()?;
            let (label, path) = line
                .split_once(':')
                .ok_or_else(|| lines.error(format!("expected 'Channel:path', found '{}'", line)))?;
            let channel = TextureChannel::from_label(label)
                .ok_or_else(|| lines.error(format!("unknown texture channel '{}'", label)))?;
            textures.push((channel, path.to_string()));
        }
        materials.push(MaterialEntry { name, textures });
    }

    let mut submesh_materials = Vec::new();
    for _ in 0..submesh_count {
        let id: i32 = lines.value("material id")?;
        if id < -1 || id >= material_count as i32 {
            return Err(lines.error(format!("material id {} out of range", id)));
        }
        submesh_materials.push(id);
    }

    lines.end()?;
    Ok(MaterialFile {
        version,
        materials,
        submesh_materials,
    })
}
