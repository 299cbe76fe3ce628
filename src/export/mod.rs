//! Artifact writers.
//!
//! Three independent text artifacts are produced per export: geometry
//! (`.msh`), animation (`.anm`) and materials (`.mat`). Writers are generic
//! over [`std::io::Write`]; file handling lives in [`crate::exporter`].

pub mod animation;
pub mod geometry;
pub mod material;

pub use animation::{write_animation, AnimationSummary, FrameTiming};
pub use geometry::{write_geometry, BindPoses};
pub use material::write_materials;

use glam::Mat4;
use std::io::{self, Write};

/// Version written after every artifact header.
pub const FORMAT_VERSION: u32 = 1;

/// Artifact file extensions.
pub const GEOMETRY_EXTENSION: &str = "msh";
pub const ANIMATION_EXTENSION: &str = "anm";
pub const MATERIAL_EXTENSION: &str = "mat";

/// Write a matrix as four lines of four components, one column per line,
/// followed by a blank separator line. Negative zeros are written as `0`.
pub(crate) fn write_matrix<W: Write>(out: &mut W, m: &Mat4) -> io::Result<()> {
    for col in m.to_cols_array_2d() {
        let [x, y, z, w] = col.map(|v| v + 0.0);
        writeln!(out, "{} {} {} {}", x, y, z, w)?;
    }
    writeln!(out)
}
