//! Z-axis mirroring for exports into a left/right-handed flipped space.

use glam::Mat4;

/// Scale matrix mirroring the Z axis.
pub const Z_MIRROR: Mat4 = Mat4::from_cols(
    glam::Vec4::X,
    glam::Vec4::Y,
    glam::Vec4::new(0.0, 0.0, -1.0, 0.0),
    glam::Vec4::W,
);

/// Pre-multiply `m` by the Z mirror when `flip` is set.
pub fn mirror_z(m: Mat4, flip: bool) -> Mat4 {
    if flip {
        Z_MIRROR * m
    } else {
        m
    }
}

/// Inverse of [`mirror_z`]: mirror first, then invert.
pub fn mirror_z_inverse(m: Mat4, flip: bool) -> Mat4 {
    mirror_z(m, flip).inverse()
}
