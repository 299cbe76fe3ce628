//! Material artifact (`.mat`) writer.

use super::FORMAT_VERSION;
use crate::aggregate::MaterialTable;
use crate::error::Result;
use crate::scene::SceneGraph;
use crate::types::{relativize_asset_path, TextureChannel};
use std::io::Write;

pub const MATERIAL_HEADER: &str = "MeshMat";

/// Write the material table and the per-submesh material ids.
///
/// Each material is written as its name, the number of bound texture
/// channels, then one `Channel:path` line per bound channel. Texture paths
/// are made relative to `asset_root`.
pub fn write_materials<W: Write, S: SceneGraph>(
    out: &mut W,
    scene: &S,
    table: &MaterialTable,
    asset_root: &str,
) -> Result<()> {
    writeln!(out, "{}", MATERIAL_HEADER)?;
    writeln!(out, "{}", FORMAT_VERSION)?;
    writeln!(out, "{}", table.len())?;
    writeln!(out, "{}", table.submesh_materials().len())?;

    for &material in table.materials() {
        let textures: Vec<(TextureChannel, &str)> = TextureChannel::ALL
            .into_iter()
            .filter_map(|channel| scene.texture_path(material, channel).map(|p| (channel, p)))
            .collect();

        writeln!(out, "{}", scene.material_name(material))?;
        writeln!(out, "{}", textures.len())?;
        for (channel, path) in textures {
            writeln!(out, "{}:{}", channel, relativize_asset_path(path, asset_root))?;
        }
    }

    for id in table.submesh_material_ids() {
        writeln!(out, "{}", id)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    #[test]
    fn test_material_layout() {
        let mut scene = MemoryScene::new();
        let brick = scene.add_material("Brick");
        let glass = scene.add_material("Glass");
        scene.set_texture(brick, TextureChannel::Height, "Assets/Textures/brick_h.png");
        scene.set_texture(brick, TextureChannel::Diffuse, "Assets/Textures/brick.png");

        let mut table = MaterialTable::default();
        let mut ids = Vec::new();
        ids.push(table.intern(glass));
        ids.push(table.intern(brick));
        ids.push(table.intern(glass));
        assert_eq!(ids, vec![0, 1, 0]);

        let mut out = Vec::new();
        write_materials(&mut out, &scene, &table, "Assets").unwrap();
        let text = String::from_utf8(out).unwrap();

        // The table was filled directly, so no submesh ids follow.
        let expected = "MeshMat\n1\n2\n0\n\
                        Glass\n0\n\
                        Brick\n2\nDiffuse:/Textures/brick.png\nHeight:/Textures/brick_h.png\n";
        assert_eq!(text, expected);
    }
}
