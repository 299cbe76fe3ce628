//! Scene Exporter CLI
//!
//! Consolidate a scene hierarchy into geometry, animation and material artifacts.

use clap::{Parser, Subcommand};
use scene_exporter::{
    find_root, load_scene, BindPoseStrategy, ClipSource, ExportConfig, Exporter, SceneGraph,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "scene-exporter")]
#[command(author, version, about = "Export a scene hierarchy as a single skinned asset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export everything under a root node
    Export {
        /// Scene description (JSON)
        #[arg(short, long)]
        scene: PathBuf,

        /// Name of the root node to export
        #[arg(short, long)]
        root: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Mirror the Z axis (and rewind triangles)
        #[arg(long)]
        flip_z: bool,

        /// Sample the legacy clip instead of the animator clip
        #[arg(long)]
        legacy_anim: bool,

        /// Use the meshes' authored bind poses instead of live transforms
        #[arg(long)]
        force_mesh_bind_pose: bool,

        /// Animation artifact name (defaults to the root name)
        #[arg(long)]
        anim_name: Option<String>,

        /// Prefix stripped from texture paths
        #[arg(long, default_value = "Assets")]
        asset_root: String,
    },

    /// Show information about a scene description
    Info {
        /// Scene description (JSON)
        #[arg(short, long)]
        scene: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            scene,
            root,
            out_dir,
            flip_z,
            legacy_anim,
            force_mesh_bind_pose,
            anim_name,
            asset_root,
        } => {
            let clip_source = if legacy_anim {
                ClipSource::Legacy
            } else {
                ClipSource::Animator
            };
            let config = ExportConfig::default()
                .with_flip_z(flip_z)
                .with_clip_source(clip_source)
                .with_bind_pose(BindPoseStrategy::from_force_mesh_bind_pose(force_mesh_bind_pose))
                .with_anim_name(anim_name.unwrap_or_default())
                .with_asset_root(asset_root);
            export_scene(&scene, &root, &out_dir, config)?;
        }
        Commands::Info { scene } => {
            show_scene_info(&scene)?;
        }
    }

    Ok(())
}

fn export_scene(
    scene_path: &Path,
    root_name: &str,
    out_dir: &Path,
    config: ExportConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let mut scene = load_scene(scene_path)?;
    let root = find_root(&scene, root_name)?;

    std::fs::create_dir_all(out_dir)?;

    println!("Exporting '{}' with config:", root_name);
    println!("  - Flip Z: {}", config.flip_z);
    println!("  - Clip source: {:?}", config.clip_source);
    println!("  - Bind poses: {:?}", config.bind_pose);

    let report = Exporter::with_config(config).export(&mut scene, root, out_dir);

    println!(
        "  Merged {} vertices, {} submeshes, {} bones",
        report.vertex_count, report.submesh_count, report.bone_count
    );
    if let Some(summary) = &report.animation_summary {
        println!(
            "  Sampled '{}': {} frames at {} fps",
            summary.clip, summary.frame_count, summary.frame_rate
        );
    }
    if !report.warnings.is_empty() {
        println!("  {} integrity warning(s)", report.warnings.len());
    }

    let report = report.into_result()?;
    if let Ok(path) = &report.geometry {
        println!("Exported geometry to {:?}", path);
    }
    if let Ok(Some(path)) = &report.animation {
        println!("Exported animation to {:?}", path);
    }
    if let Ok(path) = &report.materials {
        println!("Exported materials to {:?}", path);
    }

    Ok(())
}

fn show_scene_info(scene_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading scene from {:?}...", scene_path);
    let scene = load_scene(scene_path)?;

    let skinned = scene.renderables.iter().filter(|r| r.skinned).count();

    println!("\nScene Info:");
    println!("  Nodes: {}", scene.nodes.len());
    println!(
        "  Renderables: {} ({} skinned, {} static)",
        scene.renderables.len(),
        skinned,
        scene.renderables.len() - skinned
    );
    println!("  Materials: {}", scene.materials.len());
    println!("  Clips: {}", scene.clips.len());

    for (i, node) in scene.nodes.iter().enumerate() {
        if node.parent.is_none() {
            let id = scene_exporter::NodeId(i);
            println!(
                "  Root '{}': {} skinned, {} static renderables",
                node.name,
                scene.skinned_renderables(id).len(),
                scene.static_renderables(id).len()
            );
        }
    }
    for clip in &scene.clips {
        println!(
            "  Clip '{}' ({:?}) on '{}': {}s at {} fps",
            clip.name,
            clip.source,
            scene.name(clip.owner),
            clip.length,
            clip.frame_rate
        );
    }

    Ok(())
}
