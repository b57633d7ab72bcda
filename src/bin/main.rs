//! blobtree CLI
//!
//! Polygonizes built-in scenes to OBJ and samples their fields.

#![allow(
    clippy::uninlined_format_args,
    clippy::needless_pass_by_value,
    clippy::cast_precision_loss,
    clippy::doc_markdown
)]

#[cfg(feature = "cli")]
use blobtree::prelude::*;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use glam::DVec3;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::time::Instant;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "blobtree")]
#[command(version = blobtree::VERSION)]
#[command(about = "Blobtree implicit surfaces: evaluation and polygonization", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Scene {
    /// One weighted point
    Sphere,
    /// Two blended points
    Pair,
    /// Chain of convolution segments with varying thickness
    Limb,
    /// Single thick triangle
    Sheet,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Polygonize a scene to an OBJ file
    Mesh {
        /// Scene to build
        #[arg(value_enum, default_value = "pair")]
        scene: Scene,
        /// Output OBJ file
        #[arg(short, long, default_value = "blobtree.obj")]
        output: PathBuf,
        /// Polygonizer settings (JSON); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Detail ratio, below 1 is finer
        #[arg(short, long)]
        detail: Option<f64>,
        /// Size slices along Z from the areas crossing them
        #[arg(long)]
        adaptive: bool,
        /// Keep interpolated vertex positions
        #[arg(long)]
        no_convergence: bool,
    },

    /// Print the field at a point
    Sample {
        /// Scene to build
        #[arg(value_enum)]
        scene: Scene,
        /// X coordinate
        #[arg(allow_hyphen_values = true)]
        x: f64,
        /// Y coordinate
        #[arg(allow_hyphen_values = true)]
        y: f64,
        /// Z coordinate
        #[arg(allow_hyphen_values = true)]
        z: f64,
    },
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Mesh {
            scene,
            output,
            config,
            detail,
            adaptive,
            no_convergence,
        } => cmd_mesh(scene, output, config, detail, adaptive, no_convergence),
        Commands::Sample { scene, x, y, z } => cmd_sample(scene, DVec3::new(x, y, z)),
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI not enabled. Build with --features cli");
    std::process::exit(1);
}

#[cfg(feature = "cli")]
fn build_scene(scene: Scene) -> Result<Blobtree> {
    let mut tree = Blobtree::new();
    let root = tree.root();
    let skin = Material::with_color(0.9, 0.7, 0.6);
    let bone = Material::with_color(0.95, 0.95, 0.9);
    match scene {
        Scene::Sphere => {
            let p = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), skin);
            tree.add_child(root, p)?;
        }
        Scene::Pair => {
            let blend = tree.create_ricci(2.0);
            for (x, m) in [(-0.7, skin), (0.7, bone)] {
                let p = tree.create_point(ThickVertex::new(DVec3::new(x, 0.0, 0.0), 1.0), m);
                tree.add_child(blend, p)?;
            }
            tree.add_child(root, blend)?;
        }
        Scene::Limb => {
            let joints = [
                ThickVertex::new(DVec3::new(0.0, 0.0, 0.0), 0.6),
                ThickVertex::new(DVec3::new(1.5, 0.4, 0.0), 0.45),
                ThickVertex::new(DVec3::new(2.8, 0.2, 0.3), 0.3),
            ];
            for pair in joints.windows(2) {
                let s =
                    tree.create_segment([pair[0], pair[1]], [skin, bone], FieldModel::Convolution);
                tree.add_child(root, s)?;
            }
        }
        Scene::Sheet => {
            let t = tree.create_triangle(
                [
                    ThickVertex::new(DVec3::new(-1.0, -1.0, 0.0), 0.3),
                    ThickVertex::new(DVec3::new(1.5, -0.5, 0.0), 0.3),
                    ThickVertex::new(DVec3::new(0.0, 1.2, 0.0), 0.3),
                ],
                [skin, bone, skin],
                FieldModel::Convolution,
            );
            tree.add_child(root, t)?;
        }
    }
    Ok(tree)
}

#[cfg(feature = "cli")]
fn cmd_mesh(
    scene: Scene,
    output: PathBuf,
    config: Option<PathBuf>,
    detail: Option<f64>,
    adaptive: bool,
    no_convergence: bool,
) -> Result<()> {
    let mut config = match config {
        Some(path) => PolygonizerConfig::load(path)?,
        None => PolygonizerConfig::default(),
    };
    if let Some(detail) = detail {
        config = config.with_detail_ratio(detail);
    }
    if adaptive {
        config = config.with_z_stepping(ZStepping::Adaptive);
    }
    if no_convergence {
        config = config.with_convergence(None);
    }

    let mut tree = build_scene(scene)?;
    println!("Polygonizing (detail ratio {})...", config.detail_ratio);
    let start = Instant::now();
    let mut smc = SlidingMarchingCubes::new(&mut tree, config);
    let mesh = smc.run()?;
    let stats = *smc.stats();
    let elapsed = start.elapsed();

    println!(
        "  {} vertices, {} triangles in {:.2?}",
        mesh.vertex_count(),
        mesh.triangle_count(),
        elapsed
    );
    println!(
        "  {} slices, {} evaluations, {} interpolated, {} neutral",
        stats.slices, stats.evaluations, stats.interpolated, stats.neutral
    );
    println!("{}", mesh.topology());

    export_obj(&mesh, &output, &ObjConfig::default())?;
    println!("Exported to {}", output.display());
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_sample(scene: Scene, p: DVec3) -> Result<()> {
    let mut tree = build_scene(scene)?;
    tree.prepare_for_eval();
    let mut out = FieldSample::full().and_step();
    tree.eval(tree.root(), p, &mut out)?;

    println!("Field at ({}, {}, {})", p.x, p.y, p.z);
    println!("  value:    {:.6} (iso {})", out.value, tree.iso_value());
    if let Some(g) = out.gradient {
        println!("  gradient: ({:.6}, {:.6}, {:.6})", g.x, g.y, g.z);
    }
    if let Some(m) = out.material {
        println!(
            "  material: color ({:.3}, {:.3}, {:.3}), roughness {:.3}, metalness {:.3}",
            m.color.x, m.color.y, m.color.z, m.roughness, m.metalness
        );
    }
    if let Some(step) = out.step {
        println!("  step:     {:.6}", step);
    }
    Ok(())
}
