//! Gear fidget generator entry point

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;

use fidget_cad::{CadKernel, TessellatedMesh, save_stl};
use fidget_core::config::to_ron_string;
use fidget_core::{FidgetConfig, FidgetParts, build_fidget, load_config};

/// Build a printable gear fidget
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (`.ron` or `.json`); defaults to the example fidget
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Directory the STL files are written to
    #[clap(short, long, default_value = "out")]
    output: PathBuf,

    /// Chordal tolerance for the exported meshes, overriding the config
    #[clap(short, long)]
    tolerance: Option<f32>,

    /// Print the default configuration as RON and exit
    #[clap(long)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fidget=info,fidget_core=info,fidget_cad=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.print_default_config {
        println!("{}", to_ron_string(&FidgetConfig::default())?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FidgetConfig::default(),
    };
    if let Some(tolerance) = args.tolerance {
        config.tolerance = tolerance;
    }

    let kernel = fidget_cad::default_kernel();
    if !kernel.is_available() {
        bail!("no CAD kernel available; build with the `truck` feature");
    }
    tracing::info!("Using {} kernel", kernel.name());

    let start = Instant::now();
    let parts = build_fidget(kernel.as_ref(), &config)?;
    tracing::info!("Built fidget in {:?}", start.elapsed());

    write_parts(kernel.as_ref(), &parts, config.tolerance, &args.output)?;
    tracing::info!("Wrote parts to {:?}", args.output);
    Ok(())
}

/// Tessellate every part and write the print plates plus one file per gear
fn write_parts(
    kernel: &dyn CadKernel,
    parts: &FidgetParts,
    tolerance: f32,
    dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let core = kernel.tessellate(&parts.core.solid, tolerance)?;
    write_mesh(&core, &dir.join("core.stl"))?;

    let gears = parts
        .gears
        .iter()
        .map(|gear| kernel.tessellate(gear, tolerance))
        .collect::<Result<Vec<_>, _>>()?;
    for (i, gear) in gears.iter().enumerate() {
        write_mesh(gear, &dir.join(format!("gear_{}.stl", i)))?;
    }
    write_mesh(&TessellatedMesh::merge(&gears), &dir.join("gears.stl"))?;

    let pins = parts
        .pins
        .iter()
        .map(|pin| kernel.tessellate(pin, tolerance))
        .collect::<Result<Vec<_>, _>>()?;
    write_mesh(&TessellatedMesh::merge(&pins), &dir.join("pins.stl"))?;

    Ok(())
}

fn write_mesh(mesh: &TessellatedMesh, path: &Path) -> Result<()> {
    if !mesh.is_watertight() {
        tracing::warn!("{} is not watertight", path.display());
    }
    save_stl(mesh, path).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(
        "Wrote {} ({} triangles, volume {:.1})",
        path.display(),
        mesh.triangle_count(),
        mesh.volume()
    );
    Ok(())
}
