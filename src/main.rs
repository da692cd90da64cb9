//! meshview - loads a glTF model, uploads its meshes to the GPU and records
//! the draw commands for it.

mod settings;
mod viewer;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use meshview_assets::GltfImporter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use settings::ViewerSettings;
use viewer::Viewer;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Logging output filters; comma-separated
    #[arg(
        short,
        long,
        default_value = "info",
        env = "MESHVIEW_LOG"
    )]
    log_filter: String,
    /// Settings file to use instead of the default location
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    settings: Option<PathBuf>,
    /// Number of frames to record
    #[arg(short, long, default_value_t = 2)]
    frames: u32,
    /// glTF or GLB file to load; overrides the settings file
    #[arg(value_hint = ValueHint::FilePath)]
    model: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_filter))
        .with_target(false)
        .init();

    info!("Starting meshview...");

    let settings = match &cli.settings {
        Some(path) => ViewerSettings::load_from(path),
        None => ViewerSettings::load(),
    };
    let model_path = cli.model.clone().or_else(|| settings.model.path.clone());

    let gpu = viewer::create_vulkan_resources()?;
    let mut viewer = Viewer::new(settings, gpu).context("Failed to allocate scene uniforms")?;

    match model_path {
        Some(path) => {
            viewer.load_model(&path, &GltfImporter::new());
        }
        None => warn!("No model given; nothing will be drawn"),
    }

    for _ in 0..cli.frames {
        let frame = viewer.render_frame().context("Failed to record frame")?;
        info!(
            "Recorded {} draws ({} triangles)",
            frame.draw_count(),
            frame.index_count() / 3
        );
    }

    let gpu = viewer.shutdown();
    if gpu.buffer_count() != 0 {
        warn!("{} buffers still alive at exit", gpu.buffer_count());
    }

    Ok(())
}
