use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use opencv::{
    core::Vector,
    imgcodecs::{self, IMREAD_COLOR},
    prelude::*,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marine_vision::{
    analysis::VesselDetector,
    cache::Detections,
    config::Config,
    extraction::FloaterDetector,
    models::ModelFiles,
    render::OverlayRenderer,
    traits::Detector,
};

/// Run one detection pass over still images and save annotated copies.
#[derive(Debug, Parser)]
#[command(about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for annotated images
    #[arg(short, long, default_value = "annotated")]
    output: PathBuf,

    /// Skip the network and look for floaters only
    #[arg(long)]
    floaters_only: bool,

    #[arg(required = true)]
    image_paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    let mut vessel_detector = if args.floaters_only {
        None
    } else {
        let models = ModelFiles::resolve(&config.vessel)?;
        Some(VesselDetector::load(&config.vessel, &models)?)
    };
    let mut floater_detector = FloaterDetector::new(&config.floater);
    let renderer = OverlayRenderer::new(&config.render);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    for path in &args.image_paths {
        let path_str = path.to_str().context("Image path is not valid UTF-8")?;
        let mut image = imgcodecs::imread(path_str, IMREAD_COLOR)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        if image.empty() {
            warn!(path = %path.display(), "not a readable image, skipping");
            continue;
        }

        let vessels = match vessel_detector.as_mut() {
            Some(detector) => detector.detect(&image)?,
            None => Vec::new(),
        };
        let floaters = floater_detector.detect(&image)?;

        info!(
            path = %path.display(),
            vessels = vessels.len(),
            floaters = floaters.len(),
            "detected"
        );

        renderer.render(&mut image, &Detections { vessels, floaters })?;

        let file_name = path.file_name().context("Image path has no file name")?;
        let out_path = args.output.join(file_name);
        let out_str = out_path.to_str().context("Output path is not valid UTF-8")?;

        imgcodecs::imwrite(out_str, &image, &Vector::new())
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
    }

    Ok(())
}
