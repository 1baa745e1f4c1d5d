use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use marine_vision::{
    analysis::VesselDetector,
    capture::open_source,
    config::Config,
    decode::JpegDecoder,
    display::open_display,
    extraction::FloaterDetector,
    models::ModelFiles,
    pipeline::VisionPipeline,
};

/// Live boat and floater overlay for an MJPEG camera stream.
#[derive(Debug, Parser)]
#[command(name = "marine-vision", version, about)]
struct Args {
    /// JSON configuration file; anything it omits keeps its default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run detection on every Nth frame
    #[arg(long)]
    skip_interval: Option<u32>,

    /// Minimum network confidence for a vessel box (0-1)
    #[arg(long)]
    confidence: Option<f32>,

    /// Network class to report; repeat for several
    #[arg(long = "class")]
    classes: Vec<String>,

    /// Read the MJPEG stream from a file, or `-` for stdin, instead of the camera
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Run without a display window
    #[arg(long)]
    headless: bool,

    /// Directory holding the network files
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Download missing network files before starting
    #[arg(long)]
    fetch_models: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(skip_interval) = self.skip_interval {
            config.schedule.skip_interval = skip_interval;
        }
        if let Some(confidence) = self.confidence {
            config.vessel.confidence_threshold = confidence;
        }
        if !self.classes.is_empty() {
            config.vessel.classes = self.classes.clone();
        }
        if let Some(input) = &self.input {
            config.capture.input = Some(input.clone());
        }
        if self.headless {
            config.display.headless = true;
        }
        if let Some(model_dir) = &self.model_dir {
            config.vessel.model_dir = model_dir.clone();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        skip_interval = config.schedule.skip_interval,
        confidence = config.vessel.confidence_threshold,
        classes = ?config.vessel.classes,
        bands = config.floater.bands.len(),
        "configuration loaded"
    );

    let models = if args.fetch_models {
        ModelFiles::fetch_missing(&config.vessel)?
    } else {
        ModelFiles::resolve(&config.vessel)?
    };

    let vessel_detector = VesselDetector::load(&config.vessel, &models)?;
    let floater_detector = FloaterDetector::new(&config.floater);

    let source = open_source(&config.capture)?;
    let display = open_display(&config.display)?;

    let mut pipeline = VisionPipeline::new(
        &config,
        source,
        JpegDecoder,
        vessel_detector,
        floater_detector,
        display,
    );

    let summary = pipeline.run();
    info!(
        frames = summary.frames,
        detection_passes = summary.detection_passes,
        discarded = summary.discarded,
        reason = ?summary.reason,
        "stopped"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "marine-vision",
            "--skip-interval",
            "2",
            "--confidence",
            "0.7",
            "--class",
            "boat",
            "--class",
            "person",
            "--input",
            "-",
            "--headless",
        ]);

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.schedule.skip_interval, 2);
        assert_eq!(config.vessel.confidence_threshold, 0.7);
        assert_eq!(config.vessel.classes, vec!["boat", "person"]);
        assert_eq!(config.capture.input, Some(PathBuf::from("-")));
        assert!(config.display.headless);
        config.validate().unwrap();
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let args = Args::parse_from(["marine-vision"]);

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config, Config::default());
    }
}
