use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Bgr;

/// Labels emitted by the MobileNet-SSD VOC model, indexed by class id.
pub const MOBILENET_SSD_LABELS: &[&str] = &[
    "bg", "plane", "bike", "bird", "boat", "bottle", "bus", "car", "cat", "chair", "cow", "table",
    "dog", "horse", "moto", "person", "plant", "sheep", "sofa", "train", "tv",
];

/// Everything tunable about a run. Built once at startup and handed to each
/// component by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub schedule: ScheduleConfig,
    pub vessel: VesselConfig,
    pub floater: FloaterConfig,
    pub render: RenderConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Upper bound on a single read from the stream.
    pub chunk_size: usize,
    /// Read the stream from this file (`-` for stdin) instead of spawning
    /// the capture program.
    pub input: Option<PathBuf>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            program: "rpicam-vid".to_string(),
            args: [
                "-t", "0", "--inline", "--width", "640", "--height", "480", "--codec", "mjpeg",
                "--nopreview", "-o", "-",
            ]
            .iter()
            .map(|arg| arg.to_string())
            .collect(),
            chunk_size: 4096,
            input: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Detection runs on every `skip_interval`-th frame. Boxes on screen may
    /// lag the scene by up to this many frames.
    pub skip_interval: u32,
    /// Frames between throughput log lines. Zero disables them.
    pub log_every: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            skip_interval: 5,
            log_every: 300,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelFile {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselConfig {
    pub model_dir: PathBuf,
    pub topology: ModelFile,
    pub weights: ModelFile,
    pub confidence_threshold: f32,
    /// Allow-list of class names worth reporting.
    pub classes: Vec<String>,
    /// Class names indexed by the network's class id.
    pub labels: Vec<String>,
    pub input_size: i32,
    pub scale: f64,
    pub mean: f64,
    pub label: String,
    pub color: Bgr,
}

impl Default for VesselConfig {
    fn default() -> Self {
        VesselConfig {
            model_dir: PathBuf::from("."),
            topology: ModelFile {
                name: "MobileNetSSD_deploy.prototxt".to_string(),
                url: "https://raw.githubusercontent.com/djmv/MobilNet_SSD_opencv/master/MobileNetSSD_deploy.prototxt".to_string(),
            },
            weights: ModelFile {
                name: "MobileNetSSD_deploy.caffemodel".to_string(),
                url: "https://raw.githubusercontent.com/djmv/MobilNet_SSD_opencv/master/MobileNetSSD_deploy.caffemodel".to_string(),
            },
            confidence_threshold: 0.5,
            classes: vec!["boat".to_string()],
            labels: MOBILENET_SSD_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            input_size: 300,
            scale: 0.007843,
            mean: 127.5,
            label: "BOAT".to_string(),
            color: Bgr(255, 0, 0),
        }
    }
}

/// An HSV range (OpenCV scale: hue 0..180) that marks one kind of floater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorBand {
    pub label: String,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
    pub color: Bgr,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloaterConfig {
    pub bands: Vec<ColorBand>,
    pub blur_kernel: i32,
    pub erode_iterations: i32,
    pub dilate_iterations: i32,
    pub min_area: f64,
    pub aspect_ratio: AspectRange,
}

impl Default for FloaterConfig {
    fn default() -> Self {
        FloaterConfig {
            bands: vec![ColorBand {
                label: "FLOATER".to_string(),
                lower: [10, 100, 100],
                upper: [25, 255, 255],
                color: Bgr(0, 165, 255),
            }],
            blur_kernel: 11,
            erode_iterations: 2,
            dilate_iterations: 2,
            min_area: 300.,
            aspect_ratio: AspectRange { min: 0.4, max: 2.0 },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub thickness: i32,
    pub font_scale: f64,
    pub vessel_label_offset: i32,
    pub floater_label_offset: i32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            thickness: 2,
            font_scale: 0.5,
            vessel_label_offset: 10,
            floater_label_offset: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub window_title: String,
    pub quit_key: char,
    pub poll_ms: i32,
    pub headless: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            window_title: "Marine: Boats & Orange Floaters".to_string(),
            quit_key: 'q',
            poll_ms: 1,
            headless: false,
        }
    }
}

impl Config {
    /// Reads a JSON config file if one is given, falling back to defaults for
    /// anything it leaves out.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open config file {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Config::default(),
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.capture.chunk_size > 0, "capture.chunk_size must be positive");
        ensure!(
            self.schedule.skip_interval >= 1,
            "schedule.skip_interval must be at least 1"
        );

        let vessel = &self.vessel;
        ensure!(
            (0.0..=1.0).contains(&vessel.confidence_threshold),
            "vessel.confidence_threshold must lie in 0..=1, got {}",
            vessel.confidence_threshold
        );
        ensure!(!vessel.classes.is_empty(), "vessel.classes must not be empty");
        for class in &vessel.classes {
            ensure!(
                vessel.labels.contains(class),
                "vessel class {:?} is not a label the model produces",
                class
            );
        }
        ensure!(vessel.input_size > 0, "vessel.input_size must be positive");

        let floater = &self.floater;
        for band in &floater.bands {
            ensure!(
                band.lower.iter().zip(&band.upper).all(|(lo, hi)| lo <= hi),
                "colour band {:?} has a lower bound above its upper bound",
                band.label
            );
        }
        ensure!(
            floater.blur_kernel > 0 && floater.blur_kernel % 2 == 1,
            "floater.blur_kernel must be a positive odd number"
        );
        ensure!(
            floater.erode_iterations >= 0 && floater.dilate_iterations >= 0,
            "floater morphology iterations must not be negative"
        );
        ensure!(floater.min_area >= 0., "floater.min_area must not be negative");
        ensure!(
            floater.aspect_ratio.min > 0. && floater.aspect_ratio.min < floater.aspect_ratio.max,
            "floater.aspect_ratio needs 0 < min < max"
        );

        ensure!(self.render.thickness > 0, "render.thickness must be positive");

        Ok(())
    }
}
