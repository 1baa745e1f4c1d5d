use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Scalar, Size, CV_32F},
    dnn,
    prelude::*,
};
use tracing::info;

use crate::{
    config::VesselConfig,
    filter::{denormalize, ClassFilter},
    models::ModelFiles,
    traits::Detector,
    types::{Bgr, DetectionBox, RawDetection},
};

/// Values per detection row in an SSD `DetectionOutput` blob:
/// `[image_id, class_id, confidence, x0, y0, x1, y1]`.
const SSD_ROW_LEN: usize = 7;

/// Learned vessel detector backed by a Caffe MobileNet-SSD network.
///
/// Overlapping boxes the network emits for one object are all kept.
pub struct VesselDetector {
    net: dnn::Net,
    filter: ClassFilter,
    input_size: i32,
    scale: f64,
    mean: f64,
    label: String,
    color: Bgr,
}

impl VesselDetector {
    pub fn load(config: &VesselConfig, models: &ModelFiles) -> Result<Self> {
        let topology = models
            .topology
            .to_str()
            .context("Model topology path is not valid UTF-8")?;
        let weights = models
            .weights
            .to_str()
            .context("Model weights path is not valid UTF-8")?;

        let net = dnn::read_net_from_caffe(topology, weights)
            .with_context(|| format!("Failed to load network from {} and {}", topology, weights))?;

        info!(topology, weights, "loaded vessel network");

        Ok(VesselDetector {
            net,
            filter: ClassFilter::from_config(config),
            input_size: config.input_size,
            scale: config.scale,
            mean: config.mean,
            label: config.label.clone(),
            color: config.color,
        })
    }

    fn build_input(&self, frame: &Mat) -> Result<Mat> {
        let blob = dnn::blob_from_image(
            frame,
            self.scale,
            Size::new(self.input_size, self.input_size),
            Scalar::all(self.mean),
            false,
            false,
            CV_32F,
        )?;

        Ok(blob)
    }

    fn infer(&mut self, blob: &Mat) -> Result<Vec<RawDetection>> {
        self.net.set_input(blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;

        parse_ssd_output(&output)
    }
}

impl Detector for VesselDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<DetectionBox>> {
        let blob = self
            .build_input(frame)
            .context("Failed to build network input")?;
        let detections = self.infer(&blob).context("Network inference failed")?;

        Ok(to_boxes(
            &detections,
            &self.filter,
            frame.cols(),
            frame.rows(),
            &self.label,
            self.color,
        ))
    }
}

/// Flattens an SSD output blob (shape `1x1xNx7`) into detection rows.
pub fn parse_ssd_output(output: &Mat) -> Result<Vec<RawDetection>> {
    let values = output
        .data_typed::<f32>()
        .context("Unexpected network output layout")?;

    Ok(values
        .chunks_exact(SSD_ROW_LEN)
        .map(|row| RawDetection {
            class_index: row[1] as usize,
            confidence: row[2],
            norm_box: [row[3], row[4], row[5], row[6]],
        })
        .collect())
}

/// Applies the class filter and projects surviving boxes onto a
/// `width`x`height` frame.
pub fn to_boxes(
    detections: &[RawDetection],
    filter: &ClassFilter,
    width: i32,
    height: i32,
    label: &str,
    color: Bgr,
) -> Vec<DetectionBox> {
    detections
        .iter()
        .filter(|detection| filter.keep(detection))
        .map(|detection| {
            let [x0, y0, x1, y1] = denormalize(detection.norm_box, width, height);

            DetectionBox {
                x0,
                y0,
                x1,
                y1,
                label: label.to_string(),
                color,
            }
        })
        .collect()
}
