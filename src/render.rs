use anyhow::Result;
use opencv::{
    core::{Mat, Point},
    imgproc,
};

use crate::{
    cache::Detections,
    config::RenderConfig,
    types::{Bgr, DetectionBox},
};

/// One box outline plus its caption, in frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub top_left: Point,
    pub bottom_right: Point,
    pub label: String,
    pub label_origin: Point,
    pub color: Bgr,
}

/// Draws cached detections onto every outgoing frame, whether or not a
/// detection pass ran for it.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    config: RenderConfig,
}

impl OverlayRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        OverlayRenderer {
            config: config.clone(),
        }
    }

    /// Vessels first, then floaters, each in cache order.
    pub fn plan(&self, detections: &Detections) -> Vec<Overlay> {
        let vessels = detections
            .vessels
            .iter()
            .map(|detection| overlay(detection, self.config.vessel_label_offset));
        let floaters = detections
            .floaters
            .iter()
            .map(|detection| overlay(detection, self.config.floater_label_offset));

        vessels.chain(floaters).collect()
    }

    pub fn render(&self, frame: &mut Mat, detections: &Detections) -> Result<()> {
        for overlay in self.plan(detections) {
            let color = overlay.color.to_scalar();

            imgproc::rectangle_points(
                frame,
                overlay.top_left,
                overlay.bottom_right,
                color,
                self.config.thickness,
                imgproc::LINE_8,
                0,
            )?;

            imgproc::put_text(
                frame,
                &overlay.label,
                overlay.label_origin,
                imgproc::FONT_HERSHEY_SIMPLEX,
                self.config.font_scale,
                color,
                self.config.thickness,
                imgproc::LINE_8,
                false,
            )?;
        }

        Ok(())
    }
}

fn overlay(detection: &DetectionBox, label_offset: i32) -> Overlay {
    Overlay {
        top_left: Point::new(detection.x0, detection.y0),
        bottom_right: Point::new(detection.x1, detection.y1),
        label: detection.label.clone(),
        label_origin: Point::new(detection.x0, detection.y0 - label_offset),
        color: detection.color,
    }
}
