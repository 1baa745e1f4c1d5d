use serde::{Deserialize, Serialize};

/// A colour in OpenCV's native BGR channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bgr(pub u8, pub u8, pub u8);

impl Bgr {
    pub fn to_scalar(self) -> opencv::core::Scalar {
        opencv::core::Scalar::new(self.0 as f64, self.1 as f64, self.2 as f64, 0.)
    }
}

/// Axis-aligned box in frame pixel coordinates, tagged for drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub label: String,
    pub color: Bgr,
}

/// One row of network output: a class index, a confidence, and a box whose
/// corners are normalized to the 0..1 range on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_index: usize,
    pub confidence: f32,
    pub norm_box: [f32; 4],
}

/// A blob candidate from the colour mask: enclosed contour area and its
/// upright bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub area: f64,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}
