use crate::{
    config::{AspectRange, FloaterConfig, VesselConfig},
    types::{RawDetection, Region},
};

/// Keeps network detections that are confident enough and belong to an
/// allow-listed class.
#[derive(Debug, Clone)]
pub struct ClassFilter {
    confidence_threshold: f32,
    allowed: Vec<usize>,
}

impl ClassFilter {
    pub fn new(confidence_threshold: f32, labels: &[String], classes: &[String]) -> Self {
        let allowed = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| classes.contains(label))
            .map(|(index, _)| index)
            .collect();

        ClassFilter {
            confidence_threshold,
            allowed,
        }
    }

    pub fn from_config(config: &VesselConfig) -> Self {
        Self::new(config.confidence_threshold, &config.labels, &config.classes)
    }

    pub fn keep(&self, detection: &RawDetection) -> bool {
        detection.confidence > self.confidence_threshold
            && self.allowed.contains(&detection.class_index)
    }
}

/// Scales a normalized `[x0, y0, x1, y1]` box to pixel coordinates,
/// truncating toward zero.
pub fn denormalize(norm_box: [f32; 4], width: i32, height: i32) -> [i32; 4] {
    let [x0, y0, x1, y1] = norm_box;
    let (w, h) = (width as f32, height as f32);

    [
        (x0 * w) as i32,
        (y0 * h) as i32,
        (x1 * w) as i32,
        (y1 * h) as i32,
    ]
}

/// Rejects colour blobs that are too small, or too elongated to be a
/// compact floating object (wake lines, glare streaks).
#[derive(Debug, Clone, Copy)]
pub struct ShapeFilter {
    min_area: f64,
    aspect_ratio: AspectRange,
}

impl ShapeFilter {
    pub fn new(min_area: f64, aspect_ratio: AspectRange) -> Self {
        ShapeFilter {
            min_area,
            aspect_ratio,
        }
    }

    pub fn from_config(config: &FloaterConfig) -> Self {
        Self::new(config.min_area, config.aspect_ratio)
    }

    pub fn accepts(&self, region: &Region) -> bool {
        if region.area <= self.min_area || region.height <= 0 {
            return false;
        }

        let aspect_ratio = region.width as f64 / region.height as f64;
        self.aspect_ratio.min < aspect_ratio && aspect_ratio < self.aspect_ratio.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::MOBILENET_SSD_LABELS;

    fn labels() -> Vec<String> {
        MOBILENET_SSD_LABELS.iter().map(|l| l.to_string()).collect()
    }

    fn detection(label: &str, confidence: f32) -> RawDetection {
        RawDetection {
            class_index: MOBILENET_SSD_LABELS.iter().position(|l| *l == label).unwrap(),
            confidence,
            norm_box: [0.1, 0.1, 0.5, 0.5],
        }
    }

    #[test]
    fn test_class_filter() {
        let filter = ClassFilter::new(0.5, &labels(), &["boat".to_string()]);

        let detections = [
            detection("boat", 0.9),
            detection("car", 0.95),
            detection("boat", 0.3),
        ];
        let kept: Vec<_> = detections.iter().filter(|d| filter.keep(d)).collect();

        assert_eq!(kept, vec![&detections[0]]);
    }

    #[test]
    fn test_class_filter_threshold_is_strict() {
        let filter = ClassFilter::new(0.5, &labels(), &["boat".to_string()]);
        assert!(!filter.keep(&detection("boat", 0.5)));
    }

    #[test]
    fn test_class_filter_out_of_range_index() {
        let filter = ClassFilter::new(0.5, &labels(), &["boat".to_string()]);
        let bogus = RawDetection {
            class_index: 999,
            confidence: 0.99,
            norm_box: [0.; 4],
        };
        assert!(!filter.keep(&bogus));
    }

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize([0.25, 0.5, 0.75, 1.0], 640, 480), [160, 240, 480, 480]);
        assert_eq!(denormalize([0.1001, 0.0, 0.0, 0.0], 100, 100), [10, 0, 0, 0]);
    }

    #[test]
    fn test_shape_filter_aspect_ratio() {
        let filter = ShapeFilter::new(300., AspectRange { min: 0.4, max: 2.0 });

        let thin = Region {
            area: 1000.,
            x: 0,
            y: 0,
            width: 10,
            height: 100,
        };
        let square = Region {
            area: 400.,
            x: 5,
            y: 5,
            width: 20,
            height: 20,
        };

        assert!(!filter.accepts(&thin));
        assert!(filter.accepts(&square));
    }

    #[test]
    fn test_shape_filter_area_and_degenerate() {
        let filter = ShapeFilter::new(300., AspectRange { min: 0.4, max: 2.0 });

        let small = Region {
            area: 300.,
            x: 0,
            y: 0,
            width: 20,
            height: 20,
        };
        let flat = Region {
            area: 500.,
            x: 0,
            y: 0,
            width: 20,
            height: 0,
        };

        assert!(!filter.accepts(&small));
        assert!(!filter.accepts(&flat));
    }

    #[test]
    fn test_shape_filter_bounds_are_exclusive() {
        let filter = ShapeFilter::new(0., AspectRange { min: 0.5, max: 2.0 });
        let region = |width, height| Region {
            area: 1.,
            x: 0,
            y: 0,
            width,
            height,
        };

        assert!(!filter.accepts(&region(10, 20)));
        assert!(!filter.accepts(&region(40, 20)));
        assert!(filter.accepts(&region(39, 20)));
    }
}
