use anyhow::{Context, Result};
use opencv::core::Mat;
use tracing::debug;

use crate::{
    cache::{Detections, ResultCache},
    config::ScheduleConfig,
    traits::Detector,
};

/// Number of frames successfully decoded so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter(u64);

impl FrameCounter {
    pub fn new() -> Self {
        FrameCounter(0)
    }

    /// Counts one more frame and returns the new total.
    pub fn increment(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Decides which frames pay for a detection pass. Everything in between
/// reuses the cached boxes, so boxes may trail the scene by up to
/// `skip_interval` frames.
#[derive(Debug, Clone)]
pub struct DetectionScheduler {
    skip_interval: u64,
    passes: u64,
}

impl DetectionScheduler {
    pub fn new(skip_interval: u32) -> Self {
        DetectionScheduler {
            skip_interval: skip_interval.max(1) as u64,
            passes: 0,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.skip_interval)
    }

    pub fn should_detect(&self, frame_count: u64) -> bool {
        frame_count % self.skip_interval == 0
    }

    /// Runs both detectors when `frame_count` is due and publishes their
    /// combined output. Returns whether a pass ran. The cache is only
    /// touched once both detectors have succeeded.
    pub fn run<V, F>(
        &mut self,
        frame_count: u64,
        frame: &Mat,
        vessel_detector: &mut V,
        floater_detector: &mut F,
        cache: &mut ResultCache,
    ) -> Result<bool>
    where
        V: Detector,
        F: Detector,
    {
        if !self.should_detect(frame_count) {
            return Ok(false);
        }

        let vessels = vessel_detector
            .detect(frame)
            .context("Vessel detection failed")?;
        let floaters = floater_detector
            .detect(frame)
            .context("Floater detection failed")?;

        debug!(
            frame = frame_count,
            vessels = vessels.len(),
            floaters = floaters.len(),
            "detection pass"
        );

        cache.publish(Detections { vessels, floaters });
        self.passes += 1;

        Ok(true)
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use anyhow::bail;

    use crate::types::{Bgr, DetectionBox};

    struct CountingDetector {
        label: &'static str,
        calls: i32,
        fail_on: Option<i32>,
    }

    impl CountingDetector {
        fn new(label: &'static str) -> Self {
            CountingDetector {
                label,
                calls: 0,
                fail_on: None,
            }
        }
    }

    impl Detector for CountingDetector {
        fn detect(&mut self, _frame: &Mat) -> Result<Vec<DetectionBox>> {
            self.calls += 1;
            if self.fail_on == Some(self.calls) {
                bail!("detector exploded");
            }

            Ok(vec![DetectionBox {
                x0: self.calls,
                y0: 0,
                x1: self.calls + 1,
                y1: 1,
                label: self.label.to_string(),
                color: Bgr(1, 2, 3),
            }])
        }
    }

    #[test]
    fn test_should_detect() {
        let scheduler = DetectionScheduler::new(5);
        let due: Vec<u64> = (1..=20).filter(|n| scheduler.should_detect(*n)).collect();
        assert_eq!(due, vec![5, 10, 15, 20]);

        let every_frame = DetectionScheduler::new(1);
        assert!((1..=10).all(|n| every_frame.should_detect(n)));
    }

    #[test]
    fn test_frame_counter() {
        let mut counter = FrameCounter::new();
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
    }

    #[test]
    fn test_periodic_passes_and_stable_cache() {
        let frame = Mat::default();
        let mut vessels = CountingDetector::new("BOAT");
        let mut floaters = CountingDetector::new("FLOATER");
        let mut cache = ResultCache::new();
        let mut scheduler = DetectionScheduler::new(5);
        let mut counter = FrameCounter::new();

        let mut previous = cache.current();

        for _ in 0..23 {
            let frame_count = counter.increment();
            let ran = scheduler
                .run(frame_count, &frame, &mut vessels, &mut floaters, &mut cache)
                .unwrap();

            let current = cache.current();
            if ran {
                assert!(!Arc::ptr_eq(&previous, &current));
            } else {
                assert!(Arc::ptr_eq(&previous, &current));
            }
            previous = current;
        }

        assert_eq!(scheduler.passes(), 23 / 5);
        assert_eq!(vessels.calls, 4);
        assert_eq!(floaters.calls, 4);

        let latest = cache.current();
        assert_eq!(latest.vessels[0].x0, 4);
        assert_eq!(latest.floaters[0].label, "FLOATER");
    }

    #[test]
    fn test_failed_pass_leaves_cache_untouched() {
        let frame = Mat::default();
        let mut vessels = CountingDetector::new("BOAT");
        let mut floaters = CountingDetector::new("FLOATER");
        floaters.fail_on = Some(2);
        let mut cache = ResultCache::new();
        let mut scheduler = DetectionScheduler::new(1);

        scheduler
            .run(1, &frame, &mut vessels, &mut floaters, &mut cache)
            .unwrap();
        let published = cache.current();

        assert!(scheduler
            .run(2, &frame, &mut vessels, &mut floaters, &mut cache)
            .is_err());

        // The vessel detector ran a second time, but its boxes never landed.
        assert_eq!(vessels.calls, 2);
        assert!(Arc::ptr_eq(&published, &cache.current()));
        assert_eq!(scheduler.passes(), 1);
    }
}
