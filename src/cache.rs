use std::sync::Arc;

use crate::types::DetectionBox;

/// The complete output of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detections {
    pub vessels: Vec<DetectionBox>,
    pub floaters: Vec<DetectionBox>,
}

impl Detections {
    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty() && self.floaters.is_empty()
    }
}

/// Most recent detection pass, shown on every frame until the next pass
/// replaces it. Both box kinds live in one immutable snapshot, so readers
/// can never see one kind updated without the other.
#[derive(Debug, Default)]
pub struct ResultCache {
    current: Arc<Detections>,
}

impl ResultCache {
    pub fn new() -> Self {
        ResultCache::default()
    }

    pub fn current(&self) -> Arc<Detections> {
        Arc::clone(&self.current)
    }

    pub fn publish(&mut self, detections: Detections) {
        self.current = Arc::new(detections);
    }
}
