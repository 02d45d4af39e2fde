//! Where live statistics come from while streaming
//!
//! The live feed itself is an opaque image stream, so the session asks a
//! [`LiveStatsSource`] for each refresh. The placeholder below stands in for
//! a real event channel from the server.

use crate::client::Detection;
use crate::pipeline::DetectionStats;

/// Detections observed since the previous refresh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSample {
    pub detections: Vec<Detection>,
}

impl LiveSample {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn stats(&self) -> DetectionStats {
        DetectionStats::from_detections(&self.detections)
    }

    /// The most confident detection, recorded in the recent-events log
    pub fn strongest(&self) -> Option<&Detection> {
        self.detections
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Provider of one sample per statistics refresh
pub trait LiveStatsSource: Send {
    fn sample(&mut self) -> LiveSample;
}

/// Fixed rotating pattern used until the server exposes stream events
#[derive(Debug, Default)]
pub struct PlaceholderSource {
    tick: usize,
}

const PATTERN: &[&[(&str, f32)]] = &[
    &[],
    &[("Helmet", 0.85)],
    &[("Helmet", 0.85), ("Vest", 0.78)],
    &[("Vest", 0.81), ("Helmet", 0.72), ("Helmet", 0.66)],
];

impl LiveStatsSource for PlaceholderSource {
    fn sample(&mut self) -> LiveSample {
        let frame = PATTERN[self.tick % PATTERN.len()];
        self.tick += 1;
        LiveSample::new(
            frame
                .iter()
                .map(|(label, confidence)| Detection::new(*label, *confidence))
                .collect(),
        )
    }
}
