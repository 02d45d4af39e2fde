//! Bounded log of recent live detections

use std::collections::VecDeque;
use std::time::SystemTime;

use crate::client::Detection;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 10;

/// One detection seen while streaming
#[derive(Debug, Clone, PartialEq)]
pub struct RecentEvent {
    pub label: String,
    pub confidence: f32,
    pub at: SystemTime,
}

impl RecentEvent {
    pub fn now(detection: &Detection) -> Self {
        Self {
            label: detection.label.clone(),
            confidence: detection.confidence,
            at: SystemTime::now(),
        }
    }
}

/// Newest-first ring; inserting past capacity evicts the oldest entry
#[derive(Debug, Clone)]
pub struct RecentLog {
    entries: VecDeque<RecentEvent>,
    capacity: usize,
}

impl Default for RecentLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RecentLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the head, evicting from the tail when full
    pub fn push(&mut self, event: RecentEvent) {
        self.entries.push_front(event);
        self.entries.truncate(self.capacity);
    }

    /// Entries newest first
    pub fn snapshot(&self) -> Vec<RecentEvent> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(label: &str) -> RecentEvent {
        RecentEvent::now(&Detection::new(label, 0.85))
    }

    #[test]
    fn test_newest_first() {
        let mut log = RecentLog::default();
        log.push(event("Helmet"));
        log.push(event("Vest"));

        let labels: Vec<_> = log.snapshot().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["Vest", "Helmet"]);
    }

    #[test]
    fn test_eleventh_insert_evicts_oldest() {
        let mut log = RecentLog::default();
        for i in 0..10 {
            log.push(event(&format!("e{}", i)));
        }
        assert_eq!(log.entries.len(), 10);

        log.push(event("e10"));
        assert_eq!(log.entries.len(), 10);
        let snapshot = log.snapshot();
        assert_eq!(snapshot.first().unwrap().label, "e10");
        assert_eq!(snapshot.last().unwrap().label, "e1");
        assert!(snapshot.iter().all(|e| e.label != "e0"));
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut log = RecentLog::with_capacity(0);
        log.push(event("a"));
        log.push(event("b"));
        assert_eq!(log.capacity, 1);
        assert_eq!(log.snapshot()[0].label, "b");
    }
}
