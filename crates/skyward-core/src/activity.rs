//! Tracking activity records and their human-readable rendering.

use chrono::{DateTime, Local};
use nalgebra::Vector3;
use serde::Serialize;
use std::collections::VecDeque;

use crate::tracking::TrackSample;

/// Local-axis magnitude below which the target counts as centered.
pub const MOVEMENT_DEADBAND: f64 = 1.0;

/// Recent entries kept in memory.
pub const DEFAULT_HISTORY_CAPACITY: usize = 15;

/// Describe where the target sits relative to the drone, e.g.
/// `"right and up, approaching"`. Returns `"stationary"` when every axis is
/// inside the deadband.
pub fn movement_phrase(local: &Vector3<f64>) -> String {
    let mut sides = Vec::with_capacity(2);
    if local.x > MOVEMENT_DEADBAND {
        sides.push("right");
    } else if local.x < -MOVEMENT_DEADBAND {
        sides.push("left");
    }
    if local.y > MOVEMENT_DEADBAND {
        sides.push("up");
    } else if local.y < -MOVEMENT_DEADBAND {
        sides.push("down");
    }

    let range = if local.z > MOVEMENT_DEADBAND {
        Some("approaching")
    } else if local.z < -MOVEMENT_DEADBAND {
        Some("receding")
    } else {
        None
    };

    match (sides.is_empty(), range) {
        (true, None) => "stationary".to_string(),
        (true, Some(range)) => range.to_string(),
        (false, None) => sides.join(" and "),
        (false, Some(range)) => format!("{}, {}", sides.join(" and "), range),
    }
}

/// `[HH:MM:SS] message`
pub fn format_log_line(timestamp: &DateTime<Local>, message: &str) -> String {
    format!("[{}] {}", timestamp.format("%H:%M:%S"), message)
}

/// One sampled observation of the tracked target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackEntry {
    pub timestamp: DateTime<Local>,
    pub distance: f64,
    pub local_direction: [f64; 3],
    pub speed: f64,
    pub movement: String,
}

impl TrackEntry {
    pub fn from_sample(sample: &TrackSample, timestamp: DateTime<Local>) -> Self {
        let local = sample.local_direction;
        Self {
            timestamp,
            distance: sample.distance,
            local_direction: [local.x, local.y, local.z],
            speed: sample.speed,
            movement: movement_phrase(&local),
        }
    }

    pub fn message(&self) -> String {
        let [x, y, z] = self.local_direction;
        format!(
            "[distance: {:.1}m] target is {} (x: {:.1}, y: {:.1}, z: {:.1}), drone speed: {:.1}m/s",
            self.distance, self.movement, x, y, z, self.speed
        )
    }

    pub fn render(&self) -> String {
        format_log_line(&self.timestamp, &self.message())
    }
}

/// Bounded FIFO of recent entries; the oldest is evicted first.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    entries: VecDeque<TrackEntry>,
    capacity: usize,
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl TrackHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: TrackEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&TrackEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(TrackEntry::render).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(distance: f64) -> TrackEntry {
        let sample = TrackSample {
            distance,
            local_direction: Vector3::new(0.0, 0.0, distance),
            speed: 2.0,
        };
        TrackEntry::from_sample(&sample, Local::now())
    }

    #[test]
    fn test_movement_phrase() {
        assert_eq!(movement_phrase(&Vector3::new(2.0, 1.5, 3.0)), "right and up, approaching");
        assert_eq!(movement_phrase(&Vector3::new(-2.0, 0.0, -3.0)), "left, receding");
        assert_eq!(movement_phrase(&Vector3::new(0.0, -4.0, 0.5)), "down");
        assert_eq!(movement_phrase(&Vector3::new(0.9, -0.9, 1.0)), "stationary");
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = TrackHistory::default();
        for i in 0..20 {
            history.push(entry(i as f64));
        }
        assert_eq!(history.len(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(history.iter().next().unwrap().distance, 5.0);
        assert_eq!(history.latest().unwrap().distance, 19.0);
    }

    #[test]
    fn test_entry_render_format() {
        let line = entry(4.0).render();
        assert!(line.starts_with('['));
        assert_eq!(&line[9..12], "] [");
        assert!(line.ends_with(
            "[distance: 4.0m] target is approaching (x: 0.0, y: 0.0, z: 4.0), drone speed: 2.0m/s"
        ));
    }
}
