//! Reactive obstacle-avoiding navigation for reconnaissance.
//!
//! Each tick looks at the latest scan. If any sample is inside the safe
//! distance the vehicle turns away from the first such sample (scan order)
//! and slows down. Otherwise it turns towards the most open heading, scored
//! as free distance minus a penalty for how far it is from the current
//! forward direction.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::flight::Pose;
use crate::scan::{ScanResult, ScanSample};
use crate::spatial;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
    pub safe_distance_m: f64,
    /// Slerp rate (per second) when turning away from a hazard
    pub flee_turn_gain: f64,
    /// Slerp rate (per second) when turning towards open space
    pub explore_turn_gain: f64,
    /// Score penalty per degree off the current forward direction
    pub angle_penalty_per_deg: f64,
    /// Speed multiplier while fleeing
    pub flee_speed_factor: f64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            safe_distance_m: 2.0,
            flee_turn_gain: 5.0,
            explore_turn_gain: 2.0,
            angle_penalty_per_deg: 0.1,
            flee_speed_factor: 0.5,
        }
    }
}

/// What the navigator decided this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavDecision {
    Flee {
        sample: usize,
        bearing_deg: f64,
        distance: f64,
    },
    Explore {
        sample: usize,
        bearing_deg: f64,
        score: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    pub orientation: UnitQuaternion<f64>,
    pub velocity: Vector3<f64>,
    pub decision: NavDecision,
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    config: NavigatorConfig,
}

impl Navigator {
    pub fn new(config: NavigatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// First sample in scan order that is closer than the safe distance.
    pub fn first_danger<'a>(&self, scan: &'a ScanResult) -> Option<(usize, &'a ScanSample)> {
        scan.first_below(self.config.safe_distance_m)
    }

    /// Highest scoring sample; ties keep the earliest.
    pub fn best_heading<'a>(
        &self,
        pose: &Pose,
        scan: &'a ScanResult,
    ) -> Option<(usize, &'a ScanSample, f64)> {
        let forward = pose.forward();
        let mut best: Option<(usize, &ScanSample, f64)> = None;
        for (index, sample) in scan.samples().iter().enumerate() {
            let angle = spatial::angle_between_deg(&forward, &sample.direction);
            let score = sample.distance - angle * self.config.angle_penalty_per_deg;
            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((index, sample, score));
            }
        }
        best
    }

    /// Steering for one tick, or `None` for an empty scan.
    pub fn steer(&self, pose: &Pose, scan: &ScanResult, speed: f64, dt: f64) -> Option<Steering> {
        if let Some((index, sample)) = self.first_danger(scan) {
            let orientation = self.turn(pose, &-sample.direction, self.config.flee_turn_gain * dt);
            return Some(Steering {
                orientation,
                velocity: spatial::forward(&orientation) * speed * self.config.flee_speed_factor,
                decision: NavDecision::Flee {
                    sample: index,
                    bearing_deg: sample.bearing_deg,
                    distance: sample.distance,
                },
            });
        }

        let (index, sample, score) = self.best_heading(pose, scan)?;
        let orientation = self.turn(pose, &sample.direction, self.config.explore_turn_gain * dt);
        Some(Steering {
            orientation,
            velocity: spatial::forward(&orientation) * speed,
            decision: NavDecision::Explore {
                sample: index,
                bearing_deg: sample.bearing_deg,
                score,
            },
        })
    }

    fn turn(&self, pose: &Pose, towards: &Vector3<f64>, fraction: f64) -> UnitQuaternion<f64> {
        match spatial::look_rotation(towards) {
            Some(target) => spatial::slerp_towards(&pose.orientation, &target, fraction),
            None => pose.orientation,
        }
    }
}
