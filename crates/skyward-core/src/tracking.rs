//! Standoff tracking of a detected target.
//!
//! The controller holds a band of [near_ratio, far_ratio) times the
//! requested standoff distance. Closer than that it turns away from the
//! target and flies along its own nose at reduced speed; farther it turns
//! towards the target and flies along its nose. In between it hovers.
//! Heading is yaw-only so the vehicle stays level while turning, and
//! vertical offsets beyond a tolerance are closed with a gentle climb or
//! descent.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::flight::Pose;
use crate::spatial;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub near_ratio: f64,
    pub far_ratio: f64,
    pub approach_speed_factor: f64,
    pub retreat_speed_factor: f64,
    pub altitude_tolerance_m: f64,
    pub vertical_speed_factor: f64,
    /// Slerp rate (per second) towards the facing target
    pub turn_gain: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            near_ratio: 0.7,
            far_ratio: 1.3,
            approach_speed_factor: 0.8,
            retreat_speed_factor: 0.5,
            altitude_tolerance_m: 1.0,
            vertical_speed_factor: 0.7,
            turn_gain: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingBand {
    TooClose,
    Holding,
    TooFar,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingOutput {
    pub band: TrackingBand,
    pub orientation: UnitQuaternion<f64>,
    pub velocity: Vector3<f64>,
    pub distance: f64,
}

/// Snapshot used by the activity log.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub distance: f64,
    /// Target offset in the vehicle's local frame
    pub local_direction: Vector3<f64>,
    pub speed: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TrackingController {
    config: TrackingConfig,
    target: Option<Vector3<f64>>,
}

impl TrackingController {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            target: None,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Feed the latest detection. A missing detection keeps the last known
    /// position.
    pub fn observe(&mut self, target: Option<Vector3<f64>>) {
        if let Some(position) = target {
            self.target = Some(position);
        }
    }

    pub fn forget(&mut self) {
        self.target = None;
    }

    pub fn target(&self) -> Option<Vector3<f64>> {
        self.target
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn classify(&self, distance: f64, standoff: f64) -> TrackingBand {
        if distance < standoff * self.config.near_ratio {
            TrackingBand::TooClose
        } else if distance < standoff * self.config.far_ratio {
            TrackingBand::Holding
        } else {
            TrackingBand::TooFar
        }
    }

    pub fn steer(
        &self,
        pose: &Pose,
        standoff: f64,
        speed: f64,
        vertical_speed: f64,
        dt: f64,
    ) -> Option<TrackingOutput> {
        let target = self.target?;
        let offset = target - pose.position;
        let distance = offset.norm();
        let band = self.classify(distance, standoff);

        let facing = match band {
            TrackingBand::TooClose => spatial::yaw_towards(&-offset),
            _ => spatial::yaw_towards(&offset),
        };
        let orientation = match facing {
            Some(facing) => {
                spatial::slerp_towards(&pose.orientation, &facing, self.config.turn_gain * dt)
            }
            None => pose.orientation,
        };

        // Horizontal motion follows the nose after this tick's turn.
        let forward = spatial::forward(&orientation);
        let mut velocity = match band {
            TrackingBand::TooClose => forward * speed * self.config.retreat_speed_factor,
            TrackingBand::Holding => Vector3::zeros(),
            TrackingBand::TooFar => forward * speed * self.config.approach_speed_factor,
        };
        if offset.y.abs() > self.config.altitude_tolerance_m {
            velocity.y = offset.y.signum() * vertical_speed * self.config.vertical_speed_factor;
        }

        Some(TrackingOutput {
            band,
            orientation,
            velocity,
            distance,
        })
    }

    pub fn sample(&self, pose: &Pose, velocity: &Vector3<f64>) -> Option<TrackSample> {
        let target = self.target?;
        let offset = target - pose.position;
        Some(TrackSample {
            distance: offset.norm(),
            local_direction: pose.orientation.inverse() * offset,
            speed: velocity.norm(),
        })
    }
}
