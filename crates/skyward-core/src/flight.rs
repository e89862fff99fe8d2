//! Flight-mode state machine.
//!
//! Exactly one mode is active at a time. Applying a command always resets the
//! previous mode first, so stale targets (rotation, altitude, tracking) never
//! leak into the next command. The altitude overlay is the only thing that
//! runs alongside a mode: it drives the vertical velocity until the target
//! altitude is reached, independent of the horizontal motion.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::models::{Action, Command};
use crate::navigator::{NavDecision, Navigator};
use crate::scan::ScanResult;
use crate::spatial;
use crate::tracking::{TrackSample, TrackingBand, TrackingController};

/// Flight tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightConfig {
    /// Default horizontal speed (m/s)
    pub move_speed: f64,
    /// Climb / descent speed (m/s)
    pub vertical_speed: f64,
    /// Maximum turn rate (deg/s)
    pub rotation_speed_deg: f64,
    /// Reconnaissance speed when the command carries none (m/s)
    pub recon_speed: f64,
    pub home: Vector3<f64>,
    pub altitude_deadband_m: f64,
    pub rotation_deadband_deg: f64,
    pub arrival_tolerance_m: f64,
    pub default_tracking_distance_m: f64,
    /// Integrate velocity into position each tick. Disable when an external
    /// simulator or flight controller owns the pose.
    pub integrate_kinematics: bool,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            vertical_speed: 3.0,
            rotation_speed_deg: 100.0,
            recon_speed: 2.0,
            home: Vector3::new(0.0, 1.0, 0.0),
            altitude_deadband_m: 0.1,
            rotation_deadband_deg: 0.1,
            arrival_tolerance_m: 0.1,
            default_tracking_distance_m: 5.0,
            integrate_kinematics: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vector3::new(0.0, 1.0, 0.0))
    }
}

impl Pose {
    pub fn at(position: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn forward(&self) -> Vector3<f64> {
        spatial::forward(&self.orientation)
    }

    pub fn heading_deg(&self) -> f64 {
        spatial::heading_deg(&self.orientation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Moving { direction: Vector3<f64> },
    Hovering,
    Rotating { target: UnitQuaternion<f64> },
    Returning,
    Reconnaissance,
    Tracking,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Moving { .. } => "moving",
            Mode::Hovering => "hovering",
            Mode::Rotating { .. } => "rotating",
            Mode::Returning => "returning",
            Mode::Reconnaissance => "reconnaissance",
            Mode::Tracking => "tracking",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleState {
    pub mode: Mode,
    /// Active altitude overlay target
    pub altitude_target: Option<f64>,
    pub speed: f64,
    /// Speed restored on every reset
    pub original_speed: f64,
    pub tracking_distance: f64,
    /// Whether the external detection feed should be running
    pub detection_assist: bool,
    pub pose: Pose,
    pub velocity: Vector3<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightEvent {
    ModeChanged {
        from: &'static str,
        to: &'static str,
    },
    TrackingStarted,
    TrackingStopped,
    /// Command dropped without touching the current mode
    CommandRejected { action: Action },
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub navigation: Option<NavDecision>,
    pub tracking: Option<TrackingBand>,
    pub events: Vec<FlightEvent>,
}

pub struct FlightStateMachine {
    config: FlightConfig,
    state: VehicleState,
    navigator: Navigator,
    tracker: TrackingController,
}

impl Default for FlightStateMachine {
    fn default() -> Self {
        let config = FlightConfig::default();
        let spawn = Pose::at(config.home);
        Self::new(
            config,
            Navigator::default(),
            TrackingController::default(),
            spawn,
        )
    }
}

impl FlightStateMachine {
    pub fn new(
        config: FlightConfig,
        navigator: Navigator,
        tracker: TrackingController,
        spawn: Pose,
    ) -> Self {
        let state = VehicleState {
            mode: Mode::Idle,
            altitude_target: None,
            speed: config.move_speed,
            original_speed: config.move_speed,
            tracking_distance: config.default_tracking_distance_m,
            detection_assist: false,
            pose: spawn,
            velocity: Vector3::zeros(),
        };
        Self {
            config,
            state,
            navigator,
            tracker,
        }
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn tracker(&self) -> &TrackingController {
        &self.tracker
    }

    pub fn observe_target(&mut self, target: Option<Vector3<f64>>) {
        self.tracker.observe(target);
    }

    /// Overwrite the pose, e.g. from an external simulator.
    pub fn set_pose(&mut self, pose: Pose) {
        self.state.pose = pose;
    }

    pub fn apply_command(&mut self, command: &Command) -> Vec<FlightEvent> {
        if command.action == Action::Tracking && !self.tracker.has_target() {
            tracing::warn!("Tracking requested but no target has been observed; ignoring");
            return vec![FlightEvent::CommandRejected {
                action: command.action,
            }];
        }

        tracing::info!(
            action = %command.action,
            speed = command.speed,
            altitude = command.altitude,
            direction = ?command.direction,
            "Applying command"
        );

        let previous = self.state.mode;
        self.reset();

        match command.action {
            Action::Move => {
                self.state.mode = Mode::Moving {
                    direction: Vector3::from(command.direction),
                };
                if command.speed > 0.0 {
                    self.state.speed = command.speed;
                }
                if command.altitude != 0.0 {
                    self.state.altitude_target = Some(command.altitude);
                }
            }
            Action::Hover => {
                self.state.mode = Mode::Hovering;
                self.state.speed = 0.0;
            }
            Action::Altitude => {
                self.state.altitude_target = Some(command.altitude);
            }
            Action::Rotate => {
                let [x, y, z] = command.direction;
                self.state.mode = Mode::Rotating {
                    target: spatial::euler_deg(x, y, z),
                };
            }
            Action::Return => {
                self.state.mode = Mode::Returning;
            }
            Action::Reconnaissance => {
                self.state.mode = Mode::Reconnaissance;
                self.state.speed = if command.speed > 0.0 {
                    command.speed
                } else {
                    self.config.recon_speed
                };
                self.state.detection_assist = true;
            }
            Action::Tracking => {
                self.state.mode = Mode::Tracking;
                if command.tracking_distance > 0.0 {
                    self.state.tracking_distance = command.tracking_distance;
                }
                if command.speed > 0.0 {
                    self.state.speed = command.speed;
                }
                self.state.detection_assist = true;
            }
        }

        let mut events = Vec::new();
        self.mode_transition(previous, &mut events);
        events
    }

    /// Advance one control step of `dt` seconds using the latest scan.
    pub fn tick(&mut self, dt: f64, scan: &ScanResult) -> TickReport {
        let mut report = TickReport::default();
        if !dt.is_finite() || dt < 0.0 {
            return report;
        }

        self.update_rotation(dt, &mut report);
        self.update_movement(dt, scan, &mut report);
        self.update_altitude();

        if self.config.integrate_kinematics {
            self.state.pose.position += self.state.velocity * dt;
        }
        report
    }

    /// Current tracking observation for the activity log.
    pub fn tracking_sample(&self) -> Option<TrackSample> {
        if self.state.mode != Mode::Tracking {
            return None;
        }
        self.tracker.sample(&self.state.pose, &self.state.velocity)
    }

    fn reset(&mut self) {
        self.state.mode = Mode::Idle;
        self.state.altitude_target = None;
        self.state.velocity = Vector3::zeros();
        self.state.speed = self.state.original_speed;
        self.state.detection_assist = false;
    }

    fn set_mode(&mut self, mode: Mode, events: &mut Vec<FlightEvent>) {
        let previous = self.state.mode;
        self.state.mode = mode;
        self.mode_transition(previous, events);
    }

    fn mode_transition(&self, previous: Mode, events: &mut Vec<FlightEvent>) {
        let current = self.state.mode;
        if previous.name() == current.name() {
            return;
        }
        tracing::info!("Flight mode {} -> {}", previous.name(), current.name());
        events.push(FlightEvent::ModeChanged {
            from: previous.name(),
            to: current.name(),
        });
        if previous == Mode::Tracking {
            events.push(FlightEvent::TrackingStopped);
        }
        if current == Mode::Tracking {
            events.push(FlightEvent::TrackingStarted);
        }
    }

    fn update_rotation(&mut self, dt: f64, report: &mut TickReport) {
        let Mode::Rotating { target } = self.state.mode else {
            return;
        };
        let step = self.config.rotation_speed_deg * dt;
        let next = spatial::rotate_towards(&self.state.pose.orientation, &target, step);
        self.state.pose.orientation = next;
        if next.angle_to(&target).to_degrees() < self.config.rotation_deadband_deg {
            self.state.pose.orientation = target;
            self.set_mode(Mode::Idle, &mut report.events);
        }
    }

    fn update_movement(&mut self, dt: f64, scan: &ScanResult, report: &mut TickReport) {
        match self.state.mode {
            Mode::Idle | Mode::Rotating { .. } => {
                self.state.velocity = Vector3::zeros();
            }
            Mode::Hovering => {
                self.state.speed = 0.0;
                self.state.velocity = Vector3::zeros();
            }
            Mode::Moving { direction } => {
                self.state.velocity = self.state.pose.orientation * direction * self.state.speed;
            }
            Mode::Returning => {
                let offset = self.config.home - self.state.pose.position;
                let distance = offset.norm();
                if distance > self.config.arrival_tolerance_m {
                    // Never overshoot home within a single step.
                    let speed = if dt > 0.0 {
                        self.state.speed.min(distance / dt)
                    } else {
                        self.state.speed
                    };
                    self.state.velocity = offset / distance * speed;
                } else {
                    self.state.velocity = Vector3::zeros();
                    tracing::info!("Arrived home");
                    self.set_mode(Mode::Idle, &mut report.events);
                }
            }
            Mode::Reconnaissance => {
                match self
                    .navigator
                    .steer(&self.state.pose, scan, self.state.speed, dt)
                {
                    Some(steering) => {
                        self.state.pose.orientation = steering.orientation;
                        self.state.velocity = steering.velocity;
                        if let NavDecision::Flee {
                            bearing_deg,
                            distance,
                            ..
                        } = steering.decision
                        {
                            tracing::debug!(bearing_deg, distance, "Avoiding obstacle");
                        }
                        report.navigation = Some(steering.decision);
                    }
                    None => self.state.velocity = Vector3::zeros(),
                }
            }
            Mode::Tracking => {
                match self.tracker.steer(
                    &self.state.pose,
                    self.state.tracking_distance,
                    self.state.speed,
                    self.config.vertical_speed,
                    dt,
                ) {
                    Some(output) => {
                        self.state.pose.orientation = output.orientation;
                        self.state.velocity = output.velocity;
                        report.tracking = Some(output.band);
                    }
                    None => self.state.velocity = Vector3::zeros(),
                }
            }
        }
    }

    fn update_altitude(&mut self) {
        let Some(target) = self.state.altitude_target else {
            return;
        };
        let diff = target - self.state.pose.position.y;
        if diff.abs() > self.config.altitude_deadband_m {
            self.state.velocity.y = diff.signum() * self.config.vertical_speed;
        } else {
            self.state.pose.position.y = target;
            self.state.velocity.y = 0.0;
            self.state.altitude_target = None;
            tracing::debug!(altitude = target, "Altitude reached");
        }
    }
}
