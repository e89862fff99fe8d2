//! Core data models for drone command interpretation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Flight action requested by an operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Fly along a local-frame direction
    Move,
    /// Hold position with zero velocity
    #[default]
    Hover,
    /// Climb or descend to a target altitude
    Altitude,
    /// Turn to an absolute orientation (Euler degrees)
    Rotate,
    /// Fly back to the home position
    Return,
    /// Wander with obstacle avoidance
    #[serde(alias = "recon")]
    Reconnaissance,
    /// Keep a standoff distance from a detected target
    #[serde(alias = "track", alias = "follow")]
    Tracking,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action: {0}")]
pub struct ActionParseError(pub String);

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Move => "move",
            Action::Hover => "hover",
            Action::Altitude => "altitude",
            Action::Rotate => "rotate",
            Action::Return => "return",
            Action::Reconnaissance => "reconnaissance",
            Action::Tracking => "tracking",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "move" => Ok(Action::Move),
            "hover" => Ok(Action::Hover),
            "altitude" => Ok(Action::Altitude),
            "rotate" => Ok(Action::Rotate),
            "return" => Ok(Action::Return),
            "reconnaissance" | "recon" => Ok(Action::Reconnaissance),
            "tracking" | "track" | "follow" => Ok(Action::Tracking),
            other => Err(ActionParseError(other.to_string())),
        }
    }
}

/// Canonical, fully-resolved drone command.
///
/// Fields that do not apply to `action` are carried along untouched so the
/// command can serve as the "current state" context for the next parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    /// Target altitude in meters
    #[serde(default)]
    pub altitude: f64,
    /// Local-frame direction for move/reconnaissance (each axis in [-1, 1]),
    /// Euler angles in degrees for rotate
    #[serde(default)]
    pub direction: [f64; 3],
    /// Linear speed in m/s
    #[serde(default)]
    pub speed: f64,
    /// Standoff distance for tracking; 0 keeps the previous value
    #[serde(default, rename = "trackingDistance", alias = "tracking_distance")]
    pub tracking_distance: f64,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            action: Action::Hover,
            altitude: 0.0,
            direction: [0.0; 3],
            speed: 0.0,
            tracking_distance: 0.0,
        }
    }
}

impl Command {
    pub fn new(
        action: Action,
        altitude: f64,
        direction: [f64; 3],
        speed: f64,
        tracking_distance: f64,
    ) -> Self {
        Self {
            action,
            altitude,
            direction,
            speed,
            tracking_distance,
        }
        .normalized()
    }

    pub fn move_towards(direction: [f64; 3], speed: f64) -> Self {
        Self::new(Action::Move, 0.0, direction, speed, 0.0)
    }

    pub fn hover() -> Self {
        Self::new(Action::Hover, 0.0, [0.0; 3], 0.0, 0.0)
    }

    pub fn altitude(altitude_m: f64) -> Self {
        Self::new(Action::Altitude, altitude_m, [0.0; 3], 0.0, 0.0)
    }

    /// Rotate to absolute Euler angles in degrees (x, y, z).
    pub fn rotate(euler_deg: [f64; 3]) -> Self {
        Self::new(Action::Rotate, 0.0, euler_deg, 0.0, 0.0)
    }

    pub fn return_home() -> Self {
        Self::new(Action::Return, 0.0, [0.0; 3], 0.0, 0.0)
    }

    pub fn reconnaissance(speed: f64) -> Self {
        Self::new(Action::Reconnaissance, 0.0, [0.0; 3], speed, 0.0)
    }

    pub fn tracking(distance_m: f64) -> Self {
        Self::new(Action::Tracking, 0.0, [0.0; 3], 0.0, distance_m)
    }

    /// Enforce field ranges: finite values, non-negative speed and standoff,
    /// clamped direction (except rotate, which carries Euler angles), and
    /// zero speed for hover.
    pub fn normalized(mut self) -> Self {
        if self.action != Action::Rotate {
            for axis in &mut self.direction {
                *axis = finite_or_zero(*axis).clamp(-1.0, 1.0);
            }
        } else {
            for axis in &mut self.direction {
                *axis = finite_or_zero(*axis);
            }
        }
        self.altitude = finite_or_zero(self.altitude);
        self.speed = finite_or_zero(self.speed).max(0.0);
        self.tracking_distance = finite_or_zero(self.tracking_distance).max(0.0);
        if self.action == Action::Hover {
            self.speed = 0.0;
        }
        self
    }

    /// Fold a freshly parsed command into this canonical state.
    ///
    /// Only fields the parse produced overwrite the current values. An
    /// altitude parse is relative when its direction has a vertical component
    /// (up adds, down subtracts and floors at zero) and absolute otherwise.
    pub fn merge(&self, update: &ParsedCommand) -> Command {
        let mut next = self.clone();

        if let Some(action) = update.action {
            next.action = action;
        }

        if update.action == Some(Action::Altitude) {
            let vertical = update.direction.map(|d| d[1]).unwrap_or(0.0);
            next.altitude = if vertical > 0.0 {
                self.altitude + update.altitude
            } else if vertical < 0.0 {
                (self.altitude - update.altitude).max(0.0)
            } else {
                update.altitude
            };
        }

        if matches!(
            update.action,
            Some(Action::Move | Action::Reconnaissance | Action::Rotate)
        ) {
            if let Some(direction) = update.direction {
                next.direction = direction;
            }
        }

        if update.speed > 0.0 {
            next.speed = update.speed;
        }

        if update.tracking_distance != 0.0 {
            next.tracking_distance = update.tracking_distance;
        }

        next.normalized()
    }
}

/// Result of a single parse before it is merged into the canonical state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCommand {
    /// `None` when the text implied no action (keep the previous one)
    pub action: Option<Action>,
    pub altitude: f64,
    pub direction: Option<[f64; 3]>,
    pub speed: f64,
    pub tracking_distance: f64,
}

/// Lenient JSON shape emitted by the language model and accepted from
/// external command collaborators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireCommand {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub direction: Option<Vec<f64>>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default, rename = "trackingDistance", alias = "tracking_distance")]
    pub tracking_distance: Option<f64>,
}

impl WireCommand {
    /// Convert into a parse delta. Unknown actions become `Move` and a
    /// direction of the wrong length becomes the zero vector, both with a
    /// warning.
    pub fn into_parsed(self) -> ParsedCommand {
        let action = match self.action.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Action>().unwrap_or_else(|err| {
                tracing::warn!("{}; defaulting to move", err);
                Action::Move
            })),
        };

        let direction = self.direction.map(|values| match values.as_slice() {
            [x, y, z] => [*x, *y, *z],
            other => {
                tracing::warn!(
                    "Direction must have 3 components, got {}; using [0, 0, 0]",
                    other.len()
                );
                [0.0; 3]
            }
        });

        ParsedCommand {
            action,
            altitude: finite_or_zero(self.altitude.unwrap_or(0.0)),
            direction,
            speed: finite_or_zero(self.speed.unwrap_or(0.0)),
            tracking_distance: finite_or_zero(self.tracking_distance.unwrap_or(0.0)),
        }
    }

    /// Convert into a complete canonical command (used for direct intake).
    pub fn into_command(self) -> Command {
        let parsed = self.into_parsed();
        let action = parsed.action.unwrap_or_else(|| {
            tracing::warn!("Command without action; defaulting to move");
            Action::Move
        });
        Command::new(
            action,
            parsed.altitude,
            parsed.direction.unwrap_or([0.0; 3]),
            parsed.speed,
            parsed.tracking_distance,
        )
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
