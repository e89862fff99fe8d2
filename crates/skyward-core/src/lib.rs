//! Skyward core - command interpretation and flight-mode control.
//!
//! Everything in this crate is synchronous and free of I/O so it can run
//! inside a fixed-rate control tick.

pub mod activity;
pub mod flight;
pub mod models;
pub mod navigator;
pub mod queue;
pub mod rule_parser;
pub mod scan;
pub mod spatial;
pub mod tracking;

pub use activity::{movement_phrase, TrackEntry, TrackHistory};
pub use flight::{FlightConfig, FlightEvent, FlightStateMachine, Mode, Pose, TickReport, VehicleState};
pub use models::{Action, ActionParseError, Command, ParsedCommand, WireCommand};
pub use navigator::{NavDecision, Navigator, NavigatorConfig, Steering};
pub use queue::{CommandQueue, QueuedCommand, DEFAULT_SETTLE_DELAY};
pub use rule_parser::parse_rules;
pub use scan::{
    ObstacleField, OpenSky, RangeScanner, RangeSensor, ScanConfig, ScanResult, ScanSample,
    SphereObstacle,
};
pub use tracking::{TrackSample, TrackingBand, TrackingConfig, TrackingController, TrackingOutput};
