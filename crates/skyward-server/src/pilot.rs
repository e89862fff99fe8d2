//! The pilot ties parsing, queueing, flight control and activity logging
//! together and advances them one control tick at a time.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use skyward_core::flight::{FlightConfig, FlightEvent, FlightStateMachine, Pose};
use skyward_core::models::Command;
use skyward_core::navigator::{NavDecision, Navigator, NavigatorConfig};
use skyward_core::queue::{CommandQueue, QueuedCommand};
use skyward_core::scan::{RangeScanner, RangeSensor, ScanConfig, ScanResult};
use skyward_core::tracking::{TrackingBand, TrackingConfig, TrackingController};
use skyward_llm::{ChatBackend, CommandParser, ParseOutcome, ParseSource, Summarizer};

use crate::activity_logger::{ActivityLogger, LoggerConfig};
use crate::config::Config;
use crate::detection::TargetObservation;

/// Work submitted to the pilot from outside the control loop.
#[derive(Debug, Clone)]
pub enum Intake {
    /// Operator text, parsed against the current canonical command
    Text(String),
    /// Canonical command, queued as-is
    Command(Command),
}

/// Tunables for everything the pilot owns.
#[derive(Debug, Clone)]
pub struct PilotSettings {
    pub flight: FlightConfig,
    pub scan: ScanConfig,
    pub navigator: NavigatorConfig,
    pub tracking: TrackingConfig,
    pub logger: LoggerConfig,
    pub settle_delay: Duration,
}

impl From<&Config> for PilotSettings {
    fn from(config: &Config) -> Self {
        let scan = ScanConfig::default();
        let navigator = NavigatorConfig {
            safe_distance_m: scan.safe_distance_m,
            ..NavigatorConfig::default()
        };
        Self {
            flight: FlightConfig::default(),
            scan,
            navigator,
            tracking: TrackingConfig::default(),
            logger: LoggerConfig {
                log_path: config.log_path.clone(),
                ..LoggerConfig::default()
            },
            settle_delay: config.settle_delay(),
        }
    }
}

/// Snapshot published after every tick.
#[derive(Debug, Clone, Serialize)]
pub struct PilotStatus {
    pub mode: String,
    pub canonical: Command,
    pub position: [f64; 3],
    pub heading_deg: f64,
    pub velocity: [f64; 3],
    pub speed: f64,
    pub altitude_target: Option<f64>,
    pub tracking_distance: f64,
    pub detection_assist: bool,
    pub queued: usize,
    pub settling: bool,
    pub target: Option<[f64; 3]>,
    pub tracking_band: Option<TrackingBand>,
    pub navigation: Option<NavDecision>,
    pub nearest_obstacle_m: Option<f64>,
    pub last_parse: Option<ParseSource>,
    pub recent_log: Vec<String>,
    pub last_summary: Option<String>,
    pub updated_at: DateTime<Utc>,
}

pub struct Pilot {
    fsm: FlightStateMachine,
    queue: CommandQueue,
    scanner: RangeScanner,
    sensor: Box<dyn RangeSensor + Send>,
    logger: ActivityLogger,
    parser: CommandParser,
    canonical: Command,
    parsed_tx: mpsc::UnboundedSender<ParseOutcome>,
    parsed_rx: mpsc::UnboundedReceiver<ParseOutcome>,
    targets: watch::Receiver<Option<TargetObservation>>,
    detection_enabled: watch::Sender<bool>,
    last_scan: ScanResult,
    last_band: Option<TrackingBand>,
    last_navigation: Option<NavDecision>,
    last_parse: Option<ParseSource>,
}

impl Pilot {
    pub fn new(
        settings: PilotSettings,
        backend: Arc<dyn ChatBackend>,
        sensor: Box<dyn RangeSensor + Send>,
        targets: watch::Receiver<Option<TargetObservation>>,
    ) -> Self {
        let spawn = Pose::at(settings.flight.home);
        let fsm = FlightStateMachine::new(
            settings.flight,
            Navigator::new(settings.navigator),
            TrackingController::new(settings.tracking),
            spawn,
        );
        let (parsed_tx, parsed_rx) = mpsc::unbounded_channel();
        let (detection_enabled, _) = watch::channel(false);

        Self {
            fsm,
            queue: CommandQueue::new(settings.settle_delay),
            scanner: RangeScanner::new(settings.scan),
            sensor,
            logger: ActivityLogger::new(settings.logger, Summarizer::new(backend.clone())),
            parser: CommandParser::new(backend),
            canonical: Command::default(),
            parsed_tx,
            parsed_rx,
            targets,
            detection_enabled,
            last_scan: ScanResult::default(),
            last_band: None,
            last_navigation: None,
            last_parse: None,
        }
    }

    /// Receiver that follows whether the detection feed should run.
    pub fn detection_enabled(&self) -> watch::Receiver<bool> {
        self.detection_enabled.subscribe()
    }

    pub fn canonical(&self) -> &Command {
        &self.canonical
    }

    pub fn flight(&self) -> &FlightStateMachine {
        &self.fsm
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn logger(&self) -> &ActivityLogger {
        &self.logger
    }

    pub fn last_scan(&self) -> &ScanResult {
        &self.last_scan
    }

    pub fn submit(&mut self, intake: Intake) {
        match intake {
            Intake::Text(text) => self.submit_text(text),
            Intake::Command(command) => self.submit_command(command),
        }
    }

    /// Start parsing operator text in the background. The result is merged
    /// and queued on a later tick.
    pub fn submit_text(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let parser = self.parser.clone();
        let previous = self.canonical.clone();
        let tx = self.parsed_tx.clone();
        tokio::spawn(async move {
            let outcome = parser.parse_with_source(&previous, &text).await;
            let _ = tx.send(outcome);
        });
    }

    pub fn submit_command(&mut self, command: Command) {
        let command = command.normalized();
        self.canonical = command.clone();
        self.enqueue(command);
    }

    /// Advance everything by `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) {
        let target = self
            .targets
            .borrow()
            .as_ref()
            .and_then(TargetObservation::position_vector);
        self.fsm.observe_target(target);

        // Poll first so a settle window opened by a parse below starts full.
        if let Some(queued) = self.queue.poll(elapsed) {
            self.dispatch(queued);
        }

        while let Ok(outcome) = self.parsed_rx.try_recv() {
            self.last_parse = Some(outcome.source);
            self.canonical = outcome.command.clone();
            self.enqueue(outcome.command);
        }

        self.last_scan = self
            .scanner
            .scan(self.sensor.as_ref(), &self.fsm.state().pose.position);
        let report = self.fsm.tick(elapsed.as_secs_f64(), &self.last_scan);
        self.handle_events(&report.events);
        self.last_band = report.tracking;
        self.last_navigation = report.navigation;

        let sample = self.fsm.tracking_sample();
        self.logger.tick(elapsed, sample.as_ref());
    }

    pub fn status(&self) -> PilotStatus {
        let state = self.fsm.state();
        let position = state.pose.position;
        let velocity = state.velocity;
        PilotStatus {
            mode: state.mode.name().to_string(),
            canonical: self.canonical.clone(),
            position: [position.x, position.y, position.z],
            heading_deg: state.pose.heading_deg(),
            velocity: [velocity.x, velocity.y, velocity.z],
            speed: state.speed,
            altitude_target: state.altitude_target,
            tracking_distance: state.tracking_distance,
            detection_assist: state.detection_assist,
            queued: self.queue.pending_len(),
            settling: self.queue.is_settling(),
            target: self.fsm.tracker().target().map(|t| [t.x, t.y, t.z]),
            tracking_band: self.last_band,
            navigation: self.last_navigation,
            nearest_obstacle_m: self
                .last_scan
                .nearest()
                .map(|sample| sample.distance)
                .filter(|distance| *distance < self.scanner.config().range_m),
            last_parse: self.last_parse,
            recent_log: self.logger.history().lines(),
            last_summary: self.logger.last_summary().map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    fn enqueue(&mut self, command: Command) {
        if let Some(queued) = self.queue.enqueue(command) {
            self.dispatch(queued);
        }
    }

    fn dispatch(&mut self, queued: QueuedCommand) {
        tracing::info!(id = %queued.id, action = %queued.command.action, "Dispatching command");
        let events = self.fsm.apply_command(&queued.command);
        self.handle_events(&events);
    }

    fn handle_events(&mut self, events: &[FlightEvent]) {
        for event in events {
            match event {
                FlightEvent::TrackingStarted => self.logger.begin(),
                FlightEvent::TrackingStopped => self.logger.end(),
                FlightEvent::CommandRejected { action } => {
                    tracing::warn!("Command {} rejected by flight controller", action);
                }
                FlightEvent::ModeChanged { .. } => {}
            }
        }

        let assist = self.fsm.state().detection_assist;
        self.detection_enabled.send_if_modified(|enabled| {
            if *enabled == assist {
                return false;
            }
            tracing::info!("Detection assist {}", if assist { "enabled" } else { "disabled" });
            *enabled = assist;
            true
        });
    }
}

