use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use skyward_core::models::{Action, Command};
use skyward_core::scan::OpenSky;
use skyward_llm::{OfflineBackend, ParseSource};
use skyward_server::config::Config;
use skyward_server::detection::TargetObservation;
use skyward_server::pilot::{Intake, Pilot, PilotSettings};

const TICK: Duration = Duration::from_millis(50);

fn pilot_with(
    settle_secs: f64,
) -> (Pilot, watch::Sender<Option<TargetObservation>>) {
    let config = Config {
        log_path: None,
        settle_delay_secs: settle_secs,
        ..Config::default()
    };
    let (targets_tx, targets_rx) = watch::channel(None);
    let pilot = Pilot::new(
        PilotSettings::from(&config),
        Arc::new(OfflineBackend),
        Box::new(OpenSky),
        targets_rx,
    );
    (pilot, targets_tx)
}

fn run(pilot: &mut Pilot, ticks: usize) {
    for _ in 0..ticks {
        pilot.tick(TICK);
    }
}

#[tokio::test]
async fn queued_rotation_waits_for_settle_window() {
    let (mut pilot, _targets) = pilot_with(2.0);

    pilot.submit(Intake::Command(Command::move_towards([0.0, 0.0, 1.0], 3.0)));
    pilot.submit(Intake::Command(Command::rotate([0.0, 90.0, 0.0])));
    assert_eq!(pilot.status().mode, "moving");
    assert_eq!(pilot.flight().state().speed, 3.0);
    assert_eq!(pilot.queue().pending_len(), 1);

    run(&mut pilot, 39);
    assert_eq!(pilot.queue().pending_len(), 1);
    assert_eq!(pilot.status().mode, "moving");

    run(&mut pilot, 1);
    assert_eq!(pilot.queue().pending_len(), 0);
    assert_eq!(pilot.status().mode, "rotating");

    // 100 deg/s needs under a second for a quarter turn.
    run(&mut pilot, 30);
    let heading = pilot.flight().state().pose.heading_deg();
    assert!((heading - 90.0).abs() < 1.0, "heading {}", heading);
}

#[tokio::test]
async fn offline_text_falls_back_to_rules() {
    let (mut pilot, _targets) = pilot_with(0.1);
    pilot.submit(Intake::Command(Command::altitude(10.0)));
    pilot.submit(Intake::Text("위로 5미터 상승".to_string()));

    for _ in 0..100 {
        tokio::task::yield_now().await;
        pilot.tick(TICK);
        if pilot.status().last_parse.is_some() {
            break;
        }
    }

    let status = pilot.status();
    assert_eq!(status.last_parse, Some(ParseSource::Fallback));
    assert_eq!(pilot.canonical().action, Action::Altitude);
    assert!((pilot.canonical().altitude - 15.0).abs() < 1e-9);
}

#[tokio::test]
async fn parsed_command_gets_full_settle_window() {
    // Two ticks of settle time.
    let (mut pilot, _targets) = pilot_with(0.1);
    pilot.submit(Intake::Text("앞으로 이동".to_string()));

    for _ in 0..100 {
        tokio::task::yield_now().await;
        pilot.tick(TICK);
        if pilot.status().last_parse.is_some() {
            break;
        }
    }
    assert_eq!(pilot.status().mode, "moving");
    assert!(pilot.queue().is_settling());

    pilot.submit(Intake::Command(Command::hover()));
    assert_eq!(pilot.queue().pending_len(), 1);

    pilot.tick(TICK);
    assert_eq!(pilot.queue().pending_len(), 1);
    assert_eq!(pilot.status().mode, "moving");

    pilot.tick(TICK);
    assert_eq!(pilot.queue().pending_len(), 0);
    assert_eq!(pilot.status().mode, "hovering");
}

#[tokio::test]
async fn blank_text_is_ignored() {
    let (mut pilot, _targets) = pilot_with(0.1);
    pilot.submit(Intake::Text("   ".to_string()));
    for _ in 0..5 {
        tokio::task::yield_now().await;
        pilot.tick(TICK);
    }
    assert!(pilot.status().last_parse.is_none());
    assert_eq!(pilot.status().mode, "idle");
}

#[tokio::test]
async fn tracking_without_target_is_rejected() {
    let (mut pilot, _targets) = pilot_with(0.1);
    pilot.submit(Intake::Command(Command::tracking(5.0)));
    pilot.tick(TICK);
    assert_eq!(pilot.status().mode, "idle");
    assert!(!pilot.logger().is_active());
}

#[tokio::test]
async fn tracking_drives_logger_and_detection_assist() {
    let (mut pilot, targets) = pilot_with(0.5);
    let detection = pilot.detection_enabled();

    targets.send_replace(Some(TargetObservation::at([0.0, 1.0, 8.0])));
    pilot.tick(TICK);

    pilot.submit(Intake::Command(Command::tracking(4.0)));
    assert_eq!(pilot.status().mode, "tracking");
    assert!(pilot.logger().is_active());
    assert!(*detection.borrow());

    run(&mut pilot, 10);
    assert!(!pilot.logger().history().is_empty());
    assert!(pilot.status().recent_log.iter().any(|line| line.contains("target is")));

    pilot.submit(Intake::Command(Command::hover()));
    run(&mut pilot, 10);
    assert_eq!(pilot.status().mode, "hovering");
    assert!(!pilot.logger().is_active());
    assert!(!*detection.borrow());
}

#[tokio::test]
async fn reconnaissance_enables_detection_assist() {
    let (mut pilot, _targets) = pilot_with(0.1);
    let detection = pilot.detection_enabled();

    pilot.submit(Intake::Command(Command::reconnaissance(0.0)));
    pilot.tick(TICK);
    let status = pilot.status();
    assert_eq!(status.mode, "reconnaissance");
    assert!(status.detection_assist);
    assert!(*detection.borrow());
    assert!(status.navigation.is_some());
}
