use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tower::ServiceExt;

use skyward_core::scan::OpenSky;
use skyward_llm::OfflineBackend;

use crate::config::Config;
use crate::loops::control_loop::run_control_loop;
use crate::pilot::{Pilot, PilotSettings};
use crate::{api, state::AppState};

struct TestApp {
    app: axum::Router,
    _shutdown: broadcast::Sender<()>,
}

fn setup_app() -> TestApp {
    let config = Config {
        log_path: None,
        settle_delay_secs: 0.05,
        ..Config::default()
    };
    let (target_tx, target_rx) = watch::channel(None);
    let pilot = Pilot::new(
        PilotSettings::from(&config),
        Arc::new(OfflineBackend),
        Box::new(OpenSky),
        target_rx,
    );
    let (intake_tx, intake_rx) = mpsc::channel(16);
    let (status_tx, status_rx) = watch::channel(pilot.status());
    let (shutdown_tx, _) = broadcast::channel(1);

    tokio::spawn(run_control_loop(
        pilot,
        intake_rx,
        status_tx,
        Duration::from_millis(10),
        shutdown_tx.subscribe(),
    ));

    let state = Arc::new(AppState::new(intake_tx, status_rx, Arc::new(target_tx)));
    TestApp {
        app: api::routes().with_state(state),
        _shutdown: shutdown_tx,
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn get_state(app: &axum::Router) -> Value {
    let request = Request::builder()
        .uri("/v1/state")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

/// Poll the state endpoint until `check` passes or a second elapses.
async fn wait_for_state(app: &axum::Router, check: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..100 {
        let state = get_state(app).await;
        if check(&state) {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("state never matched: {}", get_state(app).await);
}

#[tokio::test]
async fn health_check() {
    let test = setup_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = test.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn canonical_command_is_executed() {
    let test = setup_app();
    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/v1/commands",
            json!({"action": "move", "direction": [0, 0, 1], "speed": 3}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json(response).await["action"], "move");

    let state = wait_for_state(&test.app, |s| s["mode"] == "moving").await;
    assert_eq!(state["canonical"]["speed"], 3.0);
}

#[tokio::test]
async fn unknown_action_defaults_to_move() {
    let test = setup_app();
    let response = test
        .app
        .clone()
        .oneshot(post_json("/v1/commands", json!({"action": "barrel_roll"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json(response).await["action"], "move");
}

#[tokio::test]
async fn text_command_uses_fallback_parser_when_offline() {
    let test = setup_app();
    let response = test
        .app
        .clone()
        .oneshot(post_json("/v1/commands/text", json!({"text": "고도 4미터"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let state = wait_for_state(&test.app, |s| s["last_parse"] == "fallback").await;
    assert_eq!(state["canonical"]["action"], "altitude");
    assert_eq!(state["canonical"]["altitude"], 4.0);
}

#[tokio::test]
async fn empty_text_is_rejected() {
    let test = setup_app();
    let response = test
        .app
        .clone()
        .oneshot(post_json("/v1/commands/text", json!({"text": "   "})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn posted_target_reaches_tracker() {
    let test = setup_app();
    let response = test
        .app
        .clone()
        .oneshot(post_json(
            "/v1/target",
            json!({"position": [0.0, 1.0, 8.0], "label": "person", "confidence": 0.8}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let state = wait_for_state(&test.app, |s| !s["target"].is_null()).await;
    assert_eq!(state["target"], json!([0.0, 1.0, 8.0]));
}
