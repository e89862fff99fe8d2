//! Object-detection feed.
//!
//! Connects to the detection service over WebSocket whenever detection assist
//! is enabled (reconnaissance and tracking) and publishes the most recent
//! target observation. Dropped connections are retried on a fixed cadence.

use futures_util::StreamExt;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Detections below this confidence are ignored.
pub const MIN_CONFIDENCE: f64 = 0.3;

/// Latest known target as reported by the detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetObservation {
    /// World position; `None` when the target is not currently visible
    #[serde(default)]
    pub position: Option<[f64; 3]>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl TargetObservation {
    pub fn at(position: [f64; 3]) -> Self {
        Self {
            position: Some(position),
            label: None,
            confidence: None,
        }
    }

    pub fn position_vector(&self) -> Option<Vector3<f64>> {
        self.position.map(Vector3::from)
    }
}

/// Decode one feed message. Malformed and low-confidence messages are
/// dropped.
pub fn decode_observation(text: &str) -> Option<TargetObservation> {
    let observation: TargetObservation = match serde_json::from_str(text) {
        Ok(observation) => observation,
        Err(err) => {
            tracing::warn!("Ignoring malformed detection message: {}", err);
            return None;
        }
    };
    if let Some(confidence) = observation.confidence {
        if confidence < MIN_CONFIDENCE {
            tracing::debug!(confidence, "Ignoring low-confidence detection");
            return None;
        }
    }
    Some(observation)
}

/// Run the detection feed until shutdown.
pub async fn run_detection_feed(
    url: String,
    retry: Duration,
    mut enabled: watch::Receiver<bool>,
    targets: Arc<watch::Sender<Option<TargetObservation>>>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut failures: u32 = 0;

    loop {
        while !*enabled.borrow_and_update() {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Detection feed shutting down");
                    return;
                }
                changed = enabled.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        match connect_async(url.as_str()).await {
            Ok((mut socket, _)) => {
                tracing::info!("Detection feed connected to {}", url);
                failures = 0;
                loop {
                    tokio::select! {
                        _ = shutdown.recv() => {
                            tracing::info!("Detection feed shutting down");
                            let _ = socket.close(None).await;
                            return;
                        }
                        changed = enabled.changed() => {
                            if changed.is_err() || !*enabled.borrow() {
                                tracing::info!("Detection assist disabled; closing feed");
                                let _ = socket.close(None).await;
                                break;
                            }
                        }
                        message = socket.next() => match message {
                            Some(Ok(Message::Text(text))) => {
                                if let Some(observation) = decode_observation(&text) {
                                    targets.send_replace(Some(observation));
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::warn!("Detection feed closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                tracing::warn!("Detection feed error: {}", err);
                                break;
                            }
                        }
                    }
                }
            }
            Err(err) => {
                tracing::warn!("Detection feed connection to {} failed: {}", url, err);
            }
        }

        if !*enabled.borrow() {
            continue;
        }
        failures = failures.saturating_add(1);
        tracing::info!(failures, "Reconnecting detection feed in {:?}", retry);
        tokio::select! {
            _ = shutdown.recv() => return,
            _ = tokio::time::sleep(retry) => {}
        }
    }
}
