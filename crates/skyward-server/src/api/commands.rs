//! Command intake endpoints.
//!
//! Operators post free text or canonical commands; both are handed to the
//! control loop, which parses, queues and executes them in order.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use skyward_core::models::WireCommand;

use crate::detection::TargetObservation;
use crate::pilot::{Intake, PilotStatus};
use crate::state::AppState;

/// Request carrying operator text.
#[derive(Debug, Deserialize)]
pub struct TextCommandRequest {
    pub text: String,
}

/// Response after accepting a command.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub action: Option<String>,
}

/// Current pilot snapshot.
/// GET /v1/state
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<PilotStatus> {
    Json(state.status())
}

/// Queue a canonical command.
/// POST /v1/commands
pub async fn issue_command(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WireCommand>,
) -> Result<(StatusCode, Json<AcceptedResponse>), StatusCode> {
    let command = request.into_command();
    let action = command.action.to_string();
    state
        .submit(Intake::Command(command))
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "queued".to_string(),
            action: Some(action),
        }),
    ))
}

/// Parse and queue operator text.
/// POST /v1/commands/text
pub async fn issue_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextCommandRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), StatusCode> {
    if request.text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    state
        .submit(Intake::Text(request.text))
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse {
            status: "parsing".to_string(),
            action: None,
        }),
    ))
}

/// Publish a target observation, for setups without a detection feed.
/// POST /v1/target
pub async fn set_target(
    State(state): State<Arc<AppState>>,
    Json(observation): Json<TargetObservation>,
) -> StatusCode {
    state.set_target(Some(observation));
    StatusCode::NO_CONTENT
}

