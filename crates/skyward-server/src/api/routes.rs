//! REST API routes.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::commands;
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/state", get(commands::get_state))
        .route("/v1/commands", post(commands::issue_command))
        .route("/v1/commands/text", post(commands::issue_text))
        .route("/v1/target", post(commands::set_target))
}
