//! Skyward Server - always-on drone control loop with natural-language intake

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyward_core::scan::{ObstacleField, OpenSky, RangeSensor, SphereObstacle};
use skyward_llm::{ChatBackend, OllamaClient};
use skyward_server::config::Config;
use skyward_server::pilot::{Pilot, PilotSettings};
use skyward_server::state::AppState;
use skyward_server::{api, detection, loops};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("skyward_server=debug".parse()?))
        .init();

    tracing::info!("Starting Skyward Server...");

    let config = Config::from_env();
    let backend: Arc<dyn ChatBackend> = Arc::new(
        OllamaClient::with_timeout(&config.llm_url, &config.llm_model, config.llm_timeout())
            .context("failed to build language model client")?,
    );
    tracing::info!("Language model {} at {}", config.llm_model, config.llm_url);

    let sensor = load_sensor(&config)?;
    let (target_tx, target_rx) = watch::channel(None);
    let targets = Arc::new(target_tx);

    let pilot = Pilot::new(PilotSettings::from(&config), backend, sensor, target_rx);
    let detection_enabled = pilot.detection_enabled();

    let (intake_tx, intake_rx) = mpsc::channel(64);
    let (status_tx, status_rx) = watch::channel(pilot.status());
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start background loops
    tokio::spawn(loops::control_loop::run_control_loop(
        pilot,
        intake_rx,
        status_tx,
        config.tick_interval(),
        shutdown_tx.subscribe(),
    ));

    match config.detection_url.clone() {
        Some(url) => {
            tokio::spawn(detection::run_detection_feed(
                url,
                config.detection_retry(),
                detection_enabled,
                targets.clone(),
                shutdown_tx.subscribe(),
            ));
        }
        None => tracing::info!("No detection feed configured; targets accepted on POST /v1/target"),
    }

    // Build the app
    let state = Arc::new(AppState::new(intake_tx, status_rx, targets));
    let app = api::routes()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Run server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
        })
        .await?;

    Ok(())
}

fn load_sensor(config: &Config) -> Result<Box<dyn RangeSensor + Send>> {
    let Some(path) = &config.obstacles_path else {
        return Ok(Box::new(OpenSky));
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read obstacles from {}", path.display()))?;
    let obstacles: Vec<SphereObstacle> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid obstacle list in {}", path.display()))?;
    tracing::info!("Loaded {} obstacles from {}", obstacles.len(), path.display());
    Ok(Box::new(ObstacleField::new(obstacles)))
}
