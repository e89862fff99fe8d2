//! Shared state handed to request handlers.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::detection::TargetObservation;
use crate::pilot::{Intake, PilotStatus};

pub struct AppState {
    intake: mpsc::Sender<Intake>,
    status: watch::Receiver<PilotStatus>,
    targets: Arc<watch::Sender<Option<TargetObservation>>>,
}

impl AppState {
    pub fn new(
        intake: mpsc::Sender<Intake>,
        status: watch::Receiver<PilotStatus>,
        targets: Arc<watch::Sender<Option<TargetObservation>>>,
    ) -> Self {
        Self {
            intake,
            status,
            targets,
        }
    }

    /// Hand work to the control loop. Fails once the loop has stopped.
    pub async fn submit(&self, intake: Intake) -> Result<(), mpsc::error::SendError<Intake>> {
        self.intake.send(intake).await
    }

    pub fn status(&self) -> PilotStatus {
        self.status.borrow().clone()
    }

    pub fn set_target(&self, observation: Option<TargetObservation>) {
        self.targets.send_replace(observation);
    }
}
