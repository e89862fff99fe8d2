//! Fixed-rate control loop driving the pilot.

use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::pilot::{Intake, Pilot, PilotStatus};

/// Run the pilot until shutdown, publishing a status snapshot every tick.
pub async fn run_control_loop(
    mut pilot: Pilot,
    mut intake: mpsc::Receiver<Intake>,
    status: watch::Sender<PilotStatus>,
    tick: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    tracing::info!("Control loop running every {:?}", tick);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Control loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;

                pilot.tick(elapsed);

                // After the tick, so a settle window opened here starts full.
                while let Ok(item) = intake.try_recv() {
                    pilot.submit(item);
                }
                status.send_replace(pilot.status());
            }
        }
    }
}
