//! # Bonus Scheduler
//!
//! Runs the batch processor on a fixed period inside the API process.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tick ──► process_pending_bonuses(now) ──► log report                  │
//! │   ▲                                              │                      │
//! │   └──────────────── process_interval ────────────┘                      │
//! │                                                                         │
//! │  shutdown() ──► loop exits after the current run                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Manual runs through `POST /api/process-bonuses` may overlap a scheduled
//! run; the per-record claim keeps crediting exactly-once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::services::bonus_processor;
use crate::AppState;

/// Periodic batch runner.
pub struct BonusScheduler {
    state: Arc<AppState>,
    period: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Asks the scheduler loop to stop. A no-op if it already stopped.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl BonusScheduler {
    pub fn new(state: Arc<AppState>, period: Duration) -> (Self, SchedulerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let scheduler = BonusScheduler {
            state,
            period,
            shutdown_rx,
        };

        (scheduler, SchedulerHandle { shutdown_tx })
    }

    /// Runs the scheduler loop. Spawn this as a background task.
    pub async fn run(mut self) {
        info!(period_secs = self.period.as_secs(), "Bonus scheduler starting");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let run = bonus_processor::process_pending_bonuses(&self.state.db, Utc::now());
                    if let Err(e) = run.await {
                        error!(error = %e, "Scheduled bonus batch failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Bonus scheduler shutting down");
                    break;
                }
            }
        }

        info!("Bonus scheduler stopped");
    }
}
