//! Periodic sync.
//!
//! Runs a full sync immediately, then once per interval until Ctrl-C. A
//! tick that arrives while a run is still active is skipped, never queued.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use consultant_index_core::models::SyncKind;

use crate::error::SyncError;
use crate::sync::SyncOrchestrator;

/// What happened on one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A run was started in the background.
    Started,
    /// A previous run was still active.
    Skipped,
}

/// Start a background full run unless one is already active.
pub fn trigger(orchestrator: &Arc<SyncOrchestrator>) -> TickOutcome {
    if orchestrator.is_running() {
        warn!(phase = ?orchestrator.phase(), "previous sync still running; skipping this trigger");
        return TickOutcome::Skipped;
    }

    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        match orchestrator.run(SyncKind::Full).await {
            Ok(run) => info!(run_id = %run.id, status = run.status.as_str(), "scheduled sync finished"),
            Err(SyncError::AlreadyRunning) => {
                warn!("previous sync still running; skipping this trigger")
            }
            Err(e) => error!(error = %e, "scheduled sync failed"),
        }
    });
    TickOutcome::Started
}

/// Drive `orchestrator` every `every` until the process receives Ctrl-C.
pub async fn run_schedule(orchestrator: Arc<SyncOrchestrator>, every: Duration) -> Result<()> {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_secs = every.as_secs(),
        "scheduler started; first sync runs now"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                trigger(&orchestrator);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("shutdown requested; stopping scheduler");
                break;
            }
        }
    }

    if orchestrator.is_running() {
        warn!(phase = ?orchestrator.phase(), "in-flight sync ends with the process");
    }
    Ok(())
}
