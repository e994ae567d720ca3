//! Timer-driven reconciliation
//!
//! The sweep itself is stateless; this loop only provides the period.
//! Sweeps run sequentially on one task, so timer-driven invocations
//! never overlap each other (a manual trigger through the API can
//! still run concurrently; dispatch stays safe behind the dialer's
//! lock).

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::metrics::record_sweep;
use crate::state::AppState;

/// Spawn the periodic sweep loop
pub fn spawn_sweep_loop(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.settings.reconciler.interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // A slow sweep delays the next tick instead of bursting.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(period_secs = period.as_secs(), "sweep scheduler started");

        loop {
            ticker.tick().await;
            let summary = state.reconciler.run_sweep().await;
            record_sweep(&summary);
            if summary.errors > 0 {
                tracing::warn!(
                    errors = summary.errors,
                    details = ?summary.error_details,
                    "sweep finished with errors"
                );
            }
        }
    })
}
