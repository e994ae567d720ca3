//! Prometheus metrics

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use claimcall_engine::SweepSummary;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the global recorder. Call once at startup.
pub fn init_metrics() -> anyhow::Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("metrics recorder already installed"))?;
    Ok(())
}

/// Render the metrics exposition text
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

/// Record the outcome of one reconciliation sweep
pub fn record_sweep(summary: &SweepSummary) {
    metrics::counter!("claimcall_sweeps_total").increment(1);
    metrics::counter!("claimcall_sweep_candidates_total")
        .increment((summary.processed + summary.errors) as u64);
    metrics::counter!("claimcall_sweep_errors_total").increment(summary.errors as u64);
}

/// Record a completed single-target operation
pub fn record_operation(operation: &'static str, success: bool) {
    metrics::counter!(
        "claimcall_operations_total",
        "operation" => operation,
        "success" => if success { "true" } else { "false" },
    )
    .increment(1);
}
