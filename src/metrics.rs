use std::net::SocketAddr;
use tracing::{info, warn};

pub const ROWS_PARSED: &str = "booth_sync_rows_parsed_total";
pub const ROWS_DROPPED: &str = "booth_sync_rows_dropped_total";
pub const ROWS_CLASSIFIED: &str = "booth_sync_rows_classified_total";
pub const ROWS_APPLIED: &str = "booth_sync_rows_applied_total";
pub const ROWS_FAILED: &str = "booth_sync_rows_failed_total";
pub const BATCH_DURATION: &str = "booth_sync_batch_duration_seconds";
pub const PURGE_RUNS: &str = "booth_sync_purge_runs_total";
pub const PURGED_RECORDS: &str = "booth_sync_purged_records_total";

/// Install the Prometheus exporter. Recording macros are no-ops when it is not installed.
pub fn init_metrics(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => {
            info!("Prometheus exporter listening on http://{}/metrics", addr);
        }
        Err(e) => {
            warn!("Prometheus exporter install failed (possibly already installed): {}", e);
        }
    }
}
