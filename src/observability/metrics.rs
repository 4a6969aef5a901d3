//! Metrics collection and exposition.
//!
//! # Metrics
//! - `flagtree_refresh_total` (counter): reader counters by `reader`, `kind`
//!   (`same_content_skips`, `new_content_updates`, `entries_updated`,
//!   `content_failures`, `name_duplicates`, `skipped_entries`)
//! - `flagtree_loader_cycles_total` (counter): scheduled cycles by `reader`,
//!   `result` (`request`, `failure`)
//! - `flagtree_missing_sources_total` (counter): absent sources by `scope`
//! - `flagtree_snapshot_entries` (gauge): entries in the last published
//!   catalog by `reader`

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_refresh(reader: &str, kind: &'static str, count: u64) {
    metrics::counter!("flagtree_refresh_total", "reader" => reader.to_string(), "kind" => kind)
        .increment(count);
}

pub fn record_cycle(reader: &str, result: &'static str) {
    metrics::counter!("flagtree_loader_cycles_total", "reader" => reader.to_string(), "result" => result)
        .increment(1);
}

pub fn record_missing_source(scope: &str) {
    metrics::counter!("flagtree_missing_sources_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_snapshot_size(reader: &str, entries: usize) {
    metrics::gauge!("flagtree_snapshot_entries", "reader" => reader.to_string()).set(entries as f64);
}
