//! Prometheus metrics

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// One webhook message accepted for routing.
pub fn record_inbound_event() {
    metrics::counter!("leadbot_inbound_events_total").increment(1);
}

/// A redelivered message stopped by the idempotency gate.
pub fn record_dedup_hit() {
    metrics::counter!("leadbot_dedup_hits_total").increment(1);
}

/// A delivery receipt observed (logged only).
pub fn record_status_event() {
    metrics::counter!("leadbot_status_events_total").increment(1);
}
