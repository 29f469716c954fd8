//! Metrics for the HLS streamer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `hls_` prefix
//! - `_total` suffix for counters
//!
//! # Transcoder gauges
//!
//! One gauge per metric the active dialect can produce, e.g.
//! `hls_packets_lost` (GStreamer) or `hls_fps` (FFmpeg). Gauges are set, never
//! incremented: the latest log line wins.
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `operation`: register, deregister, list
//! - `status`: success, error
//! - `backend`: gstreamer, ffmpeg

use crate::dialect::{LogDialect, MetricSample};
use metrics::{counter, describe_gauge, gauge, Gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Prefix applied to every transcoder gauge.
pub const GAUGE_PREFIX: &str = "hls_";

/// Receives parsed transcoder samples.
///
/// The supervisor only knows this trait; the export backend is chosen at
/// startup.
pub trait MetricsSink: Send + Sync {
    fn record(&self, sample: &MetricSample);
}

/// Gauge name for a dialect metric.
#[must_use]
pub fn gauge_name(metric: &str) -> String {
    format!("{GAUGE_PREFIX}{metric}")
}

/// Sink backed by the global `metrics` recorder (Prometheus in production).
///
/// Gauge handles are registered up front, one per dialect metric, so the
/// full set is visible to the puller before the first sample arrives.
pub struct PrometheusSink {
    gauges: Vec<(&'static str, Gauge)>,
}

impl PrometheusSink {
    /// Register gauges for every metric `dialect` can produce.
    ///
    /// The recorder must already be installed; handles bind to the recorder
    /// current at construction time.
    #[must_use]
    pub fn new(dialect: &dyn LogDialect) -> Self {
        let gauges = dialect
            .metric_names()
            .iter()
            .map(|metric| {
                let name = gauge_name(metric);
                describe_gauge!(
                    name.clone(),
                    format!("Latest {metric} reported by the {} transcoder", dialect.name())
                );
                (*metric, gauge!(name))
            })
            .collect();

        Self { gauges }
    }

    /// Names of the registered gauges.
    pub fn gauge_names(&self) -> impl Iterator<Item = String> + '_ {
        self.gauges.iter().map(|(metric, _)| gauge_name(metric))
    }
}

impl MetricsSink for PrometheusSink {
    fn record(&self, sample: &MetricSample) {
        for (metric, gauge) in &self.gauges {
            if let Some(value) = sample.get(metric) {
                // u64 to f64 conversion is exact for realistic counter values (< 2^53)
                #[allow(clippy::cast_precision_loss)]
                gauge.set(value as f64);
            }
        }
    }
}

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Operational Metrics (Counters)
// ============================================================================

/// Record a transcoder launch attempt.
///
/// Metric: `hls_transcoder_starts_total`
/// Labels: `backend`, `status`
pub fn record_transcoder_start(backend: &'static str, status: &'static str) {
    counter!("hls_transcoder_starts_total", "backend" => backend, "status" => status)
        .increment(1);
}

/// Record a transcoder exit.
///
/// Metric: `hls_transcoder_exits_total`
/// Labels: `backend`
pub fn record_transcoder_exit(backend: &'static str) {
    counter!("hls_transcoder_exits_total", "backend" => backend).increment(1);
}

/// Record a registry operation outcome.
///
/// Metric: `hls_registry_operations_total`
/// Labels: `operation`, `status`
pub fn record_registry_operation(operation: &'static str, status: &'static str) {
    counter!(
        "hls_registry_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}
