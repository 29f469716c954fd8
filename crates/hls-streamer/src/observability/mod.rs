//! Observability module for the HLS streamer.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `hls_packets_received` | Gauge | none | GStreamer: RTP packets received |
//! | `hls_packets_lost` | Gauge | none | GStreamer: RTP packets lost |
//! | `hls_recv_packet_rate` | Gauge | none | GStreamer: packet receive rate |
//! | `hls_fps` | Gauge | none | FFmpeg: output frame rate |
//! | `hls_drop` | Gauge | none | FFmpeg: dropped frames |
//! | `hls_transcoder_starts_total` | Counter | `backend`, `status` | Launch attempts |
//! | `hls_transcoder_exits_total` | Counter | `backend` | Child exits |
//! | `hls_registry_operations_total` | Counter | `operation`, `status` | etcd calls |

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::{init_metrics_recorder, MetricsSink, PrometheusSink};
