//! Packet-oriented dialect for `gst-launch-1.0 -v` output.
//!
//! `rtspsrc` periodically prints `application/x-rtp-source-stats`
//! structures. Each field is captured independently; a field that is not
//! present in the line is reported as 0.

use super::{capture_u64, LogDialect, MetricSample};
use regex::Regex;
use std::sync::LazyLock;

pub const PACKETS_RECEIVED: &str = "packets_received";
pub const PACKETS_LOST: &str = "packets_lost";
pub const RECV_PACKET_RATE: &str = "recv_packet_rate";

const METRIC_NAMES: &[&str] = &[PACKETS_RECEIVED, PACKETS_LOST, RECV_PACKET_RATE];

/// Field name → pattern. Each pattern captures the first integer that
/// follows a GStreamer type annotation such as `(guint64)`.
static PATTERNS: LazyLock<[(&'static str, Regex); 3]> = LazyLock::new(|| {
    [
        (PACKETS_RECEIVED, compile(r"packets-received.+?\)(\d+)")),
        (PACKETS_LOST, compile(r"packets-lost.+?\)(\d+)")),
        (RECV_PACKET_RATE, compile(r"recv-packet-rate.+?\)(\d+)")),
    ]
});

#[expect(
    clippy::expect_used,
    reason = "Patterns are compile-time literals covered by unit tests"
)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static GStreamer stats pattern must compile")
}

/// GStreamer `rtspsrc` stats dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct GstreamerDialect;

impl LogDialect for GstreamerDialect {
    fn name(&self) -> &'static str {
        "gstreamer"
    }

    fn metric_names(&self) -> &'static [&'static str] {
        METRIC_NAMES
    }

    /// Always returns a full sample; missing fields are 0.
    fn parse(&self, line: &str) -> Option<MetricSample> {
        let mut sample = MetricSample::new();
        for (name, pattern) in PATTERNS.iter() {
            let value = pattern
                .captures(line)
                .and_then(|captures| capture_u64(&captures, 1))
                .unwrap_or(0);
            sample.set(*name, value);
        }
        Some(sample)
    }
}
