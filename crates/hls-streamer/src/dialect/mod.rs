//! Transcoder log dialects.
//!
//! A dialect turns one raw log line into a [`MetricSample`]. Dialects are
//! pure: the same line always yields the same sample and no state is kept
//! between lines. Malformed input never panics; it yields a zero-valued or
//! absent sample depending on the dialect.

mod ffmpeg;
mod gstreamer;

pub use ffmpeg::{FfmpegDialect, DROP, FPS};
pub use gstreamer::{GstreamerDialect, PACKETS_LOST, PACKETS_RECEIVED, RECV_PACKET_RATE};

use std::collections::BTreeMap;

/// Named integer metrics extracted from a single log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricSample {
    values: BTreeMap<&'static str, u64>,
}

impl MetricSample {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: u64) -> Self {
        self.values.insert(name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: u64) {
        self.values.insert(name, value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }
}

/// A transcoder backend's log format.
pub trait LogDialect: Send + Sync + std::fmt::Debug {
    /// Backend name, used in logs.
    fn name(&self) -> &'static str;

    /// Every metric name this dialect can produce.
    fn metric_names(&self) -> &'static [&'static str];

    /// Extract metrics from one line. `None` means the line carried no
    /// metrics, which is distinct from metrics that are all zero.
    fn parse(&self, line: &str) -> Option<MetricSample>;
}

/// Parse a captured decimal group; overflow is treated as a miss.
fn capture_u64(captures: &regex::Captures<'_>, group: usize) -> Option<u64> {
    captures.get(group)?.as_str().parse().ok()
}
