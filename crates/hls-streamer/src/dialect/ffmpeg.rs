//! Frame-oriented dialect for FFmpeg progress lines.
//!
//! FFmpeg reports progress as `frame=  250 fps= 25 q=-1.0 ... drop=3 ...`.
//! Both fields come from one combined pattern; a line that does not match
//! carries no metrics.

use super::{capture_u64, LogDialect, MetricSample};
use regex::Regex;
use std::sync::LazyLock;

pub const FPS: &str = "fps";
pub const DROP: &str = "drop";

const METRIC_NAMES: &[&str] = &[FPS, DROP];

static PROGRESS_PATTERN: LazyLock<Regex> = LazyLock::new(compile_progress_pattern);

#[expect(
    clippy::expect_used,
    reason = "Pattern is a compile-time literal covered by unit tests"
)]
fn compile_progress_pattern() -> Regex {
    Regex::new(r"fps=\s*(\d+)(?:\.\d+)?.*?drop=\s*(\d+)")
        .expect("static FFmpeg progress pattern must compile")
}

/// FFmpeg progress line dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegDialect;

impl LogDialect for FfmpegDialect {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn metric_names(&self) -> &'static [&'static str] {
        METRIC_NAMES
    }

    /// Fractional fps values are truncated.
    fn parse(&self, line: &str) -> Option<MetricSample> {
        let captures = PROGRESS_PATTERN.captures(line)?;
        let fps = capture_u64(&captures, 1)?;
        let drop = capture_u64(&captures, 2)?;
        Some(MetricSample::new().with(FPS, fps).with(DROP, drop))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_line() {
        let line = "frame=  100 fps= 25 q=-1.0 size=N/A time=00:00:04.00 \
                    bitrate=N/A dup=0 drop=3 speed=1.01x";
        let sample = FfmpegDialect.parse(line).unwrap();

        assert_eq!(sample, MetricSample::new().with(FPS, 25).with(DROP, 3));
    }

    #[test]
    fn test_parse_truncates_fractional_fps() {
        let sample = FfmpegDialect
            .parse("frame= 3000 fps=29.97 q=-1.0 drop=0")
            .unwrap();
        assert_eq!(sample.get(FPS), Some(29));
        assert_eq!(sample.get(DROP), Some(0));
    }

    #[test]
    fn test_zero_metrics_are_still_a_sample() {
        let sample = FfmpegDialect.parse("fps=0 drop=0").unwrap();
        assert_eq!(sample, MetricSample::new().with(FPS, 0).with(DROP, 0));
    }

    #[test]
    fn test_unmatched_line_yields_none() {
        assert!(FfmpegDialect.parse("No matching information").is_none());
        assert!(FfmpegDialect.parse("fps= 25 without drops").is_none());
        assert!(FfmpegDialect
            .parse("Input #0, rtsp, from 'rtsp://example.com/[REDACTED]':")
            .is_none());
        assert!(FfmpegDialect.parse("").is_none());
    }
}
