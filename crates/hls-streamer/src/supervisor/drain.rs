//! Blocking drain of the transcoder's merged output.
//!
//! Runs on the blocking pool. Every line is forwarded to the log; when a
//! metrics sink is attached the line is also parsed by the backend's dialect.
//! The loop ends at EOF, which arrives once every write end of the pipe is
//! closed (the child has exited).

use crate::dialect::LogDialect;
use crate::observability::MetricsSink;
use std::io::{self, BufRead, BufReader, Read};
use tracing::{debug, warn};

/// What a drain pass saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Non-empty lines read.
    pub lines: u64,
    /// Samples handed to the sink.
    pub samples: u64,
}

/// Read `output` to EOF, logging each line and optionally recording samples.
///
/// Lines are decoded lossily; a transcoder printing invalid UTF-8 never
/// stops the drain.
pub fn drain_output<R: Read>(
    output: R,
    dialect: &dyn LogDialect,
    sink: Option<&dyn MetricsSink>,
) -> DrainStats {
    let mut reader = BufReader::new(output);
    let mut buf = Vec::with_capacity(1024);
    let mut stats = DrainStats::default();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(target: "hls.supervisor", error = %e, "Transcoder output read failed");
                break;
            }
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if line.is_empty() {
            continue;
        }
        stats.lines += 1;

        debug!(target: "hls.transcoder", backend = dialect.name(), "{}", line);

        let Some(sink) = sink else {
            continue;
        };
        if let Some(sample) = dialect.parse(line) {
            sink.record(&sample);
            stats.samples += 1;
        }
    }

    debug!(
        target: "hls.supervisor",
        lines = stats.lines,
        samples = stats.samples,
        "Transcoder output closed"
    );
    stats
}
