//! Supervisor lifecycle tests.
//!
//! Two kinds of children:
//! - `MockProcessRunner` children with scripted output and exits
//! - Real `sh` processes, launched through `SystemProcessRunner`, to cover
//!   signals, the merged pipe and EOF handling

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hls_streamer::backend::{TranscoderBackend, TranscoderCommand};
use hls_streamer::dialect::{MetricSample, DROP, FPS, PACKETS_LOST, PACKETS_RECEIVED};
use hls_streamer::errors::StartError;
use hls_streamer::observability::{MetricsSink, PrometheusSink};
use hls_streamer::supervisor::{
    DrainStats, LaunchedProcess, ProcessRunner, ProcessSupervisor, StreamEnd, SystemProcessRunner,
    DRAIN_TIMEOUT,
};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use streamer_test_utils::mock_runner::{MOCK_PID_BASE, SIGKILL_EXIT, SIGTERM_EXIT};
use streamer_test_utils::{test_settings, MockProcessRunner, FFMPEG_PROGRESS_LINE, GST_STATS_LINE};

const GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct CollectingSink {
    samples: Mutex<Vec<MetricSample>>,
}

impl CollectingSink {
    fn samples(&self) -> Vec<MetricSample> {
        self.samples.lock().unwrap().clone()
    }
}

impl MetricsSink for CollectingSink {
    fn record(&self, sample: &MetricSample) {
        self.samples.lock().unwrap().push(sample.clone());
    }
}

/// Runs a shell script through the real runner instead of the backend binary.
struct ShellRunner {
    script: &'static str,
}

impl ProcessRunner for ShellRunner {
    fn launch(&self, _command: &TranscoderCommand) -> Result<LaunchedProcess, StartError> {
        SystemProcessRunner.launch(&TranscoderCommand::new("sh", ["-c", self.script]))
    }
}

fn supervisor(
    backend: TranscoderBackend,
    runner: Arc<dyn ProcessRunner>,
    sink: Option<Arc<dyn MetricsSink>>,
) -> ProcessSupervisor {
    ProcessSupervisor::new(backend, 8081, runner, sink)
}

// ============================================================================
// Mock runner
// ============================================================================

#[tokio::test]
async fn test_start_records_exactly_one_launch() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockProcessRunner::new();
    let settings = test_settings(dir.path());

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner.clone()), None)
        .start(&settings)
        .unwrap();

    assert_eq!(runner.launch_count(), 1);
    assert_eq!(
        runner.launches(),
        vec![TranscoderBackend::Gstreamer.command(&settings, 8081)]
    );
    assert_eq!(handle.pid(), Some(MOCK_PID_BASE + 1));

    let report = handle.stop(GRACE).await;
    assert_eq!(report.exit, SIGTERM_EXIT);
    assert_eq!(runner.termination_count(), 1);
}

#[tokio::test]
async fn test_launch_failure_is_start_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockProcessRunner::new().failing();

    let result = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner.clone()), None)
        .start(&test_settings(dir.path()));

    assert!(matches!(result, Err(StartError::Launch { .. })));
    assert_eq!(runner.launch_count(), 0);
}

#[tokio::test]
async fn test_gstreamer_output_reaches_sink() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let runner = MockProcessRunner::new()
        .with_output(format!("Setting pipeline to PLAYING ...\n{GST_STATS_LINE}"));

    let handle = supervisor(
        TranscoderBackend::Gstreamer,
        Arc::new(runner),
        Some(Arc::clone(&sink) as Arc<dyn MetricsSink>),
    )
    .start(&test_settings(dir.path()))
    .unwrap();
    let report = handle.stop(GRACE).await;

    assert_eq!(report.drain, DrainStats { lines: 2, samples: 2 });
    let last = sink.samples().pop().unwrap();
    assert_eq!(last.get(PACKETS_RECEIVED), Some(16247));
    assert_eq!(last.get(PACKETS_LOST), Some(1371));
}

#[tokio::test]
async fn test_ffmpeg_output_only_matching_lines_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(CollectingSink::default());
    let runner = MockProcessRunner::new().with_output(format!(
        "Input #0, rtsp, from 'rtsp://cam.example.com:8554/live':\n{FFMPEG_PROGRESS_LINE}"
    ));

    let handle = supervisor(
        TranscoderBackend::Ffmpeg,
        Arc::new(runner),
        Some(Arc::clone(&sink) as Arc<dyn MetricsSink>),
    )
    .start(&test_settings(dir.path()))
    .unwrap();
    let report = handle.stop(GRACE).await;

    assert_eq!(report.drain, DrainStats { lines: 2, samples: 1 });
    assert_eq!(
        sink.samples(),
        vec![MetricSample::new().with(FPS, 25).with(DROP, 3)]
    );
}

#[tokio::test]
async fn test_metrics_disabled_skips_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockProcessRunner::new().with_output(GST_STATS_LINE);

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner), None)
        .start(&test_settings(dir.path()))
        .unwrap();
    let report = handle.stop(GRACE).await;

    assert_eq!(report.drain, DrainStats { lines: 1, samples: 0 });
}

#[tokio::test]
async fn test_natural_exit_is_observed_without_restart() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockProcessRunner::new();

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner.clone()), None)
        .start(&test_settings(dir.path()))
        .unwrap();

    runner.exit_last(StreamEnd::exited(1));
    let end = tokio::time::timeout(GRACE, handle.wait()).await.unwrap();

    assert_eq!(end, StreamEnd::exited(1));
    assert!(handle.has_exited());
    assert_eq!(runner.launch_count(), 1);

    let report = handle.stop(GRACE).await;
    assert_eq!(report.exit, StreamEnd::exited(1));
    assert_eq!(runner.termination_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_escalates_to_kill() {
    let dir = tempfile::tempdir().unwrap();
    let runner = MockProcessRunner::new().ignoring_terminate();

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner.clone()), None)
        .start(&test_settings(dir.path()))
        .unwrap();
    let report = handle.stop(Duration::from_secs(10)).await;

    assert_eq!(report.exit, SIGKILL_EXIT);
    assert_eq!(runner.termination_count(), 1);
}

#[tokio::test]
async fn test_prometheus_gauges_follow_last_line() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    // Gauge handles bind to the recorder at construction time, so the drain
    // thread writes into this recorder
    let sink = metrics::with_local_recorder(&recorder, || {
        PrometheusSink::new(TranscoderBackend::Gstreamer.dialect())
    });
    let runner = MockProcessRunner::new().with_output(format!(
        "{GST_STATS_LINE}packets-received=(guint64)20000, packets-lost=(int)1400, recv-packet-rate=(uint)44\n"
    ));

    let handle = supervisor(
        TranscoderBackend::Gstreamer,
        Arc::new(runner),
        Some(Arc::new(sink)),
    )
    .start(&test_settings(dir.path()))
    .unwrap();
    handle.stop(GRACE).await;

    let gauges: Vec<(String, f64)> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Gauge(v) => Some((key.key().name().to_string(), v.into_inner())),
            _ => None,
        })
        .collect();

    assert!(gauges.contains(&("hls_packets_received".to_string(), 20000.0)));
    assert!(gauges.contains(&("hls_packets_lost".to_string(), 1400.0)));
    assert!(gauges.contains(&("hls_recv_packet_rate".to_string(), 44.0)));
}

// ============================================================================
// Real child processes
// ============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_real_child_output_drained_to_eof() {
    let sink = Arc::new(CollectingSink::default());
    let runner = ShellRunner {
        script: "echo 'packets-received=(guint64)10, packets-lost=(int)2' 1>&2; echo done",
    };
    let dir = tempfile::tempdir().unwrap();

    let handle = supervisor(
        TranscoderBackend::Gstreamer,
        Arc::new(runner),
        Some(Arc::clone(&sink) as Arc<dyn MetricsSink>),
    )
    .start(&test_settings(dir.path()))
    .unwrap();
    assert!(handle.pid().is_some());

    let end = tokio::time::timeout(Duration::from_secs(10), handle.wait())
        .await
        .unwrap();
    assert!(end.success());

    let report = handle.stop(GRACE).await;
    assert_eq!(report.drain.lines, 2);
    assert_eq!(report.drain.samples, 2);
    assert!(sink
        .samples()
        .iter()
        .any(|s| s.get(PACKETS_RECEIVED) == Some(10) && s.get(PACKETS_LOST) == Some(2)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_child_stops_on_sigterm() {
    let runner = ShellRunner {
        script: "exec sleep 30",
    };
    let dir = tempfile::tempdir().unwrap();

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner), None)
        .start(&test_settings(dir.path()))
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), handle.stop(GRACE))
        .await
        .unwrap();

    assert_eq!(report.exit, StreamEnd::signalled(15));
}

#[cfg(unix)]
#[tokio::test]
async fn test_real_child_ignoring_sigterm_is_killed() {
    let runner = ShellRunner {
        script: "trap '' TERM; exec sleep 30",
    };
    let dir = tempfile::tempdir().unwrap();

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner), None)
        .start(&test_settings(dir.path()))
        .unwrap();

    // Give the shell time to install the trap before signalling
    tokio::time::sleep(Duration::from_millis(200)).await;
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        handle.stop(Duration::from_millis(300)),
    )
    .await
    .unwrap();

    assert_eq!(report.exit, StreamEnd::signalled(9));
}

#[cfg(unix)]
#[tokio::test]
async fn test_stop_reaches_eof_when_helper_holds_pipe() {
    let runner = ShellRunner {
        script: "sleep 15 & echo started; exec sleep 60",
    };
    let dir = tempfile::tempdir().unwrap();

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner), None)
        .start(&test_settings(dir.path()))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = std::time::Instant::now();
    let report = handle.stop(Duration::from_millis(300)).await;

    // The backgrounded sleep dies with the group, so the drain is not abandoned
    assert!(started.elapsed() < DRAIN_TIMEOUT);
    assert_eq!(report.exit, StreamEnd::signalled(15));
    assert_eq!(report.drain.lines, 1);
}

#[cfg(unix)]
#[tokio::test]
async fn test_natural_exit_does_not_wait_on_forked_helper() {
    let runner = ShellRunner {
        script: "sleep 30 & echo started",
    };
    let dir = tempfile::tempdir().unwrap();

    let handle = supervisor(TranscoderBackend::Gstreamer, Arc::new(runner), None)
        .start(&test_settings(dir.path()))
        .unwrap();
    let end = tokio::time::timeout(Duration::from_secs(10), handle.wait())
        .await
        .unwrap();
    assert!(end.success());

    let started = std::time::Instant::now();
    let report = handle.stop(GRACE).await;

    assert!(started.elapsed() < DRAIN_TIMEOUT);
    assert_eq!(report.drain.lines, 1);
}
