//! Transcoder process supervision.
//!
//! # Architecture
//!
//! ```text
//! ProcessSupervisor::start
//!     ├── ProcessRunner::launch   (child + read end of merged stdout/stderr)
//!     ├── drain task              (blocking pool, reads to EOF)
//!     └── reaper task             (waits for exit or a stop request)
//!             └── watch<Option<StreamEnd>>  observed by SupervisorHandle
//! ```
//!
//! Each handle owns exactly one child. The reaper is the only task that
//! touches the child after launch; the handle talks to it through a oneshot
//! stop request carrying the grace period. Dropping a handle without calling
//! [`SupervisorHandle::stop`] terminates the child with
//! [`DEFAULT_STOP_GRACE`].

mod drain;
mod runner;

pub use drain::{drain_output, DrainStats};
pub use runner::{ChildProcess, LaunchedProcess, ProcessRunner, StreamEnd, SystemProcessRunner};

use crate::backend::{TranscoderBackend, TranscoderCommand};
use crate::errors::StartError;
use crate::observability::metrics::{record_transcoder_exit, record_transcoder_start};
use crate::observability::MetricsSink;
use crate::settings::TranscodeSettings;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// Grace period between SIGTERM and SIGKILL when none is given.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// How long `stop` waits for the drain to reach EOF after the child is gone.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Launches transcoders for one backend.
pub struct ProcessSupervisor {
    backend: TranscoderBackend,
    http_port: u16,
    runner: Arc<dyn ProcessRunner>,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl ProcessSupervisor {
    /// Create a supervisor.
    ///
    /// `sink` is `None` when metrics export is disabled; output is then
    /// drained and logged but never parsed.
    pub fn new(
        backend: TranscoderBackend,
        http_port: u16,
        runner: Arc<dyn ProcessRunner>,
        sink: Option<Arc<dyn MetricsSink>>,
    ) -> Self {
        Self {
            backend,
            http_port,
            runner,
            sink,
        }
    }

    #[must_use]
    pub fn backend(&self) -> TranscoderBackend {
        self.backend
    }

    /// Launch one transcoder for `settings`.
    ///
    /// Returns as soon as the child is spawned; segment production is not
    /// awaited. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StartError` if the process cannot be launched. Nothing is
    /// left running in that case.
    #[instrument(skip_all, fields(backend = %self.backend))]
    pub fn start(&self, settings: &TranscodeSettings) -> Result<SupervisorHandle, StartError> {
        let backend = self.backend.as_str();
        let command = self.backend.command(settings, self.http_port);

        info!(
            target: "hls.supervisor",
            command = %command.redacted(settings),
            "Launching transcoder"
        );

        let launched = match self.runner.launch(&command) {
            Ok(launched) => launched,
            Err(e) => {
                error!(target: "hls.supervisor", error = %e, "Transcoder launch failed");
                record_transcoder_start(backend, "error");
                return Err(e);
            }
        };
        record_transcoder_start(backend, "success");

        let LaunchedProcess { pid, output, child } = launched;
        info!(target: "hls.supervisor", pid = ?pid, "Transcoder started");

        let dialect = self.backend.dialect();
        let sink = self.sink.clone();
        let drain =
            tokio::task::spawn_blocking(move || drain_output(output, dialect, sink.as_deref()));

        let (exit_tx, exit_rx) = watch::channel(None);
        let (stop_tx, stop_rx) = oneshot::channel();
        let reaper = tokio::spawn(reap(child, stop_rx, exit_tx, backend));

        Ok(SupervisorHandle {
            pid,
            command,
            exit_rx,
            stop_tx: Some(stop_tx),
            reaper,
            drain,
        })
    }
}

/// Outcome of [`SupervisorHandle::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopReport {
    pub exit: StreamEnd,
    pub drain: DrainStats,
}

/// Handle to one running transcoder.
pub struct SupervisorHandle {
    pid: Option<u32>,
    command: TranscoderCommand,
    exit_rx: watch::Receiver<Option<StreamEnd>>,
    stop_tx: Option<oneshot::Sender<Duration>>,
    reaper: JoinHandle<()>,
    drain: JoinHandle<DrainStats>,
}

impl SupervisorHandle {
    /// OS process id, if the runner reported one.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The command the child was launched with (unredacted).
    #[must_use]
    pub fn command(&self) -> &TranscoderCommand {
        &self.command
    }

    /// Exit status, once the child has exited.
    #[must_use]
    pub fn exit_status(&self) -> Option<StreamEnd> {
        *self.exit_rx.borrow()
    }

    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.exit_status().is_some()
    }

    /// Wait until the child exits, without stopping it. Cancel-safe.
    pub async fn wait(&self) -> StreamEnd {
        let mut exit_rx = self.exit_rx.clone();
        let end = match exit_rx.wait_for(Option::is_some).await {
            Ok(end) => end.unwrap_or_else(StreamEnd::unknown),
            // Reaper gone without publishing; it panicked
            Err(_) => StreamEnd::unknown(),
        };
        end
    }

    /// Terminate the child and wait for it and the drain to finish.
    ///
    /// Sends SIGTERM, waits up to `grace`, then SIGKILLs. Idempotent with
    /// respect to a child that already exited.
    #[instrument(skip_all, fields(pid = ?self.pid))]
    pub async fn stop(self, grace: Duration) -> StopReport {
        let SupervisorHandle {
            exit_rx,
            stop_tx,
            reaper,
            drain,
            ..
        } = self;

        if let Some(stop_tx) = stop_tx {
            // Err means the reaper already finished
            let _ = stop_tx.send(grace);
        }

        if let Err(e) = reaper.await {
            error!(target: "hls.supervisor", error = %e, "Reaper task failed");
        }
        let exit = (*exit_rx.borrow()).unwrap_or_else(StreamEnd::unknown);

        let drain = match tokio::time::timeout(DRAIN_TIMEOUT, drain).await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                error!(target: "hls.supervisor", error = %e, "Drain task failed");
                DrainStats::default()
            }
            Err(_) => {
                warn!(
                    target: "hls.supervisor",
                    timeout = ?DRAIN_TIMEOUT,
                    "Transcoder output still open after exit, abandoning drain"
                );
                DrainStats::default()
            }
        };

        info!(
            target: "hls.supervisor",
            exit = %exit,
            lines = drain.lines,
            samples = drain.samples,
            "Transcoder stopped"
        );

        StopReport { exit, drain }
    }
}

enum ReapEvent {
    Exited(io::Result<StreamEnd>),
    StopRequested(Duration),
    HandleDropped,
}

async fn reap(
    mut child: Box<dyn ChildProcess>,
    stop_rx: oneshot::Receiver<Duration>,
    exit_tx: watch::Sender<Option<StreamEnd>>,
    backend: &'static str,
) {
    let event = tokio::select! {
        result = child.wait() => ReapEvent::Exited(result),
        request = stop_rx => match request {
            Ok(grace) => ReapEvent::StopRequested(grace),
            Err(_) => ReapEvent::HandleDropped,
        },
    };

    let result = match event {
        ReapEvent::Exited(result) => result,
        ReapEvent::StopRequested(grace) => terminate(child.as_mut(), grace).await,
        ReapEvent::HandleDropped => {
            warn!(target: "hls.supervisor", "Handle dropped while transcoder running, terminating");
            terminate(child.as_mut(), DEFAULT_STOP_GRACE).await
        }
    };

    let end = result.unwrap_or_else(|e| {
        error!(target: "hls.supervisor", error = %e, "Failed to wait for transcoder");
        StreamEnd::unknown()
    });

    if end.success() {
        info!(target: "hls.supervisor", exit = %end, "Transcoder exited");
    } else {
        warn!(target: "hls.supervisor", exit = %end, "Transcoder exited");
    }
    record_transcoder_exit(backend);

    // Release the child (and any pipe ends it holds) before publishing
    drop(child);
    exit_tx.send_replace(Some(end));
}

async fn terminate(child: &mut dyn ChildProcess, grace: Duration) -> io::Result<StreamEnd> {
    if let Err(e) = child.terminate() {
        warn!(target: "hls.supervisor", error = %e, "Failed to signal transcoder");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                target: "hls.supervisor",
                grace = ?grace,
                "Transcoder ignored SIGTERM, killing"
            );
            child.kill()?;
            child.wait().await
        }
    }
}
