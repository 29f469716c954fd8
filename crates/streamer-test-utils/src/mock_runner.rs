//! Scripted process runner.
//!
//! Each launch returns a child whose output is a fixed byte buffer and whose
//! lifetime is controlled by the test: it exits when terminated (unless told
//! to ignore SIGTERM), when killed, or when the test calls
//! [`MockProcessRunner::exit_last`].
//!
//! # Example
//!
//! ```rust,ignore
//! use streamer_test_utils::MockProcessRunner;
//!
//! let runner = MockProcessRunner::new().with_output(GST_STATS_LINE);
//! let supervisor = ProcessSupervisor::new(backend, 8081, Arc::new(runner.clone()), None);
//! let handle = supervisor.start(&settings)?;
//!
//! assert_eq!(runner.launch_count(), 1);
//! runner.exit_last(StreamEnd::exited(1));
//! ```

use async_trait::async_trait;
use hls_streamer::backend::TranscoderCommand;
use hls_streamer::errors::StartError;
use hls_streamer::supervisor::{ChildProcess, LaunchedProcess, ProcessRunner, StreamEnd};
use std::io::{self, Cursor};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Pid reported for the first mock child; later children count up.
pub const MOCK_PID_BASE: u32 = 40_000;

/// Exit reported when a mock child is terminated.
pub const SIGTERM_EXIT: StreamEnd = StreamEnd::signalled(15);

/// Exit reported when a mock child is killed.
pub const SIGKILL_EXIT: StreamEnd = StreamEnd::signalled(9);

/// Mock `ProcessRunner` for supervisor tests.
#[derive(Debug, Clone, Default)]
pub struct MockProcessRunner {
    inner: Arc<Mutex<MockRunnerInner>>,
}

#[derive(Debug, Default)]
struct MockRunnerInner {
    output: Vec<u8>,
    fail_launch: bool,
    ignore_terminate: bool,
    launches: Vec<TranscoderCommand>,
    children: Vec<watch::Sender<Option<StreamEnd>>>,
    terminations: usize,
}

impl MockProcessRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Output every launched child produces (stdout and stderr merged).
    #[must_use]
    pub fn with_output(self, output: impl Into<Vec<u8>>) -> Self {
        self.inner.lock().unwrap().output = output.into();
        self
    }

    /// Fail every launch with `StartError::Launch` (binary not found).
    #[must_use]
    pub fn failing(self) -> Self {
        self.inner.lock().unwrap().fail_launch = true;
        self
    }

    /// Children ignore SIGTERM and exit only when killed.
    #[must_use]
    pub fn ignoring_terminate(self) -> Self {
        self.inner.lock().unwrap().ignore_terminate = true;
        self
    }

    pub fn launch_count(&self) -> usize {
        self.inner.lock().unwrap().launches.len()
    }

    /// Every command launched, in order.
    pub fn launches(&self) -> Vec<TranscoderCommand> {
        self.inner.lock().unwrap().launches.clone()
    }

    /// Number of SIGTERMs delivered across all children.
    pub fn termination_count(&self) -> usize {
        self.inner.lock().unwrap().terminations
    }

    /// Make the most recently launched child exit on its own.
    pub fn exit_last(&self, end: StreamEnd) {
        if let Some(child) = self.inner.lock().unwrap().children.last() {
            child.send_replace(Some(end));
        }
    }
}

impl ProcessRunner for MockProcessRunner {
    fn launch(&self, command: &TranscoderCommand) -> Result<LaunchedProcess, StartError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_launch {
            return Err(StartError::Launch {
                program: command.program.clone(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }

        inner.launches.push(command.clone());
        let (exited, _) = watch::channel(None);
        inner.children.push(exited.clone());
        let pid = MOCK_PID_BASE + u32::try_from(inner.children.len()).unwrap();

        Ok(LaunchedProcess {
            pid: Some(pid),
            output: Box::new(Cursor::new(inner.output.clone())),
            child: Box::new(MockChild {
                exited,
                ignore_terminate: inner.ignore_terminate,
                runner: Arc::clone(&self.inner),
            }),
        })
    }
}

struct MockChild {
    exited: watch::Sender<Option<StreamEnd>>,
    ignore_terminate: bool,
    runner: Arc<Mutex<MockRunnerInner>>,
}

#[async_trait]
impl ChildProcess for MockChild {
    fn terminate(&mut self) -> io::Result<()> {
        self.runner.lock().unwrap().terminations += 1;
        if !self.ignore_terminate {
            self.exited.send_if_modified(|state| {
                if state.is_none() {
                    *state = Some(SIGTERM_EXIT);
                    true
                } else {
                    false
                }
            });
        }
        Ok(())
    }

    fn kill(&mut self) -> io::Result<()> {
        self.exited.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(SIGKILL_EXIT);
                true
            } else {
                false
            }
        });
        Ok(())
    }

    async fn wait(&mut self) -> io::Result<StreamEnd> {
        let mut exited = self.exited.subscribe();
        let end = exited
            .wait_for(Option::is_some)
            .await
            .map_err(|_| io::Error::other("mock child channel closed"))?;
        Ok(end.unwrap_or(StreamEnd::unknown()))
    }
}
