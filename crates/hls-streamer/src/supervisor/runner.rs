//! Process launching seam.
//!
//! `ProcessRunner` is the only place that touches the OS process API, so the
//! supervisor can be exercised with scripted children in tests.
//!
//! The production runner attaches the child's stdout and stderr to the write
//! end of a single OS pipe, so the drain task sees one interleaved stream in
//! the order the transcoder wrote it.
//!
//! On unix the child leads its own process group. Signals go to the whole
//! group, and the group is swept with SIGKILL once the leader has exited, so
//! no helper process the transcoder forked is left holding the write end.

use crate::backend::TranscoderCommand;
use crate::errors::StartError;
use async_trait::async_trait;
use std::fmt;
use std::io::{self, Read};
use std::process::{ExitStatus, Stdio};

/// How a supervised child ended. Terminal for its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEnd {
    /// Exit code, when the child exited normally.
    pub code: Option<i32>,
    /// Terminating signal, when the child was killed by one (unix only).
    pub signal: Option<i32>,
}

impl StreamEnd {
    /// Exit with the given code.
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Killed by the given signal.
    #[must_use]
    pub const fn signalled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Outcome could not be observed (wait failed).
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            code: None,
            signal: None,
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for StreamEnd {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for StreamEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {code}"),
            (None, Some(signal)) => write!(f, "signal {signal}"),
            (None, None) => f.write_str("unknown exit status"),
        }
    }
}

/// Control over a running child.
#[async_trait]
pub trait ChildProcess: Send {
    /// Ask the child to exit (SIGTERM on unix).
    fn terminate(&mut self) -> io::Result<()>;

    /// Force the child to exit (SIGKILL on unix).
    fn kill(&mut self) -> io::Result<()>;

    /// Wait for the child to exit. Cancel-safe.
    async fn wait(&mut self) -> io::Result<StreamEnd>;
}

/// A freshly launched child and the read end of its merged output.
pub struct LaunchedProcess {
    pub pid: Option<u32>,
    pub output: Box<dyn Read + Send>,
    pub child: Box<dyn ChildProcess>,
}

/// Launches transcoder processes.
pub trait ProcessRunner: Send + Sync {
    /// Spawn `command`. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `StartError` if the pipe cannot be created or the process
    /// cannot be spawned.
    fn launch(&self, command: &TranscoderCommand) -> Result<LaunchedProcess, StartError>;
}

/// Spawns real OS processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn launch(&self, command: &TranscoderCommand) -> Result<LaunchedProcess, StartError> {
        let (reader, writer) = io::pipe().map_err(StartError::Pipe)?;
        let stderr_writer = writer.try_clone().map_err(StartError::Pipe)?;

        // The Command owns both write ends; it is dropped when this function
        // returns so the reader sees EOF once the child exits.
        let mut process = tokio::process::Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);
        #[cfg(unix)]
        process.process_group(0);

        let child = process.spawn().map_err(|source| StartError::Launch {
            program: command.program.clone(),
            source,
        })?;
        let pid = child.id();

        Ok(LaunchedProcess {
            pid,
            output: Box::new(reader),
            child: Box::new(SystemChild {
                child,
                #[cfg(unix)]
                group: pid.and_then(|pid| i32::try_from(pid).ok()),
            }),
        })
    }
}

struct SystemChild {
    child: tokio::process::Child,
    /// Process group id; equal to the leader's pid.
    #[cfg(unix)]
    group: Option<i32>,
}

#[cfg(unix)]
impl SystemChild {
    fn signal_group(&self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::killpg;
        use nix::unistd::Pid;

        let Some(group) = self.group else {
            return Ok(());
        };
        match killpg(Pid::from_raw(group), signal) {
            // Every member already gone
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(io::Error::from(e)),
        }
    }
}

#[async_trait]
impl ChildProcess for SystemChild {
    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        self.signal_group(nix::sys::signal::Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    #[cfg(unix)]
    fn kill(&mut self) -> io::Result<()> {
        if self.group.is_some() {
            self.signal_group(nix::sys::signal::Signal::SIGKILL)
        } else {
            self.child.start_kill()
        }
    }

    #[cfg(not(unix))]
    fn kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    async fn wait(&mut self) -> io::Result<StreamEnd> {
        let end = self.child.wait().await.map(StreamEnd::from)?;

        // Leftover group members would keep the output pipe open
        #[cfg(unix)]
        {
            if let Err(e) = self.signal_group(nix::sys::signal::Signal::SIGKILL) {
                tracing::warn!(target: "hls.supervisor", error = %e, "Failed to sweep transcoder process group");
            }
        }

        Ok(end)
    }
}
