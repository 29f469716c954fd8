//! HLS streamer error types.
//!
//! Parse misses are not errors: a line without metrics yields a zero or
//! absent sample. Everything else is surfaced as one of the types below.

use crate::config::ConfigError;
use thiserror::Error;

/// The transcoder child process could not be launched.
///
/// Recoverable: the caller decides whether to retry or abort startup.
#[derive(Debug, Error)]
pub enum StartError {
    /// The OS refused to spawn the process (binary missing, permissions,
    /// resource exhaustion).
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The output pipe could not be created.
    #[error("Failed to create output pipe: {0}")]
    Pipe(#[source] std::io::Error),
}

/// Registry (etcd) operation failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Could not open a connection to the registry.
    #[error("Registry connection failed: {0}")]
    Connect(String),

    /// The registry rejected or failed an RPC.
    #[error("Registry {operation} failed: {message}")]
    Rpc {
        operation: &'static str,
        message: String,
    },

    /// The operation did not finish within its deadline.
    #[error("Registry {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The key is already registered with a different value.
    #[error("Key {key} already registered with value {existing}")]
    AlreadyRegistered { key: String, existing: String },

    /// The registry returned a key or value that is not valid UTF-8.
    #[error("Registry returned invalid data: {0}")]
    InvalidData(String),
}

/// Top-level error type for the streamer binary.
#[derive(Debug, Error)]
pub enum StreamerError {
    /// Invalid configuration (fatal, nothing has been started).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transcoder could not be started.
    #[error("Transcoder start error: {0}")]
    Start(#[from] StartError),

    /// Registry interaction failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Startup I/O (output directory, listeners).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metrics recorder could not be installed.
    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl RegistryError {
    /// Short, bounded label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            RegistryError::Connect(_) => "connect",
            RegistryError::Rpc { .. } => "rpc",
            RegistryError::Timeout { .. } => "timeout",
            RegistryError::AlreadyRegistered { .. } => "already_registered",
            RegistryError::InvalidData(_) => "invalid_data",
        }
    }
}
