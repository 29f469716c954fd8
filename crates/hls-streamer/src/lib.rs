//! HLS Streamer Service Library
//!
//! Supervises an external RTSP → HLS transcoder (GStreamer or FFmpeg),
//! turns its log stream into metrics, and advertises the service address
//! in etcd so other components can discover it.
//!
//! # Architecture
//!
//! ```text
//! main
//! ├── DiscoveryRegistrar (register on startup, deregister on shutdown)
//! └── ProcessSupervisor
//!     └── SupervisorHandle (one per transcoder child)
//!         ├── reaper task   (owns the child, handles stop requests)
//!         └── drain task    (blocking pool, reads merged stdout/stderr)
//!             └── LogDialect::parse → MetricsSink::record
//! ```
//!
//! # Modules
//!
//! - [`config`] - Service configuration from environment
//! - [`settings`] - Validated transcoding settings
//! - [`backend`] - Transcoder backend selection and command construction
//! - [`dialect`] - Log line metric extraction per backend
//! - [`supervisor`] - Child process lifecycle and output draining
//! - [`discovery`] - Service identity and etcd registration
//! - [`observability`] - Metrics sink and health endpoints
//! - [`errors`] - Error types

pub mod backend;
pub mod config;
pub mod dialect;
pub mod discovery;
pub mod errors;
pub mod host;
pub mod observability;
pub mod routes;
pub mod settings;
pub mod supervisor;
