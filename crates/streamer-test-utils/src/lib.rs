//! # Streamer Test Utilities
//!
//! Shared test utilities for the HLS streamer.
//!
//! Mocks stand in for the two external systems the streamer talks to, so
//! lifecycle tests run without etcd or a transcoder binary.
//!
//! ## Modules
//!
//! - `mock_registry` - In-memory `ServiceRegistry` with failure and hang modes
//! - `mock_runner` - Scripted `ProcessRunner` that records launches
//! - `fixtures` - Settings, environment maps and captured log lines
//!
//! ## Usage
//!
//! ```rust,ignore
//! use streamer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let registry = MockRegistry::new();
//!     let runner = MockProcessRunner::new().with_output(GST_STATS_LINE);
//!     let settings = test_settings(dir.path());
//!
//!     // Run your test...
//! }
//! ```

pub mod fixtures;
pub mod mock_registry;
pub mod mock_runner;

pub use fixtures::*;
pub use mock_registry::MockRegistry;
pub use mock_runner::MockProcessRunner;
