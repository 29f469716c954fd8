//! Common utilities and types shared across HLS streamer components.

#![warn(clippy::pedantic)]

/// Module for shared configuration types and environment flag parsing
pub mod config;

/// Module for process-wide logging initialization
pub mod observability;

/// Module for secret types that prevent accidental logging
pub mod secret;
