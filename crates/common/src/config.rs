//! Common configuration types for HLS streamer components.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default log level when neither `RUST_LOG` nor `LOG_LEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors produced while reading shared configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlagError {
    #[error("Invalid boolean value for {name}: {value}")]
    InvalidBool { name: String, value: String },
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Enable JSON-formatted logs
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Read `LOG_LEVEL` and `LOG_JSON` from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::InvalidBool` if `LOG_JSON` is not a recognised boolean.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, FlagError> {
        let log_level = vars
            .get("LOG_LEVEL")
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Ok(Self {
            log_level,
            json_logs: bool_flag(vars, "LOG_JSON")?,
        })
    }
}

/// Parse a boolean feature flag.
///
/// Accepts `true/1/yes/on/t/y` and `false/0/no/off/f/n` (case-insensitive,
/// surrounding whitespace ignored). Returns `None` for anything else.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

/// Look up a boolean flag in a variable map. An absent variable is `false`.
///
/// # Errors
///
/// Returns `FlagError::InvalidBool` when the variable is present but not a
/// recognised boolean.
pub fn bool_flag(vars: &HashMap<String, String>, name: &str) -> Result<bool, FlagError> {
    match vars.get(name) {
        None => Ok(false),
        Some(raw) => parse_bool(raw).ok_or_else(|| FlagError::InvalidBool {
            name: name.to_string(),
            value: raw.clone(),
        }),
    }
}
