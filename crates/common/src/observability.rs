//! Process-wide logging initialization.
//!
//! Called exactly once from a binary's `main`. Library code only emits
//! `tracing` events and never touches the subscriber.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the default filter directive.
///
/// `RUST_LOG` takes precedence when set; otherwise `<target>=<level>` for
/// each of `targets`. Events with an explicit `target:` need their own entry
/// next to the crate name.
#[must_use]
pub fn default_directive(targets: &[&str], config: &ObservabilityConfig) -> String {
    targets
        .iter()
        .map(|target| format!("{target}={}", config.log_level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global tracing subscriber.
///
/// JSON output is used when `config.json_logs` is set, plain text otherwise.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(
    targets: &[&str],
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(targets, config).into());

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            json_logs: false,
        };
        assert_eq!(
            default_directive(&["hls_streamer", "hls"], &config),
            "hls_streamer=debug,hls=debug"
        );
    }
}
