//! HLS streamer configuration.
//!
//! Configuration is loaded from environment variables once in `main` and
//! passed explicitly to every component. The RTSP access token is redacted
//! in Debug output.

use crate::backend::TranscoderBackend;
use crate::settings::{
    HlsFlags, TranscodeSettings, DEFAULT_DIRECTORY, DEFAULT_FLAGS, DEFAULT_LIST_SIZE,
    DEFAULT_SEGMENT_DURATION,
};
use common::config::{bool_flag, FlagError, ObservabilityConfig};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HLS HTTP port (also the port advertised in the registry).
pub const DEFAULT_HTTP_PORT: u16 = 8081;

/// Default Prometheus metrics port.
pub const DEFAULT_PROM_PORT: u16 = 9090;

/// Default etcd host.
pub const DEFAULT_ETCD_HOST: &str = "localhost";

/// Default etcd client port.
pub const DEFAULT_ETCD_PORT: u16 = 2379;

/// Default registry key prefix (key = `/services/<prefix><identity>`).
pub const DEFAULT_SERVICE_PREFIX: &str = "hls_streamer_";

/// Default bound on shutdown deregistration.
pub const DEFAULT_DEREGISTER_TIMEOUT_SECONDS: u64 = 5;

/// Default SIGTERM grace period before the transcoder is killed.
pub const DEFAULT_STOP_GRACE_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<FlagError> for ConfigError {
    fn from(err: FlagError) -> Self {
        ConfigError::InvalidValue(err.to_string())
    }
}

/// HLS streamer configuration.
#[derive(Clone)]
pub struct Config {
    /// Validated transcoding settings (source, output, segmenting).
    pub settings: TranscodeSettings,

    /// Which transcoder binary (and log dialect) to use.
    pub backend: TranscoderBackend,

    /// Register this instance in etcd for discovery.
    pub enable_discovery: bool,

    /// Export transcoder gauges via Prometheus.
    pub enable_prometheus: bool,

    /// HLS HTTP port (default: 8081).
    pub http_port: u16,

    /// Prometheus metrics port (default: 9090).
    pub prom_port: u16,

    /// etcd host (default: "localhost").
    pub etcd_host: String,

    /// etcd client port (default: 2379).
    pub etcd_port: u16,

    /// Registry key prefix (default: "hls_streamer_").
    pub service_prefix: String,

    /// Address to advertise; resolved from the host name when unset.
    pub advertise_ip: Option<IpAddr>,

    /// Upper bound on deregistration during shutdown.
    pub deregister_timeout: Duration,

    /// Grace period between SIGTERM and SIGKILL for the transcoder.
    pub stop_grace: Duration,

    /// Logging configuration.
    pub observability: ObservabilityConfig,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.settings.url)
            .field("access_token", &"[REDACTED]")
            .field("directory", &self.settings.directory)
            .field("segment_duration", &self.settings.segment_duration)
            .field("list_size", &self.settings.list_size)
            .field("flags", &self.settings.flags.to_string())
            .field("backend", &self.backend)
            .field("enable_discovery", &self.enable_discovery)
            .field("enable_prometheus", &self.enable_prometheus)
            .field("http_port", &self.http_port)
            .field("prom_port", &self.prom_port)
            .field("etcd_host", &self.etcd_host)
            .field("etcd_port", &self.etcd_port)
            .field("service_prefix", &self.service_prefix)
            .field("advertise_ip", &self.advertise_ip)
            .field("deregister_timeout", &self.deregister_timeout)
            .field("stop_grace", &self.stop_grace)
            .field("observability", &self.observability)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let url = vars
            .get("RTSP_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("RTSP_URL".to_string()))?
            .clone();

        let access_token = SecretString::from(
            vars.get("RTSP_ACCESS_TOKEN")
                .ok_or_else(|| ConfigError::MissingEnvVar("RTSP_ACCESS_TOKEN".to_string()))?
                .clone(),
        );

        let directory = vars
            .get("HLS_DIRECTORY")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DIRECTORY.to_string());

        let segment_duration = parse_var(vars, "HLS_TIME", DEFAULT_SEGMENT_DURATION)?;
        let list_size = parse_var(vars, "HLS_LIST_SIZE", DEFAULT_LIST_SIZE)?;
        let flags = HlsFlags::parse(
            vars.get("HLS_FLAGS")
                .map_or(DEFAULT_FLAGS, String::as_str),
        )?;

        let settings = TranscodeSettings {
            url,
            access_token,
            directory: PathBuf::from(directory),
            segment_duration,
            list_size,
            flags,
        };
        settings.validate()?;

        let backend = parse_var(vars, "TRANSCODER_BACKEND", TranscoderBackend::default())?;

        let enable_discovery = bool_flag(vars, "FEATURE_ENABLE_DISCOVERY")?;
        let enable_prometheus = bool_flag(vars, "FEATURE_ENABLE_PROMETHEUS")?;

        let http_port = parse_var(vars, "PORT", DEFAULT_HTTP_PORT)?;
        let prom_port = parse_var(vars, "PROM_PORT", DEFAULT_PROM_PORT)?;

        let etcd_host = vars
            .get("ETCD_HOST")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ETCD_HOST.to_string());
        let etcd_port = parse_var(vars, "ETCD_PORT", DEFAULT_ETCD_PORT)?;

        let service_prefix = vars
            .get("SERVICE_PREFIX")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SERVICE_PREFIX.to_string());

        let advertise_ip = match vars.get("ADVERTISE_IP") {
            Some(raw) => Some(raw.trim().parse::<IpAddr>().map_err(|e| {
                ConfigError::InvalidValue(format!("ADVERTISE_IP '{raw}' is not an IP address: {e}"))
            })?),
            None => None,
        };

        let deregister_timeout = Duration::from_secs(parse_var(
            vars,
            "DEREGISTER_TIMEOUT_SECONDS",
            DEFAULT_DEREGISTER_TIMEOUT_SECONDS,
        )?);
        let stop_grace = Duration::from_secs(parse_var(
            vars,
            "TRANSCODER_STOP_GRACE_SECONDS",
            DEFAULT_STOP_GRACE_SECONDS,
        )?);

        let observability = ObservabilityConfig::from_vars(vars)?;

        Ok(Config {
            settings,
            backend,
            enable_discovery,
            enable_prometheus,
            http_port,
            prom_port,
            etcd_host,
            etcd_port,
            service_prefix,
            advertise_ip,
            deregister_timeout,
            stop_grace,
            observability,
        })
    }

    /// etcd endpoint in `host:port` form.
    #[must_use]
    pub fn etcd_endpoint(&self) -> String {
        format!("{}:{}", self.etcd_host, self.etcd_port)
    }
}

/// Parse an optional variable, falling back to `default` when absent.
fn parse_var<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ConfigError::InvalidValue(format!("{name} has invalid value '{raw}': {e}"))
        }),
    }
}
