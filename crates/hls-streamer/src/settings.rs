//! Validated transcoding settings.
//!
//! `TranscodeSettings` is built once at startup and never mutated. Invalid
//! values are rejected here, before any process or registry is touched.

use crate::config::ConfigError;
use common::secret::SecretString;
use std::fmt;
use std::path::PathBuf;

/// Default output directory for segments and playlist.
pub const DEFAULT_DIRECTORY: &str = "hls_stream";

/// Default segment duration in seconds.
pub const DEFAULT_SEGMENT_DURATION: u32 = 2;

/// Default playlist window (segment count).
pub const DEFAULT_LIST_SIZE: u32 = 3;

/// Default segment retention flags.
pub const DEFAULT_FLAGS: &str = "delete_segments";

/// Accepted source URL schemes.
pub const RTSP_SCHEMES: [&str; 2] = ["rtsp://", "rtsps://"];

/// Segment retention flag set (`+`-separated on the wire, e.g.
/// `delete_segments+append_list`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HlsFlags(Vec<String>);

impl HlsFlags {
    /// Parse a `+`-separated flag list. Empty items are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a flag contains characters
    /// other than ASCII alphanumerics and `_`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut flags = Vec::new();
        for flag in raw.split('+').map(str::trim).filter(|f| !f.is_empty()) {
            if !flag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ConfigError::InvalidValue(format!(
                    "HLS_FLAGS contains invalid flag '{flag}'"
                )));
            }
            if !flags.iter().any(|f| f == flag) {
                flags.push(flag.to_string());
            }
        }
        Ok(Self(flags))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn contains(&self, flag: &str) -> bool {
        self.0.iter().any(|f| f == flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for HlsFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("+"))
    }
}

/// Transcoding settings: where to read the stream from and how to segment it.
///
/// The access token is a `SecretString`, so `Debug` output is safe to log.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    /// RTSP source URL (`rtsp://` or `rtsps://`), without the access token.
    pub url: String,
    /// Access token appended to the URL path.
    pub access_token: SecretString,
    /// Output directory for segments and playlist.
    pub directory: PathBuf,
    /// Segment duration in seconds (>= 1).
    pub segment_duration: u32,
    /// Number of segments kept in the playlist (> 0).
    pub list_size: u32,
    /// Segment retention flags.
    pub flags: HlsFlags,
}

impl TranscodeSettings {
    /// Create settings with default segmenting parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the URL scheme is not RTSP.
    pub fn new(url: impl Into<String>, access_token: SecretString) -> Result<Self, ConfigError> {
        let settings = Self {
            url: url.into(),
            access_token,
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            segment_duration: DEFAULT_SEGMENT_DURATION,
            list_size: DEFAULT_LIST_SIZE,
            flags: HlsFlags::parse(DEFAULT_FLAGS)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    #[must_use]
    pub fn with_segment_duration(mut self, seconds: u32) -> Self {
        self.segment_duration = seconds;
        self
    }

    #[must_use]
    pub fn with_list_size(mut self, list_size: u32) -> Self {
        self.list_size = list_size;
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: HlsFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Check every field against its constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !RTSP_SCHEMES.iter().any(|scheme| self.url.starts_with(scheme)) {
            return Err(ConfigError::InvalidValue(
                "Invalid RTSP URL format: scheme must be rtsp:// or rtsps://".to_string(),
            ));
        }
        if self.segment_duration < 1 {
            return Err(ConfigError::InvalidValue(
                "HLS_TIME must be at least 1 second".to_string(),
            ));
        }
        if self.list_size == 0 {
            return Err(ConfigError::InvalidValue(
                "HLS_LIST_SIZE must be greater than 0".to_string(),
            ));
        }
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "HLS_DIRECTORY must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token() -> SecretString {
        SecretString::from("token")
    }

    #[test]
    fn test_new_applies_defaults() {
        let settings = TranscodeSettings::new("rtsp://example.com:8554", token()).unwrap();

        assert_eq!(settings.directory, PathBuf::from(DEFAULT_DIRECTORY));
        assert_eq!(settings.segment_duration, 2);
        assert_eq!(settings.list_size, 3);
        assert!(settings.flags.contains("delete_segments"));
    }

    #[test]
    fn test_rtsps_scheme_accepted() {
        assert!(TranscodeSettings::new("rtsps://secure.example.com", token()).is_ok());
    }

    #[test]
    fn test_http_scheme_rejected() {
        let result = TranscodeSettings::new("http://example.com", token());
        assert!(matches!(result, Err(ConfigError::InvalidValue(msg)) if msg.contains("RTSP URL")));
    }

    #[test]
    fn test_zero_segment_duration_rejected() {
        let settings = TranscodeSettings::new("rtsp://example.com", token())
            .unwrap()
            .with_segment_duration(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_list_size_rejected() {
        let settings = TranscodeSettings::new("rtsp://example.com", token())
            .unwrap()
            .with_list_size(0);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_access_token() {
        let settings =
            TranscodeSettings::new("rtsp://example.com", SecretString::from("s3cr3t")).unwrap();
        let debug = format!("{settings:?}");
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn test_flags_parse_and_display() {
        let flags = HlsFlags::parse("delete_segments+append_list+delete_segments").unwrap();
        assert_eq!(flags.to_string(), "delete_segments+append_list");
        assert_eq!(flags.iter().count(), 2);

        assert!(HlsFlags::parse("").unwrap().is_empty());
        assert!(HlsFlags::parse("delete segments").is_err());
    }
}
