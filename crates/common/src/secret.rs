//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. The RTSP access
//! token is the main secret handled by the streamer: it is embedded in the
//! transcoder's input URL and must never reach a log line or a `Debug` dump.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StreamSource {
//!     url: String,
//!     access_token: SecretString, // Debug shows "[REDACTED]"
//! }
//!
//! let source = StreamSource {
//!     url: "rtsp://camera.local:8554".to_string(),
//!     access_token: SecretString::from("tok-123"),
//! };
//!
//! assert!(!format!("{source:?}").contains("tok-123"));
//! assert_eq!(source.access_token.expose_secret(), "tok-123");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("hunter2");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from("token123");
        assert_eq!(secret.expose_secret(), "token123");
    }

    #[test]
    fn test_deserialize() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Source {
            url: String,
            access_token: SecretString,
        }

        let json = r#"{"url": "rtsp://cam", "access_token": "my-secret-value"}"#;
        let source: Source = serde_json::from_str(json).expect("deserialize");

        assert_eq!(source.access_token.expose_secret(), "my-secret-value");

        let debug = format!("{source:?}");
        assert!(!debug.contains("my-secret-value"));
        assert!(debug.contains("REDACTED"));
    }
}
