//! Deterministic service identity.

use crate::settings::TranscodeSettings;
use common::secret::{ExposeSecret, SecretString};
use std::fmt;

/// Characters taken from each side of the identity.
const PART_LEN: usize = 3;

/// Short token identifying one stream configuration in the registry.
///
/// Built from the tail of the URL's host segment (the text between the first
/// and second `:`) and the head of the access token, e.g. `com_tok` for
/// `rtsp://cam.example.com:8554/live` with token `tok123`. Counted in
/// characters, never bytes; short inputs contribute what they have.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamIdentity(String);

impl StreamIdentity {
    #[must_use]
    pub fn from_parts(url: &str, access_token: &SecretString) -> Self {
        let host_segment = url.split(':').nth(1).unwrap_or_default();
        let tail: String = {
            let mut chars: Vec<char> = host_segment.chars().rev().take(PART_LEN).collect();
            chars.reverse();
            chars.into_iter().collect()
        };
        let head: String = access_token.expose_secret().chars().take(PART_LEN).collect();

        Self(format!("{tail}_{head}"))
    }

    #[must_use]
    pub fn from_settings(settings: &TranscodeSettings) -> Self {
        Self::from_parts(&settings.url, &settings.access_token)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
