//! Pre-configured test data for streamer tests.
//!
//! Provides:
//! - Transcode settings pointing at a test directory
//! - Environment maps for `Config::from_vars`
//! - Log lines captured from real GStreamer and FFmpeg runs

use common::secret::SecretString;
use hls_streamer::settings::TranscodeSettings;
use std::collections::HashMap;
use std::path::Path;

/// Stream URL used by the fixtures.
pub const TEST_RTSP_URL: &str = "rtsp://cam.example.com:8554/live";

/// Access token used by the fixtures.
pub const TEST_ACCESS_TOKEN: &str = "tok123";

/// Identity derived from `TEST_RTSP_URL` and `TEST_ACCESS_TOKEN`.
pub const TEST_IDENTITY: &str = "com_tok";

/// `rtspsrc` stats line: 16247 received, 1371 lost, 45 packets/s.
pub const GST_STATS_LINE: &str = "/GstPipeline:pipeline0/GstRTSPSrc:rtspsrc0/GstRtpBin:manager/\
GstRtpSession:rtpsession0: stats = application/x-rtp-source-stats, ssrc=(uint)3735928559, \
internal=(boolean)false, validated=(boolean)true, received-bye=(boolean)false, \
is-csrc=(boolean)false, is-sender=(boolean)true, seqnum-base=(int)-1, clock-rate=(int)90000, \
octets-received=(guint64)17894512, packets-received=(guint64)16247, bitrate=(guint64)2103448, \
packets-lost=(int)1371, jitter=(uint)1371, recv-packet-rate=(uint)45, have-sr=(boolean)true\n";

/// FFmpeg progress line: 25 fps, 3 dropped frames.
pub const FFMPEG_PROGRESS_LINE: &str =
    "frame=  100 fps= 25 q=-1.0 size=N/A time=00:00:04.00 bitrate=N/A dup=0 drop=3 speed=1.01x\n";

/// Settings for `TEST_RTSP_URL` writing into `directory`.
pub fn test_settings(directory: &Path) -> TranscodeSettings {
    TranscodeSettings::new(TEST_RTSP_URL, SecretString::from(TEST_ACCESS_TOKEN))
        .expect("fixture settings are valid")
        .with_directory(directory)
}

/// Builder for environment maps passed to `Config::from_vars`.
#[derive(Debug, Clone)]
pub struct TestEnv {
    vars: HashMap<String, String>,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Minimal valid environment (URL and token only).
    #[must_use]
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        vars.insert("RTSP_URL".to_string(), TEST_RTSP_URL.to_string());
        vars.insert(
            "RTSP_ACCESS_TOKEN".to_string(),
            TEST_ACCESS_TOKEN.to_string(),
        );
        Self { vars }
    }

    /// Set a variable.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Remove a variable.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.vars.remove(name);
        self
    }

    #[must_use]
    pub fn build(self) -> HashMap<String, String> {
        self.vars
    }
}
