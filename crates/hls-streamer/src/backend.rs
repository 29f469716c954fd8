//! Transcoder backend selection and command construction.
//!
//! Two backends are supported. GStreamer is the primary one; FFmpeg is an
//! alternative with a different log dialect and metric set. The argument
//! vectors below are the compatibility contract with each binary and must
//! stay byte-for-byte stable.

use crate::dialect::{FfmpegDialect, GstreamerDialect, LogDialect};
use crate::settings::TranscodeSettings;
use common::secret::ExposeSecret;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// GStreamer launcher binary.
pub const GSTREAMER_PROGRAM: &str = "gst-launch-1.0";

/// FFmpeg binary.
pub const FFMPEG_PROGRAM: &str = "ffmpeg";

/// Playlist file name inside the output directory.
pub const PLAYLIST_FILE: &str = "stream.m3u8";

/// Segment file name pattern inside the output directory.
pub const SEGMENT_PATTERN: &str = "segment%05d.ts";

/// URL path under which the HLS server exposes the output directory.
pub const HLS_ROUTE: &str = "/hls_stream";

static GSTREAMER_DIALECT: GstreamerDialect = GstreamerDialect;
static FFMPEG_DIALECT: FfmpegDialect = FfmpegDialect;

/// Which transcoder binary drives the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscoderBackend {
    /// `gst-launch-1.0` with `rtspsrc ! ... ! hlssink2` (packet metrics).
    #[default]
    Gstreamer,
    /// `ffmpeg -f hls` (frame metrics).
    Ffmpeg,
}

impl TranscoderBackend {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TranscoderBackend::Gstreamer => "gstreamer",
            TranscoderBackend::Ffmpeg => "ffmpeg",
        }
    }

    /// The log dialect this backend's output is written in.
    #[must_use]
    pub fn dialect(&self) -> &'static dyn LogDialect {
        match self {
            TranscoderBackend::Gstreamer => &GSTREAMER_DIALECT,
            TranscoderBackend::Ffmpeg => &FFMPEG_DIALECT,
        }
    }

    /// Build the full argument vector for this backend.
    ///
    /// `http_port` is the port of the HLS server; GStreamer embeds it in the
    /// playlist root.
    #[must_use]
    pub fn command(&self, settings: &TranscodeSettings, http_port: u16) -> TranscoderCommand {
        match self {
            TranscoderBackend::Gstreamer => gstreamer_command(settings, http_port),
            TranscoderBackend::Ffmpeg => ffmpeg_command(settings),
        }
    }
}

impl fmt::Display for TranscoderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranscoderBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gstreamer" | "gst" => Ok(TranscoderBackend::Gstreamer),
            "ffmpeg" => Ok(TranscoderBackend::Ffmpeg),
            other => Err(format!("unknown transcoder backend '{other}'")),
        }
    }
}

/// A program plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscoderCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TranscoderCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Space-joined command line with the token segment of the source URL
    /// masked, for logs. Other text is left alone even if it happens to
    /// contain the token.
    #[must_use]
    pub fn redacted(&self, settings: &TranscodeSettings) -> String {
        let source = source_url(settings);
        let masked = format!("{}/{REDACTED}", settings.url);
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|arg| arg.replace(&source, &masked)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

const REDACTED: &str = "[REDACTED]";

/// Source URL with the access token appended as the last path segment.
fn source_url(settings: &TranscodeSettings) -> String {
    format!(
        "{}/{}",
        settings.url,
        settings.access_token.expose_secret()
    )
}

fn output_path(directory: &Path, file: &str) -> String {
    directory.join(file).to_string_lossy().into_owned()
}

fn gstreamer_command(settings: &TranscodeSettings, http_port: u16) -> TranscoderCommand {
    let segment_location = output_path(&settings.directory, SEGMENT_PATTERN);
    let playlist_location = output_path(&settings.directory, PLAYLIST_FILE);

    TranscoderCommand::new(
        GSTREAMER_PROGRAM,
        [
            "-v".to_string(),
            "rtspsrc".to_string(),
            format!("location={}", source_url(settings)),
            "tls-validation-flags=0".to_string(),
            "protocols=GST_RTSP_LOWER_TRANS_TCP".to_string(),
            "!".to_string(),
            "rtph264depay".to_string(),
            "!".to_string(),
            "h264parse".to_string(),
            "!".to_string(),
            "hlssink2".to_string(),
            format!("location={segment_location}"),
            format!("playlist-location={playlist_location}"),
            format!("playlist-root=http://localhost:{http_port}{HLS_ROUTE}/"),
            format!("max-files={}", settings.list_size),
            format!("target-duration={}", settings.segment_duration),
        ],
    )
}

fn ffmpeg_command(settings: &TranscodeSettings) -> TranscoderCommand {
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "info".to_string(),
        "-rtsp_transport".to_string(),
        "tcp".to_string(),
        "-i".to_string(),
        source_url(settings),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-f".to_string(),
        "hls".to_string(),
        "-hls_time".to_string(),
        settings.segment_duration.to_string(),
        "-hls_list_size".to_string(),
        settings.list_size.to_string(),
    ];
    if !settings.flags.is_empty() {
        args.push("-hls_flags".to_string());
        args.push(settings.flags.to_string());
    }
    args.push("-hls_segment_filename".to_string());
    args.push(output_path(&settings.directory, SEGMENT_PATTERN));
    args.push(output_path(&settings.directory, PLAYLIST_FILE));

    TranscoderCommand::new(FFMPEG_PROGRAM, args)
}
