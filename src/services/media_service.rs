//! Media inspection and fast-start remuxing.
//!
//! The pipeline only talks to [`MediaTools`]; [`FfmpegTools`] is the
//! production implementation that shells out to `ffprobe` and `ffmpeg`.

use async_trait::async_trait;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Output},
    time::Duration,
};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid media path {path:?}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to execute {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} did not finish within {after:?}")]
    Timeout { tool: &'static str, after: Duration },
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },
    #[error("failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no video stream found")]
    NoStreams,
    #[error("width or height is zero ({width}x{height}), cannot determine aspect ratio")]
    ZeroDimension { width: u32, height: u32 },
}

/// Pixel dimensions of a video stream. Both sides are non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    width: u32,
    height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Result<Self, MediaError> {
        if width == 0 || height == 0 {
            return Err(MediaError::ZeroDimension { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Coarse aspect class. It only survives as the object-key prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    pub fn classify(geometry: Geometry) -> Self {
        match geometry.width.cmp(&geometry.height) {
            std::cmp::Ordering::Greater => Orientation::Landscape,
            std::cmp::Ordering::Less => Orientation::Portrait,
            std::cmp::Ordering::Equal => Orientation::Other,
        }
    }

    pub fn key_prefix(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape-",
            Orientation::Portrait => "portrait-",
            Orientation::Other => "other-",
        }
    }
}

#[async_trait]
pub trait MediaTools: Send + Sync {
    /// Dimensions of the first video stream in `path`.
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError>;

    /// Write a fast-start copy of `path` next to it and return the new path.
    /// Streams are copied, never re-encoded.
    async fn remux_faststart(&self, path: &Path) -> Result<PathBuf, MediaError>;
}

/// Suffix appended to the input path for the remuxed copy.
pub const REMUX_SUFFIX: &str = ".processing";

pub struct FfmpegTools {
    ffprobe_bin: String,
    ffmpeg_bin: String,
    timeout: Duration,
}

impl FfmpegTools {
    pub fn new(ffprobe_bin: impl Into<String>, ffmpeg_bin: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_bin: ffprobe_bin.into(),
            ffmpeg_bin: ffmpeg_bin.into(),
            timeout,
        }
    }

    async fn run(&self, tool: &'static str, command: &mut Command) -> Result<Output, MediaError> {
        let start = std::time::Instant::now();
        command.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| MediaError::Timeout {
                tool,
                after: self.timeout,
            })?
            .map_err(|source| MediaError::Spawn { tool, source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(tool, status = %output.status, %stderr, "media tool failed");
            return Err(MediaError::Failed {
                tool,
                status: output.status,
                stderr,
            });
        }

        debug!(
            tool,
            duration_ms = start.elapsed().as_millis() as u64,
            "media tool finished"
        );
        Ok(output)
    }
}

#[async_trait]
impl MediaTools for FfmpegTools {
    #[tracing::instrument(skip(self), fields(process.executable.name = "ffprobe"))]
    async fn probe(&self, path: &Path) -> Result<Geometry, MediaError> {
        let path = absolute(path).await?;
        let output = self
            .run(
                "ffprobe",
                Command::new(&self.ffprobe_bin)
                    .args(["-v", "error", "-print_format", "json", "-show_streams"])
                    .arg(&path),
            )
            .await?;

        let geometry = parse_probe_output(&output.stdout)?;
        debug!(
            width = geometry.width,
            height = geometry.height,
            "video probe completed"
        );
        Ok(geometry)
    }

    #[tracing::instrument(skip(self), fields(process.executable.name = "ffmpeg"))]
    async fn remux_faststart(&self, path: &Path) -> Result<PathBuf, MediaError> {
        let path = absolute(path).await?;
        let mut processed = path.clone().into_os_string();
        processed.push(REMUX_SUFFIX);
        let processed = PathBuf::from(processed);

        let result = self
            .run(
                "ffmpeg",
                Command::new(&self.ffmpeg_bin)
                    .arg("-y")
                    .arg("-i")
                    .arg(&path)
                    .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
                    .arg(&processed),
            )
            .await;

        if let Err(err) = result {
            // ffmpeg may leave a partial output behind
            let _ = tokio::fs::remove_file(&processed).await;
            return Err(err);
        }

        Ok(processed)
    }
}

async fn absolute(path: &Path) -> Result<PathBuf, MediaError> {
    tokio::fs::canonicalize(path).await.map_err(|source| MediaError::Path {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Extract the first video stream's dimensions from `ffprobe -print_format json -show_streams`.
///
/// Streams without a `codec_type` are treated as video.
pub fn parse_probe_output(stdout: &[u8]) -> Result<Geometry, MediaError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().is_none_or(|t| t == "video"))
        .ok_or(MediaError::NoStreams)?;
    Geometry::new(stream.width, stream.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(w: u32, h: u32) -> Geometry {
        Geometry::new(w, h).unwrap()
    }

    #[test]
    fn classifies_by_strict_comparison() {
        assert_eq!(Orientation::classify(geometry(1920, 1080)), Orientation::Landscape);
        assert_eq!(Orientation::classify(geometry(1080, 1920)), Orientation::Portrait);
        assert_eq!(Orientation::classify(geometry(720, 720)), Orientation::Other);
    }

    #[test]
    fn prefixes_match_orientation() {
        assert_eq!(Orientation::Landscape.key_prefix(), "landscape-");
        assert_eq!(Orientation::Portrait.key_prefix(), "portrait-");
        assert_eq!(Orientation::Other.key_prefix(), "other-");
    }

    #[test]
    fn zero_dimension_is_an_error_not_a_default() {
        assert!(matches!(
            Geometry::new(0, 1080),
            Err(MediaError::ZeroDimension { width: 0, height: 1080 })
        ));
        assert!(Geometry::new(1920, 0).is_err());
    }

    #[test]
    fn parses_first_video_stream() {
        let json = br#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "sample_rate": "48000"},
                {"index": 1, "codec_type": "video", "width": 1920, "height": 1080},
                {"index": 2, "codec_type": "video", "width": 640, "height": 480}
            ]
        }"#;
        assert_eq!(parse_probe_output(json).unwrap(), geometry(1920, 1080));
    }

    #[test]
    fn untyped_stream_counts_as_video() {
        let json = br#"{"streams": [{"width": 1080, "height": 1920}]}"#;
        assert_eq!(parse_probe_output(json).unwrap(), geometry(1080, 1920));
    }

    #[test]
    fn empty_streams_fail() {
        assert!(matches!(
            parse_probe_output(br#"{"streams": []}"#),
            Err(MediaError::NoStreams)
        ));
        assert!(matches!(
            parse_probe_output(br#"{}"#),
            Err(MediaError::NoStreams)
        ));
    }

    #[test]
    fn missing_dimensions_fail() {
        let json = br#"{"streams": [{"codec_type": "video"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::ZeroDimension { .. })
        ));
    }

    #[test]
    fn garbage_output_fails_to_parse() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mp4");
        std::fs::write(&input, b"data").unwrap();

        let tools = FfmpegTools::new(
            "/nonexistent/ffprobe-binary",
            "/nonexistent/ffmpeg-binary",
            Duration::from_secs(5),
        );
        assert!(matches!(
            tools.probe(&input).await,
            Err(MediaError::Spawn { tool: "ffprobe", .. })
        ));
        assert!(matches!(
            tools.remux_faststart(&input).await,
            Err(MediaError::Spawn { tool: "ffmpeg", .. })
        ));
    }

    #[tokio::test]
    async fn missing_input_is_a_path_error() {
        let tools = FfmpegTools::new("ffprobe", "ffmpeg", Duration::from_secs(5));
        assert!(matches!(
            tools.probe(Path::new("/definitely/not/here.mp4")).await,
            Err(MediaError::Path { .. })
        ));
    }
}
