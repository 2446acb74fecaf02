//! FFprobe-based source probing.

use super::Prober;
use crate::{Error, Result, ToolCommand};
use async_trait::async_trait;
use reelcache_common::SourceDescriptor;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Probing a healthy file takes well under a second.
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    bit_rate: Option<String>,
}

/// Prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a prober running the given ffprobe binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Override the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> Result<SourceDescriptor> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(Error::file_not_found(path));
        }

        let output = ToolCommand::new(self.program.clone())
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path.as_os_str())
            .timeout(self.timeout)
            .execute()
            .await?;

        let descriptor = parse_ffprobe_json(path, &output.stdout)?;
        tracing::debug!(
            source = %path.display(),
            bit_rate = descriptor.bit_rate,
            fps = descriptor.fps,
            height = descriptor.height,
            "probed source"
        );
        Ok(descriptor)
    }
}

/// Build a [`SourceDescriptor`] from `ffprobe -print_format json` output.
///
/// The first video stream is the primary one. The container bit rate is
/// preferred; the stream bit rate is used when the container omits it.
pub fn parse_ffprobe_json(path: &Path, json: &str) -> Result<SourceDescriptor> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| Error::parse_error("ffprobe", format!("no video stream in {}", path.display())))?;

    let bit_rate = output
        .format
        .as_ref()
        .and_then(|f| f.bit_rate.as_deref())
        .and_then(|b| b.parse::<u64>().ok())
        .or_else(|| video.bit_rate.as_deref().and_then(|b| b.parse().ok()))
        .unwrap_or(0);

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    Ok(SourceDescriptor {
        path: path.to_path_buf(),
        bit_rate,
        fps,
        height: video.height.unwrap_or(0),
    })
}

/// Parse `num/den` or plain frame rates; `0/0` yields `None`.
fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    rate_str.parse().ok()
}
