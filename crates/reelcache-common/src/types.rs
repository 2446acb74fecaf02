//! Core type definitions for transcoding profiles, probed sources and jobs.
//!
//! Codec and container enums serialize in lowercase because their names are
//! embedded verbatim in artifact file names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Video codec used for transcoded artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 / AVC.
    #[serde(alias = "libx264")]
    H264,
    /// H.265 / HEVC.
    #[serde(alias = "libx265")]
    H265,
    /// VP8.
    #[serde(alias = "libvpx")]
    Vp8,
    /// VP9.
    #[serde(alias = "libvpx-vp9")]
    Vp9,
}

impl VideoCodec {
    /// The ffmpeg encoder implementing this codec.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
            Self::Vp8 => "libvpx",
            Self::Vp9 => "libvpx-vp9",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "h264"),
            Self::H265 => write!(f, "h265"),
            Self::Vp8 => write!(f, "vp8"),
            Self::Vp9 => write!(f, "vp9"),
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h264" | "libx264" => Ok(Self::H264),
            "h265" | "hevc" | "libx265" => Ok(Self::H265),
            "vp8" | "libvpx" => Ok(Self::Vp8),
            "vp9" | "libvpx-vp9" => Ok(Self::Vp9),
            _ => Err(format!("Invalid video codec: {}", s)),
        }
    }
}

/// Container format of transcoded artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    /// MPEG-4 Part 14.
    Mp4,
    /// WebM (Matroska subset).
    Webm,
}

impl ContainerFormat {
    /// File extension (without dot) for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ContainerFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            _ => Err(format!("Invalid container format: {}", s)),
        }
    }
}

/// Active transcoding configuration.
///
/// The numeric fields are ceilings: sources already below them are passed
/// through unchanged in that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodingProfile {
    /// Target video codec.
    #[serde(default = "default_codec")]
    pub codec: VideoCodec,

    /// Target container format.
    #[serde(default = "default_format")]
    pub format: ContainerFormat,

    /// Maximum video bit rate in bits per second.
    #[serde(default = "default_bit_rate")]
    pub bit_rate: u64,

    /// Maximum frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Maximum output height in pixels.
    #[serde(default = "default_resolution")]
    pub resolution: u32,
}

fn default_codec() -> VideoCodec {
    VideoCodec::H264
}
fn default_format() -> ContainerFormat {
    ContainerFormat::Mp4
}
fn default_bit_rate() -> u64 {
    5 * 1024 * 1024
}
fn default_fps() -> u32 {
    25
}
fn default_resolution() -> u32 {
    720
}

impl Default for TranscodingProfile {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            format: default_format(),
            bit_rate: default_bit_rate(),
            fps: default_fps(),
            resolution: default_resolution(),
        }
    }
}

/// Convert bits per second to KiB/s, rounding half up.
pub fn kib_rounded(bits: u64) -> u64 {
    bits / 1024 + u64::from(bits % 1024 >= 512)
}

impl TranscodingProfile {
    /// Bit rate in KiB/s, rounded half up.
    pub fn bit_rate_kib(&self) -> u64 {
        kib_rounded(self.bit_rate)
    }

    /// Cache key embedded in artifact file names, e.g. `2048kh264720.mp4`.
    ///
    /// Frame rate is not part of the key.
    pub fn postfix(&self) -> String {
        format!(
            "{}k{}{}.{}",
            self.bit_rate_kib(),
            self.codec,
            self.resolution,
            self.format
        )
    }
}

/// Characteristics of a source file, as reported by a prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Path of the probed file.
    pub path: PathBuf,
    /// Overall bit rate in bits per second (0 when unknown).
    pub bit_rate: u64,
    /// Frame rate of the primary video stream (0.0 when unknown).
    pub fps: f64,
    /// Height of the primary video stream in pixels.
    pub height: u32,
}

/// Output half of a [`JobDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Final artifact path.
    pub path: PathBuf,
    pub codec: VideoCodec,
    pub format: ContainerFormat,
    /// Bit rate cap, set only when the source exceeds the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit_rate: Option<u64>,
    /// Frame rate cap, set only when the source exceeds the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    /// Height cap, set only when the source exceeds the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<u32>,
}

/// Everything a transcoder needs to produce one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    /// Source media file.
    pub source: PathBuf,
    pub output: OutputSpec,
}

impl JobDescription {
    /// Build a job for `source`, adding overrides only where the probed
    /// source exceeds the profile ceiling.
    pub fn build(source: &SourceDescriptor, output_path: &Path, profile: &TranscodingProfile) -> Self {
        let mut output = OutputSpec {
            path: output_path.to_path_buf(),
            codec: profile.codec,
            format: profile.format,
            bit_rate: None,
            fps: None,
            resolution: None,
        };

        if source.bit_rate > profile.bit_rate {
            output.bit_rate = Some(profile.bit_rate);
        }
        if source.fps > f64::from(profile.fps) {
            output.fps = Some(profile.fps);
        }
        if profile.resolution < source.height {
            output.resolution = Some(profile.resolution);
        }

        Self {
            source: source.path.clone(),
            output,
        }
    }
}
