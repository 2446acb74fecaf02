use reelcache_common::paths::video_extensions;
use reelcache_common::TranscodingProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub transcoding: TranscodingProfile,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Source extensions treated as video (case-insensitive, no dot).
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            transcoding: TranscodingProfile::default(),
            executor: ExecutorConfig::default(),
            tools: ToolsConfig::default(),
            video_extensions: default_video_extensions(),
        }
    }
}

fn default_video_extensions() -> Vec<String> {
    video_extensions().iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Root of the source media tree.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Root under which the source tree is mirrored with transcoded artifacts.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("./media")
}
fn default_artifact_root() -> PathBuf {
    PathBuf::from("./transcoded")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            artifact_root: default_artifact_root(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutorConfig {
    /// Number of transcodes allowed to run at once (default: 1)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Path to ffmpeg (PATH lookup when unset)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to ffprobe (PATH lookup when unset)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Upper bound for a single transcode in seconds (default: 6 hours)
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,
}

fn default_transcode_timeout() -> u64 {
    reelcache_av::transcode::DEFAULT_TRANSCODE_TIMEOUT.as_secs()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            transcode_timeout_secs: default_transcode_timeout(),
        }
    }
}
