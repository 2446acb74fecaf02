//! Transcoding collaborator.
//!
//! A [`Transcoder`] turns one [`JobDescription`] into an artifact on disk.
//! The shipped implementation drives the ffmpeg CLI and stages its output
//! through a [`Workspace`] so the artifact appears atomically.

use crate::{Result, ToolCommand, Workspace};
use async_trait::async_trait;
use reelcache_common::{ContainerFormat, JobDescription};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default encode timeout: 6 hours.
pub const DEFAULT_TRANSCODE_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

/// Performs a single conversion.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Produce `job.output.path` from `job.source`.
    ///
    /// On error no file may be left at the output path.
    async fn run(&self, job: JobDescription) -> Result<()>;
}

/// Transcoder backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    timeout: Duration,
}

impl FfmpegTranscoder {
    /// Create a transcoder running the given ffmpeg binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TRANSCODE_TIMEOUT,
        }
    }

    /// Override the per-job timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn run(&self, job: JobDescription) -> Result<()> {
        let workspace = Workspace::new(&job.output.path)?;
        let args = ffmpeg_args(&job, workspace.staging_path());

        tracing::info!(
            source = %job.source.display(),
            output = %job.output.path.display(),
            codec = %job.output.codec,
            "transcoding"
        );
        tracing::debug!("FFmpeg args: {:?}", args);

        let started = Instant::now();
        ToolCommand::new(self.program.clone())
            .args(args)
            .timeout(self.timeout)
            .execute()
            .await?;

        let artifact = workspace.commit().await?;
        tracing::info!(
            output = %artifact.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transcode finished"
        );
        Ok(())
    }
}

/// Audio codec paired with each container.
fn audio_encoder(format: ContainerFormat) -> &'static str {
    match format {
        ContainerFormat::Mp4 => "aac",
        ContainerFormat::Webm => "libopus",
    }
}

fn push_pair(args: &mut Vec<OsString>, flag: &str, value: impl Into<OsString>) {
    args.push(flag.into());
    args.push(value.into());
}

/// Build the ffmpeg argument list for `job`, writing to `output`.
///
/// Caps missing from the job are left to ffmpeg, which keeps the source's
/// characteristics for that dimension.
pub fn ffmpeg_args(job: &JobDescription, output: &Path) -> Vec<OsString> {
    let out = &job.output;
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        job.source.clone().into_os_string(),
        "-c:v".into(),
        out.codec.encoder().into(),
    ];

    if let Some(bit_rate) = out.bit_rate {
        push_pair(&mut args, "-b:v", bit_rate.to_string());
    }
    if let Some(fps) = out.fps {
        push_pair(&mut args, "-r", fps.to_string());
    }
    if let Some(height) = out.resolution {
        // -2 keeps the aspect ratio with an even width.
        push_pair(&mut args, "-vf", format!("scale=-2:{height}"));
    }

    push_pair(&mut args, "-c:a", audio_encoder(out.format));

    if out.format == ContainerFormat::Mp4 {
        push_pair(&mut args, "-movflags", "+faststart");
    }

    // The staging file has a `.part` suffix, so the muxer must be explicit.
    push_pair(&mut args, "-f", out.format.extension());
    args.push(output.as_os_str().to_os_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcache_common::{OutputSpec, VideoCodec};

    fn job(bit_rate: Option<u64>, fps: Option<u32>, resolution: Option<u32>) -> JobDescription {
        JobDescription {
            source: PathBuf::from("/media/clip.mov"),
            output: OutputSpec {
                path: PathBuf::from("/cache/clip.mov_2048kh264720.mp4"),
                codec: VideoCodec::H264,
                format: ContainerFormat::Mp4,
                bit_rate,
                fps,
                resolution,
            },
        }
    }

    fn joined(args: &[OsString]) -> String {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_args_without_overrides() {
        let args = joined(&ffmpeg_args(&job(None, None, None), Path::new("/cache/.tmp.part")));
        assert_eq!(
            args,
            "-hide_banner -nostdin -y -i /media/clip.mov -c:v libx264 -c:a aac \
             -movflags +faststart -f mp4 /cache/.tmp.part"
        );
    }

    #[test]
    fn test_args_with_overrides() {
        let args = joined(&ffmpeg_args(
            &job(Some(2_097_152), Some(30), Some(720)),
            Path::new("/cache/.tmp.part"),
        ));
        assert!(args.contains("-b:v 2097152"));
        assert!(args.contains("-r 30"));
        assert!(args.contains("-vf scale=-2:720"));
    }

    #[test]
    fn test_args_webm() {
        let mut j = job(None, None, None);
        j.output.codec = VideoCodec::Vp9;
        j.output.format = ContainerFormat::Webm;
        let args = joined(&ffmpeg_args(&j, Path::new("out.part")));
        assert!(args.contains("-c:v libvpx-vp9"));
        assert!(args.contains("-c:a libopus"));
        assert!(args.contains("-f webm"));
        assert!(!args.contains("faststart"));
    }

    #[tokio::test]
    async fn test_failed_encode_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut j = job(None, None, None);
        j.source = dir.path().join("missing.mov");
        j.output.path = dir.path().join("missing.mov_2048kh264720.mp4");

        // The staged file must be cleaned up even when ffmpeg never starts.
        let transcoder = FfmpegTranscoder::new("nonexistent_ffmpeg_12345");
        assert!(transcoder.run(j.clone()).await.is_err());
        assert!(!j.output.path.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
