//! Conversion orchestration.
//!
//! [`ConversionManager::convert`] is idempotent: the artifact path encodes the
//! profile, so an artifact that already exists at the derived path was built
//! under the current profile and the request is a cache hit.

use super::executor::{TaskAborted, TaskExecutor};
use crate::config::{ConfigStore, ProfileSource};
use reelcache_av::{FfmpegTranscoder, FfprobeProber, Prober, ToolPaths, Transcoder};
use reelcache_common::artifact::{self, ArtifactPathCodec, PostfixCodec};
use reelcache_common::paths::{check_access, is_media_of_kind, FileAccess};
use reelcache_common::JobDescription;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Errors surfaced by [`ConversionManager::convert`].
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The source file does not exist.
    #[error("source not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The source file exists but cannot be read.
    #[error("source not readable: {}", .0.display())]
    SourceUnreadable(PathBuf),

    /// No artifact path could be derived for the source.
    #[error("cannot derive artifact path: {0}")]
    Path(#[from] reelcache_common::Error),

    /// Metadata extraction failed; nothing was queued.
    #[error("probe failed: {0}")]
    Probe(#[source] reelcache_av::Error),

    /// The transcoder reported an error.
    #[error("transcode failed: {0}")]
    Encode(#[source] reelcache_av::Error),

    /// The artifact directory could not be created.
    #[error("failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transcode job died without reporting back.
    #[error(transparent)]
    Aborted(#[from] TaskAborted),
}

/// What [`ConversionManager::convert`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// A valid artifact already existed.
    Cached(PathBuf),
    /// A new artifact was produced.
    Transcoded(PathBuf),
}

impl ConversionOutcome {
    /// Path of the artifact.
    pub fn path(&self) -> &Path {
        match self {
            Self::Cached(p) | Self::Transcoded(p) => p,
        }
    }

    /// Whether the request was served from the cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Conversion manager owning the transcode queue.
pub struct ConversionManager {
    profiles: Arc<dyn ProfileSource>,
    codec: Arc<dyn ArtifactPathCodec>,
    prober: Arc<dyn Prober>,
    executor: TaskExecutor<JobDescription, (), ConversionError>,
}

impl ConversionManager {
    /// Create a manager from its collaborators.
    ///
    /// At most `concurrency` transcodes run at once.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        codec: Arc<dyn ArtifactPathCodec>,
        prober: Arc<dyn Prober>,
        transcoder: Arc<dyn Transcoder>,
        concurrency: usize,
    ) -> Self {
        let executor = TaskExecutor::new(concurrency, move |job: JobDescription| {
            let transcoder = Arc::clone(&transcoder);
            async move { run_job(transcoder.as_ref(), job).await }
        });

        Self {
            profiles,
            codec,
            prober,
            executor,
        }
    }

    /// Create a manager using ffprobe/ffmpeg and the configured roots.
    pub fn from_config(store: Arc<ConfigStore>, tools: &ToolPaths) -> Self {
        let config = store.snapshot();
        let codec = PostfixCodec::new(&config.paths.source_root, &config.paths.artifact_root);
        let prober = FfprobeProber::new(&tools.ffprobe);
        let transcoder = FfmpegTranscoder::new(&tools.ffmpeg)
            .with_timeout(Duration::from_secs(config.tools.transcode_timeout_secs));

        Self::new(
            store,
            Arc::new(codec),
            Arc::new(prober),
            Arc::new(transcoder),
            config.executor.concurrency,
        )
    }

    /// Make sure an up-to-date artifact exists for `source`.
    ///
    /// The profile is read once and used for every step of the request.
    pub async fn convert(&self, source: &Path) -> Result<ConversionOutcome, ConversionError> {
        let profile = self.profiles.profile();
        let artifact = self.codec.derive_path(source, &profile)?;

        if check_access(&artifact).await.is_non_empty() {
            debug!(source = %source.display(), artifact = %artifact.display(), "cache hit");
            return Ok(ConversionOutcome::Cached(artifact));
        }

        match check_access(source).await {
            FileAccess::Readable { .. } => {}
            FileAccess::NotFound => return Err(ConversionError::SourceNotFound(source.to_path_buf())),
            FileAccess::Denied => return Err(ConversionError::SourceUnreadable(source.to_path_buf())),
        }

        let descriptor = self.prober.probe(source).await.map_err(ConversionError::Probe)?;
        let job = JobDescription::build(&descriptor, &artifact, &profile);

        if let Some(dir) = artifact.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ConversionError::CreateDir {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        info!(
            source = %source.display(),
            artifact = %artifact.display(),
            queued = self.executor.queued(),
            "queueing transcode"
        );
        self.executor.execute(job).await?;

        Ok(ConversionOutcome::Transcoded(artifact))
    }

    /// Convert many sources; they share the queue and start in the given order.
    pub async fn convert_all(
        &self,
        sources: Vec<PathBuf>,
    ) -> Vec<(PathBuf, Result<ConversionOutcome, ConversionError>)> {
        let requests = sources.into_iter().map(|source| async move {
            let result = self.convert(&source).await;
            if let Err(ref e) = result {
                warn!(source = %source.display(), error = %e, "conversion failed");
            }
            (source, result)
        });
        futures::future::join_all(requests).await
    }

    /// Artifact path for `source` under the current profile.
    pub fn artifact_path(&self, source: &Path) -> Result<PathBuf, ConversionError> {
        Ok(self.codec.derive_path(source, &self.profiles.profile())?)
    }

    /// Whether `artifact` matches the current profile and its source still exists.
    pub async fn is_valid_artifact(&self, artifact: &Path) -> bool {
        artifact::is_valid_artifact(self.codec.as_ref(), artifact, &self.profiles.profile()).await
    }

    /// Whether `path` has one of the configured video extensions.
    pub fn is_video(&self, path: &Path) -> bool {
        is_media_of_kind(path, &self.profiles.video_extensions())
    }

    /// The transcode queue.
    pub fn executor(&self) -> &TaskExecutor<JobDescription, (), ConversionError> {
        &self.executor
    }
}

/// Executor body: run one job unless an identical job ahead of it in the
/// queue already produced the artifact.
async fn run_job(transcoder: &dyn Transcoder, job: JobDescription) -> Result<(), ConversionError> {
    if check_access(&job.output.path).await.is_non_empty() {
        debug!(artifact = %job.output.path.display(), "artifact appeared while queued");
        return Ok(());
    }

    transcoder.run(job).await.map_err(ConversionError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reelcache_common::{SourceDescriptor, TranscodingProfile};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedProfile(Mutex<TranscodingProfile>);

    impl ProfileSource for FixedProfile {
        fn profile(&self) -> TranscodingProfile {
            self.0.lock().clone()
        }

        fn video_extensions(&self) -> Vec<String> {
            vec!["mov".into(), "mp4".into()]
        }
    }

    struct StubProber {
        fail: bool,
    }

    #[async_trait]
    impl Prober for StubProber {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn probe(&self, path: &Path) -> reelcache_av::Result<SourceDescriptor> {
            if self.fail {
                return Err(reelcache_av::Error::parse_error("stub", "no video stream"));
            }
            Ok(SourceDescriptor {
                path: path.to_path_buf(),
                bit_rate: 3000 * 1024,
                fps: 24.0,
                height: 1080,
            })
        }
    }

    #[derive(Default)]
    struct RecordingTranscoder {
        runs: AtomicUsize,
        jobs: Mutex<Vec<JobDescription>>,
        fail: bool,
    }

    #[async_trait]
    impl Transcoder for RecordingTranscoder {
        async fn run(&self, job: JobDescription) -> reelcache_av::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.jobs.lock().push(job.clone());
            if self.fail {
                return Err(reelcache_av::Error::tool_failed("ffmpeg", "exit status 1"));
            }
            tokio::fs::write(&job.output.path, b"encoded").await?;
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        source_root: PathBuf,
        artifact_root: PathBuf,
        profiles: Arc<FixedProfile>,
        transcoder: Arc<RecordingTranscoder>,
        manager: ConversionManager,
    }

    fn fixture(probe_fails: bool, encode_fails: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let source_root = dir.path().join("media");
        let artifact_root = dir.path().join("transcoded");
        std::fs::create_dir_all(source_root.join("2024")).unwrap();

        let profiles = Arc::new(FixedProfile(Mutex::new(TranscodingProfile {
            bit_rate: 2048 * 1024,
            fps: 30,
            ..TranscodingProfile::default()
        })));
        let transcoder = Arc::new(RecordingTranscoder {
            fail: encode_fails,
            ..Default::default()
        });
        let manager = ConversionManager::new(
            profiles.clone(),
            Arc::new(PostfixCodec::new(&source_root, &artifact_root)),
            Arc::new(StubProber { fail: probe_fails }),
            transcoder.clone(),
            1,
        );

        Fixture {
            _dir: dir,
            source_root,
            artifact_root,
            profiles,
            transcoder,
            manager,
        }
    }

    fn write_source(fx: &Fixture) -> PathBuf {
        let source = fx.source_root.join("2024/clip.mov");
        std::fs::write(&source, b"source bytes").unwrap();
        source
    }

    #[tokio::test]
    async fn test_convert_transcodes_then_hits_cache() {
        let fx = fixture(false, false);
        let source = write_source(&fx);
        let expected = fx.artifact_root.join("2024/clip.mov_2048kh264720.mp4");

        let first = fx.manager.convert(&source).await.unwrap();
        assert_eq!(first, ConversionOutcome::Transcoded(expected.clone()));

        let second = fx.manager.convert(&source).await.unwrap();
        assert_eq!(second, ConversionOutcome::Cached(expected));
        assert_eq!(fx.transcoder.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_job_caps_only_exceeded_limits() {
        let fx = fixture(false, false);
        let source = write_source(&fx);
        fx.manager.convert(&source).await.unwrap();

        let jobs = fx.transcoder.jobs.lock();
        let output = &jobs[0].output;
        assert_eq!(jobs[0].source, source);
        assert_eq!(output.bit_rate, Some(2048 * 1024));
        assert_eq!(output.fps, None);
        assert_eq!(output.resolution, Some(720));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let fx = fixture(false, false);
        let source = fx.source_root.join("2024/missing.mov");

        let err = fx.manager.convert(&source).await.unwrap_err();
        assert_matches!(err, ConversionError::SourceNotFound(p) if p == source);
        assert_eq!(fx.transcoder.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_source_outside_root() {
        let fx = fixture(false, false);
        let err = fx.manager.convert(Path::new("/elsewhere/clip.mov")).await.unwrap_err();
        assert_matches!(err, ConversionError::Path(_));
    }

    #[tokio::test]
    async fn test_probe_failure_queues_nothing() {
        let fx = fixture(true, false);
        let source = write_source(&fx);

        let err = fx.manager.convert(&source).await.unwrap_err();
        assert_matches!(err, ConversionError::Probe(_));
        assert_eq!(fx.transcoder.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_encode_failure_is_reported() {
        let fx = fixture(false, true);
        let source = write_source(&fx);

        let err = fx.manager.convert(&source).await.unwrap_err();
        assert_matches!(err, ConversionError::Encode(_));

        let artifact = fx.manager.artifact_path(&source).unwrap();
        assert!(!artifact.exists());
        assert!(!fx.manager.is_valid_artifact(&artifact).await);
    }

    #[tokio::test]
    async fn test_empty_artifact_is_rebuilt() {
        let fx = fixture(false, false);
        let source = write_source(&fx);
        let artifact = fx.manager.artifact_path(&source).unwrap();
        std::fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        std::fs::write(&artifact, b"").unwrap();

        let outcome = fx.manager.convert(&source).await.unwrap();
        assert!(!outcome.is_cached());
        assert_eq!(fx.transcoder.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_profile_change_derives_new_artifact() {
        let fx = fixture(false, false);
        let source = write_source(&fx);
        let old = fx.manager.convert(&source).await.unwrap();

        fx.profiles.0.lock().resolution = 480;
        assert!(!fx.manager.is_valid_artifact(old.path()).await);

        let new = fx.manager.convert(&source).await.unwrap();
        assert_matches!(new, ConversionOutcome::Transcoded(_));
        assert_ne!(new.path(), old.path());
        assert!(old.path().exists());
        assert_eq!(fx.transcoder.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_duplicate_requests_share_one_encode() {
        let fx = fixture(false, false);
        let source = write_source(&fx);

        let results = fx
            .manager
            .convert_all(vec![source.clone(), source.clone(), source])
            .await;

        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(fx.transcoder.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_is_video_uses_configured_extensions() {
        let fx = fixture(false, false);
        assert!(fx.manager.is_video(Path::new("a/clip.MOV")));
        assert!(!fx.manager.is_video(Path::new("a/clip.mkv")));
        assert!(!fx.manager.is_video(Path::new("a/notes.txt")));
    }
}
