//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which lays out a source root and an artifact
//! root in a temp dir and builds a [`ConversionManager`] over a live
//! [`ConfigStore`] with fake probe and transcode collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reelcache::config::{Config, ConfigStore};
use reelcache::conversion::ConversionManager;
use reelcache_av::{Prober, Transcoder};
use reelcache_common::artifact::PostfixCodec;
use reelcache_common::{JobDescription, SourceDescriptor, TranscodingProfile};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Prober returning the same characteristics for every readable file.
pub struct FakeProber {
    pub descriptor: Mutex<(u64, f64, u32)>,
    pub calls: AtomicUsize,
    pub failing: Mutex<HashSet<PathBuf>>,
}

impl Default for FakeProber {
    fn default() -> Self {
        Self {
            descriptor: Mutex::new((3000 * 1024, 24.0, 1080)),
            calls: AtomicUsize::new(0),
            failing: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, path: &Path) -> reelcache_av::Result<SourceDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().contains(path) {
            return Err(reelcache_av::Error::parse_error("fake", "no video stream found"));
        }

        let (bit_rate, fps, height) = *self.descriptor.lock();
        Ok(SourceDescriptor {
            path: path.to_path_buf(),
            bit_rate,
            fps,
            height,
        })
    }
}

/// Transcoder that writes a small artifact and records what it saw.
#[derive(Default)]
pub struct CountingTranscoder {
    pub jobs: Mutex<Vec<JobDescription>>,
    pub current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
    pub delay: Mutex<Option<Duration>>,
    pub failing: Mutex<HashSet<PathBuf>>,
}

impl CountingTranscoder {
    pub fn runs(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn sources(&self) -> Vec<PathBuf> {
        self.jobs.lock().iter().map(|j| j.source.clone()).collect()
    }
}

#[async_trait]
impl Transcoder for CountingTranscoder {
    async fn run(&self, job: JobDescription) -> reelcache_av::Result<()> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.jobs.lock().push(job.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.lock().contains(&job.source) {
            Err(reelcache_av::Error::tool_failed("ffmpeg", "Conversion failed!"))
        } else {
            tokio::fs::write(&job.output.path, b"transcoded")
                .await
                .map_err(reelcache_av::Error::from)
        };

        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Test harness wrapping a [`ConversionManager`] over temp roots.
pub struct TestHarness {
    pub dir: TempDir,
    pub source_root: PathBuf,
    pub artifact_root: PathBuf,
    pub store: Arc<ConfigStore>,
    pub prober: Arc<FakeProber>,
    pub transcoder: Arc<CountingTranscoder>,
    pub manager: ConversionManager,
}

impl TestHarness {
    /// Harness with a 2048k/h264/720p/mp4 profile at 30 fps and one slot.
    pub fn new() -> Self {
        Self::with_concurrency(1)
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let source_root = dir.path().join("media");
        let artifact_root = dir.path().join("transcoded");
        std::fs::create_dir_all(&source_root).expect("failed to create source root");

        let mut config = Config::default();
        config.paths.source_root = source_root.clone();
        config.paths.artifact_root = artifact_root.clone();
        config.transcoding = TranscodingProfile {
            bit_rate: 2048 * 1024,
            fps: 30,
            ..TranscodingProfile::default()
        };
        config.executor.concurrency = concurrency;

        let store = Arc::new(ConfigStore::new(config, None));
        let prober = Arc::new(FakeProber::default());
        let transcoder = Arc::new(CountingTranscoder::default());
        let manager = ConversionManager::new(
            store.clone(),
            Arc::new(PostfixCodec::new(&source_root, &artifact_root)),
            prober.clone(),
            transcoder.clone(),
            concurrency,
        );

        Self {
            dir,
            source_root,
            artifact_root,
            store,
            prober,
            transcoder,
            manager,
        }
    }

    /// Create a source file at `relative` under the source root.
    pub fn add_source(&self, relative: &str) -> PathBuf {
        let path = self.source_root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create source dir");
        }
        std::fs::write(&path, b"source").expect("failed to write source");
        path
    }

    /// Change the transcoding profile through the config store.
    pub fn update_profile(&self, f: impl FnOnce(&mut TranscodingProfile)) {
        let mut profile = self.store.snapshot().transcoding;
        f(&mut profile);
        self.store.set_profile(profile).expect("invalid profile");
    }
}
