//! Live configuration shared by the conversion pipeline.
//!
//! The transcoding profile is part of every artifact's cache key, so it is
//! read from the store at the start of each request instead of being copied
//! once at startup.

use super::{load_config, validate_config, Config};
use anyhow::{Context, Result};
use parking_lot::RwLock;
use reelcache_common::TranscodingProfile;
use std::path::{Path, PathBuf};

/// Supplies the transcoding settings in effect right now.
pub trait ProfileSource: Send + Sync {
    /// Snapshot of the active transcoding profile.
    fn profile(&self) -> TranscodingProfile;

    /// Extensions (without dot) recognised as video sources.
    fn video_extensions(&self) -> Vec<String>;
}

/// Mutable runtime configuration with hot-reload support.
#[derive(Debug)]
pub struct ConfigStore {
    config: RwLock<Config>,
    /// Path to the config file for reloads (None = defaults only).
    config_path: Option<PathBuf>,
}

impl ConfigStore {
    /// Build a new store from the given config and optional file path.
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config: RwLock::new(config),
            config_path,
        }
    }

    /// Read a snapshot of the whole configuration.
    pub fn snapshot(&self) -> Config {
        self.config.read().clone()
    }

    /// The file this store reloads from.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Replace the transcoding profile.
    pub fn set_profile(&self, profile: TranscodingProfile) -> Result<()> {
        let mut candidate = self.snapshot();
        candidate.transcoding = profile;
        validate_config(&candidate)?;

        *self.config.write() = candidate;
        tracing::info!("Transcoding profile updated");
        Ok(())
    }

    /// Re-read the config file, keeping the current config on failure.
    ///
    /// Path and executor settings are fixed at startup; a changed value is
    /// stored but only takes effect after a restart.
    pub fn reload(&self) -> Result<()> {
        let Some(ref path) = self.config_path else {
            return Ok(());
        };

        let fresh = load_config(path).with_context(|| format!("Failed to reload {:?}", path))?;

        let mut current = self.config.write();
        if fresh.paths.source_root != current.paths.source_root
            || fresh.paths.artifact_root != current.paths.artifact_root
            || fresh.executor.concurrency != current.executor.concurrency
        {
            tracing::warn!("Path or executor settings changed; restart to apply them");
        }
        if fresh.transcoding != current.transcoding {
            tracing::info!(
                old = %current.transcoding.postfix(),
                new = %fresh.transcoding.postfix(),
                "Transcoding profile changed"
            );
        }
        *current = fresh;
        Ok(())
    }
}

impl ProfileSource for ConfigStore {
    fn profile(&self) -> TranscodingProfile {
        self.config.read().transcoding.clone()
    }

    fn video_extensions(&self) -> Vec<String> {
        self.config.read().video_extensions.clone()
    }
}
