//! Configuration loading and the live configuration store.

mod store;
mod types;

pub use store::{ConfigStore, ProfileSource};
pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file to use when none is given.
pub const CONFIG_ENV: &str = "REELCACHE_CONFIG";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Locate the config file that [`load_config_or_default`] would use.
pub fn find_config(custom_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = custom_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(shellexpand::tilde(&path).as_ref()));
        }
    }

    let default_paths = [
        "./reelcache.toml",
        "./config.toml",
        "~/.config/reelcache/config.toml",
        "/etc/reelcache/config.toml",
    ];

    default_paths
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Load config from the given path, `$REELCACHE_CONFIG`, default locations,
/// or fall back to the built-in defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    match find_config(custom_path) {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let profile = &config.transcoding;
    if profile.bit_rate == 0 {
        anyhow::bail!("transcoding.bit_rate must be greater than 0");
    }
    if profile.fps == 0 {
        anyhow::bail!("transcoding.fps must be greater than 0");
    }
    if profile.resolution == 0 {
        anyhow::bail!("transcoding.resolution must be greater than 0");
    }

    if config.executor.concurrency == 0 {
        anyhow::bail!("executor.concurrency must be at least 1");
    }

    let (source_root, artifact_root) = (&config.paths.source_root, &config.paths.artifact_root);
    if source_root == artifact_root {
        anyhow::bail!(
            "paths.artifact_root must differ from paths.source_root ({:?})",
            source_root
        );
    }
    // Nested roots would let a directory scan pick up artifacts as sources.
    if artifact_root.starts_with(source_root) || source_root.starts_with(artifact_root) {
        anyhow::bail!(
            "paths.artifact_root ({:?}) and paths.source_root ({:?}) must not contain each other",
            artifact_root,
            source_root
        );
    }

    if !config.paths.source_root.exists() {
        tracing::warn!("Source root does not exist: {:?}", config.paths.source_root);
    }

    if config.video_extensions.is_empty() {
        tracing::warn!("No video extensions configured; directory scans will find nothing");
    }

    Ok(())
}
