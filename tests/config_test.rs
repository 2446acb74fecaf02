//! Integration tests for configuration loading and live profile updates.

use reelcache::config::{self, ConfigStore};
use reelcache::conversion::ConversionManager;
use reelcache_av::{FfmpegTranscoder, FfprobeProber};
use reelcache_common::artifact::PostfixCodec;
use std::sync::Arc;

fn write_config(path: &std::path::Path, root: &std::path::Path, resolution: u32) {
    let body = format!(
        r#"
[paths]
source_root = "{src}"
artifact_root = "{dst}"

[transcoding]
codec = "vp9"
format = "webm"
bit_rate = 1048576
resolution = {resolution}
"#,
        src = root.join("media").display(),
        dst = root.join("transcoded").display(),
    );
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn reloaded_profile_changes_artifact_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reelcache.toml");
    write_config(&path, dir.path(), 480);

    let cfg = config::load_config(&path).unwrap();
    let codec = PostfixCodec::new(&cfg.paths.source_root, &cfg.paths.artifact_root);
    let store = Arc::new(ConfigStore::new(cfg, Some(path.clone())));
    let manager = ConversionManager::new(
        store.clone(),
        Arc::new(codec),
        Arc::new(FfprobeProber::default()),
        Arc::new(FfmpegTranscoder::default()),
        1,
    );

    let source = dir.path().join("media/clip.mov");
    let before = manager.artifact_path(&source).unwrap();
    assert_eq!(before, dir.path().join("transcoded/clip.mov_1024kvp9480.webm"));

    write_config(&path, dir.path(), 720);
    store.reload().unwrap();

    let after = manager.artifact_path(&source).unwrap();
    assert_eq!(after, dir.path().join("transcoded/clip.mov_1024kvp9720.webm"));
}

#[test]
fn invalid_file_is_rejected_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reelcache.toml");
    std::fs::write(&path, "[executor]\nconcurrency = 0\n").unwrap();

    let err = config::load_config(&path).unwrap_err();
    assert!(err.to_string().contains("concurrency"));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = config::load_config_or_default(Some(&dir.path().join("nope.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read config file"));
}

#[test]
fn artifact_root_inside_source_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reelcache.toml");
    let body = format!(
        "[paths]\nsource_root = \"{src}\"\nartifact_root = \"{src}/.transcoded\"\n",
        src = dir.path().join("media").display(),
    );
    std::fs::write(&path, body).unwrap();

    let err = config::load_config(&path).unwrap_err();
    assert!(err.to_string().contains("must not contain each other"));
}
