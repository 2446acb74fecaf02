//! Source discovery.
//!
//! Expands the paths given to `reelcache convert` into the list of video
//! files to convert. Directories are walked recursively; only files whose
//! extension is in the configured set are kept.

use reelcache_common::paths::is_media_of_kind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Collect video files from `paths`.
///
/// Files named explicitly are kept as given, even when their extension is
/// not in `extensions`; the conversion itself decides whether they are
/// usable. Directory entries are filtered and returned in sorted order.
pub fn collect_sources<S: AsRef<str>>(paths: &[PathBuf], extensions: &[S]) -> Vec<PathBuf> {
    let mut sources = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut found = walk_dir(path, extensions);
            debug!(dir = %path.display(), count = found.len(), "scanned directory");
            sources.append(&mut found);
        } else {
            sources.push(path.clone());
        }
    }

    sources
}

fn walk_dir<S: AsRef<str>>(dir: &Path, extensions: &[S]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if is_media_of_kind(path, extensions) {
            found.push(path.to_path_buf());
        }
    }

    found
}
