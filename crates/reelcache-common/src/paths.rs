//! Path utilities for detecting media files and probing file access.
//!
//! Extension checks are pure string operations. [`check_access`] is the one
//! place that touches the filesystem; it reports the expected "file is not
//! there" outcome as a value instead of an error.

use std::io::ErrorKind;
use std::path::Path;

/// Video extensions accepted when no explicit list is configured.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "ogv", "ogg", "avi", "mkv", "mov", "wmv", "flv", "mts", "m2ts", "mpg", "mpeg",
    "3gp", "m4v", "vob", "ts",
];

/// Check if a path's lowercase extension is in `extensions`.
///
/// Entries in `extensions` are matched case-insensitively and may be given
/// with or without a leading dot.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use reelcache_common::paths::is_media_of_kind;
///
/// assert!(is_media_of_kind(Path::new("clip.MOV"), &["mov", ".mp4"]));
/// assert!(is_media_of_kind(Path::new("/a/b/clip.mp4"), &["mov", ".mp4"]));
/// assert!(!is_media_of_kind(Path::new("notes.txt"), &["mov"]));
/// ```
pub fn is_media_of_kind<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();

    extensions.iter().any(|candidate| {
        let candidate = candidate.as_ref();
        candidate
            .strip_prefix('.')
            .unwrap_or(candidate)
            .eq_ignore_ascii_case(&ext)
    })
}

/// Check if a path has one of the default video extensions.
pub fn is_video_file(path: &Path) -> bool {
    is_media_of_kind(path, VIDEO_EXTENSIONS)
}

/// Get the list of default video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Outcome of [`check_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    /// A regular file that could be opened for reading.
    Readable {
        /// Size in bytes.
        len: u64,
    },
    /// Nothing exists at the path, or it is not a regular file.
    NotFound,
    /// The file exists but could not be opened for reading.
    Denied,
}

impl FileAccess {
    /// Whether the file can be read.
    pub fn is_readable(&self) -> bool {
        matches!(self, Self::Readable { .. })
    }

    /// Whether the file can be read and holds at least one byte.
    pub fn is_non_empty(&self) -> bool {
        matches!(self, Self::Readable { len } if *len > 0)
    }
}

/// Probe whether `path` is a readable regular file.
///
/// Errors other than "not found" are reported as [`FileAccess::Denied`]:
/// callers deciding on cache validity must fail closed.
pub async fn check_access(path: &Path) -> FileAccess {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return FileAccess::NotFound,
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "file not readable");
            return FileAccess::Denied;
        }
    };

    match file.metadata().await {
        Ok(meta) if meta.is_file() => FileAccess::Readable { len: meta.len() },
        Ok(_) => FileAccess::NotFound,
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "failed to stat file");
            FileAccess::Denied
        }
    }
}
