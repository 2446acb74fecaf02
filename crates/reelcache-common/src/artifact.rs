//! Mapping between source files and their transcoded artifacts.
//!
//! The artifact's file name carries the transcoding profile it was built
//! with, so the filesystem path is the cache index: when the live profile
//! changes, the derived path changes and old artifacts simply stop matching.
//!
//! ```text
//! source_root/2024/trip/clip.mov
//!   -> artifact_root/2024/trip/clip.mov_2048kh264720.mp4
//! ```

use crate::paths::{check_access, FileAccess};
use crate::{Error, Result, TranscodingProfile};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Separator between the source file name and the profile postfix.
const KEY_SEPARATOR: char = '_';

/// Encodes a transcoding profile into artifact paths and decodes it back.
///
/// Implementations must be pure: the same source and profile always yield
/// the same artifact path.
pub trait ArtifactPathCodec: Send + Sync {
    /// Derive the artifact path for `source` under `profile`.
    fn derive_path(&self, source: &Path, profile: &TranscodingProfile) -> Result<PathBuf>;

    /// Recover the source path an artifact was derived from.
    ///
    /// Returns `None` when the artifact path is malformed.
    fn recover_source(&self, artifact: &Path) -> Option<PathBuf>;

    /// Extract the profile key embedded in an artifact path.
    fn postfix_of(&self, artifact: &Path) -> Option<String>;

    /// The key that `profile` produces.
    fn expected_postfix(&self, profile: &TranscodingProfile) -> String {
        profile.postfix()
    }
}

/// Check whether `artifact` was built under `profile` from a source that
/// is still readable.
///
/// Malformed artifact paths and filesystem errors yield `false`.
pub async fn is_valid_artifact<C>(codec: &C, artifact: &Path, profile: &TranscodingProfile) -> bool
where
    C: ArtifactPathCodec + ?Sized,
{
    let Some(postfix) = codec.postfix_of(artifact) else {
        tracing::debug!(artifact = %artifact.display(), "artifact has no cache key");
        return false;
    };

    if postfix != codec.expected_postfix(profile) {
        tracing::debug!(
            artifact = %artifact.display(),
            found = %postfix,
            "artifact built under a different profile"
        );
        return false;
    }

    let Some(source) = codec.recover_source(artifact) else {
        return false;
    };

    match check_access(&source).await {
        FileAccess::Readable { .. } => true,
        access => {
            tracing::debug!(
                artifact = %artifact.display(),
                source = %source.display(),
                ?access,
                "artifact source is gone"
            );
            false
        }
    }
}

/// The `<name>_<postfix>` codec mirroring the source tree under an artifact root.
#[derive(Debug, Clone)]
pub struct PostfixCodec {
    source_root: PathBuf,
    artifact_root: PathBuf,
}

impl PostfixCodec {
    /// Create a codec for the given source and artifact roots.
    pub fn new(source_root: impl Into<PathBuf>, artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            artifact_root: artifact_root.into(),
        }
    }

    /// Split an artifact file name into `(source name, postfix)` at the last separator.
    ///
    /// Works on the raw file name bytes so sources with non-UTF-8 names
    /// round-trip. The postfix itself is always ASCII.
    fn split_name(artifact: &Path) -> Option<(&OsStr, &str)> {
        let name = artifact.file_name()?.as_encoded_bytes();
        let idx = name.iter().rposition(|&b| b == KEY_SEPARATOR as u8)?;
        let (base, postfix) = (&name[..idx], &name[idx + 1..]);
        if base.is_empty() || postfix.is_empty() {
            return None;
        }
        Some((os_str_from_bytes(base)?, std::str::from_utf8(postfix).ok()?))
    }
}

#[cfg(unix)]
fn os_str_from_bytes(bytes: &[u8]) -> Option<&OsStr> {
    use std::os::unix::ffi::OsStrExt;
    Some(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn os_str_from_bytes(bytes: &[u8]) -> Option<&OsStr> {
    std::str::from_utf8(bytes).ok().map(OsStr::new)
}

impl ArtifactPathCodec for PostfixCodec {
    fn derive_path(&self, source: &Path, profile: &TranscodingProfile) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .ok_or_else(|| Error::invalid_input(format!("no file name in {}", source.display())))?;

        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        let relative = parent.strip_prefix(&self.source_root).map_err(|_| {
            Error::invalid_input(format!(
                "{} is outside the source root {}",
                source.display(),
                self.source_root.display()
            ))
        })?;

        let mut name = OsString::from(file_name);
        name.push(KEY_SEPARATOR.to_string());
        name.push(self.expected_postfix(profile));

        Ok(self.artifact_root.join(relative).join(name))
    }

    fn recover_source(&self, artifact: &Path) -> Option<PathBuf> {
        let (base, _) = Self::split_name(artifact)?;
        let relative = artifact.parent()?.strip_prefix(&self.artifact_root).ok()?;
        Some(self.source_root.join(relative).join(base))
    }

    fn postfix_of(&self, artifact: &Path) -> Option<String> {
        Self::split_name(artifact).map(|(_, postfix)| postfix.to_string())
    }
}
