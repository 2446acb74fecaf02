//! Staging area for encoder output.
//!
//! The encoder writes into a hidden temp file next to the final artifact and
//! the file is renamed into place only after the encode succeeded. A failed
//! or interrupted encode therefore never leaves a file at the artifact path,
//! which would otherwise be taken for a cache hit.

use crate::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A temp file that becomes `destination` on [`commit`](Self::commit).
///
/// Dropping an uncommitted workspace deletes the partial output.
///
/// # Example
///
/// ```no_run
/// use reelcache_av::Workspace;
///
/// # async fn example() -> reelcache_av::Result<()> {
/// let workspace = Workspace::new("/srv/transcoded/clip.mov_2048kh264720.mp4")?;
/// // ... encoder writes to workspace.staging_path() ...
/// workspace.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Workspace {
    staging: NamedTempFile,
    destination: PathBuf,
}

impl Workspace {
    /// Create a staging file in the destination's directory.
    ///
    /// The directory must already exist.
    pub fn new<P: AsRef<Path>>(destination: P) -> Result<Self> {
        let destination = destination.as_ref();
        let file_name = destination
            .file_name()
            .ok_or_else(|| Error::InvalidInput(format!("invalid output path: {}", destination.display())))?;
        let mut prefix = OsString::from(".");
        prefix.push(file_name);
        prefix.push(".");
        let dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let staging = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|e| Error::Workspace(format!("failed to create staging file in {}: {e}", dir.display())))?;

        Ok(Self {
            staging,
            destination: destination.to_path_buf(),
        })
    }

    /// Where the encoder should write.
    pub fn staging_path(&self) -> &Path {
        self.staging.path()
    }

    /// Final artifact location.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically move the staged output to its destination.
    pub async fn commit(self) -> Result<PathBuf> {
        let len = tokio::fs::metadata(self.staging.path()).await?.len();
        if len == 0 {
            return Err(Error::Workspace(format!(
                "refusing to commit empty output for {}",
                self.destination.display()
            )));
        }

        let Self {
            staging,
            destination,
        } = self;
        tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            staging.persist(&destination).map_err(|e| {
                Error::Workspace(format!(
                    "failed to move output to {}: {}",
                    destination.display(),
                    e.error
                ))
            })?;
            Ok(destination)
        })
        .await
        .map_err(|e| Error::Workspace(format!("commit task failed: {e}")))?
    }
}
