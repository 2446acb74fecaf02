//! Source metadata probing.
//!
//! The conversion pipeline only needs three numbers from a source: overall
//! bit rate, frame rate and height of the primary video stream. They decide
//! which caps end up in the job description.

mod ffprobe;

pub use ffprobe::{parse_ffprobe_json, FfprobeProber};

use crate::Result;
use async_trait::async_trait;
use reelcache_common::SourceDescriptor;
use std::path::Path;

/// A media file prober capable of describing a source file.
///
/// Implementations must be safe to share across tasks (`Send + Sync`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Probe the media file at `path`.
    ///
    /// Fails for missing, unreadable, malformed or unsupported media.
    async fn probe(&self, path: &Path) -> Result<SourceDescriptor>;
}
