//! # reelcache-av
//!
//! External media collaborators for reelcache.
//!
//! This crate provides:
//! - Probing source files for bit rate, frame rate and height ([`Prober`], ffprobe backed)
//! - Transcoding one job into an artifact ([`Transcoder`], ffmpeg backed)
//! - Atomic staging of encoder output ([`Workspace`])
//! - External tool discovery and timed execution ([`ToolCommand`])
//!
//! ## Example
//!
//! ```no_run
//! use reelcache_av::{FfprobeProber, Prober};
//! use std::path::Path;
//!
//! # async fn example() -> reelcache_av::Result<()> {
//! let source = FfprobeProber::default().probe(Path::new("/srv/media/clip.mov")).await?;
//! println!("{} bps, {} fps, {}p", source.bit_rate, source.fps, source.height);
//! # Ok(())
//! # }
//! ```

mod command;
mod error;
pub mod probe;
pub mod tools;
pub mod transcode;
pub mod workspace;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use probe::{FfprobeProber, Prober};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo, ToolPaths};
pub use transcode::{FfmpegTranscoder, Transcoder};
pub use workspace::Workspace;
