//! Reelcache-Common: Shared types, the artifact cache key, and path utilities.
//!
//! This crate provides common functionality used across reelcache:
//!
//! - **Core Types**: Transcoding profiles, probed source descriptors and job descriptions
//! - **Artifact Paths**: The codec mapping a source file and a profile to its artifact path
//! - **Path Utilities**: Extension checks and the tri-state file access probe
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use reelcache_common::artifact::{ArtifactPathCodec, PostfixCodec};
//! use reelcache_common::TranscodingProfile;
//! use std::path::Path;
//!
//! let codec = PostfixCodec::new("/srv/media", "/srv/transcoded");
//! let profile = TranscodingProfile::default();
//!
//! let artifact = codec
//!     .derive_path(Path::new("/srv/media/2024/clip.mov"), &profile)
//!     .unwrap();
//! assert_eq!(
//!     artifact,
//!     Path::new("/srv/transcoded/2024/clip.mov_5120kh264720.mp4")
//! );
//! ```

pub mod artifact;
pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
