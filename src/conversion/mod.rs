//! Media conversion.
//!
//! This module turns source videos into cached artifacts. It includes:
//!
//! - A bounded, FIFO task executor that caps concurrent transcodes
//! - The [`ConversionManager`], which checks the cache, probes the source
//!   and queues a transcode only when no artifact exists for the current
//!   profile
//!
//! # Cache key
//!
//! Artifacts live under the artifact root, mirroring the source tree. The
//! file name is `<source file name>_<kbit/s>k<codec><height>.<format>`, so a
//! profile change produces a new path and old artifacts are simply ignored.

mod executor;
mod manager;

pub use executor::{TaskAborted, TaskExecutor, TaskHandle};
pub use manager::{ConversionError, ConversionManager, ConversionOutcome};
