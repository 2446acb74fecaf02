//! Reelcache - on-demand video transcoding cache
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod conversion;
pub mod scanner;
