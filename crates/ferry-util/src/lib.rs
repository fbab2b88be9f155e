//! Shared utilities for Ferry.
//!
//! This crate provides cross-cutting concerns used by all other Ferry crates:
//! the publish error taxonomy, checksum hashing, filesystem helpers, and
//! terminal progress indicators.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
