//! Core data types for the Ferry publishing pipeline.
//!
//! This crate defines what gets published and with which identity:
//! coordinates, artifacts, detached signatures, the validated publication
//! unit, credential resolution, global configuration, and the `Ferry.toml`
//! manifest handed over by the build step.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod artifact;
pub mod config;
pub mod coordinates;
pub mod credentials;
pub mod manifest;
pub mod properties;
pub mod publication;
pub mod signature;
