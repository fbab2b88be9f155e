//! Maven repository side of publishing: layout and metadata, POM
//! generation, checksums, and the staging session protocol.

pub mod auth;
pub mod checksum;
pub mod download;
pub mod metadata;
pub mod pom;
pub mod repository;
pub mod retry;
pub mod staging;
