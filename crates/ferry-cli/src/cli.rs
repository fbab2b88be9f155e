//! CLI argument definitions for Ferry.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ferry",
    version,
    about = "Sign, stage and release build artifacts to a Maven repository",
    long_about = "Ferry takes the artifacts a build produced, signs them, uploads them into a \
                  staging session and releases them only once the whole set is in place."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign, stage and release the artifacts listed in Ferry.toml
    Publish {
        /// Path to Ferry.toml (default: searched upwards from the current directory)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Repository to publish to (a name from Ferry.toml or ~/.ferry/config.toml, or "local")
        #[arg(short, long)]
        repository: Option<String>,
        /// Publish into build/ferry-dry-run instead of a real repository
        #[arg(long, conflicts_with = "repository")]
        dry_run: bool,
    },

    /// Verify a detached signature
    Verify {
        /// The signed file
        file: PathBuf,
        /// The armored signature (.asc)
        signature: PathBuf,
        /// PEM file holding the public key
        #[arg(long)]
        public_key: PathBuf,
    },

    /// Show which credentials are configured
    Env {
        /// Print values instead of masking them
        #[arg(long)]
        reveal: bool,
    },

    /// Drop a staging session left open by an interrupted publish
    Drop {
        /// Session id printed by the failed publish
        session: String,
        /// Repository the session lives on
        #[arg(short, long)]
        repository: Option<String>,
        /// Path to Ferry.toml
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Print the public key of the configured signing key
    Pubkey,
}

pub fn parse() -> Cli {
    Cli::parse()
}
