//! Command dispatch and handler modules.

mod drop;
mod env;
mod publish;
mod pubkey;
mod verify;

use std::path::{Path, PathBuf};

use miette::Result;

use ferry_core::config::credentials_env_path;
use ferry_core::manifest::Manifest;
use ferry_core::properties::ConfigStore;
use ferry_util::errors::FerryError;
use ferry_util::fs::find_ancestor_with;

use crate::cli::{Cli, Command};

const MANIFEST_FILE: &str = "Ferry.toml";

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Publish {
            manifest,
            repository,
            dry_run,
        } => publish::exec(manifest.as_deref(), repository.as_deref(), dry_run).await,
        Command::Verify {
            file,
            signature,
            public_key,
        } => verify::exec(&file, &signature, &public_key),
        Command::Env { reveal } => env::exec(reveal),
        Command::Drop {
            session,
            repository,
            manifest,
        } => drop::exec(&session, repository.as_deref(), manifest.as_deref()).await,
        Command::Pubkey => pubkey::exec(),
    }
}

/// Manifest path from `--manifest`, or `Ferry.toml` in the current directory
/// or the nearest parent that has one.
fn locate_manifest(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(FerryError::Io)?;
    let root = find_ancestor_with(&cwd, MANIFEST_FILE).ok_or_else(|| FerryError::Manifest {
        message: format!("Could not find {MANIFEST_FILE} in this directory or any parent"),
    })?;
    Ok(root.join(MANIFEST_FILE))
}

/// Load the manifest and the directory its artifact paths are relative to.
fn load_manifest(explicit: Option<&Path>) -> Result<(Manifest, PathBuf)> {
    let path = locate_manifest(explicit)?;
    let manifest = Manifest::from_path(&path)?;
    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((manifest, base))
}

/// Snapshot credentials: `~/.ferry/credentials.env` overlaid with the environment.
fn config_snapshot() -> Result<ConfigStore> {
    Ok(ConfigStore::snapshot(&credentials_env_path())?)
}
