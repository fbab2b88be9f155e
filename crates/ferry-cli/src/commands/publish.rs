//! Handler for `ferry publish`.

use std::path::Path;

use miette::Result;

use ferry_core::config::GlobalConfig;
use ferry_maven::repository::StagingRepository;
use ferry_ops::ops_publish::{publish_to, PublishRequest};
use ferry_util::progress::status;

use super::{config_snapshot, load_manifest};

const DRY_RUN_DIR: &str = "build/ferry-dry-run";

pub async fn exec(manifest: Option<&Path>, repository: Option<&str>, dry_run: bool) -> Result<()> {
    let (manifest, base_dir) = load_manifest(manifest)?;
    let global = GlobalConfig::load()?;

    let target = if dry_run {
        StagingRepository::local(base_dir.join(DRY_RUN_DIR))
    } else {
        StagingRepository::resolve(&manifest.repositories, &global, repository)?
    };
    tracing::info!("Publishing {} to {}", manifest.coordinates(), target.name);
    if target.is_remote() {
        status(
            "Publishing",
            &format!("{} to remote repository {}", manifest.coordinates(), target.name),
        );
    } else {
        status(
            "Installing",
            &format!(
                "{} into local repository {}; an existing copy is overwritten",
                manifest.coordinates(),
                target.name
            ),
        );
    }

    let request = PublishRequest::from_manifest(
        &manifest,
        &base_dir,
        config_snapshot()?,
        global.staging.clone(),
    )?
    .with_release_url(target.release_url().map(str::to_string));

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let outcome = publish_to(&target, request, cancel).await?;

    status(
        "Released",
        &format!(
            "{} to {} ({} artifacts, {} signatures)",
            outcome.coordinates, outcome.repository, outcome.artifacts, outcome.signatures
        ),
    );
    if dry_run {
        println!("{}", base_dir.join(DRY_RUN_DIR).display());
    }
    Ok(())
}
