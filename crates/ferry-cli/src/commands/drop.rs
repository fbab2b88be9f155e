//! Handler for `ferry drop`.

use std::collections::BTreeMap;
use std::path::Path;

use miette::Result;

use ferry_core::config::GlobalConfig;
use ferry_maven::repository::StagingRepository;
use ferry_maven::staging::SessionId;
use ferry_ops::ops_drop::drop_session;
use ferry_util::progress::status;

use super::{config_snapshot, load_manifest};

pub async fn exec(session: &str, repository: Option<&str>, manifest: Option<&Path>) -> Result<()> {
    let global = GlobalConfig::load()?;
    let declared = match load_manifest(manifest) {
        Ok((manifest, _)) => manifest.repositories,
        Err(e) if manifest.is_some() => return Err(e),
        Err(_) => BTreeMap::new(),
    };
    let target = StagingRepository::resolve(&declared, &global, repository)?;

    drop_session(
        &target,
        SessionId::new(session),
        &config_snapshot()?,
        &global.staging,
    )
    .await?;
    status("Dropped", &format!("session {session} on {}", target.name));
    Ok(())
}
