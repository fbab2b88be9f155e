//! Operation: drop a staging session left behind by an interrupted publish.

use ferry_core::config::StagingConfig;
use ferry_core::credentials::CredentialProvider;
use ferry_core::properties::ConfigStore;
use ferry_maven::download::build_client;
use ferry_maven::repository::{RepositoryTarget, StagingRepository};
use ferry_maven::staging::{
    LocalStaging, RemoteStaging, SessionId, StagingClient, StagingService,
};
use ferry_util::errors::{FerryError, FerryResult};

/// Drop `session` on `repository`.
pub async fn drop_session(
    repository: &StagingRepository,
    session: SessionId,
    config: &ConfigStore,
    staging: &StagingConfig,
) -> FerryResult<()> {
    match &repository.target {
        RepositoryTarget::Remote { url, .. } => {
            let credentials = CredentialProvider::new(config)
                .resolve()?
                .repository
                .ok_or_else(|| FerryError::Auth {
                    message: format!(
                        "no repository credentials configured for '{}'",
                        repository.name
                    ),
                })?;
            let service = RemoteStaging::new(&repository.name, url, build_client(staging.timeout())?)
                .with_credentials(credentials);
            drop_with(StagingClient::from_config(service, staging), session).await
        }
        RepositoryTarget::Local { root } => {
            drop_with(StagingClient::from_config(LocalStaging::new(root), staging), session).await
        }
    }
}

async fn drop_with<S: StagingService>(client: StagingClient<S>, session: SessionId) -> FerryResult<()> {
    client.adopt(session.clone());
    client.drop_session(&session).await?;
    tracing::info!("Dropped session {session} on {}", client.service().name());
    Ok(())
}
