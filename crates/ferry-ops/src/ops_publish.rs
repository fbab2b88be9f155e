//! Operation: take a built publication from manifest to released version.
//!
//! credentials → preflight → POM → sign → build → open → upload → validate
//! → close → release. Any failure after open drops the session before the
//! failure is reported; the caller sees either a released version or
//! nothing. The exception is a release whose answer was lost: unless the
//! release repository confirms it, the failure says the outcome is unknown
//! and the session is left alone.

use std::fmt;
use std::future::Future;
use std::path::Path;

use miette::Diagnostic;
use thiserror::Error;

use ferry_core::artifact::Artifact;
use ferry_core::config::StagingConfig;
use ferry_core::coordinates::Coordinates;
use ferry_core::credentials::{CredentialProvider, RepositoryCredentials, SigningCapability};
use ferry_core::manifest::{Manifest, PublicationMetadata};
use ferry_core::properties::ConfigStore;
use ferry_core::publication::PublicationBuilder;
use ferry_maven::download::build_client;
use ferry_maven::metadata::is_released;
use ferry_maven::pom::pom_artifact;
use ferry_maven::repository::{RepositoryTarget, StagingRepository};
use ferry_maven::staging::{
    LocalStaging, OpenRequest, RemoteStaging, SessionId, StagingClient, StagingService,
};
use ferry_sign::Signer;
use ferry_util::errors::{FerryError, FerryResult};
use ferry_util::progress::{spinner, status, status_warn};

/// Pipeline step, as reported when a publish fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    Credentials,
    Preflight,
    Pom,
    Sign,
    Build,
    Open,
    Upload,
    Validate,
    Close,
    Release,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PublishStage::Credentials => "credentials",
            PublishStage::Preflight => "preflight",
            PublishStage::Pom => "pom",
            PublishStage::Sign => "sign",
            PublishStage::Build => "build",
            PublishStage::Open => "open",
            PublishStage::Upload => "upload",
            PublishStage::Validate => "validate",
            PublishStage::Close => "close",
            PublishStage::Release => "release",
        };
        f.write_str(s)
    }
}

/// Everything one publish needs, captured up front.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub metadata: PublicationMetadata,
    pub artifacts: Vec<Artifact>,
    /// Generate a POM because the manifest does not list one.
    pub generate_pom: bool,
    /// Configuration snapshot credentials are resolved from.
    pub config: ConfigStore,
    pub staging: StagingConfig,
    /// Release repository to check for an existing version first.
    pub release_url: Option<String>,
}

impl PublishRequest {
    /// Read the manifest's artifacts from disk.
    pub fn from_manifest(
        manifest: &Manifest,
        base_dir: &Path,
        config: ConfigStore,
        staging: StagingConfig,
    ) -> FerryResult<Self> {
        Ok(Self {
            metadata: manifest.publication.clone(),
            artifacts: manifest.load_artifacts(base_dir)?,
            generate_pom: !manifest.has_pom(),
            config,
            staging,
            release_url: None,
        })
    }

    pub fn with_release_url(mut self, url: Option<String>) -> Self {
        self.release_url = url;
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(
            self.metadata.group.trim(),
            self.metadata.artifact.trim(),
            self.metadata.version.trim(),
        )
    }
}

/// A released version.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub coordinates: Coordinates,
    pub repository: String,
    pub session: SessionId,
    pub artifacts: usize,
    pub signatures: usize,
    pub files: usize,
}

/// A publish that did not release anything.
#[derive(Debug, Error, Diagnostic)]
#[error("Publish failed during {stage} ({}): {source}", session_note(.session_left_open))]
pub struct PublishFailure {
    pub stage: PublishStage,
    /// Session that was open when the failure happened, if any.
    pub session: Option<SessionId>,
    /// True when the cleanup drop failed, or was not attempted because the
    /// service may hold a session in an unknown state.
    pub session_left_open: bool,
    #[diagnostic_source]
    pub source: FerryError,
    #[help]
    pub hint: Option<String>,
}

fn session_note(left_open: &bool) -> &'static str {
    if *left_open {
        "staging session left open"
    } else {
        "no staging session left open"
    }
}

impl PublishFailure {
    fn new(stage: PublishStage, source: FerryError) -> Self {
        Self {
            stage,
            session: None,
            session_left_open: false,
            source,
            hint: None,
        }
    }

    /// Short failure tag (e.g. `AuthError`).
    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }
}

/// Run the pipeline against `service`, giving up when `cancel` completes.
pub async fn publish<S, C>(
    request: PublishRequest,
    service: S,
    cancel: C,
) -> Result<PublishOutcome, PublishFailure>
where
    S: StagingService,
    C: Future<Output = ()>,
{
    let client = StagingClient::from_config(service, &request.staging);
    let mut stage = PublishStage::Credentials;

    let result = {
        let pipeline = run(&request, &client, &mut stage);
        tokio::pin!(pipeline);
        tokio::pin!(cancel);
        tokio::select! {
            result = &mut pipeline => result,
            _ = &mut cancel => {
                tracing::warn!("Publish cancelled");
                Err(FerryError::Cancelled)
            }
        }
    };

    match result {
        Ok(outcome) => Ok(outcome),
        Err(source) => Err(cleanup(&client, stage, source).await),
    }
}

/// Pick the service for `repository` and publish to it.
pub async fn publish_to<C>(
    repository: &StagingRepository,
    request: PublishRequest,
    cancel: C,
) -> Result<PublishOutcome, PublishFailure>
where
    C: Future<Output = ()>,
{
    match &repository.target {
        RepositoryTarget::Remote { url, .. } => {
            let http = build_client(request.staging.timeout())
                .map_err(|e| PublishFailure::new(PublishStage::Credentials, e))?;
            let service = RemoteStaging::new(&repository.name, url, http);
            publish(request, service, cancel).await
        }
        RepositoryTarget::Local { root } => {
            publish(request, LocalStaging::new(root), cancel).await
        }
    }
}

/// Drop whatever session is still active and wrap the error.
async fn cleanup<S: StagingService>(
    client: &StagingClient<S>,
    stage: PublishStage,
    source: FerryError,
) -> PublishFailure {
    let mut failure = PublishFailure::new(stage, source);

    if matches!(failure.source, FerryError::OutcomeUnknown { .. }) {
        // The session may already be released; leave it for the caller.
        if let Some(session) = client.active_session() {
            failure.session_left_open = true;
            failure.hint = Some(format!(
                "Staging session {session} may already be released; check the repository \
                 before publishing again, or remove it with `ferry drop {session}`"
            ));
            failure.session = Some(session);
        }
        return failure;
    }

    if let Some(session) = client.active_session() {
        match client.drop_session(&session).await {
            Ok(()) => {
                status_warn("Dropped", &format!("staging session {session}"));
            }
            Err(e) => {
                tracing::warn!("Failed to drop staging session {session}: {e}");
                failure.session_left_open = true;
                failure.hint = Some(format!(
                    "Staging session {session} may still be open; remove it with `ferry drop {session}`"
                ));
            }
        }
        failure.session = Some(session);
    } else if client.open_unsettled() {
        tracing::warn!(
            "Open on {} did not answer; a staging session may exist",
            client.service().name()
        );
        failure.session_left_open = true;
        failure.hint = Some(format!(
            "The open call on {} was interrupted before it answered, so a staging session \
             may have been created; look for it in the repository and remove it with \
             `ferry drop <session>`",
            client.service().name()
        ));
    }

    failure
}

async fn run<S: StagingService>(
    request: &PublishRequest,
    client: &StagingClient<S>,
    stage: &mut PublishStage,
) -> FerryResult<PublishOutcome> {
    let coords = request.coordinates();

    *stage = PublishStage::Credentials;
    let credentials = CredentialProvider::new(&request.config).resolve()?;

    *stage = PublishStage::Preflight;
    if let Some(url) = request.release_url.as_deref() {
        if coords.is_valid() && !client.service().allows_republish() {
            let http = build_client(request.staging.timeout())?;
            if is_released(&http, url, &coords, credentials.repository.as_ref()).await? {
                return Err(FerryError::Rejected {
                    message: format!("{coords} is already released at {url}"),
                });
            }
        }
    }

    let mut artifacts = request.artifacts.clone();
    *stage = PublishStage::Pom;
    if request.generate_pom {
        artifacts.push(pom_artifact(&request.metadata)?);
    }

    *stage = PublishStage::Sign;
    let signatures = match &credentials.signing {
        SigningCapability::Enabled(signing) => {
            let signer = Signer::from_credentials(signing)?;
            let signatures = signer.sign_all(&artifacts)?;
            status(
                "Signed",
                &format!("{} artifacts with key {}", signatures.len(), signer.key().key_id()),
            );
            signatures
        }
        SigningCapability::Disabled => {
            tracing::info!("No signing key configured; publishing unsigned");
            Vec::new()
        }
    };

    *stage = PublishStage::Build;
    let publication = PublicationBuilder::new(coords.clone())
        .artifacts(artifacts)
        .signatures(signatures)
        .signing(credentials.signing.mode())
        .build()?;

    *stage = PublishStage::Open;
    let session = client
        .open(credentials.repository.as_ref(), &OpenRequest::new(coords.clone()))
        .await?;
    status(
        "Staging",
        &format!("{coords} to {} (session {session})", client.service().name()),
    );

    *stage = PublishStage::Upload;
    let sp = spinner(&format!("Uploading {} files...", publication.files().len()));
    let files = client.upload(&session, &publication).await;
    sp.finish_and_clear();
    let files = files?;

    *stage = PublishStage::Validate;
    let report = client.validate(&session).await?;
    if !report.passed {
        return Err(FerryError::Rejected {
            message: format!(
                "staging validation failed:\n  - {}",
                report
                    .violations
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n  - ")
            ),
        });
    }

    *stage = PublishStage::Close;
    client.close(&session).await?;

    *stage = PublishStage::Release;
    match client.release(&session).await {
        Ok(()) => {}
        Err(FerryError::OutcomeUnknown { message }) => {
            confirm_release(request, &coords, credentials.repository.as_ref(), message).await?;
        }
        Err(e) => return Err(e),
    }

    Ok(PublishOutcome {
        coordinates: coords,
        repository: client.service().name().to_string(),
        session,
        artifacts: publication.artifacts().len(),
        signatures: publication.signatures().len(),
        files,
    })
}

/// Settle a release whose answer was lost by asking the release repository
/// whether the version is listed. Anything short of a listing keeps the
/// outcome unknown.
async fn confirm_release(
    request: &PublishRequest,
    coords: &Coordinates,
    credentials: Option<&RepositoryCredentials>,
    message: String,
) -> FerryResult<()> {
    let Some(url) = request.release_url.as_deref() else {
        return Err(FerryError::OutcomeUnknown { message });
    };

    let http = build_client(request.staging.timeout())?;
    match is_released(&http, url, coords, credentials).await {
        Ok(true) => {
            tracing::info!("{coords} is listed at {url}; the lost release went through");
            Ok(())
        }
        Ok(false) => Err(FerryError::OutcomeUnknown {
            message: format!("{message} ({coords} is not listed at {url} yet)"),
        }),
        Err(e) => {
            tracing::warn!("Could not check {url} for {coords}: {e}");
            Err(FerryError::OutcomeUnknown { message })
        }
    }
}
