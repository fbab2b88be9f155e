//! HTTP staging service.
//!
//! | Call     | Request                                     |
//! |----------|---------------------------------------------|
//! | open     | `POST   {url}/sessions`                     |
//! | upload   | `PUT    {url}/sessions/{id}/files/{path}`   |
//! | validate | `POST   {url}/sessions/{id}/validate`       |
//! | close    | `POST   {url}/sessions/{id}/close`          |
//! | release  | `POST   {url}/sessions/{id}/release`        |
//! | drop     | `DELETE {url}/sessions/{id}`                |
//!
//! Every request carries HTTP Basic credentials.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use ferry_core::credentials::RepositoryCredentials;
use ferry_core::publication::PublicationFile;
use ferry_util::errors::{FerryError, FerryResult};

use super::{OpenRequest, SessionId, StagingService, ValidationReport};
use crate::auth;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenResponse {
    session_id: String,
}

/// Staging service reached over HTTP.
pub struct RemoteStaging {
    name: String,
    base_url: String,
    client: Client,
    credentials: Mutex<Option<RepositoryCredentials>>,
}

impl RemoteStaging {
    pub fn new(name: impl Into<String>, base_url: &str, client: Client) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials: Mutex::new(None),
        }
    }

    /// Preset credentials for calls on sessions this instance did not open.
    pub fn with_credentials(self, credentials: RepositoryCredentials) -> Self {
        *self.lock() = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session_url(&self, session: &SessionId, suffix: &str) -> String {
        format!("{}/sessions/{}{suffix}", self.base_url, session.as_str())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<RepositoryCredentials>> {
        self.credentials.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        let credentials = self.lock().clone();
        auth::apply_auth(request, credentials.as_ref())
    }

    async fn send(&self, what: &str, request: RequestBuilder) -> FerryResult<Response> {
        self.authed(request)
            .send()
            .await
            .map_err(|e| FerryError::Transport {
                message: format!("{what} request to {} failed: {e}", self.name),
            })
    }

    /// Post to a session endpoint that answers with an empty success.
    async fn post_session(&self, session: &SessionId, action: &str) -> FerryResult<()> {
        let url = self.session_url(session, &format!("/{action}"));
        let resp = self.send(action, self.client.post(&url)).await?;
        check_status(action, Some(session), resp).await?;
        Ok(())
    }
}

/// Map an unsuccessful response onto the error taxonomy.
async fn check_status(
    what: &str,
    session: Option<&SessionId>,
    resp: Response,
) -> FerryResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let detail = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", body.trim())
    };
    let message = format!("{what} failed: {detail}");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FerryError::Auth { message },
        StatusCode::CONFLICT | StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            FerryError::Rejected { message }
        }
        StatusCode::NOT_FOUND if session.is_some() => FerryError::State {
            message: format!(
                "{what} failed: session {} is unknown to the service",
                session.map(SessionId::as_str).unwrap_or_default()
            ),
        },
        _ => FerryError::Transport { message },
    })
}

#[async_trait]
impl StagingService for RemoteStaging {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(
        &self,
        credentials: Option<&RepositoryCredentials>,
        request: &OpenRequest,
    ) -> FerryResult<SessionId> {
        let credentials = credentials.cloned().ok_or_else(|| FerryError::Auth {
            message: format!("no repository credentials configured for '{}'", self.name),
        })?;
        *self.lock() = Some(credentials);

        let url = format!("{}/sessions", self.base_url);
        let resp = self
            .send("open", self.client.post(&url).json(request))
            .await
            .map_err(|e| match e {
                FerryError::Transport { message } => FerryError::Unavailable { message },
                other => other,
            })?;
        let resp = check_status("open", None, resp).await.map_err(|e| match e {
            FerryError::Transport { message } => FerryError::Unavailable { message },
            other => other,
        })?;

        let body: OpenResponse = resp.json().await.map_err(|e| FerryError::Unavailable {
            message: format!("open returned an unreadable response: {e}"),
        })?;
        Ok(SessionId::new(body.session_id))
    }

    async fn upload(&self, session: &SessionId, file: &PublicationFile) -> FerryResult<()> {
        let url = self.session_url(session, &format!("/files/{}", file.path));
        let request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(file.content.to_vec());
        let resp = self.send("upload", request).await?;
        check_status(&format!("upload of {}", file.path), Some(session), resp).await?;
        Ok(())
    }

    async fn validate(&self, session: &SessionId) -> FerryResult<ValidationReport> {
        let url = self.session_url(session, "/validate");
        let resp = self.send("validate", self.client.post(&url)).await?;
        let resp = check_status("validate", Some(session), resp).await?;
        resp.json().await.map_err(|e| FerryError::Transport {
            message: format!("validate returned an unreadable report: {e}"),
        })
    }

    async fn close(&self, session: &SessionId) -> FerryResult<()> {
        self.post_session(session, "close").await
    }

    async fn release(&self, session: &SessionId) -> FerryResult<()> {
        self.post_session(session, "release").await
    }

    async fn drop_session(&self, session: &SessionId) -> FerryResult<()> {
        let url = self.session_url(session, "");
        let resp = self.send("drop", self.client.delete(&url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Session {session} was already gone");
            return Ok(());
        }
        check_status("drop", Some(session), resp).await?;
        Ok(())
    }
}
