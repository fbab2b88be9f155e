//! Plain HTTP reads from Maven repositories.

use std::time::Duration;

use reqwest::{Client, StatusCode};

use ferry_core::credentials::RepositoryCredentials;
use ferry_util::errors::{FerryError, FerryResult};

use crate::auth;
use crate::retry::RetryPolicy;

/// Build a shared reqwest client.
pub fn build_client(timeout: Duration) -> FerryResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ferry/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FerryError::Generic {
            message: format!("Failed to create HTTP client: {e}"),
        })
}

/// Download raw bytes from a URL, retrying 5xx answers and connection
/// failures with the default [`RetryPolicy`].
///
/// Returns `Ok(None)` for 404.
pub async fn download_bytes(
    client: &Client,
    url: &str,
    credentials: Option<&RepositoryCredentials>,
) -> FerryResult<Option<Vec<u8>>> {
    RetryPolicy::default()
        .run(&format!("GET {url}"), || fetch_once(client, url, credentials))
        .await
}

async fn fetch_once(
    client: &Client,
    url: &str,
    credentials: Option<&RepositoryCredentials>,
) -> FerryResult<Option<Vec<u8>>> {
    let resp = auth::apply_auth(client.get(url), credentials)
        .send()
        .await
        .map_err(|e| FerryError::Transport {
            message: format!("Request to {url} failed: {e}"),
        })?;

    let status = resp.status();
    match status {
        StatusCode::NOT_FOUND => return Ok(None),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(FerryError::Auth {
                message: format!("HTTP {status} fetching {url}"),
            })
        }
        s if s.is_server_error() => {
            return Err(FerryError::Transport {
                message: format!("HTTP {status} from {url}"),
            })
        }
        s if !s.is_success() => {
            return Err(FerryError::Rejected {
                message: format!("HTTP {status} fetching {url}"),
            })
        }
        _ => {}
    }

    let bytes = resp.bytes().await.map_err(|e| FerryError::Transport {
        message: format!("Failed to read response from {url}: {e}"),
    })?;
    Ok(Some(bytes.to_vec()))
}

/// Download a text file (metadata, checksum sidecar).
pub async fn download_text(
    client: &Client,
    url: &str,
    credentials: Option<&RepositoryCredentials>,
) -> FerryResult<Option<String>> {
    Ok(download_bytes(client, url, credentials)
        .await?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}
