//! Repository authentication.
//!
//! Credentials come from the resolved [`CredentialBundle`], never from the
//! manifest, so this module only attaches them to outgoing requests.
//!
//! [`CredentialBundle`]: ferry_core::credentials::CredentialBundle

use reqwest::RequestBuilder;

use ferry_core::credentials::RepositoryCredentials;

/// Apply HTTP Basic authentication when credentials are available.
pub fn apply_auth(
    request: RequestBuilder,
    credentials: Option<&RepositoryCredentials>,
) -> RequestBuilder {
    match credentials {
        Some(creds) => request.basic_auth(&creds.username, Some(creds.password.expose())),
        None => request,
    }
}
