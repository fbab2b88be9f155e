//! Operation: report which credential settings are visible to ferry.

use ferry_core::credentials::CredentialProvider;
use ferry_core::properties::ConfigStore;
use ferry_core::publication::SigningMode;

const MASK: &str = "********";

/// One credential field and where its value came from.
#[derive(Debug, Clone)]
pub struct EnvEntry {
    pub field: &'static str,
    pub key: Option<&'static str>,
    /// Value as shown to the user: masked unless revealed.
    pub display: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnvReport {
    pub entries: Vec<EnvEntry>,
    /// Signing mode the next publish would use, or the configuration error
    /// that would stop it.
    pub signing: Result<SigningMode, String>,
    pub repository_credentials: bool,
}

pub fn env_report(config: &ConfigStore, reveal: bool) -> EnvReport {
    let provider = CredentialProvider::new(config);
    let entries = provider
        .sources()
        .into_iter()
        .map(|source| EnvEntry {
            field: source.field,
            key: source.key,
            display: source.value.map(|v| {
                if reveal {
                    v
                } else {
                    MASK.to_string()
                }
            }),
        })
        .collect();

    let (signing, repository_credentials) = match provider.resolve() {
        Ok(bundle) => (Ok(bundle.signing.mode()), bundle.repository.is_some()),
        Err(e) => (Err(e.to_string()), false),
    };

    EnvReport {
        entries,
        signing,
        repository_credentials,
    }
}
