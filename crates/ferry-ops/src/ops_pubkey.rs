//! Operation: export the public half of the configured signing key.

use ferry_core::credentials::{CredentialProvider, SigningCapability};
use ferry_core::properties::ConfigStore;
use ferry_sign::KeyMaterial;
use ferry_util::errors::{FerryError, FerryResult};

#[derive(Debug, Clone)]
pub struct PublicKey {
    pub key_id: String,
    pub pem: String,
}

/// Unlock the signing key from `config` and return its public key.
pub fn public_key(config: &ConfigStore) -> FerryResult<PublicKey> {
    let bundle = CredentialProvider::new(config).resolve()?;
    let SigningCapability::Enabled(signing) = bundle.signing else {
        return Err(FerryError::Configuration {
            message: "no signing key configured; set FERRY_SIGNING_KEY and \
                      FERRY_SIGNING_KEY_PASSWORD"
                .to_string(),
        });
    };
    let key = KeyMaterial::from_credentials(&signing)?;
    Ok(PublicKey {
        key_id: key.key_id().to_string(),
        pem: key.public_key_pem()?,
    })
}
