use ed25519_dalek::{Signature as Ed25519Signature, Signer as _, VerifyingKey};

use ferry_core::artifact::Artifact;
use ferry_core::credentials::SigningCredentials;
use ferry_core::signature::Signature;
use ferry_util::errors::{FerryError, FerryResult};

use crate::armor;
use crate::key::{key_id_for, KeyMaterial};

/// Produces detached signatures with one unlocked key.
#[derive(Debug)]
pub struct Signer {
    key: KeyMaterial,
}

impl Signer {
    pub fn new(key: KeyMaterial) -> Self {
        Self { key }
    }

    pub fn from_credentials(credentials: &SigningCredentials) -> FerryResult<Self> {
        KeyMaterial::from_credentials(credentials).map(Self::new)
    }

    pub fn key(&self) -> &KeyMaterial {
        &self.key
    }

    /// Sign one artifact's bytes.
    pub fn sign(&self, artifact: &Artifact) -> FerryResult<Signature> {
        if !artifact.classifier.is_signable() {
            return Err(FerryError::Signing {
                message: format!("{} artifacts are not signable", artifact.classifier),
            });
        }
        let sig = self.key.signing_key().sign(artifact.content());
        let armored = armor::encode(self.key.key_id(), &sig.to_bytes());
        tracing::debug!(
            "Signed {} artifact ({} bytes) with key {}",
            artifact.classifier,
            artifact.len(),
            self.key.key_id()
        );
        Ok(Signature::new(
            artifact.classifier.clone(),
            self.key.key_id(),
            armored,
        ))
    }

    /// Sign every signable artifact, in order.
    pub fn sign_all(&self, artifacts: &[Artifact]) -> FerryResult<Vec<Signature>> {
        artifacts
            .iter()
            .filter(|a| a.classifier.is_signable())
            .map(|a| self.sign(a))
            .collect()
    }
}

/// One-shot signing: unlock the key and sign a single artifact.
pub fn sign(artifact: &Artifact, credentials: &SigningCredentials) -> FerryResult<Signature> {
    Signer::from_credentials(credentials)?.sign(artifact)
}

/// Check an armored signature over `content` against a public key.
///
/// Fails when the armor names a different key, or when the signature does
/// not cover exactly these bytes.
pub fn verify(content: &[u8], armored: &str, key: &VerifyingKey) -> FerryResult<()> {
    let parsed = armor::decode(armored)?;
    let expected = key_id_for(key);
    if parsed.key_id != expected {
        return Err(FerryError::Signing {
            message: format!(
                "signature was made by key {} but the public key is {expected}",
                parsed.key_id
            ),
        });
    }
    let sig = Ed25519Signature::from_bytes(&parsed.bytes);
    key.verify_strict(content, &sig)
        .map_err(|_| FerryError::Signing {
            message: "signature does not match the content".to_string(),
        })
}

pub fn verify_artifact(
    artifact: &Artifact,
    signature: &Signature,
    key: &VerifyingKey,
) -> FerryResult<()> {
    if signature.classifier != artifact.classifier {
        return Err(FerryError::Signing {
            message: format!(
                "signature covers {} but the artifact is {}",
                signature.classifier, artifact.classifier
            ),
        });
    }
    verify(artifact.content(), &signature.armored, key)
}
