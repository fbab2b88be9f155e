use crate::artifact::Classifier;

/// A detached signature over one artifact of a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Classifier of the artifact this signature covers.
    pub classifier: Classifier,
    /// Fingerprint of the signing key (16 lowercase hex chars).
    pub key_id: String,
    /// ASCII-armored signature text, stored as the `.asc` sidecar.
    pub armored: String,
}

impl Signature {
    pub fn new(classifier: Classifier, key_id: impl Into<String>, armored: impl Into<String>) -> Self {
        Self {
            classifier,
            key_id: key_id.into(),
            armored: armored.into(),
        }
    }
}
