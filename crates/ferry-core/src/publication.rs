//! Publication descriptor: coordinates, artifacts and signatures assembled
//! into one immutable unit ready for staging.

use std::collections::BTreeMap;
use std::sync::Arc;

use ferry_util::errors::{FerryError, FerryResult};
use ferry_util::hash::{md5_bytes, sha1_bytes, sha256_bytes};

use crate::artifact::{Artifact, Classifier};
use crate::coordinates::Coordinates;
use crate::signature::Signature;

/// Whether the pipeline signs this publication. Resolved once per publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningMode {
    Enabled,
    Disabled,
}

/// Checksum sidecars written next to every artifact.
pub const CHECKSUM_ALGORITHMS: [&str; 3] = ["md5", "sha1", "sha256"];

/// What a file in the upload set represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Artifact(Classifier),
    Signature(Classifier),
    Checksum {
        classifier: Classifier,
        algorithm: &'static str,
    },
}

/// One file of the expanded upload set.
#[derive(Debug, Clone)]
pub struct PublicationFile {
    /// Path relative to the repository root, in Maven layout.
    pub path: String,
    pub kind: FileKind,
    pub content: Arc<[u8]>,
}

impl PublicationFile {
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A validated, immutable publication unit.
#[derive(Debug, Clone)]
pub struct Publication {
    coordinates: Coordinates,
    artifacts: Vec<Artifact>,
    signatures: Vec<Signature>,
}

impl Publication {
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn artifact(&self, classifier: &Classifier) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| &a.classifier == classifier)
    }

    pub fn signature_for(&self, classifier: &Classifier) -> Option<&Signature> {
        self.signatures.iter().find(|s| &s.classifier == classifier)
    }

    /// Expand into the full upload set: each artifact, its `.asc` when
    /// signed, and its checksum sidecars.
    pub fn files(&self) -> Vec<PublicationFile> {
        let dir = self.coordinates.path();
        let mut files = Vec::with_capacity(self.artifacts.len() * 5);

        for artifact in &self.artifacts {
            let name = artifact.file_name(&self.coordinates);
            let path = format!("{dir}/{name}");
            let content = artifact.bytes();

            files.push(PublicationFile {
                path: path.clone(),
                kind: FileKind::Artifact(artifact.classifier.clone()),
                content: content.clone(),
            });

            if let Some(sig) = self.signature_for(&artifact.classifier) {
                files.push(PublicationFile {
                    path: format!("{path}.asc"),
                    kind: FileKind::Signature(artifact.classifier.clone()),
                    content: Arc::from(sig.armored.as_bytes()),
                });
            }

            for algorithm in CHECKSUM_ALGORITHMS {
                let digest = checksum(algorithm, &content);
                files.push(PublicationFile {
                    path: format!("{path}.{algorithm}"),
                    kind: FileKind::Checksum {
                        classifier: artifact.classifier.clone(),
                        algorithm,
                    },
                    content: Arc::from(digest.into_bytes()),
                });
            }
        }

        files
    }
}

/// Hex digest of `data` for one of [`CHECKSUM_ALGORITHMS`].
pub fn checksum(algorithm: &str, data: &[u8]) -> String {
    match algorithm {
        "md5" => md5_bytes(data),
        "sha1" => sha1_bytes(data),
        _ => sha256_bytes(data),
    }
}

/// Fluent front-end to [`build`].
#[derive(Debug, Clone)]
pub struct PublicationBuilder {
    coordinates: Coordinates,
    artifacts: Vec<Artifact>,
    signatures: Vec<Signature>,
    signing: SigningMode,
}

impl PublicationBuilder {
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            artifacts: Vec::new(),
            signatures: Vec::new(),
            signing: SigningMode::Disabled,
        }
    }

    pub fn artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn artifacts(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn signatures(mut self, signatures: impl IntoIterator<Item = Signature>) -> Self {
        self.signatures.extend(signatures);
        self
    }

    pub fn signing(mut self, mode: SigningMode) -> Self {
        self.signing = mode;
        self
    }

    pub fn build(self) -> FerryResult<Publication> {
        build(self.coordinates, self.artifacts, self.signatures, self.signing)
    }
}

/// Validate and assemble a publication.
///
/// Collects every violation before failing, so the caller sees all missing
/// pieces at once. Pure: no I/O.
pub fn build(
    coordinates: Coordinates,
    artifacts: Vec<Artifact>,
    signatures: Vec<Signature>,
    signing: SigningMode,
) -> FerryResult<Publication> {
    let mut violations = coordinates.violations();

    if artifacts.is_empty() {
        violations.push("publication has no artifacts".to_string());
    }

    let mut seen: BTreeMap<&Classifier, usize> = BTreeMap::new();
    for artifact in &artifacts {
        if !artifact.classifier.is_recognized() {
            violations.push(format!(
                "unrecognized classifier '{}' (expected primary, sources, javadoc or pom)",
                artifact.classifier
            ));
        }
        if artifact.is_empty() {
            violations.push(format!("{} artifact is empty", artifact.classifier));
        }
        *seen.entry(&artifact.classifier).or_default() += 1;
    }
    for (classifier, count) in &seen {
        if *count > 1 {
            violations.push(format!("{count} artifacts share the classifier {classifier}"));
        }
    }

    let mut signed: BTreeMap<&Classifier, usize> = BTreeMap::new();
    for sig in &signatures {
        if !seen.contains_key(&sig.classifier) {
            violations.push(format!(
                "signature for {} has no matching artifact",
                sig.classifier
            ));
        }
        *signed.entry(&sig.classifier).or_default() += 1;
    }
    for (classifier, count) in &signed {
        if *count > 1 {
            violations.push(format!("{classifier} artifact has {count} signatures"));
        }
    }

    if signing == SigningMode::Enabled || !signatures.is_empty() {
        for artifact in &artifacts {
            if artifact.classifier.is_signable() && !signed.contains_key(&artifact.classifier) {
                violations.push(format!(
                    "missing signature for {} artifact",
                    artifact.classifier
                ));
            }
        }
    }

    if !violations.is_empty() {
        return Err(FerryError::Validation { violations });
    }

    Ok(Publication {
        coordinates,
        artifacts,
        signatures,
    })
}
