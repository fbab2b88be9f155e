use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use ferry_util::errors::{FerryError, FerryResult};

use crate::artifact::{Artifact, Classifier};
use crate::coordinates::Coordinates;

/// The parsed representation of a `Ferry.toml` file: what the build step
/// hands over for publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub publication: PublicationMetadata,

    #[serde(default)]
    pub artifacts: Vec<ArtifactEntry>,

    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,
}

/// Coordinates and descriptive metadata from the `[publication]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub group: String,
    pub artifact: String,
    pub version: String,
    #[serde(default = "default_packaging")]
    pub packaging: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

fn default_packaging() -> String {
    "jar".to_string()
}

/// One built file from `[[artifacts]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the manifest directory.
    pub path: String,
    #[serde(default)]
    pub classifier: Option<String>,
    /// Overrides the extension derived from the classifier and packaging.
    #[serde(default)]
    pub extension: Option<String>,
}

/// Where a repository entry publishes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    #[default]
    Remote,
    Local,
}

/// A staging target, either a URL string or a detailed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepositoryEntry {
    Url(String),
    Detailed {
        #[serde(default)]
        kind: RepositoryKind,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        path: Option<String>,
        #[serde(default, rename = "release-url")]
        release_url: Option<String>,
    },
}

impl Manifest {
    /// Load and parse a `Ferry.toml` file from the given path.
    ///
    /// Before parsing, `${env:VAR}` references in the manifest content are
    /// resolved using `~/.ferry/credentials.env` (if present) and process
    /// environment variables.
    pub fn from_path(path: &Path) -> FerryResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FerryError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;

        let env_vars = crate::properties::load_env_file(&crate::config::credentials_env_path())
            .unwrap_or_default();
        let resolved = crate::properties::interpolate(&content, &env_vars);

        Self::from_str(&resolved)
    }

    /// Parse a `Ferry.toml` from a string (no interpolation).
    pub fn from_str(content: &str) -> FerryResult<Self> {
        toml::from_str(content).map_err(|e| FerryError::Manifest {
            message: format!("Failed to parse Ferry.toml: {e}"),
        })
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(
            self.publication.group.trim(),
            self.publication.artifact.trim(),
            self.publication.version.trim(),
        )
    }

    /// Whether the manifest lists its own POM instead of relying on generation.
    pub fn has_pom(&self) -> bool {
        self.artifacts
            .iter()
            .any(|a| Classifier::parse(a.classifier.as_deref().unwrap_or("")) == Classifier::Pom)
    }

    /// Read every listed artifact from disk, relative to `base_dir`.
    ///
    /// Contents are read once and treated as opaque immutable bytes.
    pub fn load_artifacts(&self, base_dir: &Path) -> FerryResult<Vec<Artifact>> {
        self.artifacts
            .iter()
            .map(|entry| {
                let path = base_dir.join(&entry.path);
                let content = std::fs::read(&path).map_err(|e| FerryError::Manifest {
                    message: format!("Failed to read artifact {}: {e}", path.display()),
                })?;
                let classifier = Classifier::parse(entry.classifier.as_deref().unwrap_or(""));
                let extension = entry.extension.clone().unwrap_or_else(|| {
                    classifier
                        .default_extension(&self.publication.packaging)
                        .to_string()
                });
                tracing::debug!(
                    "Loaded {} artifact {} ({} bytes)",
                    classifier,
                    path.display(),
                    content.len()
                );
                Ok(Artifact::new(classifier, extension, content))
            })
            .collect()
    }
}
