//! Staging targets: where a publication goes, and Maven layout URLs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ferry_core::config::GlobalConfig;
use ferry_core::coordinates::Coordinates;
use ferry_core::manifest::{RepositoryEntry, RepositoryKind};
use ferry_util::errors::{FerryError, FerryResult};

/// Name of the implicit local target.
pub const LOCAL_REPOSITORY: &str = "local";

/// Default root of the local Maven repository.
pub fn default_local_root() -> PathBuf {
    ferry_util::fs::home_dir().join(".m2").join("repository")
}

/// Where a configured repository publishes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryTarget {
    /// A remote staging service speaking the session protocol.
    Remote {
        url: String,
        /// Release repository consulted before publishing.
        release_url: Option<String>,
    },
    /// A Maven-layout directory on disk.
    Local { root: PathBuf },
}

/// A named staging target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRepository {
    pub name: String,
    pub target: RepositoryTarget,
}

impl StagingRepository {
    /// Build a `StagingRepository` from a name and a manifest `RepositoryEntry`.
    pub fn from_entry(name: &str, entry: &RepositoryEntry) -> FerryResult<Self> {
        let target = match entry {
            RepositoryEntry::Url(url) => RepositoryTarget::Remote {
                url: trim_url(url),
                release_url: None,
            },
            RepositoryEntry::Detailed {
                kind: RepositoryKind::Local,
                path,
                ..
            } => RepositoryTarget::Local {
                root: path
                    .as_deref()
                    .map(ferry_util::fs::expand_home)
                    .unwrap_or_else(default_local_root),
            },
            RepositoryEntry::Detailed {
                kind: RepositoryKind::Remote,
                url,
                release_url,
                ..
            } => {
                let url = url.as_deref().filter(|u| !u.trim().is_empty()).ok_or_else(|| {
                    FerryError::Configuration {
                        message: format!("repository '{name}' is remote but has no url"),
                    }
                })?;
                RepositoryTarget::Remote {
                    url: trim_url(url),
                    release_url: release_url.as_deref().map(trim_url),
                }
            }
        };
        Ok(Self {
            name: name.to_string(),
            target,
        })
    }

    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            name: LOCAL_REPOSITORY.to_string(),
            target: RepositoryTarget::Local { root: root.into() },
        }
    }

    pub fn remote(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            target: RepositoryTarget::Remote {
                url: trim_url(url),
                release_url: None,
            },
        }
    }

    /// Pick the target for a publish.
    ///
    /// An explicit name is looked up in the manifest, then in the global
    /// `[repositories]` table; `local` always resolves. Without a name the
    /// manifest's only repository is used, or the implicit local target
    /// when it declares none.
    pub fn resolve(
        declared: &BTreeMap<String, RepositoryEntry>,
        global: &GlobalConfig,
        requested: Option<&str>,
    ) -> FerryResult<Self> {
        match requested {
            Some(name) => {
                if let Some(entry) = declared.get(name) {
                    Self::from_entry(name, entry)
                } else if let Some(url) = global.repositories.get(name) {
                    Ok(Self::remote(name, url))
                } else if name == LOCAL_REPOSITORY {
                    Ok(Self::local(default_local_root()))
                } else {
                    Err(FerryError::Configuration {
                        message: format!("unknown repository '{name}'"),
                    })
                }
            }
            None => match declared.iter().collect::<Vec<_>>().as_slice() {
                [] => Ok(Self::local(default_local_root())),
                [(name, entry)] => Self::from_entry(name, entry),
                _ => Err(FerryError::Configuration {
                    message: format!(
                        "several repositories are declared ({}); pick one with --repository",
                        declared.keys().cloned().collect::<Vec<_>>().join(", ")
                    ),
                }),
            },
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.target, RepositoryTarget::Remote { .. })
    }

    pub fn release_url(&self) -> Option<&str> {
        match &self.target {
            RepositoryTarget::Remote { release_url, .. } => release_url.as_deref(),
            RepositoryTarget::Local { .. } => None,
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Full URL to a file within a Maven repository.
pub fn file_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// URL to the artifact-level `maven-metadata.xml` (version listing).
pub fn metadata_url(base: &str, coords: &Coordinates) -> String {
    file_url(
        base,
        &format!("{}/maven-metadata.xml", coords.artifact_path()),
    )
}
