use std::fmt;

use serde::{Deserialize, Serialize};

/// Maven-style publication coordinates: `group:artifact:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl Coordinates {
    /// Construct coordinates without validating them.
    ///
    /// Use [`Coordinates::violations`] (or the publication builder, which
    /// calls it) to check the invariant.
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// Parse `group:artifact:version`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(':');
        let group = parts.next()?;
        let artifact = parts.next()?;
        let version = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(group, artifact, version))
    }

    /// Every way these coordinates break the invariant. Empty when valid.
    pub fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (field, value) in [
            ("group", &self.group),
            ("artifact", &self.artifact),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                out.push(format!("{field} must not be empty"));
            } else if value
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | ':'))
            {
                out.push(format!(
                    "{field} '{value}' contains whitespace or one of '/', '\\', ':'"
                ));
            }
        }
        out
    }

    /// Whether the coordinates satisfy the invariant.
    pub fn is_valid(&self) -> bool {
        self.violations().is_empty()
    }

    /// Standard Maven layout directory for these coordinates.
    ///
    /// `io.example:lib:1.0.0` becomes `io/example/lib/1.0.0`
    pub fn path(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version
        )
    }

    /// Artifact-level directory (the parent of every version directory).
    pub fn artifact_path(&self) -> String {
        format!("{}/{}", self.group.replace('.', "/"), self.artifact)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}
