use std::fmt;
use std::sync::Arc;

use crate::coordinates::Coordinates;

/// The role a file plays within a publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classifier {
    /// The main binary (`lib-1.0.0.jar`).
    Primary,
    /// Source archive (`lib-1.0.0-sources.jar`).
    Sources,
    /// API documentation archive (`lib-1.0.0-javadoc.jar`).
    Javadoc,
    /// Project object model (`lib-1.0.0.pom`).
    Pom,
    /// Anything else; never accepted into a publication.
    Unrecognized(String),
}

impl Classifier {
    /// Parse a classifier name as written in `Ferry.toml`.
    ///
    /// Unknown names are kept as [`Classifier::Unrecognized`] so validation
    /// can report them alongside every other problem.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "main" | "" => Self::Primary,
            "sources" => Self::Sources,
            "javadoc" | "docs" => Self::Javadoc,
            "pom" => Self::Pom,
            _ => Self::Unrecognized(s.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Every recognized classifier is signable.
    pub fn is_signable(&self) -> bool {
        self.is_recognized()
    }

    /// The Maven classifier suffix appended to the file name, if any.
    pub fn suffix(&self) -> Option<&str> {
        match self {
            Self::Primary | Self::Pom => None,
            Self::Sources => Some("sources"),
            Self::Javadoc => Some("javadoc"),
            Self::Unrecognized(s) => Some(s.as_str()),
        }
    }

    /// File extension used when the caller does not specify one.
    pub fn default_extension<'a>(&self, packaging: &'a str) -> &'a str {
        match self {
            Self::Primary => packaging,
            Self::Pom => "pom",
            _ => "jar",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Primary => "primary",
            Self::Sources => "sources",
            Self::Javadoc => "javadoc",
            Self::Pom => "pom",
            Self::Unrecognized(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One immutable file handed over by the build step.
///
/// Content is reference-counted so the signer, the publication and the
/// uploader share one copy of the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub classifier: Classifier,
    pub extension: String,
    content: Arc<[u8]>,
}

impl Artifact {
    pub fn new(classifier: Classifier, extension: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            classifier,
            extension: extension.into(),
            content: content.into(),
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// A shared handle to the content, without copying the bytes.
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.content)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Maven file name for this artifact under the given coordinates.
    ///
    /// `lib-1.0.0.jar`, `lib-1.0.0-sources.jar`, `lib-1.0.0.pom`
    pub fn file_name(&self, coords: &Coordinates) -> String {
        match self.classifier.suffix() {
            Some(c) => format!(
                "{}-{}-{c}.{}",
                coords.artifact, coords.version, self.extension
            ),
            None => format!("{}-{}.{}", coords.artifact, coords.version, self.extension),
        }
    }
}
