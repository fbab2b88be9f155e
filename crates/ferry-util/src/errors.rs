use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Ferry operations.
///
/// The variants double as the failure tags reported to the caller of a
/// publish, so stage and retry decisions match on them directly.
#[derive(Debug, Error, Diagnostic)]
pub enum FerryError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed publication manifest (e.g. Ferry.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Ferry.toml for syntax errors"))]
    Manifest { message: String },

    /// Bad or partial local configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help(
        "Set both FERRY_SIGNING_KEY and FERRY_SIGNING_KEY_PASSWORD, or neither"
    ))]
    Configuration { message: String },

    /// Key material could not be loaded or used for signing.
    #[error("Signing failed: {message}")]
    Signing { message: String },

    /// The publication failed local validation before any network call.
    #[error("Publication is invalid:\n  - {}", violations.join("\n  - "))]
    Validation { violations: Vec<String> },

    /// Missing or rejected repository credentials.
    #[error("Authentication failed: {message}")]
    #[diagnostic(help(
        "Set FERRY_REPOSITORY_USERNAME and FERRY_REPOSITORY_PASSWORD for the target repository"
    ))]
    Auth { message: String },

    /// The staging service could not be reached when opening a session.
    #[error("Staging service unavailable: {message}")]
    Unavailable { message: String },

    /// Transient network failure; safe to retry.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The remote declared the publication content invalid.
    #[error("Rejected by repository: {message}")]
    Rejected { message: String },

    /// A call may have taken effect remotely, but its answer never arrived.
    #[error("Outcome unknown: {message}")]
    #[diagnostic(help(
        "Check the repository before publishing this version again"
    ))]
    OutcomeUnknown { message: String },

    /// An operation was attempted in a session state that does not allow it.
    #[error("Invalid staging state: {message}")]
    State { message: String },

    /// The publish was cancelled by the caller.
    #[error("Publish cancelled")]
    Cancelled,

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl FerryError {
    /// Whether retrying the same call unchanged may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FerryError::Transport { .. })
    }

    /// Short tag naming the failure class, as shown in publish reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FerryError::Io(_) => "IoError",
            FerryError::Manifest { .. } => "ManifestError",
            FerryError::Configuration { .. } => "ConfigurationError",
            FerryError::Signing { .. } => "SigningError",
            FerryError::Validation { .. } => "ValidationError",
            FerryError::Auth { .. } => "AuthError",
            FerryError::Unavailable { .. } => "UnavailableError",
            FerryError::Transport { .. } => "TransportError",
            FerryError::Rejected { .. } => "RejectedError",
            FerryError::OutcomeUnknown { .. } => "OutcomeUnknown",
            FerryError::State { .. } => "StateError",
            FerryError::Cancelled => "Cancelled",
            FerryError::Generic { .. } => "Error",
        }
    }
}

/// Convenience alias used by the library crates.
pub type FerryResult<T> = Result<T, FerryError>;
