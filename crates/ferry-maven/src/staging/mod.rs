//! Staging sessions: the two-phase upload/release protocol.
//!
//! A [`StagingService`] is one backend speaking the protocol (remote HTTP,
//! local filesystem, or the in-memory mock). [`client::StagingClient`] sits
//! in front of any of them and owns the session state machine, timeouts and
//! retries, so a backend only has to perform the raw calls.
//!
//! ```text
//! OPEN --upload--> OPEN --validate--> VALIDATED --close--> CLOSED --release--> RELEASED
//!   \________________________\_____________________________\____drop____> DROPPED
//! ```

pub mod client;
pub mod local;
pub mod mock;
pub mod remote;
pub mod state;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ferry_core::coordinates::Coordinates;
use ferry_core::credentials::RepositoryCredentials;
use ferry_core::publication::PublicationFile;
use ferry_util::errors::FerryResult;

pub use client::StagingClient;
pub use local::LocalStaging;
pub use mock::MockStaging;
pub use remote::RemoteStaging;
pub use state::{Operation, SessionState};

/// Identifier of one staging session, assigned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the service is told when a session is opened.
#[derive(Debug, Clone, Serialize)]
pub struct OpenRequest {
    #[serde(flatten)]
    pub coordinates: Coordinates,
    pub description: String,
}

impl OpenRequest {
    pub fn new(coordinates: Coordinates) -> Self {
        let description = format!("ferry: {coordinates}");
        Self {
            coordinates,
            description,
        }
    }
}

/// One failed remote check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub message: String,
}

impl Violation {
    pub fn new(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

/// Outcome of the service-side checks on staged content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn passed() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    pub fn failed(violations: Vec<Violation>) -> Self {
        Self {
            passed: false,
            violations,
        }
    }

    /// A report is passing only when it says so and lists nothing.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::passed()
        } else {
            Self::failed(violations)
        }
    }
}

/// Raw operations of a staging backend.
///
/// Implementations perform the calls and map failures onto the error
/// taxonomy; they do not enforce call order.
#[async_trait]
pub trait StagingService: Send + Sync {
    /// Human-readable backend name for status output.
    fn name(&self) -> &str;

    /// Whether releasing a version that already exists overwrites it.
    fn allows_republish(&self) -> bool {
        false
    }

    async fn open(
        &self,
        credentials: Option<&RepositoryCredentials>,
        request: &OpenRequest,
    ) -> FerryResult<SessionId>;

    async fn upload(&self, session: &SessionId, file: &PublicationFile) -> FerryResult<()>;

    async fn validate(&self, session: &SessionId) -> FerryResult<ValidationReport>;

    async fn close(&self, session: &SessionId) -> FerryResult<()>;

    async fn release(&self, session: &SessionId) -> FerryResult<()>;

    /// Abandon a session. Dropping a session the service no longer knows is
    /// not an error.
    async fn drop_session(&self, session: &SessionId) -> FerryResult<()>;
}
