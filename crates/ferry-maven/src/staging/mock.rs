//! In-memory staging service for deterministic tests.
//!
//! Clones share state, so a test keeps one handle for assertions while the
//! pipeline owns another:
//!
//! ```
//! use ferry_maven::staging::mock::{MockOp, MockStaging};
//! use ferry_util::errors::FerryError;
//!
//! let mock = MockStaging::new().fail_times(MockOp::Upload, 1, || FerryError::Transport {
//!     message: "connection reset".into(),
//! });
//! let handle = mock.clone();
//! assert!(handle.calls().is_empty());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use ferry_core::credentials::RepositoryCredentials;
use ferry_core::publication::PublicationFile;
use ferry_util::errors::{FerryError, FerryResult};

use super::{OpenRequest, SessionId, StagingService, ValidationReport};

/// Which service call a failure or hang applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Open,
    Upload,
    Validate,
    Close,
    Release,
    Drop,
}

/// Recorded call, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Open {
        coordinates: String,
        username: Option<String>,
    },
    Upload {
        session: SessionId,
        path: String,
    },
    Validate {
        session: SessionId,
    },
    Close {
        session: SessionId,
    },
    Release {
        session: SessionId,
    },
    Drop {
        session: SessionId,
    },
}

type ErrorFactory = Arc<dyn Fn() -> FerryError + Send + Sync>;

struct Failure {
    op: MockOp,
    remaining: Option<u32>,
    error: ErrorFactory,
}

#[derive(Default)]
struct MockInner {
    next_id: u32,
    calls: Vec<MockCall>,
    failures: Vec<Failure>,
    hangs: Vec<MockOp>,
    lost_releases: u32,
    report: Option<ValidationReport>,
    uploaded: HashMap<SessionId, Vec<String>>,
    released: Vec<SessionId>,
    dropped: Vec<SessionId>,
}

/// Mock staging service.
#[derive(Clone, Default)]
pub struct MockStaging {
    inner: Arc<Mutex<MockInner>>,
}

impl std::fmt::Debug for MockStaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStaging")
            .field("calls", &self.lock().calls.len())
            .finish()
    }
}

impl MockStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls of `op` with the error `error` builds.
    pub fn fail_times(
        self,
        op: MockOp,
        times: u32,
        error: impl Fn() -> FerryError + Send + Sync + 'static,
    ) -> Self {
        self.lock().failures.push(Failure {
            op,
            remaining: Some(times),
            error: Arc::new(error),
        });
        self
    }

    /// Fail every call of `op`.
    pub fn fail_always(
        self,
        op: MockOp,
        error: impl Fn() -> FerryError + Send + Sync + 'static,
    ) -> Self {
        self.lock().failures.push(Failure {
            op,
            remaining: None,
            error: Arc::new(error),
        });
        self
    }

    /// Never complete calls of `op` (for timeout and cancellation tests).
    pub fn hang_on(self, op: MockOp) -> Self {
        self.lock().hangs.push(op);
        self
    }

    /// Let the next `times` releases take effect, then answer with a
    /// transport error as if the response was lost on the way back. A
    /// second release of the same session is refused as already released.
    pub fn lose_release_response(self, times: u32) -> Self {
        self.lock().lost_releases = times;
        self
    }

    /// Report returned by `validate` (passing by default).
    pub fn with_report(self, report: ValidationReport) -> Self {
        self.lock().report = Some(report);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Every path uploaded successfully, across sessions.
    pub fn uploaded_paths(&self) -> Vec<String> {
        let inner = self.lock();
        let mut sessions: Vec<_> = inner.uploaded.iter().collect();
        sessions.sort_by(|a, b| a.0.cmp(b.0));
        sessions
            .into_iter()
            .flat_map(|(_, paths)| paths.iter().cloned())
            .collect()
    }

    pub fn released(&self) -> Vec<SessionId> {
        self.lock().released.clone()
    }

    pub fn dropped(&self) -> Vec<SessionId> {
        self.lock().dropped.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call, then apply any injected failure or hang.
    async fn enter(&self, op: MockOp, call: MockCall) -> FerryResult<()> {
        let (injected, hang) = {
            let mut inner = self.lock();
            inner.calls.push(call);
            let injected = inner
                .failures
                .iter_mut()
                .find(|f| f.op == op && f.remaining != Some(0))
                .map(|f| {
                    if let Some(n) = f.remaining.as_mut() {
                        *n -= 1;
                    }
                    (f.error)()
                });
            (injected, inner.hangs.contains(&op))
        };
        if hang {
            std::future::pending::<()>().await;
        }
        match injected {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StagingService for MockStaging {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(
        &self,
        credentials: Option<&RepositoryCredentials>,
        request: &OpenRequest,
    ) -> FerryResult<SessionId> {
        self.enter(
            MockOp::Open,
            MockCall::Open {
                coordinates: request.coordinates.to_string(),
                username: credentials.map(|c| c.username.clone()),
            },
        )
        .await?;

        if credentials.is_none() {
            return Err(FerryError::Auth {
                message: "no repository credentials configured".to_string(),
            });
        }

        let mut inner = self.lock();
        inner.next_id += 1;
        Ok(SessionId::new(format!("mock-{}", inner.next_id)))
    }

    async fn upload(&self, session: &SessionId, file: &PublicationFile) -> FerryResult<()> {
        self.enter(
            MockOp::Upload,
            MockCall::Upload {
                session: session.clone(),
                path: file.path.clone(),
            },
        )
        .await?;
        self.lock()
            .uploaded
            .entry(session.clone())
            .or_default()
            .push(file.path.clone());
        Ok(())
    }

    async fn validate(&self, session: &SessionId) -> FerryResult<ValidationReport> {
        self.enter(
            MockOp::Validate,
            MockCall::Validate {
                session: session.clone(),
            },
        )
        .await?;
        Ok(self
            .lock()
            .report
            .clone()
            .unwrap_or_else(ValidationReport::passed))
    }

    async fn close(&self, session: &SessionId) -> FerryResult<()> {
        self.enter(
            MockOp::Close,
            MockCall::Close {
                session: session.clone(),
            },
        )
        .await
    }

    async fn release(&self, session: &SessionId) -> FerryResult<()> {
        self.enter(
            MockOp::Release,
            MockCall::Release {
                session: session.clone(),
            },
        )
        .await?;
        let mut inner = self.lock();
        if inner.released.contains(session) {
            return Err(FerryError::Rejected {
                message: "version already released".to_string(),
            });
        }
        inner.released.push(session.clone());
        if inner.lost_releases > 0 {
            inner.lost_releases -= 1;
            return Err(FerryError::Transport {
                message: "connection closed before the release answer arrived".to_string(),
            });
        }
        Ok(())
    }

    async fn drop_session(&self, session: &SessionId) -> FerryResult<()> {
        self.enter(
            MockOp::Drop,
            MockCall::Drop {
                session: session.clone(),
            },
        )
        .await?;
        self.lock().dropped.push(session.clone());
        Ok(())
    }
}
