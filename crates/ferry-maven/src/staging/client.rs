use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ferry_core::config::StagingConfig;
use ferry_core::credentials::RepositoryCredentials;
use ferry_core::publication::Publication;
use ferry_util::errors::{FerryError, FerryResult};

use super::state::{Operation, SessionState};
use super::{OpenRequest, SessionId, StagingService, ValidationReport};
use crate::retry::RetryPolicy;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy)]
struct SessionRecord {
    state: SessionState,
    has_content: bool,
}

/// Drives staging sessions on a [`StagingService`] through the state
/// machine, bounding every call with a timeout and retrying the idempotent
/// ones.
///
/// Session state lives behind a mutex that is never held across an
/// `.await`, so the client can be shared by reference with a cancellation
/// path that drops whatever session is still active.
pub struct StagingClient<S> {
    service: S,
    policy: RetryPolicy,
    timeout: Duration,
    sessions: Mutex<HashMap<SessionId, SessionRecord>>,
    open_unsettled: AtomicBool,
}

impl<S: StagingService> StagingClient<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            policy: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            sessions: Mutex::new(HashMap::new()),
            open_unsettled: AtomicBool::new(false),
        }
    }

    pub fn from_config(service: S, config: &StagingConfig) -> Self {
        Self::new(service)
            .with_policy(RetryPolicy::from_config(config))
            .with_timeout(config.timeout())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn state(&self, session: &SessionId) -> Option<SessionState> {
        self.lock().get(session).map(|r| r.state)
    }

    /// The session that is open and not yet released or dropped, if any.
    pub fn active_session(&self) -> Option<SessionId> {
        self.lock()
            .iter()
            .find(|(_, r)| !r.state.is_terminal())
            .map(|(id, _)| id.clone())
    }

    /// True when an `open` call timed out or was abandoned before it
    /// answered; the service may then hold a session this client never saw.
    pub fn open_unsettled(&self) -> bool {
        self.open_unsettled.load(Ordering::SeqCst)
    }

    /// Track a session opened elsewhere (e.g. by an earlier, interrupted
    /// run) so it can be dropped.
    pub fn adopt(&self, session: SessionId) {
        self.lock().entry(session).or_insert(SessionRecord {
            state: SessionState::Open,
            has_content: false,
        });
    }

    /// Open a new session. Never retried: a repeated open could leave a
    /// second session behind on the service.
    pub async fn open(
        &self,
        credentials: Option<&RepositoryCredentials>,
        request: &OpenRequest,
    ) -> FerryResult<SessionId> {
        // Cleared only once the service has answered; a dropped future or a
        // timeout leaves it set.
        self.open_unsettled.store(true, Ordering::SeqCst);
        let answer = tokio::time::timeout(self.timeout, self.service.open(credentials, request))
            .await
            .map_err(|_| FerryError::Unavailable {
                message: format!(
                    "open on {} timed out after {}s",
                    self.service.name(),
                    self.timeout.as_secs_f32()
                ),
            })?;
        self.open_unsettled.store(false, Ordering::SeqCst);
        let id = answer.map_err(|e| match e {
            FerryError::Transport { message } => FerryError::Unavailable { message },
            other => other,
        })?;
        tracing::info!(
            "Opened staging session {id} on {} for {}",
            self.service.name(),
            request.coordinates
        );
        self.lock().insert(
            id.clone(),
            SessionRecord {
                state: SessionState::Open,
                has_content: false,
            },
        );
        Ok(id)
    }

    /// Upload every file of the publication. Each file is retried on its
    /// own, so a transient failure never re-sends what already arrived.
    pub async fn upload(&self, session: &SessionId, publication: &Publication) -> FerryResult<usize> {
        self.check(session, Operation::Upload)?;

        let files = publication.files();
        let service = &self.service;
        for file in &files {
            tracing::debug!("Uploading {} ({} bytes)", file.path, file.content.len());
            self.policy
                .run(&format!("upload of {}", file.path), move || {
                    self.timed("upload", service.upload(session, file))
                })
                .await?;
            self.with_record(session, |r| r.has_content = true);
        }

        self.transition(session, Operation::Upload)?;
        Ok(files.len())
    }

    /// Run the service-side checks. A failing report keeps the session
    /// open; it is up to the caller to drop it.
    pub async fn validate(&self, session: &SessionId) -> FerryResult<ValidationReport> {
        self.check(session, Operation::Validate { passed: true })?;
        let has_content = self.lock().get(session).is_some_and(|r| r.has_content);
        if !has_content {
            return Err(FerryError::State {
                message: format!("session {session} has no uploaded content to validate"),
            });
        }

        let report = self
            .timed("validate", self.service.validate(session))
            .await?;
        self.transition(
            session,
            Operation::Validate {
                passed: report.passed,
            },
        )?;
        Ok(report)
    }

    /// Close a validated session. Closing an already closed session
    /// succeeds without calling the service again.
    pub async fn close(&self, session: &SessionId) -> FerryResult<()> {
        if self.state(session) == Some(SessionState::Closed) {
            tracing::debug!("Session {session} is already closed");
            return Ok(());
        }
        self.check(session, Operation::Close)?;

        let service = &self.service;
        self.policy
            .run("close", move || self.timed("close", service.close(session)))
            .await?;
        self.transition(session, Operation::Close)
    }

    /// Release a closed session. After this the version is public.
    pub async fn release(&self, session: &SessionId) -> FerryResult<()> {
        self.check(session, Operation::Release)?;

        let service = &self.service;
        let answer_lost = &AtomicBool::new(false);
        let result = self
            .policy
            .run("release", move || async move {
                let result = self.timed("release", service.release(session)).await;
                if matches!(result, Err(ref e) if e.is_retryable()) {
                    answer_lost.store(true, Ordering::SeqCst);
                }
                result
            })
            .await;

        match result {
            Ok(()) => {}
            // The earlier attempt may have gone through; a refusal now says
            // nothing about whether the version is public.
            Err(FerryError::Rejected { message }) if answer_lost.load(Ordering::SeqCst) => {
                tracing::warn!("Release of session {session} refused after a lost answer: {message}");
                return Err(FerryError::OutcomeUnknown {
                    message: format!(
                        "release of session {session} may already have succeeded; the retry was refused: {message}"
                    ),
                });
            }
            Err(e) => return Err(e),
        }
        self.transition(session, Operation::Release)?;
        tracing::info!("Released staging session {session}");
        Ok(())
    }

    /// Abandon a session. A session that already ended is left alone.
    pub async fn drop_session(&self, session: &SessionId) -> FerryResult<()> {
        match self.state(session) {
            None => {
                return Err(unknown(session));
            }
            Some(state) if state.is_terminal() => {
                tracing::debug!("Session {session} is already {state}; nothing to drop");
                return Ok(());
            }
            Some(_) => {}
        }

        self.timed("drop", self.service.drop_session(session))
            .await?;
        self.transition(session, Operation::Drop)?;
        tracing::info!("Dropped staging session {session}");
        Ok(())
    }

    async fn timed<T>(
        &self,
        what: &str,
        call: impl Future<Output = FerryResult<T>>,
    ) -> FerryResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(FerryError::Transport {
                message: format!(
                    "{what} on {} timed out after {}s",
                    self.service.name(),
                    self.timeout.as_secs_f32()
                ),
            }),
        }
    }

    fn check(&self, session: &SessionId, op: Operation) -> FerryResult<SessionState> {
        let state = self.state(session).ok_or_else(|| unknown(session))?;
        state.apply(op).ok_or_else(|| FerryError::State {
            message: format!("cannot {op} session {session} while it is {state}"),
        })
    }

    fn transition(&self, session: &SessionId, op: Operation) -> FerryResult<()> {
        let mut sessions = self.lock();
        let record = sessions.get_mut(session).ok_or_else(|| unknown(session))?;
        let next = record.state.apply(op).ok_or_else(|| FerryError::State {
            message: format!("cannot {op} session {session} while it is {}", record.state),
        })?;
        if next != record.state {
            tracing::debug!("Session {session}: {} -> {next}", record.state);
        }
        record.state = next;
        Ok(())
    }

    fn with_record(&self, session: &SessionId, f: impl FnOnce(&mut SessionRecord)) {
        if let Some(record) = self.lock().get_mut(session) {
            f(record);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn unknown(session: &SessionId) -> FerryError {
    FerryError::State {
        message: format!("unknown staging session {session}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::mock::{MockCall, MockStaging};
    use ferry_core::artifact::{Artifact, Classifier};
    use ferry_core::coordinates::Coordinates;
    use ferry_core::credentials::Secret;
    use ferry_core::publication::{PublicationBuilder, SigningMode};

    fn creds() -> RepositoryCredentials {
        RepositoryCredentials {
            username: "deployer".to_string(),
            password: Secret::new("s3cret"),
        }
    }

    fn request() -> OpenRequest {
        OpenRequest::new(Coordinates::new("io.example", "lib", "1.0.0"))
    }

    fn publication() -> Publication {
        PublicationBuilder::new(Coordinates::new("io.example", "lib", "1.0.0"))
            .artifact(Artifact::new(Classifier::Primary, "jar", b"jar".to_vec()))
            .signing(SigningMode::Disabled)
            .build()
            .unwrap()
    }

    fn client(mock: &MockStaging) -> StagingClient<MockStaging> {
        StagingClient::new(mock.clone()).with_policy(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            multiplier: 2,
        })
    }

    async fn validated(client: &StagingClient<MockStaging>) -> SessionId {
        let id = client.open(Some(&creds()), &request()).await.unwrap();
        client.upload(&id, &publication()).await.unwrap();
        assert!(client.validate(&id).await.unwrap().passed);
        id
    }

    #[tokio::test]
    async fn full_lifecycle_reaches_released() {
        let mock = MockStaging::new();
        let client = client(&mock);
        let id = validated(&client).await;
        client.close(&id).await.unwrap();
        client.release(&id).await.unwrap();
        assert_eq!(client.state(&id), Some(SessionState::Released));
        assert_eq!(client.active_session(), None);
    }

    #[tokio::test]
    async fn close_twice_is_a_no_op() {
        let mock = MockStaging::new();
        let client = client(&mock);
        let id = validated(&client).await;
        client.close(&id).await.unwrap();
        client.close(&id).await.unwrap();
        assert_eq!(client.state(&id), Some(SessionState::Closed));
        let closes = mock
            .calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Close { .. }))
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn release_from_open_or_validated_is_a_state_error() {
        let mock = MockStaging::new();
        let client = client(&mock);
        let id = client.open(Some(&creds()), &request()).await.unwrap();
        let err = client.release(&id).await.unwrap_err();
        assert!(matches!(err, FerryError::State { .. }), "got {err:?}");

        client.upload(&id, &publication()).await.unwrap();
        client.validate(&id).await.unwrap();
        let err = client.release(&id).await.unwrap_err();
        assert!(matches!(err, FerryError::State { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn validate_without_content_is_a_state_error() {
        let mock = MockStaging::new();
        let client = client(&mock);
        let id = client.open(Some(&creds()), &request()).await.unwrap();
        let err = client.validate(&id).await.unwrap_err();
        assert!(matches!(err, FerryError::State { .. }));
    }

    #[tokio::test]
    async fn unknown_session_is_a_state_error() {
        let client = client(&MockStaging::new());
        let ghost = SessionId::new("ghost");
        assert!(matches!(
            client.close(&ghost).await,
            Err(FerryError::State { .. })
        ));
        assert!(matches!(
            client.drop_session(&ghost).await,
            Err(FerryError::State { .. })
        ));
    }

    #[tokio::test]
    async fn drop_after_release_is_a_no_op() {
        let mock = MockStaging::new();
        let client = client(&mock);
        let id = validated(&client).await;
        client.close(&id).await.unwrap();
        client.release(&id).await.unwrap();
        client.drop_session(&id).await.unwrap();
        assert_eq!(client.state(&id), Some(SessionState::Released));
        assert!(!mock.calls().iter().any(|c| matches!(c, MockCall::Drop { .. })));
    }

    #[tokio::test]
    async fn upload_retries_only_the_failed_file() {
        let mock = MockStaging::new().fail_times(crate::staging::mock::MockOp::Upload, 1, || {
            FerryError::Transport {
                message: "connection reset".into(),
            }
        });
        let client = client(&mock);
        let id = client.open(Some(&creds()), &request()).await.unwrap();
        let files = client.upload(&id, &publication()).await.unwrap();

        let uploads = mock
            .calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Upload { .. }))
            .count();
        assert_eq!(uploads, files + 1);
        assert_eq!(mock.uploaded_paths().len(), files);
    }

    #[tokio::test]
    async fn open_transport_failure_is_unavailable() {
        let mock = MockStaging::new().fail_times(crate::staging::mock::MockOp::Open, 1, || {
            FerryError::Transport {
                message: "refused".into(),
            }
        });
        let client = client(&mock);
        let err = client.open(Some(&creds()), &request()).await.unwrap_err();
        assert!(matches!(err, FerryError::Unavailable { .. }), "got {err:?}");
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn slow_calls_time_out_as_transport_errors() {
        let mock = MockStaging::new().hang_on(crate::staging::mock::MockOp::Close);
        let client = client(&mock)
            .with_timeout(Duration::from_millis(50))
            .with_policy(RetryPolicy::none());
        let id = validated(&client).await;
        let err = client.close(&id).await.unwrap_err();
        assert!(matches!(err, FerryError::Transport { .. }), "got {err:?}");
        assert_eq!(client.state(&id), Some(SessionState::Validated));
    }

    #[tokio::test]
    async fn refused_retry_after_lost_release_answer_is_unknown() {
        let mock = MockStaging::new().lose_release_response(1);
        let client = client(&mock);
        let id = validated(&client).await;
        client.close(&id).await.unwrap();

        let err = client.release(&id).await.unwrap_err();
        assert!(matches!(err, FerryError::OutcomeUnknown { .. }), "got {err:?}");
        assert_eq!(mock.released(), vec![id.clone()]);
        assert_eq!(client.state(&id), Some(SessionState::Closed));
    }

    #[tokio::test]
    async fn refused_first_release_stays_rejected() {
        let mock = MockStaging::new().fail_times(crate::staging::mock::MockOp::Release, 1, || {
            FerryError::Rejected {
                message: "version already released".into(),
            }
        });
        let client = client(&mock);
        let id = validated(&client).await;
        client.close(&id).await.unwrap();

        let err = client.release(&id).await.unwrap_err();
        assert!(matches!(err, FerryError::Rejected { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn lost_release_answer_with_successful_retry_is_released() {
        let mock = MockStaging::new().fail_times(crate::staging::mock::MockOp::Release, 1, || {
            FerryError::Transport {
                message: "reset".into(),
            }
        });
        let client = client(&mock);
        let id = validated(&client).await;
        client.close(&id).await.unwrap();
        client.release(&id).await.unwrap();
        assert_eq!(client.state(&id), Some(SessionState::Released));
    }

    #[tokio::test]
    async fn timed_out_open_is_left_unsettled() {
        let mock = MockStaging::new().hang_on(crate::staging::mock::MockOp::Open);
        let client = client(&mock).with_timeout(Duration::from_millis(50));
        let err = client.open(Some(&creds()), &request()).await.unwrap_err();
        assert!(matches!(err, FerryError::Unavailable { .. }), "got {err:?}");
        assert!(client.open_unsettled());
        assert_eq!(client.active_session(), None);
    }

    #[tokio::test]
    async fn answered_open_is_settled() {
        let mock = MockStaging::new().fail_times(crate::staging::mock::MockOp::Open, 1, || {
            FerryError::Transport {
                message: "refused".into(),
            }
        });
        let client = client(&mock);
        assert!(client.open(Some(&creds()), &request()).await.is_err());
        assert!(!client.open_unsettled());
        client.open(Some(&creds()), &request()).await.unwrap();
        assert!(!client.open_unsettled());
    }
}
