//! Session manager service.
//!
//! Stateless over a `SessionRepository`: every call reads and writes through
//! the store, so concurrent calls across sessions share nothing in-process.

use std::time::Duration;

use tracing::{debug, info, warn};
use tutor_types::error::{RepositoryError, SessionError, ValidationError};
use tutor_types::session::{EndReason, Session, SessionUpdate};
use tutor_types::time;
use uuid::Uuid;

use crate::repository::session::SessionRepository;

/// How many times `start_session` re-runs after losing a race against a
/// concurrent start for the same user.
const START_ATTEMPTS: usize = 3;

/// Orchestrates session creation, updates, and termination.
pub struct SessionManager<S: SessionRepository> {
    repo: S,
}

impl<S: SessionRepository> SessionManager<S> {
    pub fn new(repo: S) -> Self {
        Self { repo }
    }

    /// Access the session repository.
    pub fn repo(&self) -> &S {
        &self.repo
    }

    /// Start a new active session for a user.
    ///
    /// Any session still active for the user is ended first with reason
    /// `system`. After a successful return exactly one active session exists
    /// for the user, the returned one.
    pub async fn start_session(
        &self,
        user_id: Uuid,
        device_info: Option<String>,
    ) -> Result<Session, SessionError> {
        if user_id.is_nil() {
            return Err(ValidationError::required("user_id").into());
        }

        let mut last_conflict = String::new();
        for attempt in 1..=START_ATTEMPTS {
            let now = time::now();

            if let Some(previous) = self.repo.get_active_for_user(&user_id).await? {
                let ended = self
                    .repo
                    .end_active_for_user(&user_id, EndReason::System, now)
                    .await?;
                info!(
                    user_id = %user_id,
                    previous_session = %previous.id,
                    ended,
                    "Ended active session before starting a new one"
                );
            }

            let session = Session::start(user_id, device_info.clone(), now);
            match self.repo.create(&session).await {
                Ok(created) => {
                    info!(user_id = %user_id, session_id = %created.id, "Session started");
                    return Ok(created);
                }
                Err(RepositoryError::Conflict(msg)) => {
                    warn!(user_id = %user_id, attempt, "Concurrent session start detected");
                    last_conflict = msg;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(SessionError::Conflict(last_conflict))
    }

    /// The most recently started active session of a user, if any.
    pub async fn get_active_session(&self, user_id: &Uuid) -> Result<Option<Session>, SessionError> {
        Ok(self.repo.get_active_for_user(user_id).await?)
    }

    /// Get a session by ID.
    pub async fn get_session(&self, session_id: &Uuid) -> Result<Session, SessionError> {
        self.repo
            .get(session_id)
            .await?
            .ok_or(SessionError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// Absent fields are untouched. `is_active = false` ends the session with
    /// the given reason (default `explicit`); ending an already-ended session
    /// keeps its original end stamp and reason. An ended session cannot be
    /// reactivated.
    pub async fn update_session(
        &self,
        session_id: &Uuid,
        update: SessionUpdate,
    ) -> Result<Session, SessionError> {
        let session = self.get_session(session_id).await?;

        if update.end_reason.is_some() && update.is_active != Some(false) {
            return Err(ValidationError::field(
                "end_reason",
                "end_reason is only accepted together with is_active = false",
            )
            .into());
        }
        if update.is_active == Some(true) && !session.is_active {
            return Err(ValidationError::field(
                "is_active",
                "an ended session cannot be reactivated; start a new session instead",
            )
            .into());
        }

        let now = time::now();

        if update.current_concept.is_some() || update.concepts_covered.is_some() {
            self.repo
                .update_topics(
                    session_id,
                    update.current_concept.as_deref(),
                    update.concepts_covered.as_deref(),
                    now,
                )
                .await?;
        }

        if update.is_active == Some(false) {
            let reason = update.end_reason.unwrap_or(EndReason::Explicit);
            if self.repo.end(session_id, reason, now).await? {
                info!(session_id = %session_id, reason = %reason, "Session ended");
            } else {
                debug!(session_id = %session_id, "Session already ended");
            }
        }

        self.get_session(session_id).await
    }

    /// End a session explicitly. Idempotent: ending an ended session returns
    /// it unchanged.
    pub async fn end_session(&self, session_id: &Uuid) -> Result<Session, SessionError> {
        self.update_session(session_id, SessionUpdate::end(EndReason::Explicit))
            .await
    }

    /// Advance the session's last-message timestamp to now.
    pub async fn touch(&self, session_id: &Uuid) -> Result<(), SessionError> {
        Ok(self.repo.touch(session_id, time::now()).await?)
    }

    /// End every active session idle for longer than `idle_for`, with reason
    /// `timeout`. Returns the sessions this call ended.
    pub async fn expire_idle_sessions(&self, idle_for: Duration) -> Result<Vec<Session>, SessionError> {
        let now = time::now();
        let idle_for = chrono::Duration::from_std(idle_for)
            .map_err(|e| ValidationError::new(format!("invalid idle timeout: {e}")))?;
        let cutoff = now - idle_for;

        let mut expired = Vec::new();
        for mut session in self.repo.list_idle(cutoff).await? {
            match self.repo.end_if_idle(&session.id, cutoff, now).await {
                Ok(true) => {
                    session.end(EndReason::Timeout, now);
                    info!(session_id = %session.id, user_id = %session.user_id, "Idle session expired");
                    expired.push(session);
                }
                // Ended or touched since the scan.
                Ok(false) => {}
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Failed to expire idle session");
                }
            }
        }

        Ok(expired)
    }
}
