//! Session repository trait definition.

use chrono::{DateTime, Utc};
use tutor_types::error::RepositoryError;
use tutor_types::session::{EndReason, Session};
use uuid::Uuid;

/// Repository trait for session persistence.
///
/// The store must enforce "at most one active session per user" itself
/// (e.g., a partial unique index): `create` of a second active session for a
/// user fails with `RepositoryError::Conflict`.
pub trait SessionRepository: Send + Sync {
    /// Insert a new session.
    fn create(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<Session, RepositoryError>> + Send;

    /// Get a session by its unique ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// Most recently started active session for a user, if any.
    fn get_active_for_user(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// Set topic fields that are `Some`, leaving the others untouched.
    ///
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    fn update_topics(
        &self,
        id: &Uuid,
        current_concept: Option<&str>,
        concepts_covered: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// End a session if it is still active.
    ///
    /// Returns `true` if this call ended it, `false` if it had already ended.
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    fn end(
        &self,
        id: &Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// End a session with reason `timeout` if it is still active and its last
    /// message is older than `cutoff`. Returns `true` if this call ended it.
    fn end_if_idle(
        &self,
        id: &Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// End every active session of a user. Returns how many were ended.
    fn end_active_for_user(
        &self,
        user_id: &Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Advance `last_message_at` to `now`.
    fn touch(
        &self,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Active sessions whose last message is older than `cutoff`.
    fn list_idle(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Session>, RepositoryError>> + Send;
}
