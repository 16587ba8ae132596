//! Message repository trait definition.

use tutor_types::error::RepositoryError;
use tutor_types::message::Message;
use uuid::Uuid;

/// Repository trait for message persistence.
///
/// Messages are append-only: there is no update or delete.
pub trait MessageRepository: Send + Sync {
    /// Append a message to its session.
    fn append(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Messages for a session ordered by `sent_at` ascending (insertion order
    /// breaks ties), capped at `limit`.
    fn list_for_session(
        &self,
        session_id: &Uuid,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Total number of messages in a session.
    fn count_for_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
