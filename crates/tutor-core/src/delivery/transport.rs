//! Network port used by the delivery client.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tutor_types::message::{Message, Turn};
use tutor_types::session::Session;
use uuid::Uuid;

/// Error code the server returns for a turn sent to a session that has ended.
pub const SESSION_ENDED_CODE: &str = "SESSION_ENDED";

/// Failures talking to the chat server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request never got a response (connection refused, reset, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server error ({status} {code}): {message}")]
    Server {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The session a turn targeted is unknown or has already ended, so no
    /// retry against it can succeed.
    pub fn is_session_gone(&self) -> bool {
        match self {
            TransportError::Server { status: 404, .. } => true,
            TransportError::Server { code, .. } => code == SESSION_ENDED_CODE,
            _ => false,
        }
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub message_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

/// Server operations the delivery client depends on.
pub trait ChatTransport: Send + Sync {
    /// The user's active session, if any.
    fn active_session(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, TransportError>> + Send;

    /// Start a new session, ending any active one server-side.
    fn start_session(
        &self,
        user_id: &Uuid,
        device_info: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Session, TransportError>> + Send;

    fn history(
        &self,
        session_id: &Uuid,
        limit: Option<u32>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, TransportError>> + Send;

    fn post_turn(
        &self,
        request: &TurnRequest,
    ) -> impl std::future::Future<Output = Result<Turn, TransportError>> + Send;

    fn end_session(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Session, TransportError>> + Send;
}
