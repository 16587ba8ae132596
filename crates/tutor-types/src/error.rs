use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::message::Message;

/// A rejected input, optionally tied to the offending field.
///
/// Always produced before any write reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: Option<String>,
    pub message: String,
}

impl ValidationError {
    /// Validation failure attributed to a single input field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Validation failure not tied to a specific field.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Shorthand for a missing required field.
    pub fn required(field: &str) -> Self {
        Self::field(field, format!("{field} is required"))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{field}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors related to user profile operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("user not found")]
    NotFound,

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors related to session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("session not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Errors from the message pipeline.
///
/// The two storage variants are distinct: `UserMessageNotPersisted` means the
/// turn never reached the store, `ReplyNotPersisted` means the user message
/// is committed but the bot reply is missing, so the whole turn may be retried.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("session not found")]
    SessionNotFound,

    #[error("session has ended; start a new session to keep chatting")]
    SessionEnded,

    #[error("failed to save message: {0}")]
    UserMessageNotPersisted(String),

    #[error("failed to save bot response: {detail}")]
    ReplyNotPersisted {
        user_message: Box<Message>,
        detail: String,
    },

    #[error("storage error: {0}")]
    StorageError(String),
}

/// Reply generation failures. Internal only: the pipeline degrades these to
/// a fallback reply and never surfaces them to callers.
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("responder timed out after {0:?}")]
    Timeout(Duration),

    #[error("responder failed: {0}")]
    Failed(String),
}

/// Errors from repository operations (used by trait definitions in tutor-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<RepositoryError> for UserError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => UserError::NotFound,
            other => UserError::StorageError(other.to_string()),
        }
    }
}

impl From<RepositoryError> for SessionError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => SessionError::NotFound,
            RepositoryError::Conflict(msg) => SessionError::Conflict(msg),
            other => SessionError::StorageError(other.to_string()),
        }
    }
}
