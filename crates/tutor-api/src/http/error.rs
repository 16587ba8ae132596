//! Application error type mapping to HTTP status codes and the error body.
//!
//! Every failure is rendered as
//! `{"error": {"code", "message", "field"?, "details"?}}`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::error;

use tutor_types::error::{ChatError, SessionError, UserError, ValidationError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Session lifecycle errors.
    Session(SessionError),
    /// Message pipeline errors.
    Chat(ChatError),
    /// User profile errors.
    User(UserError),
    /// Request-level validation (bad ids, missing params, malformed bodies).
    Validation(ValidationError),
    /// Generic internal error.
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Session(e)
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        AppError::User(e)
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(ValidationError::new(e.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(ValidationError::new(e.body_text()))
    }
}

/// Rendered form of an error before it becomes a response.
struct ErrorBody {
    status: StatusCode,
    code: &'static str,
    message: String,
    field: Option<String>,
    details: Option<Value>,
}

impl ErrorBody {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    fn validation(e: &ValidationError) -> Self {
        Self {
            field: e.field.clone(),
            ..Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.message.clone())
        }
    }

    fn storage(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", detail)
    }
}

impl AppError {
    fn body(&self) -> ErrorBody {
        match self {
            AppError::Validation(e)
            | AppError::Session(SessionError::Validation(e))
            | AppError::Chat(ChatError::Validation(e))
            | AppError::User(UserError::Validation(e)) => ErrorBody::validation(e),

            AppError::Session(SessionError::NotFound) | AppError::Chat(ChatError::SessionNotFound) => {
                ErrorBody::new(StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", "Session not found")
            }
            AppError::Chat(e @ ChatError::SessionEnded) => ErrorBody {
                field: Some("session_id".to_string()),
                ..ErrorBody::new(StatusCode::BAD_REQUEST, "SESSION_ENDED", e.to_string())
            },
            AppError::Session(SessionError::Conflict(msg)) => {
                ErrorBody::new(StatusCode::CONFLICT, "SESSION_CONFLICT", msg.clone())
            }
            AppError::Session(e @ SessionError::StorageError(_)) => ErrorBody::storage(e.to_string()),

            AppError::Chat(ChatError::ReplyNotPersisted { user_message, detail }) => ErrorBody {
                details: Some(json!({ "userMessage": user_message })),
                ..ErrorBody::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "REPLY_NOT_PERSISTED",
                    format!("Failed to save bot response: {detail}"),
                )
            },
            AppError::Chat(e @ (ChatError::UserMessageNotPersisted(_) | ChatError::StorageError(_))) => {
                ErrorBody::storage(e.to_string())
            }

            AppError::User(UserError::NotFound) => {
                ErrorBody::new(StatusCode::NOT_FOUND, "USER_NOT_FOUND", "User not found")
            }
            AppError::User(e @ UserError::StorageError(_)) => ErrorBody::storage(e.to_string()),

            AppError::Internal(msg) => {
                ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = self.body();
        if body.status.is_server_error() {
            error!(code = body.code, message = %body.message, "Request failed");
        }

        let mut error = json!({
            "code": body.code,
            "message": body.message,
        });
        if let Some(field) = body.field {
            error["field"] = json!(field);
        }
        if let Some(details) = body.details {
            error["details"] = details;
        }

        (body.status, Json(json!({ "error": error }))).into_response()
    }
}
