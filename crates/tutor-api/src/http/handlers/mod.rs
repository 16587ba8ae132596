//! HTTP request handlers for the REST API.

pub mod chat;
pub mod health;
pub mod session;
pub mod user;

use tutor_types::error::ValidationError;
use uuid::Uuid;

use crate::http::error::AppError;

/// Parse a required UUID from a path or query parameter.
///
/// Missing, blank, and malformed values all become a 400 naming `field`.
pub(crate) fn parse_uuid(field: &str, value: Option<&str>) -> Result<Uuid, AppError> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValidationError::required(field))?;
    value
        .parse::<Uuid>()
        .map_err(|_| ValidationError::field(field, format!("Invalid UUID: {value}")).into())
}
