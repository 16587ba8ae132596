//! Session lifecycle HTTP handlers.
//!
//! Endpoints:
//! - POST   /session           - Start a session (ends any active one)
//! - GET    /session?user_id=  - Get the user's active session, or null
//! - PATCH  /session/{id}      - Partial update
//! - DELETE /session/{id}      - End a session

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use tutor_types::error::ValidationError;
use tutor_types::session::SessionUpdate;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::state::AppState;

/// Body of `POST /session`.
#[derive(Debug, Deserialize)]
pub struct StartSessionBody {
    pub user_id: Option<String>,
    pub device_info: Option<String>,
}

/// Query of `GET /session`.
#[derive(Debug, Deserialize)]
pub struct ActiveSessionQuery {
    pub user_id: Option<String>,
}

/// POST /session - Start a new session for a user.
pub async fn start_session(
    State(state): State<AppState>,
    payload: Result<Json<StartSessionBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(body) = payload?;
    let user_id = parse_uuid("user_id", body.user_id.as_deref())?;

    let session = state
        .session_manager
        .start_session(user_id, body.device_info)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "session": session }))))
}

/// GET /session?user_id= - The user's active session, or `null`.
pub async fn get_active_session(
    State(state): State<AppState>,
    query: Result<Query<ActiveSessionQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let user_id = parse_uuid("user_id", query.user_id.as_deref())?;

    let session = state.session_manager.get_active_session(&user_id).await?;

    Ok(Json(json!({ "session": session })))
}

/// PATCH /session/{id} - Apply a partial update.
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SessionUpdate>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let session_id = parse_uuid("session_id", Some(&id))?;
    let Json(update) = payload?;
    if update.is_empty() {
        return Err(ValidationError::new(
            "at least one of current_concept, concepts_covered, is_active, end_reason is required",
        )
        .into());
    }

    let session = state
        .session_manager
        .update_session(&session_id, update)
        .await?;

    Ok(Json(json!({ "session": session })))
}

/// DELETE /session/{id} - End a session. Ending an ended session returns it unchanged.
pub async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let session_id = parse_uuid("session_id", Some(&id))?;

    let session = state.session_manager.end_session(&session_id).await?;

    Ok(Json(json!({ "session": session })))
}
