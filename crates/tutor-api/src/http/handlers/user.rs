//! User profile HTTP handlers.
//!
//! Endpoints:
//! - POST  /user           - Create a profile (onboarding)
//! - GET   /user?user_id=  - Fetch a profile
//! - PATCH /user           - Partial profile update (`user_id` in the body)

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use tutor_types::user::{CreateUserRequest, UpdateUserRequest};

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::state::AppState;

/// Query of `GET /user`.
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

/// Body of `PATCH /user`.
#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub update: UpdateUserRequest,
}

/// POST /user - Validate and persist a new profile.
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(request) = payload?;

    let user = state.user_service.create_user(request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// GET /user?user_id= - Fetch a profile.
pub async fn get_user(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let user_id = parse_uuid("user_id", query.user_id.as_deref())?;

    let user = state.user_service.get_user(&user_id).await?;

    Ok(Json(json!({ "user": user })))
}

/// PATCH /user - Apply the present profile fields.
pub async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserBody>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(body) = payload?;
    let user_id = parse_uuid("user_id", body.user_id.as_deref())?;

    let user = state.user_service.update_user(&user_id, body.update).await?;

    Ok(Json(json!({ "user": user })))
}
