//! Chat turn and history HTTP handlers.
//!
//! Endpoints:
//! - POST /chat                      - Post one turn (user message + bot reply)
//! - GET  /chat?session_id=&limit=   - Session history, oldest first

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use tutor_types::message::{Turn, TurnInput};

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::state::AppState;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct PostTurnBody {
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub message_text: Option<String>,
    pub temp_id: Option<String>,
    pub intent: Option<String>,
}

/// Query of `GET /chat`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub session_id: Option<String>,
    pub limit: Option<u32>,
}

/// POST /chat - Run one turn through the message pipeline.
///
/// The turn runs on its own task: once started it completes both writes
/// even if the client disconnects and this handler future is dropped.
pub async fn post_turn(
    State(state): State<AppState>,
    payload: Result<Json<PostTurnBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Turn>), AppError> {
    let start = Instant::now();
    let Json(body) = payload?;

    let input = TurnInput {
        session_id: parse_uuid("session_id", body.session_id.as_deref())?,
        user_id: parse_uuid("user_id", body.user_id.as_deref())?,
        message_text: body.message_text.unwrap_or_default(),
        temp_id: body.temp_id,
        intent: body.intent,
    };

    let pipeline = state.message_pipeline.clone();
    let turn = tokio::spawn(async move { pipeline.post_turn(input).await })
        .await
        .map_err(|e| AppError::Internal(format!("turn task failed: {e}")))??;

    debug!(
        session_id = %turn.user_message.session_id,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Turn served"
    );

    Ok((StatusCode::CREATED, Json(turn)))
}

/// GET /chat?session_id=&limit= - Messages of a session in send order.
pub async fn get_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let session_id = parse_uuid("session_id", query.session_id.as_deref())?;

    let messages = state
        .message_pipeline
        .get_history(&session_id, query.limit)
        .await?;

    Ok(Json(json!({ "messages": messages })))
}
