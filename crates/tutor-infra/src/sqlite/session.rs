//! SQLite session repository implementation.
//!
//! "At most one active session per user" is enforced by the partial unique
//! index `idx_sessions_one_active_per_user`; a violating insert surfaces as
//! `RepositoryError::Conflict`. Every other write is a single-statement
//! point update on the writer connection.

use chrono::{DateTime, Utc};
use sqlx::Row;
use tutor_core::repository::session::SessionRepository;
use tutor_types::error::RepositoryError;
use tutor_types::session::{EndReason, Session};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_insert_error, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `SessionRepository`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        // Writer connection: must observe the statement that just ran on it.
        let row = sqlx::query("SELECT 1 FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(row.is_some())
    }

    fn rows_to_sessions(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Session>, RepositoryError> {
        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let session_row =
                SessionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            sessions.push(session_row.into_session()?);
        }
        Ok(sessions)
    }
}

/// Internal row type for mapping SQLite rows to domain Session.
struct SessionRow {
    id: String,
    user_id: String,
    is_active: bool,
    current_concept: Option<String>,
    concepts_covered: Option<String>,
    device_info: Option<String>,
    started_at: String,
    last_message_at: String,
    ended_at: Option<String>,
    end_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            is_active: row.try_get("is_active")?,
            current_concept: row.try_get("current_concept")?,
            concepts_covered: row.try_get("concepts_covered")?,
            device_info: row.try_get("device_info")?,
            started_at: row.try_get("started_at")?,
            last_message_at: row.try_get("last_message_at")?,
            ended_at: row.try_get("ended_at")?,
            end_reason: row.try_get("end_reason")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        let concepts_covered = self
            .concepts_covered
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid concepts_covered: {e}")))?;
        let end_reason = self
            .end_reason
            .as_deref()
            .map(str::parse::<EndReason>)
            .transpose()
            .map_err(RepositoryError::Query)?;

        Ok(Session {
            id: parse_uuid(&self.id, "session id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            is_active: self.is_active,
            current_concept: self.current_concept,
            concepts_covered,
            device_info: self.device_info,
            started_at: parse_datetime(&self.started_at)?,
            last_message_at: parse_datetime(&self.last_message_at)?,
            ended_at: self.ended_at.as_deref().map(parse_datetime).transpose()?,
            end_reason,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn encode_concepts(concepts: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(concepts)
        .map_err(|e| RepositoryError::Query(format!("invalid concepts_covered: {e}")))
}

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session, RepositoryError> {
        let concepts = session
            .concepts_covered
            .as_deref()
            .map(encode_concepts)
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO sessions (id, user_id, is_active, current_concept, concepts_covered, device_info,
                                     started_at, last_message_at, ended_at, end_reason, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(session.is_active)
        .bind(&session.current_concept)
        .bind(concepts)
        .bind(&session.device_info)
        .bind(format_datetime(&session.started_at))
        .bind(format_datetime(&session.last_message_at))
        .bind(session.ended_at.as_ref().map(format_datetime))
        .bind(session.end_reason.map(|r| r.to_string()))
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_insert_error(e, "user already has an active session"))?;

        Ok(session.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row =
                    SessionRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn get_active_for_user(&self, user_id: &Uuid) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM sessions WHERE user_id = ? AND is_active = 1 ORDER BY started_at DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row =
                    SessionRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn update_topics(
        &self,
        id: &Uuid,
        current_concept: Option<&str>,
        concepts_covered: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let concepts = concepts_covered.map(encode_concepts).transpose()?;

        let result = sqlx::query(
            r#"UPDATE sessions
               SET current_concept = COALESCE(?, current_concept),
                   concepts_covered = COALESCE(?, concepts_covered),
                   updated_at = ?
               WHERE id = ?"#,
        )
        .bind(current_concept)
        .bind(concepts)
        .bind(format_datetime(&now))
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn end(&self, id: &Uuid, reason: EndReason, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let stamp = format_datetime(&now);
        let result = sqlx::query(
            r#"UPDATE sessions
               SET is_active = 0, ended_at = ?, end_reason = ?, updated_at = ?
               WHERE id = ? AND is_active = 1"#,
        )
        .bind(&stamp)
        .bind(reason.to_string())
        .bind(&stamp)
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        if self.exists(id).await? {
            Ok(false)
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn end_if_idle(
        &self,
        id: &Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let stamp = format_datetime(&now);
        let result = sqlx::query(
            r#"UPDATE sessions
               SET is_active = 0, ended_at = ?, end_reason = ?, updated_at = ?
               WHERE id = ? AND is_active = 1 AND last_message_at < ?"#,
        )
        .bind(&stamp)
        .bind(EndReason::Timeout.to_string())
        .bind(&stamp)
        .bind(id.to_string())
        .bind(format_datetime(&cutoff))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn end_active_for_user(
        &self,
        user_id: &Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let stamp = format_datetime(&now);
        let result = sqlx::query(
            r#"UPDATE sessions
               SET is_active = 0, ended_at = ?, end_reason = ?, updated_at = ?
               WHERE user_id = ? AND is_active = 1"#,
        )
        .bind(&stamp)
        .bind(reason.to_string())
        .bind(&stamp)
        .bind(user_id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn touch(&self, id: &Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        let stamp = format_datetime(&now);
        let result = sqlx::query(
            "UPDATE sessions SET last_message_at = MAX(last_message_at, ?), updated_at = ? WHERE id = ?",
        )
        .bind(&stamp)
        .bind(&stamp)
        .bind(id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE is_active = 1 AND last_message_at < ? ORDER BY last_message_at ASC",
        )
        .bind(format_datetime(&cutoff))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Self::rows_to_sessions(&rows)
    }
}
