//! SQLite message repository implementation.
//!
//! Messages are append-only: there is no update or delete path.

use sqlx::Row;
use tutor_core::repository::message::MessageRepository;
use tutor_types::error::RepositoryError;
use tutor_types::message::{DeliveryStatus, Message, SenderType};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_insert_error, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    session_id: String,
    user_id: String,
    sender_type: String,
    message_text: String,
    intent: Option<String>,
    temp_id: Option<String>,
    status: String,
    sent_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            sender_type: row.try_get("sender_type")?,
            message_text: row.try_get("message_text")?,
            intent: row.try_get("intent")?,
            temp_id: row.try_get("temp_id")?,
            status: row.try_get("status")?,
            sent_at: row.try_get("sent_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let sender_type: SenderType = self
            .sender_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let status: DeliveryStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            session_id: parse_uuid(&self.session_id, "session_id")?,
            user_id: parse_uuid(&self.user_id, "user_id")?,
            sender_type,
            message_text: self.message_text,
            intent: self.intent,
            temp_id: self.temp_id,
            status,
            sent_at: parse_datetime(&self.sent_at)?,
        })
    }
}

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO messages (id, session_id, user_id, sender_type, message_text, intent, temp_id, status, sent_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.session_id.to_string())
        .bind(message.user_id.to_string())
        .bind(message.sender_type.to_string())
        .bind(&message.message_text)
        .bind(&message.intent)
        .bind(&message.temp_id)
        .bind(message.status.to_string())
        .bind(format_datetime(&message.sent_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| map_insert_error(e, "message already exists"))?;

        Ok(())
    }

    async fn list_for_session(
        &self,
        session_id: &Uuid,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        // rowid breaks ties between messages stamped in the same microsecond.
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE session_id = ? ORDER BY sent_at ASC, rowid ASC LIMIT ?",
        )
        .bind(session_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn count_for_session(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM messages WHERE session_id = ?")
            .bind(session_id.to_string())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }
}
