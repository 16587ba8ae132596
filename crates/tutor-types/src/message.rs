//! Message and turn types.
//!
//! Messages are immutable once persisted and ordered by `sent_at` within a
//! session. A turn is one user message paired with one bot message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    User,
    Bot,
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderType::User => write!(f, "user"),
            SenderType::Bot => write!(f, "bot"),
        }
    }
}

impl FromStr for SenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(SenderType::User),
            "bot" => Ok(SenderType::Bot),
            other => Err(format!("invalid sender type: '{other}'")),
        }
    }
}

/// Stored delivery status. The server only ever records `Sent`; `Failed`
/// exists so clients can share the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(DeliveryStatus::Sent),
            "failed" => Ok(DeliveryStatus::Failed),
            other => Err(format!("invalid delivery status: '{other}'")),
        }
    }
}

/// One persisted message in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "message_id")]
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub sender_type: SenderType,
    pub message_text: String,
    pub intent: Option<String>,
    /// Client correlation id, carried through unchanged. Advisory only.
    pub temp_id: Option<String>,
    pub status: DeliveryStatus,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    /// Build a message stamped `sent` at `now`.
    pub fn new(
        session_id: Uuid,
        user_id: Uuid,
        sender_type: SenderType,
        message_text: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            user_id,
            sender_type,
            message_text,
            intent: None,
            temp_id: None,
            status: DeliveryStatus::Sent,
            sent_at: now,
        }
    }
}

/// Input to the message pipeline for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInput {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub message_text: String,
    pub temp_id: Option<String>,
    pub intent: Option<String>,
}

/// Both records of a completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "userMessage")]
    pub user_message: Message,
    #[serde(rename = "botMessage")]
    pub bot_message: Message,
}
