//! Local conversation view with per-message delivery state.
//!
//! Entries are kept in submission order and new entries are only ever
//! appended, so a slow round trip never reorders what is already shown.
//! A failed entry stays in place when retried; it is marked as superseded by
//! the new attempt and cannot be retried a second time.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tutor_types::message::{Message, SenderType, Turn};
use uuid::Uuid;

/// Client-generated id attached to an outbound message until the server
/// assigns a permanent one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(format!("temp_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery state of one local entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Sending,
    Sent,
    Failed,
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryState::Sending => write!(f, "sending"),
            DeliveryState::Sent => write!(f, "sent"),
            DeliveryState::Failed => write!(f, "failed"),
        }
    }
}

/// Identity of a local entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryId {
    /// Not yet acknowledged by the server.
    Pending(CorrelationId),
    /// Server-assigned message id.
    Server(Uuid),
    /// Rendered locally only, never persisted (the welcome greeting).
    Local,
}

/// One rendered message.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: EntryId,
    pub correlation_id: Option<CorrelationId>,
    pub sender: SenderType,
    pub text: String,
    pub state: DeliveryState,
    pub timestamp: DateTime<Utc>,
    /// Set on a failed entry once it has been retried.
    pub retried_as: Option<CorrelationId>,
}

impl Entry {
    fn from_message(message: Message) -> Self {
        Self {
            id: EntryId::Server(message.id),
            correlation_id: None,
            sender: message.sender_type,
            text: message.message_text,
            state: DeliveryState::Sent,
            timestamp: message.sent_at,
            retried_as: None,
        }
    }

    /// True for a failed entry that has not been retried yet.
    pub fn is_retryable(&self) -> bool {
        self.state == DeliveryState::Failed && self.retried_as.is_none()
    }
}

/// Rejected ledger transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeliveryError {
    #[error("no entry with correlation id {0}")]
    UnknownEntry(String),

    #[error("cannot {action} a message that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: DeliveryState,
    },

    #[error("message was already retried as {0}")]
    AlreadyRetried(String),

    #[error("server echoed correlation id {got:?}, expected {expected}")]
    CorrelationMismatch { expected: String, got: Option<String> },

    #[error("message text is empty")]
    EmptyText,

    #[error("no active session")]
    NoSession,
}

/// Explicit state container for one conversation on the client.
#[derive(Debug, Default)]
pub struct DeliveryLedger {
    entries: Vec<Entry>,
    banner: Option<String>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, correlation_id: &CorrelationId) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.correlation_id.as_ref() == Some(correlation_id))
    }

    /// Most recent entry that can still be retried.
    pub fn last_retryable(&self) -> Option<&Entry> {
        self.entries.iter().rev().find(|e| e.is_retryable())
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn set_banner(&mut self, message: impl Into<String>) {
        self.banner = Some(message.into());
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Replace the view with persisted history, in server order.
    pub fn load_history(&mut self, messages: Vec<Message>) {
        self.entries = messages.into_iter().map(Entry::from_message).collect();
    }

    /// Append a bot greeting that exists only locally.
    pub fn push_welcome(&mut self, text: impl Into<String>) {
        self.entries.push(Entry {
            id: EntryId::Local,
            correlation_id: None,
            sender: SenderType::Bot,
            text: text.into(),
            state: DeliveryState::Sent,
            timestamp: Utc::now(),
            retried_as: None,
        });
    }

    /// Optimistically render an outbound message in `sending`.
    pub fn submit(&mut self, text: impl Into<String>) -> Result<CorrelationId, DeliveryError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(DeliveryError::EmptyText);
        }
        let correlation_id = CorrelationId::new();
        self.entries.push(Entry {
            id: EntryId::Pending(correlation_id.clone()),
            correlation_id: Some(correlation_id.clone()),
            sender: SenderType::User,
            text,
            state: DeliveryState::Sending,
            timestamp: Utc::now(),
            retried_as: None,
        });
        Ok(correlation_id)
    }

    /// `sending -> sent`: adopt the server identity and append the bot reply.
    pub fn confirm(&mut self, correlation_id: &CorrelationId, turn: Turn) -> Result<(), DeliveryError> {
        if let Some(echoed) = &turn.user_message.temp_id {
            if echoed != correlation_id.as_str() {
                return Err(DeliveryError::CorrelationMismatch {
                    expected: correlation_id.to_string(),
                    got: Some(echoed.clone()),
                });
            }
        }

        let entry = self.pending_mut(correlation_id, "confirm")?;
        entry.id = EntryId::Server(turn.user_message.id);
        entry.state = DeliveryState::Sent;
        entry.timestamp = turn.user_message.sent_at;

        self.entries.push(Entry::from_message(turn.bot_message));
        Ok(())
    }

    /// `sending -> failed`. No bot entry is added.
    pub fn fail(&mut self, correlation_id: &CorrelationId, reason: impl Into<String>) -> Result<(), DeliveryError> {
        let entry = self.pending_mut(correlation_id, "fail")?;
        entry.state = DeliveryState::Failed;
        self.banner = Some(reason.into());
        Ok(())
    }

    /// `failed -> sending` as a new attempt with the same text.
    ///
    /// The failed entry stays where it is, marked as superseded; the new
    /// attempt is appended at the end. Returns the new correlation id and
    /// the text to resend.
    pub fn retry(&mut self, correlation_id: &CorrelationId) -> Result<(CorrelationId, String), DeliveryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.correlation_id.as_ref() == Some(correlation_id))
            .ok_or_else(|| DeliveryError::UnknownEntry(correlation_id.to_string()))?;

        if let Some(next) = &entry.retried_as {
            return Err(DeliveryError::AlreadyRetried(next.to_string()));
        }
        if entry.state != DeliveryState::Failed {
            return Err(DeliveryError::InvalidTransition {
                action: "retry",
                state: entry.state,
            });
        }

        let text = entry.text.clone();
        let next = CorrelationId::new();
        entry.retried_as = Some(next.clone());

        self.entries.push(Entry {
            id: EntryId::Pending(next.clone()),
            correlation_id: Some(next.clone()),
            sender: SenderType::User,
            text: text.clone(),
            state: DeliveryState::Sending,
            timestamp: Utc::now(),
            retried_as: None,
        });
        self.banner = None;
        Ok((next, text))
    }

    fn pending_mut(
        &mut self,
        correlation_id: &CorrelationId,
        action: &'static str,
    ) -> Result<&mut Entry, DeliveryError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.correlation_id.as_ref() == Some(correlation_id))
            .ok_or_else(|| DeliveryError::UnknownEntry(correlation_id.to_string()))?;
        if entry.state != DeliveryState::Sending {
            return Err(DeliveryError::InvalidTransition {
                action,
                state: entry.state,
            });
        }
        Ok(entry)
    }
}
