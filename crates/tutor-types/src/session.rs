//! Tutoring session types.
//!
//! A session is a bounded conversational context for one user. At most one
//! session per user is active at any instant; ending a session is
//! irreversible and keeps its message history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Why a session stopped being active.
///
/// Maps to the CHECK constraint in the SQLite schema on `sessions.end_reason`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Timeout,
    Explicit,
    Inactivity,
    System,
    Manual,
    UserEnded,
    GoalAchieved,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Timeout => write!(f, "timeout"),
            EndReason::Explicit => write!(f, "explicit"),
            EndReason::Inactivity => write!(f, "inactivity"),
            EndReason::System => write!(f, "system"),
            EndReason::Manual => write!(f, "manual"),
            EndReason::UserEnded => write!(f, "user_ended"),
            EndReason::GoalAchieved => write!(f, "goal_achieved"),
        }
    }
}

impl FromStr for EndReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timeout" => Ok(EndReason::Timeout),
            "explicit" => Ok(EndReason::Explicit),
            "inactivity" => Ok(EndReason::Inactivity),
            "system" => Ok(EndReason::System),
            "manual" => Ok(EndReason::Manual),
            "user_ended" => Ok(EndReason::UserEnded),
            "goal_achieved" => Ok(EndReason::GoalAchieved),
            other => Err(format!("invalid end reason: '{other}'")),
        }
    }
}

/// A conversational session owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "session_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub current_concept: Option<String>,
    pub concepts_covered: Option<Vec<String>>,
    pub device_info: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<EndReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh active session starting at `now`.
    pub fn start(user_id: Uuid, device_info: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            is_active: true,
            current_concept: None,
            concepts_covered: None,
            device_info,
            started_at: now,
            last_message_at: now,
            ended_at: None,
            end_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the session ended. No-op if it already ended.
    ///
    /// Returns `true` if this call performed the termination.
    pub fn end(&mut self, reason: EndReason, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.ended_at = Some(now);
        self.end_reason = Some(reason);
        self.updated_at = now;
        true
    }
}

/// Partial session update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub current_concept: Option<String>,
    pub concepts_covered: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub end_reason: Option<EndReason>,
}

impl SessionUpdate {
    /// Update that ends the session with the given reason.
    pub fn end(reason: EndReason) -> Self {
        Self {
            is_active: Some(false),
            end_reason: Some(reason),
            ..Default::default()
        }
    }

    /// Whether the update carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.current_concept.is_none()
            && self.concepts_covered.is_none()
            && self.is_active.is_none()
            && self.end_reason.is_none()
    }
}
