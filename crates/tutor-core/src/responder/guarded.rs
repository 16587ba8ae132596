//! Timeout and fallback guard around a responder.
//!
//! The message pipeline must always complete a turn with a bot message, so
//! every responder failure mode (error, timeout, blank reply) degrades to a
//! fixed fallback text here and is only logged.

use std::time::Duration;

use tracing::warn;
use tutor_types::config::TutorConfig;
use tutor_types::error::ResponderError;

use super::{BoxResponder, Responder};

/// A responder with a bounded call time and a fixed fallback reply.
pub struct GuardedResponder {
    inner: BoxResponder,
    timeout: Duration,
    fallback: String,
}

impl GuardedResponder {
    pub fn new(inner: BoxResponder, timeout: Duration, fallback: impl Into<String>) -> Self {
        Self {
            inner,
            timeout,
            fallback: fallback.into(),
        }
    }

    /// Guard configured from `responder_timeout_ms` and `fallback_reply`.
    pub fn from_config(inner: BoxResponder, config: &TutorConfig) -> Self {
        Self::new(inner, config.responder_timeout(), config.fallback_reply.clone())
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Call the inner responder, surfacing timeouts as errors.
    pub async fn try_reply(&self, input: &str) -> Result<String, ResponderError> {
        match tokio::time::timeout(self.timeout, self.inner.respond(input)).await {
            Ok(Ok(text)) if text.trim().is_empty() => {
                Err(ResponderError::Failed("empty reply".to_string()))
            }
            Ok(result) => result,
            Err(_) => Err(ResponderError::Timeout(self.timeout)),
        }
    }

    /// Reply text, never failing: errors degrade to the fallback.
    pub async fn reply(&self, input: &str) -> String {
        match self.try_reply(input).await {
            Ok(text) => text,
            Err(e) => {
                warn!(responder = self.inner.name(), error = %e, "Responder failed, using fallback reply");
                self.fallback.clone()
            }
        }
    }
}
