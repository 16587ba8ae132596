//! Service configuration types.
//!
//! `TutorConfig` represents the `config.toml` in the data directory that
//! controls reply generation, history reads, and session expiry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reply used whenever the responder fails, times out, or returns nothing.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "I'm having a little trouble thinking right now. Could you ask that again in a moment?";

/// Top-level service configuration. All fields have sensible defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Upper bound on a single responder call.
    #[serde(default = "default_responder_timeout_ms")]
    pub responder_timeout_ms: u64,

    /// Bot reply text used when the responder cannot produce one.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// Default page size for history reads.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Active sessions idle longer than this are ended with reason `timeout`.
    /// Zero disables expiry.
    #[serde(default = "default_session_idle_timeout_minutes")]
    pub session_idle_timeout_minutes: u64,

    /// How often the idle-session sweeper runs.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_responder_timeout_ms() -> u64 {
    5_000
}

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

fn default_history_limit() -> u32 {
    50
}

fn default_session_idle_timeout_minutes() -> u64 {
    120
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            responder_timeout_ms: default_responder_timeout_ms(),
            fallback_reply: default_fallback_reply(),
            history_limit: default_history_limit(),
            session_idle_timeout_minutes: default_session_idle_timeout_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl TutorConfig {
    pub fn responder_timeout(&self) -> Duration {
        Duration::from_millis(self.responder_timeout_ms)
    }

    /// `None` when idle expiry is disabled.
    pub fn session_idle_timeout(&self) -> Option<Duration> {
        (self.session_idle_timeout_minutes > 0)
            .then(|| Duration::from_secs(self.session_idle_timeout_minutes * 60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
