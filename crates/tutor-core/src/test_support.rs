//! In-memory repositories with failure injection, shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tutor_types::error::{RepositoryError, ResponderError};
use tutor_types::message::Message;
use tutor_types::session::{EndReason, Session};
use tutor_types::user::User;
use uuid::Uuid;

use crate::repository::message::MessageRepository;
use crate::repository::session::SessionRepository;
use crate::repository::user::UserRepository;
use crate::responder::Responder;

#[derive(Default)]
struct Inner {
    users: Mutex<Vec<User>>,
    sessions: Mutex<Vec<Session>>,
    messages: Mutex<Vec<Message>>,
    appends: AtomicUsize,
    fail_append_at: Mutex<Option<usize>>,
    fail_touch: AtomicBool,
    fail_writes: AtomicBool,
    lost_races: AtomicUsize,
}

/// One shared in-memory store implementing every repository port.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the n-th (1-based) message append from now on.
    pub fn fail_append_number(&self, n: usize) {
        let done = self.inner.appends.load(Ordering::SeqCst);
        *self.inner.fail_append_at.lock().unwrap() = Some(done + n);
    }

    /// Let a rival request win the next `n` session inserts: each one finds
    /// a freshly created active session for the same user and conflicts.
    pub fn lose_next_session_races(&self, n: usize) {
        self.inner.lost_races.store(n, Ordering::SeqCst);
    }

    pub fn fail_touch(&self) {
        self.inner.fail_touch.store(true, Ordering::SeqCst);
    }

    pub fn fail_all_writes(&self) {
        self.inner.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.inner.sessions.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.users.lock().unwrap().clone()
    }

    fn check_writes(&self) -> Result<(), RepositoryError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        Ok(())
    }
}

impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        self.check_writes()?;
        self.inner.users.lock().unwrap().push(user.clone());
        Ok(user.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>, RepositoryError> {
        Ok(self.inner.users.lock().unwrap().iter().find(|u| u.id == *id).cloned())
    }

    async fn update(&self, user: &User) -> Result<User, RepositoryError> {
        self.check_writes()?;
        let mut users = self.inner.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = user.clone();
        Ok(user.clone())
    }
}

impl SessionRepository for MemoryStore {
    async fn create(&self, session: &Session) -> Result<Session, RepositoryError> {
        self.check_writes()?;
        let mut sessions = self.inner.sessions.lock().unwrap();
        let raced = self
            .inner
            .lost_races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            sessions.push(Session::start(session.user_id, Some("rival".to_string()), session.started_at));
        }
        if session.is_active
            && sessions
                .iter()
                .any(|s| s.user_id == session.user_id && s.is_active)
        {
            return Err(RepositoryError::Conflict(
                "user already has an active session".to_string(),
            ));
        }
        sessions.push(session.clone());
        Ok(session.clone())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Session>, RepositoryError> {
        Ok(self.inner.sessions.lock().unwrap().iter().find(|s| s.id == *id).cloned())
    }

    async fn get_active_for_user(&self, user_id: &Uuid) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .inner
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == *user_id && s.is_active)
            .max_by_key(|s| s.started_at)
            .cloned())
    }

    async fn update_topics(
        &self,
        id: &Uuid,
        current_concept: Option<&str>,
        concepts_covered: Option<&[String]>,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_writes()?;
        let mut sessions = self.inner.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(concept) = current_concept {
            session.current_concept = Some(concept.to_string());
        }
        if let Some(covered) = concepts_covered {
            session.concepts_covered = Some(covered.to_vec());
        }
        session.updated_at = now;
        Ok(())
    }

    async fn end(&self, id: &Uuid, reason: EndReason, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        self.check_writes()?;
        let mut sessions = self.inner.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(session.end(reason, now))
    }

    async fn end_if_idle(
        &self,
        id: &Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        self.check_writes()?;
        let mut sessions = self.inner.sessions.lock().unwrap();
        match sessions.iter_mut().find(|s| s.id == *id) {
            Some(session) if session.last_message_at < cutoff => Ok(session.end(EndReason::Timeout, now)),
            _ => Ok(false),
        }
    }

    async fn end_active_for_user(
        &self,
        user_id: &Uuid,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        self.check_writes()?;
        let mut sessions = self.inner.sessions.lock().unwrap();
        let mut ended = 0;
        for session in sessions.iter_mut().filter(|s| s.user_id == *user_id) {
            if session.end(reason, now) {
                ended += 1;
            }
        }
        Ok(ended)
    }

    async fn touch(&self, id: &Uuid, now: DateTime<Utc>) -> Result<(), RepositoryError> {
        if self.inner.fail_touch.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("touch failed".to_string()));
        }
        self.check_writes()?;
        let mut sessions = self.inner.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        session.last_message_at = now;
        session.updated_at = now;
        Ok(())
    }

    async fn list_idle(&self, cutoff: DateTime<Utc>) -> Result<Vec<Session>, RepositoryError> {
        Ok(self
            .inner
            .sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.is_active && s.last_message_at < cutoff)
            .cloned()
            .collect())
    }
}

impl MessageRepository for MemoryStore {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        self.check_writes()?;
        let n = self.inner.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.inner.fail_append_at.lock().unwrap() == Some(n) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        self.inner.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn list_for_session(&self, session_id: &Uuid, limit: u32) -> Result<Vec<Message>, RepositoryError> {
        let mut messages: Vec<Message> = self
            .inner
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_id == *session_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by_key(|m| m.sent_at);
        messages.truncate(limit as usize);
        Ok(messages)
    }

    async fn count_for_session(&self, session_id: &Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .inner
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.session_id == *session_id)
            .count() as u64)
    }
}

/// Responder that echoes its input.
pub struct EchoResponder;

impl Responder for EchoResponder {
    fn name(&self) -> &str {
        "echo"
    }

    async fn respond(&self, input: &str) -> Result<String, ResponderError> {
        Ok(format!("echo: {input}"))
    }
}

/// Responder that always fails.
pub struct BrokenResponder;

impl Responder for BrokenResponder {
    fn name(&self) -> &str {
        "broken"
    }

    async fn respond(&self, _input: &str) -> Result<String, ResponderError> {
        Err(ResponderError::Failed("model offline".to_string()))
    }
}

/// Responder that never answers within any sane timeout.
pub struct StalledResponder;

impl Responder for StalledResponder {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn respond(&self, _input: &str) -> Result<String, ResponderError> {
        tokio::time::sleep(std::time::Duration::from_secs(3_600)).await;
        Ok("too late".to_string())
    }
}
