//! Delivery driver: runs turns through the ledger against a transport.

use tracing::{debug, info, warn};
use tutor_types::session::Session;
use uuid::Uuid;

use super::ledger::{CorrelationId, DeliveryError, DeliveryLedger};
use super::transport::{ChatTransport, TransportError, TurnRequest};

const SEND_FAILED_BANNER: &str = "Failed to send message. Please try again.";
const BOOTSTRAP_FAILED_BANNER: &str = "Failed to start your session. Please try again.";
const SESSION_GONE_BANNER: &str =
    "Your session has ended. Send a message or type /retry to continue in a new session.";

/// Result of sending one message.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The turn was persisted; carries the bot reply text.
    Delivered {
        correlation_id: CorrelationId,
        reply: String,
    },
    /// The entry is now `failed` and can be retried.
    Failed {
        correlation_id: CorrelationId,
        error: TransportError,
    },
}

impl SendOutcome {
    pub fn correlation_id(&self) -> &CorrelationId {
        match self {
            SendOutcome::Delivered { correlation_id, .. } | SendOutcome::Failed { correlation_id, .. } => {
                correlation_id
            }
        }
    }
}

/// Client-side owner of one conversation.
///
/// All mutation goes through `&mut self`, so turns are sent one at a time
/// and rendered in submission order. When the server reports that the
/// session is gone (ended by the idle sweeper or by a start elsewhere), the
/// stale session is dropped and the next send or retry continues in the
/// user's current active session, starting one if needed.
pub struct DeliveryClient<T: ChatTransport> {
    transport: T,
    user_id: Uuid,
    student_name: Option<String>,
    device_info: Option<String>,
    history_limit: Option<u32>,
    session: Option<Session>,
    session_lost: bool,
    ledger: DeliveryLedger,
}

impl<T: ChatTransport> DeliveryClient<T> {
    pub fn new(transport: T, user_id: Uuid) -> Self {
        Self {
            transport,
            user_id,
            student_name: None,
            device_info: None,
            history_limit: None,
            session: None,
            session_lost: false,
            ledger: DeliveryLedger::new(),
        }
    }

    /// First name used in the welcome greeting.
    pub fn with_student_name(mut self, name: impl Into<String>) -> Self {
        self.student_name = Some(name.into());
        self
    }

    pub fn with_device_info(mut self, device_info: impl Into<String>) -> Self {
        self.device_info = Some(device_info.into());
        self
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = Some(limit);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn ledger(&self) -> &DeliveryLedger {
        &self.ledger
    }

    pub fn dismiss_banner(&mut self) {
        self.ledger.dismiss_banner();
    }

    /// Resume the active session or start one, then load its history.
    ///
    /// An empty history gets a local-only welcome greeting.
    pub async fn bootstrap(&mut self) -> Result<&Session, TransportError> {
        match self.load_session().await {
            Ok(session) => {
                self.session_lost = false;
                Ok(self.session.insert(session))
            }
            Err(e) => {
                warn!(user_id = %self.user_id, error = %e, "Session bootstrap failed");
                self.ledger.set_banner(BOOTSTRAP_FAILED_BANNER);
                Err(e)
            }
        }
    }

    async fn load_session(&mut self) -> Result<Session, TransportError> {
        let session = match self.transport.active_session(&self.user_id).await? {
            Some(session) => {
                debug!(session_id = %session.id, "Resuming active session");
                session
            }
            None => {
                self.transport
                    .start_session(&self.user_id, self.device_info.as_deref())
                    .await?
            }
        };

        let history = self.transport.history(&session.id, self.history_limit).await?;
        let empty = history.is_empty();
        self.ledger.load_history(history);
        if empty {
            self.ledger.push_welcome(welcome_text(self.student_name.as_deref()));
        }
        self.ledger.dismiss_banner();
        Ok(session)
    }

    /// Replace a lost session with the user's active one, or a new one.
    ///
    /// The local view is kept as is; entries from the old session stay above
    /// the new ones.
    async fn reopen_session(&mut self) -> Result<Uuid, TransportError> {
        let session = match self.transport.active_session(&self.user_id).await? {
            Some(session) => session,
            None => {
                self.transport
                    .start_session(&self.user_id, self.device_info.as_deref())
                    .await?
            }
        };
        info!(user_id = %self.user_id, session_id = %session.id, "Continuing in a new session");
        self.session_lost = false;
        self.ledger.dismiss_banner();
        Ok(self.session.insert(session).id)
    }

    /// Submit a message and wait for the server to acknowledge the turn.
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome, DeliveryError> {
        if self.session.is_none() && !self.session_lost {
            return Err(DeliveryError::NoSession);
        }
        let correlation_id = self.ledger.submit(text)?;
        let text = text.trim().to_string();
        self.dispatch(correlation_id, text).await
    }

    /// Retry a failed message as a new attempt.
    pub async fn retry(&mut self, correlation_id: &CorrelationId) -> Result<SendOutcome, DeliveryError> {
        if self.session.is_none() && !self.session_lost {
            return Err(DeliveryError::NoSession);
        }
        let (next, text) = self.ledger.retry(correlation_id)?;
        self.dispatch(next, text).await
    }

    /// Retry the most recent failed message, if there is one.
    pub async fn retry_last(&mut self) -> Result<Option<SendOutcome>, DeliveryError> {
        let Some(correlation_id) = self
            .ledger
            .last_retryable()
            .and_then(|e| e.correlation_id.clone())
        else {
            return Ok(None);
        };
        self.retry(&correlation_id).await.map(Some)
    }

    /// End the current session server-side and forget it locally.
    pub async fn end_session(&mut self) -> Result<Option<Session>, TransportError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        match self.transport.end_session(&session.id).await {
            Ok(ended) => Ok(Some(ended)),
            Err(e) => {
                self.ledger.set_banner("Failed to end your session.");
                self.session = Some(session);
                Err(e)
            }
        }
    }

    async fn dispatch(
        &mut self,
        correlation_id: CorrelationId,
        text: String,
    ) -> Result<SendOutcome, DeliveryError> {
        let session_id = match self.session.as_ref().map(|s| s.id) {
            Some(id) => id,
            None => match self.reopen_session().await {
                Ok(id) => id,
                Err(error) => {
                    warn!(%correlation_id, error = %error, "Could not continue in a new session");
                    self.ledger.fail(&correlation_id, BOOTSTRAP_FAILED_BANNER)?;
                    return Ok(SendOutcome::Failed {
                        correlation_id,
                        error,
                    });
                }
            },
        };
        let request = TurnRequest {
            session_id,
            user_id: self.user_id,
            message_text: text,
            temp_id: Some(correlation_id.to_string()),
            intent: None,
        };

        match self.transport.post_turn(&request).await {
            Ok(turn) => {
                let reply = turn.bot_message.message_text.clone();
                if let Err(e) = self.ledger.confirm(&correlation_id, turn) {
                    warn!(%correlation_id, error = %e, "Server acknowledged a different message");
                    self.ledger.fail(&correlation_id, SEND_FAILED_BANNER)?;
                    return Err(e);
                }
                Ok(SendOutcome::Delivered {
                    correlation_id,
                    reply,
                })
            }
            Err(error) => {
                warn!(%correlation_id, error = %error, "Message delivery failed");
                self.ledger.fail(&correlation_id, SEND_FAILED_BANNER)?;
                if error.is_session_gone() {
                    if let Some(stale) = self.session.take() {
                        info!(session_id = %stale.id, "Session ended on the server");
                    }
                    self.session_lost = true;
                    self.ledger.set_banner(SESSION_GONE_BANNER);
                }
                Ok(SendOutcome::Failed {
                    correlation_id,
                    error,
                })
            }
        }
    }
}

fn welcome_text(name: Option<&str>) -> String {
    let greeting = match name {
        Some(name) => format!("Hi {name}!"),
        None => "Hi!".to_string(),
    };
    format!(
        "{greeting} I'm your AI tutor. I'm here to help you learn and understand your subjects better. What would you like to study today?"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::delivery::ledger::{DeliveryState, EntryId};
    use crate::delivery::transport::SESSION_ENDED_CODE;
    use tutor_types::message::{Message, SenderType, Turn};
    use tutor_types::time;

    /// Transport that serves canned sessions and fails turns on demand.
    #[derive(Default)]
    struct MockTransport {
        active: Mutex<Option<Session>>,
        history: Mutex<Vec<Message>>,
        failures: Mutex<VecDeque<TransportError>>,
        requests: Mutex<Vec<TurnRequest>>,
        starts: Mutex<Vec<Option<String>>>,
    }

    impl MockTransport {
        fn fail_next(&self, error: TransportError) {
            self.failures.lock().unwrap().push_back(error);
        }
    }

    impl ChatTransport for MockTransport {
        async fn active_session(&self, _user_id: &Uuid) -> Result<Option<Session>, TransportError> {
            if let Some(e) = self.failures.lock().unwrap().pop_front() {
                return Err(e);
            }
            Ok(self.active.lock().unwrap().clone())
        }

        async fn start_session(
            &self,
            user_id: &Uuid,
            device_info: Option<&str>,
        ) -> Result<Session, TransportError> {
            self.starts.lock().unwrap().push(device_info.map(str::to_string));
            let session = Session::start(*user_id, device_info.map(str::to_string), time::now());
            *self.active.lock().unwrap() = Some(session.clone());
            Ok(session)
        }

        async fn history(&self, _session_id: &Uuid, _limit: Option<u32>) -> Result<Vec<Message>, TransportError> {
            Ok(self.history.lock().unwrap().clone())
        }

        async fn post_turn(&self, request: &TurnRequest) -> Result<Turn, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(e) = self.failures.lock().unwrap().pop_front() {
                return Err(e);
            }
            let now = time::now();
            let mut user_message = Message::new(
                request.session_id,
                request.user_id,
                SenderType::User,
                request.message_text.clone(),
                now,
            );
            user_message.temp_id = request.temp_id.clone();
            let bot_message = Message::new(
                request.session_id,
                request.user_id,
                SenderType::Bot,
                format!("about {}", request.message_text),
                now,
            );
            Ok(Turn {
                user_message,
                bot_message,
            })
        }

        async fn end_session(&self, session_id: &Uuid) -> Result<Session, TransportError> {
            let mut active = self.active.lock().unwrap();
            let mut session = active
                .take()
                .filter(|s| s.id == *session_id)
                .ok_or_else(|| TransportError::Server {
                    status: 404,
                    code: "NOT_FOUND".to_string(),
                    message: "session not found".to_string(),
                })?;
            session.end(tutor_types::session::EndReason::Explicit, time::now());
            Ok(session)
        }
    }

    fn network_down() -> TransportError {
        TransportError::Network("connection refused".to_string())
    }

    async fn ready_client() -> DeliveryClient<MockTransport> {
        let mut client = DeliveryClient::new(MockTransport::default(), Uuid::now_v7())
            .with_student_name("Asha")
            .with_device_info("tutor-cli/test");
        client.bootstrap().await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_bootstrap_starts_session_and_greets() {
        let client = ready_client().await;

        assert!(client.session().unwrap().is_active);
        assert_eq!(
            client.transport().starts.lock().unwrap().as_slice(),
            &[Some("tutor-cli/test".to_string())]
        );
        let entries = client.ledger().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, EntryId::Local);
        assert!(entries[0].text.starts_with("Hi Asha!"));
    }

    #[tokio::test]
    async fn test_bootstrap_resumes_with_history() {
        let transport = MockTransport::default();
        let user_id = Uuid::now_v7();
        let session = Session::start(user_id, None, time::now());
        let message = Message::new(session.id, user_id, SenderType::User, "earlier".into(), time::now());
        *transport.active.lock().unwrap() = Some(session.clone());
        *transport.history.lock().unwrap() = vec![message];

        let mut client = DeliveryClient::new(transport, user_id);
        client.bootstrap().await.unwrap();

        assert_eq!(client.session().unwrap().id, session.id);
        assert!(client.transport().starts.lock().unwrap().is_empty());
        assert_eq!(client.ledger().entries().len(), 1);
        assert_eq!(client.ledger().entries()[0].text, "earlier");
    }

    #[tokio::test]
    async fn test_bootstrap_failure_sets_banner() {
        let transport = MockTransport::default();
        transport.fail_next(network_down());
        let mut client = DeliveryClient::new(transport, Uuid::now_v7());

        assert!(client.bootstrap().await.is_err());
        assert!(client.session().is_none());
        assert_eq!(client.ledger().banner(), Some(BOOTSTRAP_FAILED_BANNER));
    }

    #[tokio::test]
    async fn test_send_confirms_and_appends_reply() {
        let mut client = ready_client().await;

        let outcome = client.send("fractions").await.unwrap();

        let SendOutcome::Delivered { correlation_id, reply } = outcome else {
            panic!("expected delivery");
        };
        assert_eq!(reply, "about fractions");
        let request = client.transport().requests.lock().unwrap()[0].clone();
        assert_eq!(request.temp_id.as_deref(), Some(correlation_id.as_str()));

        let entries = client.ledger().entries();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[1].id, EntryId::Server(_)));
        assert_eq!(entries[1].state, DeliveryState::Sent);
        assert_eq!(entries[2].sender, SenderType::Bot);
    }

    #[tokio::test]
    async fn test_failed_send_then_retry() {
        let mut client = ready_client().await;
        client.transport().fail_next(network_down());

        let outcome = client.send("fractions").await.unwrap();
        let failed_id = outcome.correlation_id().clone();
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert_eq!(client.ledger().entry(&failed_id).unwrap().state, DeliveryState::Failed);
        assert_eq!(client.ledger().banner(), Some(SEND_FAILED_BANNER));
        assert_eq!(client.ledger().entries().len(), 2);

        let retried = client.retry_last().await.unwrap().unwrap();
        assert!(matches!(retried, SendOutcome::Delivered { .. }));
        assert_ne!(retried.correlation_id(), &failed_id);

        let entries = client.ledger().entries();
        // Greeting, dead failed attempt, confirmed retry, bot reply.
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1].state, DeliveryState::Failed);
        assert_eq!(entries[2].state, DeliveryState::Sent);
        assert_eq!(entries[2].text, "fractions");
        assert!(client.ledger().last_retryable().is_none());
        assert!(client.retry(&failed_id).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_session_raises_banner() {
        let mut client = ready_client().await;
        client.transport().fail_next(TransportError::Server {
            status: 404,
            code: "NOT_FOUND".to_string(),
            message: "session not found".to_string(),
        });

        client.send("hello").await.unwrap();
        assert_eq!(client.ledger().banner(), Some(SESSION_GONE_BANNER));
    }

    fn session_ended() -> TransportError {
        TransportError::Server {
            status: 400,
            code: SESSION_ENDED_CODE.to_string(),
            message: "session has ended; start a new session to keep chatting".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ended_session_is_replaced_on_retry() {
        let mut client = ready_client().await;
        let stale_id = client.session().unwrap().id;
        // The server expired the session behind the client's back.
        *client.transport().active.lock().unwrap() = None;
        client.transport().fail_next(session_ended());

        let outcome = client.send("fractions").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        assert!(client.session().is_none());
        assert_eq!(client.ledger().banner(), Some(SESSION_GONE_BANNER));

        let retried = client.retry_last().await.unwrap().unwrap();
        assert!(matches!(retried, SendOutcome::Delivered { .. }));
        let fresh_id = client.session().unwrap().id;
        assert_ne!(fresh_id, stale_id);
        assert_eq!(client.transport().starts.lock().unwrap().len(), 2);
        assert!(client.ledger().banner().is_none());

        let requests = client.transport().requests.lock().unwrap().clone();
        assert_eq!(requests[0].session_id, stale_id);
        assert_eq!(requests[1].session_id, fresh_id);

        client.send("decimals").await.unwrap();
        assert_eq!(client.transport().requests.lock().unwrap()[2].session_id, fresh_id);
    }

    #[tokio::test]
    async fn test_failed_reopen_keeps_message_retryable() {
        let mut client = ready_client().await;
        client.transport().fail_next(session_ended());
        client.send("fractions").await.unwrap();

        // Looking up the replacement session fails too.
        client.transport().fail_next(network_down());
        let outcome = client.retry_last().await.unwrap().unwrap();
        assert!(matches!(outcome, SendOutcome::Failed { error: TransportError::Network(_), .. }));
        assert_eq!(client.ledger().banner(), Some(BOOTSTRAP_FAILED_BANNER));
        assert!(client.session().is_none());
        assert_eq!(client.transport().requests.lock().unwrap().len(), 1);

        let outcome = client.retry_last().await.unwrap().unwrap();
        assert!(matches!(outcome, SendOutcome::Delivered { .. }));
        assert!(client.session().is_some());
    }

    #[tokio::test]
    async fn test_send_without_session() {
        let mut client = DeliveryClient::new(MockTransport::default(), Uuid::now_v7());
        assert_eq!(client.send("hi").await.unwrap_err(), DeliveryError::NoSession);
        assert!(client.ledger().entries().is_empty());
    }

    #[tokio::test]
    async fn test_end_session() {
        let mut client = ready_client().await;
        let ended = client.end_session().await.unwrap().unwrap();
        assert!(!ended.is_active);
        assert!(client.session().is_none());
        assert!(client.end_session().await.unwrap().is_none());
    }
}
