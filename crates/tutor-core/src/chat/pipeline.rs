//! Turn processing and history reads.
//!
//! A turn is two independent single-row writes: the user message, then the
//! bot message. Once the user message is stored the turn is committed from
//! the user's point of view and is never rolled back. If the bot write
//! then fails, the caller gets `ChatError::ReplyNotPersisted` carrying the
//! stored user message so the client can retry the whole turn (producing a
//! second user row; correlation ids are not used for deduplication).

use std::cmp;

use tracing::{info, warn};
use tutor_types::error::{ChatError, SessionError, ValidationError};
use tutor_types::message::{Message, SenderType, Turn, TurnInput};
use tutor_types::time;
use uuid::Uuid;

use crate::repository::message::MessageRepository;
use crate::repository::session::SessionRepository;
use crate::responder::GuardedResponder;
use crate::session::SessionManager;

/// Largest page a history read may request.
pub const MAX_HISTORY_LIMIT: u32 = 500;

/// Appends turns to sessions and reads their history.
pub struct MessagePipeline<S: SessionRepository, M: MessageRepository> {
    sessions: SessionManager<S>,
    messages: M,
    responder: GuardedResponder,
    history_limit: u32,
}

impl<S: SessionRepository, M: MessageRepository> MessagePipeline<S, M> {
    /// Create a pipeline.
    ///
    /// - `sessions`: used to validate the target session and touch it
    /// - `messages`: append-only message store
    /// - `responder`: reply generator with timeout and fallback
    /// - `history_limit`: default page size for [`Self::get_history`]
    pub fn new(
        sessions: SessionManager<S>,
        messages: M,
        responder: GuardedResponder,
        history_limit: u32,
    ) -> Self {
        Self {
            sessions,
            messages,
            responder,
            history_limit: history_limit.clamp(1, MAX_HISTORY_LIMIT),
        }
    }

    /// Access the message repository.
    pub fn messages(&self) -> &M {
        &self.messages
    }

    pub fn default_history_limit(&self) -> u32 {
        self.history_limit
    }

    /// Process one turn and return both persisted records.
    ///
    /// 1. Validate input and the target session (no writes on failure)
    /// 2. Persist the user message
    /// 3. Touch the session (best effort)
    /// 4. Generate the reply (never fails; degrades to the fallback text)
    /// 5. Persist the bot message
    pub async fn post_turn(&self, input: TurnInput) -> Result<Turn, ChatError> {
        let text = validate(&input)?;

        let session = match self.sessions.get_session(&input.session_id).await {
            Ok(session) => session,
            Err(SessionError::NotFound) => return Err(ChatError::SessionNotFound),
            Err(e) => return Err(ChatError::StorageError(e.to_string())),
        };
        if session.user_id != input.user_id {
            return Err(ValidationError::field("user_id", "session does not belong to this user").into());
        }
        if !session.is_active {
            return Err(ChatError::SessionEnded);
        }

        let mut user_message = Message::new(
            input.session_id,
            input.user_id,
            SenderType::User,
            text,
            time::now(),
        );
        user_message.temp_id = input.temp_id;
        user_message.intent = input.intent;

        self.messages
            .append(&user_message)
            .await
            .map_err(|e| ChatError::UserMessageNotPersisted(e.to_string()))?;

        if let Err(e) = self.sessions.touch(&input.session_id).await {
            warn!(session_id = %input.session_id, error = %e, "Failed to advance session activity");
        }

        let reply = self.responder.reply(&user_message.message_text).await;

        // The reply never sorts before the message it answers.
        let bot_sent_at = cmp::max(time::now(), user_message.sent_at);
        let bot_message = Message::new(
            input.session_id,
            input.user_id,
            SenderType::Bot,
            reply,
            bot_sent_at,
        );

        if let Err(e) = self.messages.append(&bot_message).await {
            warn!(
                session_id = %input.session_id,
                user_message_id = %user_message.id,
                error = %e,
                "User message stored but bot reply was not"
            );
            return Err(ChatError::ReplyNotPersisted {
                user_message: Box::new(user_message),
                detail: e.to_string(),
            });
        }

        info!(
            session_id = %input.session_id,
            user_message_id = %user_message.id,
            bot_message_id = %bot_message.id,
            "Turn completed"
        );

        Ok(Turn {
            user_message,
            bot_message,
        })
    }

    /// Messages of a session in `sent_at` order, capped at `limit`
    /// (default from configuration, at most [`MAX_HISTORY_LIMIT`]).
    pub async fn get_history(
        &self,
        session_id: &Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<Message>, ChatError> {
        if session_id.is_nil() {
            return Err(ValidationError::required("session_id").into());
        }
        let limit = limit.unwrap_or(self.history_limit).clamp(1, MAX_HISTORY_LIMIT);
        self.messages
            .list_for_session(session_id, limit)
            .await
            .map_err(|e| ChatError::StorageError(e.to_string()))
    }
}

/// Reject empty ids and blank text before anything is written.
fn validate(input: &TurnInput) -> Result<String, ValidationError> {
    if input.session_id.is_nil() {
        return Err(ValidationError::required("session_id"));
    }
    if input.user_id.is_nil() {
        return Err(ValidationError::required("user_id"));
    }
    let text = input.message_text.trim();
    if text.is_empty() {
        return Err(ValidationError::required("message_text"));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::responder::{BoxResponder, Responder};
    use crate::test_support::{BrokenResponder, EchoResponder, MemoryStore, StalledResponder};
    use tutor_types::message::DeliveryStatus;
    use tutor_types::session::Session;

    const FALLBACK: &str = "Let's try that again in a moment.";

    fn pipeline_with<R: Responder + 'static>(
        responder: R,
    ) -> (MessagePipeline<MemoryStore, MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let guarded = GuardedResponder::new(
            BoxResponder::new(responder),
            Duration::from_millis(100),
            FALLBACK,
        );
        let pipeline = MessagePipeline::new(
            SessionManager::new(store.clone()),
            store.clone(),
            guarded,
            50,
        );
        (pipeline, store)
    }

    async fn active_session(pipeline: &MessagePipeline<MemoryStore, MemoryStore>) -> Session {
        pipeline
            .sessions
            .start_session(Uuid::now_v7(), None)
            .await
            .unwrap()
    }

    fn input(session: &Session, text: &str) -> TurnInput {
        TurnInput {
            session_id: session.id,
            user_id: session.user_id,
            message_text: text.to_string(),
            temp_id: Some("temp_1".to_string()),
            intent: None,
        }
    }

    #[tokio::test]
    async fn test_post_turn_returns_pair() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;

        let turn = pipeline.post_turn(input(&session, "  hello  ")).await.unwrap();

        assert_eq!(turn.user_message.sender_type, SenderType::User);
        assert_eq!(turn.user_message.message_text, "hello");
        assert_eq!(turn.user_message.temp_id.as_deref(), Some("temp_1"));
        assert_eq!(turn.user_message.status, DeliveryStatus::Sent);
        assert_eq!(turn.bot_message.sender_type, SenderType::Bot);
        assert_eq!(turn.bot_message.message_text, "echo: hello");
        assert!(turn.bot_message.temp_id.is_none());
        assert!(turn.bot_message.sent_at >= turn.user_message.sent_at);
        assert_eq!(store.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_post_turn_touches_session() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        tokio::time::sleep(Duration::from_millis(2)).await;

        pipeline.post_turn(input(&session, "hi")).await.unwrap();

        let stored = store.sessions().into_iter().find(|s| s.id == session.id).unwrap();
        assert!(stored.last_message_at > session.last_message_at);
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_writes() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;

        let err = pipeline.post_turn(input(&session, "   ")).await.unwrap_err();
        match err {
            ChatError::Validation(v) => assert_eq!(v.field.as_deref(), Some("message_text")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_nil_ids_rejected() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;

        let mut bad = input(&session, "hi");
        bad.user_id = Uuid::nil();
        assert!(matches!(
            pipeline.post_turn(bad).await.unwrap_err(),
            ChatError::Validation(_)
        ));

        let mut bad = input(&session, "hi");
        bad.session_id = Uuid::nil();
        assert!(matches!(
            pipeline.post_turn(bad).await.unwrap_err(),
            ChatError::Validation(_)
        ));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let turn = TurnInput {
            session_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            message_text: "hi".into(),
            temp_id: None,
            intent: None,
        };
        assert!(matches!(
            pipeline.post_turn(turn).await.unwrap_err(),
            ChatError::SessionNotFound
        ));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_ended_session_rejected() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        pipeline.sessions.end_session(&session.id).await.unwrap();

        assert!(matches!(
            pipeline.post_turn(input(&session, "hi")).await.unwrap_err(),
            ChatError::SessionEnded
        ));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_session_rejected() {
        let (pipeline, _) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        let mut turn = input(&session, "hi");
        turn.user_id = Uuid::now_v7();
        assert!(matches!(
            pipeline.post_turn(turn).await.unwrap_err(),
            ChatError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_responder_failure_uses_fallback() {
        let (pipeline, _) = pipeline_with(BrokenResponder);
        let session = active_session(&pipeline).await;

        let turn = pipeline.post_turn(input(&session, "hi")).await.unwrap();
        assert_eq!(turn.bot_message.message_text, FALLBACK);
    }

    #[tokio::test(start_paused = true)]
    async fn test_responder_timeout_uses_fallback() {
        let (pipeline, _) = pipeline_with(StalledResponder);
        let session = active_session(&pipeline).await;

        let turn = pipeline.post_turn(input(&session, "hi")).await.unwrap();
        assert_eq!(turn.bot_message.message_text, FALLBACK);
    }

    #[tokio::test]
    async fn test_touch_failure_does_not_abort_turn() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        store.fail_touch();

        let turn = pipeline.post_turn(input(&session, "hi")).await.unwrap();
        assert_eq!(turn.bot_message.message_text, "echo: hi");
    }

    #[tokio::test]
    async fn test_user_write_failure_is_fatal() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        store.fail_append_number(1);

        let err = pipeline.post_turn(input(&session, "hi")).await.unwrap_err();
        assert!(matches!(err, ChatError::UserMessageNotPersisted(_)));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn test_bot_write_failure_reports_committed_user_message() {
        let (pipeline, store) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        store.fail_append_number(2);

        let err = pipeline.post_turn(input(&session, "hi")).await.unwrap_err();
        match err {
            ChatError::ReplyNotPersisted { user_message, .. } => {
                assert_eq!(user_message.message_text, "hi");
                assert_eq!(store.messages(), vec![*user_message]);
            }
            other => panic!("expected ReplyNotPersisted, got {other:?}"),
        }

        // Retrying the whole turn appends a second, independent user row.
        let turn = pipeline.post_turn(input(&session, "hi")).await.unwrap();
        assert_eq!(turn.bot_message.message_text, "echo: hi");
        let users = store
            .messages()
            .iter()
            .filter(|m| m.sender_type == SenderType::User)
            .count();
        assert_eq!(users, 2);
    }

    #[tokio::test]
    async fn test_history_is_ordered_and_idempotent() {
        let (pipeline, _) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        for text in ["one", "two", "three"] {
            pipeline.post_turn(input(&session, text)).await.unwrap();
        }

        let first = pipeline.get_history(&session.id, None).await.unwrap();
        let second = pipeline.get_history(&session.id, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
        assert!(first.windows(2).all(|w| w[0].sent_at <= w[1].sent_at));
        assert_eq!(first[0].message_text, "one");
        assert_eq!(first[1].message_text, "echo: one");
    }

    #[tokio::test]
    async fn test_history_limit() {
        let (pipeline, _) = pipeline_with(EchoResponder);
        let session = active_session(&pipeline).await;
        for text in ["one", "two"] {
            pipeline.post_turn(input(&session, text)).await.unwrap();
        }

        let page = pipeline.get_history(&session.id, Some(3)).await.unwrap();
        assert_eq!(page.len(), 3);
        // Zero is clamped to one rather than returning nothing.
        let page = pipeline.get_history(&session.id, Some(0)).await.unwrap();
        assert_eq!(page.len(), 1);
    }
}
