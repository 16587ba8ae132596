//! HttpChatClient -- [`ChatTransport`] implementation over the REST API.
//!
//! Used by the terminal chat and the onboarding/logout commands. Non-success
//! responses are decoded from the `{"error": {"code", "message"}}` body into
//! [`TransportError::Server`].

use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use tutor_core::delivery::{ChatTransport, TransportError, TurnRequest};
use tutor_types::message::{Message, Turn};
use tutor_types::session::Session;
use tutor_types::user::{CreateUserRequest, User};

/// Upper bound on one request, including a full turn with its reply.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct SessionBody {
    session: Option<Session>,
}

#[derive(Deserialize)]
struct MessagesBody {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct UserBody {
    user: User,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// REST client for the tutoring chat server.
#[derive(Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request and decode a success body, or map the error body.
    async fn call<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ErrorBody>(&error_body) {
                Ok(body) => TransportError::Server {
                    status: status.as_u16(),
                    code: body.error.code,
                    message: body.error.message,
                },
                Err(_) => TransportError::Server {
                    status: status.as_u16(),
                    code: "HTTP_ERROR".to_string(),
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Create a profile (`POST /user`).
    pub async fn create_user(&self, request: &CreateUserRequest) -> Result<User, TransportError> {
        let body: UserBody = Self::call(self.client.post(self.url("/user")).json(request)).await?;
        Ok(body.user)
    }

    /// Fetch a profile (`GET /user`).
    pub async fn get_user(&self, user_id: &Uuid) -> Result<User, TransportError> {
        let request = self
            .client
            .get(self.url("/user"))
            .query(&[("user_id", user_id.to_string())]);
        let body: UserBody = Self::call(request).await?;
        Ok(body.user)
    }
}

impl ChatTransport for HttpChatClient {
    async fn active_session(&self, user_id: &Uuid) -> Result<Option<Session>, TransportError> {
        let request = self
            .client
            .get(self.url("/session"))
            .query(&[("user_id", user_id.to_string())]);
        let body: SessionBody = Self::call(request).await?;
        Ok(body.session)
    }

    async fn start_session(
        &self,
        user_id: &Uuid,
        device_info: Option<&str>,
    ) -> Result<Session, TransportError> {
        let request = self
            .client
            .post(self.url("/session"))
            .json(&json!({ "user_id": user_id, "device_info": device_info }));
        let body: SessionBody = Self::call(request).await?;
        body.session
            .ok_or_else(|| TransportError::Decode("response carried no session".to_string()))
    }

    async fn history(&self, session_id: &Uuid, limit: Option<u32>) -> Result<Vec<Message>, TransportError> {
        let mut query = vec![("session_id", session_id.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let body: MessagesBody = Self::call(self.client.get(self.url("/chat")).query(&query)).await?;
        Ok(body.messages)
    }

    async fn post_turn(&self, request: &TurnRequest) -> Result<Turn, TransportError> {
        Self::call(self.client.post(self.url("/chat")).json(request)).await
    }

    async fn end_session(&self, session_id: &Uuid) -> Result<Session, TransportError> {
        let request = self.client.delete(self.url(&format!("/session/{session_id}")));
        let body: SessionBody = Self::call(request).await?;
        body.session
            .ok_or_else(|| TransportError::Decode("response carried no session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::delivery::{DeliveryClient, DeliveryState, SendOutcome};
    use tutor_core::responder::{BoxResponder, KeywordResponder};
    use tutor_infra::sqlite::pool::{DatabasePool, database_url};
    use tutor_types::config::TutorConfig;
    use tutor_types::message::SenderType;

    use crate::http::router::build_router;
    use crate::state::AppState;

    /// Serve the real router on an ephemeral port and return its base URL
    /// along with the server state.
    async fn spawn_server() -> (String, AppState) {
        let tmp = tempfile::tempdir().unwrap();
        let tmp = Box::leak(Box::new(tmp));
        let pool = DatabasePool::new(&database_url(tmp.path())).await.unwrap();
        let state = AppState::build(
            pool,
            tmp.path().to_path_buf(),
            TutorConfig::default(),
            BoxResponder::new(KeywordResponder::new()),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    fn onboarding() -> CreateUserRequest {
        CreateUserRequest {
            first_name: Some("Asha".to_string()),
            age: Some(14),
            grade_level: Some(9),
            education_board: Some("CBSE".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_conversation_over_http() {
        let (base_url, _) = spawn_server().await;
        let transport = HttpChatClient::new(&base_url).unwrap();
        let user = transport.create_user(&onboarding()).await.unwrap();
        assert_eq!(transport.get_user(&user.id).await.unwrap(), user);

        let mut client = DeliveryClient::new(transport.clone(), user.id).with_student_name("Asha");
        let session_id = client.bootstrap().await.unwrap().id;
        assert_eq!(client.ledger().entries().len(), 1, "local welcome only");

        let outcome = client.send("hello").await.unwrap();
        assert!(matches!(outcome, SendOutcome::Delivered { .. }));

        let entries = client.ledger().entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].sender, SenderType::User);
        assert_eq!(entries[1].state, DeliveryState::Sent);
        assert_eq!(entries[2].sender, SenderType::Bot);

        let history = transport.history(&session_id, None).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].temp_id.as_deref(), entries[1].correlation_id.as_ref().map(|c| c.as_str()));

        let ended = client.end_session().await.unwrap().unwrap();
        assert!(!ended.is_active);
        assert!(transport.active_session(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chat_continues_after_session_expires() {
        let (base_url, state) = spawn_server().await;
        let transport = HttpChatClient::new(&base_url).unwrap();
        let user = transport.create_user(&onboarding()).await.unwrap();
        let mut client = DeliveryClient::new(transport.clone(), user.id);
        let stale_id = client.bootstrap().await.unwrap().id;

        tokio::time::sleep(Duration::from_millis(5)).await;
        let expired = state
            .session_manager
            .expire_idle_sessions(Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);

        let SendOutcome::Failed { error, .. } = client.send("hello").await.unwrap() else {
            panic!("send to an expired session must fail");
        };
        assert!(matches!(error, TransportError::Server { ref code, .. } if code == "SESSION_ENDED"));
        assert!(client.session().is_none());
        assert!(client.ledger().banner().unwrap().contains("session has ended"));

        let retried = client.retry_last().await.unwrap().unwrap();
        assert!(matches!(retried, SendOutcome::Delivered { .. }));
        let fresh = client.session().unwrap().clone();
        assert_ne!(fresh.id, stale_id);
        assert!(fresh.is_active);

        assert_eq!(transport.history(&fresh.id, None).await.unwrap().len(), 2);
        assert!(transport.history(&stale_id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_errors_are_decoded() {
        let (base_url, _) = spawn_server().await;
        let transport = HttpChatClient::new(&base_url).unwrap();

        let err = transport.get_user(&Uuid::now_v7()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(err, TransportError::Server { ref code, .. } if code == "USER_NOT_FOUND"));

        let mut request = onboarding();
        request.age = Some(10);
        let err = transport.create_user(&request).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpChatClient::new(&format!("http://{addr}/")).unwrap();
        assert_eq!(transport.url("/chat"), format!("http://{addr}/chat"));
        let err = transport.active_session(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }
}
