//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the REST API and
//! the background sweeper. Services are generic over repository traits, but
//! AppState pins them to the SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use tutor_core::chat::MessagePipeline;
use tutor_core::responder::{BoxResponder, GuardedResponder, KeywordResponder};
use tutor_core::service::UserService;
use tutor_core::session::SessionManager;
use tutor_infra::config::load_tutor_config;
use tutor_infra::paths::resolve_data_dir;
use tutor_infra::sqlite::message::SqliteMessageRepository;
use tutor_infra::sqlite::pool::{DatabasePool, database_url};
use tutor_infra::sqlite::session::SqliteSessionRepository;
use tutor_infra::sqlite::user::SqliteUserRepository;
use tutor_types::config::TutorConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteSessionManager = SessionManager<SqliteSessionRepository>;

pub type ConcreteMessagePipeline = MessagePipeline<SqliteSessionRepository, SqliteMessageRepository>;

pub type ConcreteUserService = UserService<SqliteUserRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<ConcreteSessionManager>,
    pub message_pipeline: Arc<ConcreteMessagePipeline>,
    pub user_service: Arc<ConcreteUserService>,
    pub config: Arc<TutorConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: resolve the data directory, load
    /// `config.toml`, open the database and wire services with the keyword
    /// responder.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_tutor_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;

        Ok(Self::build(
            db_pool,
            data_dir,
            config,
            BoxResponder::new(KeywordResponder::new()),
        ))
    }

    /// Wire services over an open pool with the given responder.
    pub fn build(
        db_pool: DatabasePool,
        data_dir: PathBuf,
        config: TutorConfig,
        responder: BoxResponder,
    ) -> Self {
        let session_manager = SessionManager::new(SqliteSessionRepository::new(db_pool.clone()));

        // The pipeline owns its own manager over the same pool; both are stateless.
        let message_pipeline = MessagePipeline::new(
            SessionManager::new(SqliteSessionRepository::new(db_pool.clone())),
            SqliteMessageRepository::new(db_pool.clone()),
            GuardedResponder::from_config(responder, &config),
            config.history_limit,
        );

        let user_service = UserService::new(SqliteUserRepository::new(db_pool.clone()));

        Self {
            session_manager: Arc::new(session_manager),
            message_pipeline: Arc::new(message_pipeline),
            user_service: Arc::new(user_service),
            config: Arc::new(config),
            data_dir,
            db_pool,
        }
    }
}
