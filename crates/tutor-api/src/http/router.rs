//! Axum router configuration with middleware.
//!
//! Middleware: permissive CORS and `TraceLayer` request tracing.

use axum::Router;
use axum::routing::{get, patch};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Sessions
        .route(
            "/session",
            get(handlers::session::get_active_session).post(handlers::session::start_session),
        )
        .route(
            "/session/{id}",
            patch(handlers::session::update_session).delete(handlers::session::end_session),
        )
        // Turns and history
        .route(
            "/chat",
            get(handlers::chat::get_history).post(handlers::chat::post_turn),
        )
        // Profiles
        .route(
            "/user",
            get(handlers::user::get_user)
                .post(handlers::user::create_user)
                .patch(handlers::user::update_user),
        )
        .route("/health", get(handlers::health::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
