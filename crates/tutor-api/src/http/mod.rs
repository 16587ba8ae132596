//! HTTP/REST API layer.
//!
//! Axum-based JSON API with permissive CORS and request tracing. Routes sit
//! at the root (`/session`, `/chat`, `/user`, `/health`).

pub mod error;
pub mod handlers;
pub mod router;
