//! Shared domain types for the tutoring chat service.
//!
//! This crate contains the core domain types used across the workspace:
//! User, Session, Message, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod message;
pub mod session;
pub mod time;
pub mod user;
