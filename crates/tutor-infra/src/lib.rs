//! Infrastructure layer for the tutoring chat service.
//!
//! Contains implementations of the repository traits defined in `tutor-core`
//! (SQLite storage), the `config.toml` loader, data directory resolution, and the
//! locally stored user id.

pub mod config;
pub mod identity;
pub mod paths;
pub mod sqlite;
