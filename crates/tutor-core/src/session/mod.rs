//! Session lifecycle management.
//!
//! Owns the rule "at most one active session per user", session creation,
//! and termination (explicit, system-forced, or idle timeout).

pub mod manager;

pub use manager::SessionManager;
