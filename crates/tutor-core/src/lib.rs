//! Business logic and repository trait definitions for the tutoring chat service.
//!
//! This crate defines the "ports" (repository traits, responder, chat
//! transport) that the infrastructure and application layers implement. It
//! depends only on `tutor-types` -- never on `tutor-infra` or any
//! database/IO crate.

pub mod chat;
pub mod delivery;
pub mod repository;
pub mod responder;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
