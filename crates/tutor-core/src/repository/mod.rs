//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (tutor-infra) implements. The core crate never depends on any specific
//! storage technology. Every method is a single point write or a read; the
//! store is expected to make each of them atomic.

pub mod message;
pub mod session;
pub mod user;
