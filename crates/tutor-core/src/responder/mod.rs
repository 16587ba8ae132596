//! Reply generation capability.
//!
//! A responder maps the student's message text to reply text. It is injected
//! into the message pipeline so a real reasoning backend can replace the
//! keyword stub without touching session or message handling.
//!
//! - [`Responder`]: the trait implementations provide
//! - [`BoxResponder`]: type-erased wrapper for runtime selection
//! - [`GuardedResponder`]: timeout + fixed fallback around any responder
//! - [`KeywordResponder`]: keyword-matching stub

pub mod box_responder;
pub mod guarded;
pub mod keyword;

use tutor_types::error::ResponderError;

pub use box_responder::BoxResponder;
pub use guarded::GuardedResponder;
pub use keyword::KeywordResponder;

/// Trait for reply generators.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait Responder: Send + Sync {
    /// Human-readable responder name, used in logs.
    fn name(&self) -> &str;

    /// Produce reply text for the given input text.
    fn respond(
        &self,
        input: &str,
    ) -> impl std::future::Future<Output = Result<String, ResponderError>> + Send;
}
