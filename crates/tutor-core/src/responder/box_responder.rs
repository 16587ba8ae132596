//! BoxResponder -- object-safe dynamic dispatch wrapper for Responder.
//!
//! 1. Define an object-safe `ResponderDyn` trait with boxed futures
//! 2. Blanket-impl `ResponderDyn` for all `T: Responder`
//! 3. `BoxResponder` wraps `Box<dyn ResponderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use tutor_types::error::ResponderError;

use super::Responder;

/// Object-safe version of [`Responder`] with boxed futures.
pub trait ResponderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn respond_boxed<'a>(
        &'a self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ResponderError>> + Send + 'a>>;
}

impl<T: Responder> ResponderDyn for T {
    fn name(&self) -> &str {
        Responder::name(self)
    }

    fn respond_boxed<'a>(
        &'a self,
        input: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, ResponderError>> + Send + 'a>> {
        Box::pin(self.respond(input))
    }
}

/// Type-erased responder for runtime selection.
pub struct BoxResponder {
    inner: Box<dyn ResponderDyn>,
}

impl BoxResponder {
    pub fn new<T: Responder + 'static>(responder: T) -> Self {
        Self {
            inner: Box::new(responder),
        }
    }
}

impl Responder for BoxResponder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn respond(&self, input: &str) -> Result<String, ResponderError> {
        self.inner.respond_boxed(input).await
    }
}
