//! Message pipeline: one user message in, one bot message out.

pub mod pipeline;

pub use pipeline::MessagePipeline;
