//! Observability setup: structured logging and optional OpenTelemetry export.

pub mod tracing_setup;

pub use tracing_setup::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
