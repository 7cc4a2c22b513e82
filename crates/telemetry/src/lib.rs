//! Telemetry building blocks for HTTP server instrumentation
//!
//! Provides the OpenTelemetry semantic convention attributes and the HTTP server metric instruments.

pub mod metrics;
pub mod semconv;

// Re-export common OpenTelemetry types used by the instrumentation
pub use opentelemetry::{
    KeyValue,
    metrics::{Histogram, Meter},
    trace::Status,
};
