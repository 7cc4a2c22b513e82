//! OpenTelemetry instrumentation for axum.
//!
//! [`OtelLayer`] starts a server span around every request handled by the wrapped service, continuing
//! the trace context propagated by the caller, and records the HTTP server metrics once the response
//! body has been written.
//!
//! ```rust,ignore
//! let layer = OtelLayer::builder("checkout", &tracer_provider, &meter_provider)
//!     .filter(|parts| parts.uri.path() == "/health")
//!     .build();
//!
//! let app = Router::new().route("/users/{id}", get(user)).layer(layer);
//! ```

mod body;
mod builder;
mod carrier;
mod context;
mod finalizer;
mod layer;
mod recorder;
mod resolver;

pub use body::InstrumentedBody;
pub use builder::{Builder, CarrierFn, Filter, SpanAttributesFn, SpanNameFormatter, default_span_name};
pub use carrier::HeaderCarrier;
pub use layer::{OtelLayer, OtelService};
pub use recorder::{PooledRecorder, RecorderPool, ResponseRecorder};
pub use resolver::RouteClientIp;

pub use client_ip::{ClientIpResolver, default_resolver};

/// Instrumentation scope name of the tracer and the meter.
pub const SCOPE_NAME: &str = "otelaxum";

/// Version of the instrumentation.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Version of the instrumentation, prefixed with `semver:`.
pub fn sem_version() -> String {
    format!("semver:{}", version())
}
