//! HTTP server metric instruments

mod names;
mod recorder;

pub use names::*;
pub use recorder::Recorder;

use opentelemetry::metrics::{Histogram, Meter};

/// The histograms recorded for every instrumented request.
///
/// Instruments are created once from the injected meter and shared by all requests.
#[derive(Clone)]
pub struct ServerMetrics {
    pub(crate) duration: Histogram<f64>,
    pub(crate) request_size: Histogram<u64>,
    pub(crate) response_size: Histogram<u64>,
}

impl ServerMetrics {
    pub fn new(meter: &Meter) -> Self {
        let duration = meter
            .f64_histogram(HTTP_SERVER_REQUEST_DURATION)
            .with_unit("ms")
            .with_description("Duration of HTTP server requests.")
            .build();

        let request_size = meter
            .u64_histogram(HTTP_SERVER_REQUEST_BODY_SIZE)
            .with_unit("By")
            .with_description("Size of HTTP server request bodies.")
            .build();

        let response_size = meter
            .u64_histogram(HTTP_SERVER_RESPONSE_BODY_SIZE)
            .with_unit("By")
            .with_description("Size of HTTP server response bodies.")
            .build();

        Self {
            duration,
            request_size,
            response_size,
        }
    }
}

impl std::fmt::Debug for ServerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerMetrics").finish_non_exhaustive()
    }
}
