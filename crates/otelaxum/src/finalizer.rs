use opentelemetry::{
    Context,
    trace::{Status, TraceContextExt},
};
use telemetry::{
    metrics::Recorder,
    semconv::{self, HTTP_RESPONSE_STATUS_CODE},
};

use crate::PooledRecorder;

/// Ends the server span and records the metrics of one request when dropped.
///
/// Dropped once the response body has been fully written, when the body or the response future is
/// dropped early, or when the downstream service fails. During a panic only the span is ended.
pub(crate) struct Finalizer {
    cx: Context,
    response: PooledRecorder,
    metrics: Option<Recorder>,
    error: Option<String>,
}

impl Finalizer {
    pub(crate) fn new(cx: Context, response: PooledRecorder, metrics: Recorder) -> Self {
        Self {
            cx,
            response,
            metrics: Some(metrics),
            error: None,
        }
    }

    pub(crate) fn context(&self) -> &Context {
        &self.cx
    }

    pub(crate) fn observe_status(&mut self, status: u16) {
        self.response.write_header(status);
    }

    pub(crate) fn observe_data(&mut self, len: usize) {
        self.response.write(len);
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.error = Some(error);
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        let span = self.cx.span();

        if std::thread::panicking() {
            span.end();
            return;
        }

        let status = self.response.written().then(|| self.response.status());

        match (self.error.take(), status) {
            (Some(error), _) => span.set_status(Status::error(error)),
            (None, Some(status)) => span.set_status(semconv::server_status(status)),
            (None, None) => (),
        }

        if let Some(status) = status {
            span.set_attribute(semconv::status_code(status));
        }

        span.set_attribute(semconv::response_body_size(self.response.size()));
        span.end();

        if let Some(mut metrics) = self.metrics.take() {
            if let Some(status) = status {
                metrics.push_attribute(HTTP_RESPONSE_STATUS_CODE, i64::from(status));
            }

            metrics.record(self.response.size());
        }
    }
}
