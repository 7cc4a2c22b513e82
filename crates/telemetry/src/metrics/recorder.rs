use std::{sync::Arc, time::Instant};

use opentelemetry::{Key, KeyValue, Value};

use super::ServerMetrics;

/// Measures one request and records the HTTP server histograms.
///
/// The recorder captures the current time when created. Calling [`Recorder::record`] records the
/// elapsed time in milliseconds together with the request and response body sizes, all sharing
/// the same attributes.
///
/// # Examples
///
/// ```rust,ignore
/// use telemetry::metrics::{Recorder, ServerMetrics};
///
/// let metrics = Arc::new(ServerMetrics::new(&meter));
/// let mut recorder = Recorder::new(metrics);
/// recorder.push_attribute("http.route", "/users/{id}");
///
/// let response = handle(request).await;
///
/// recorder.record(response_size);
/// ```
pub struct Recorder {
    start: Instant,
    metrics: Arc<ServerMetrics>,
    request_size: u64,
    attributes: Vec<KeyValue>,
}

impl Recorder {
    /// Creates a new recorder, starting the clock immediately.
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
            request_size: 0,
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute to be recorded with every metric.
    pub fn push_attribute<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        self.attributes.push(KeyValue::new(key, value));
    }

    /// Adds several attributes at once.
    pub fn extend_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        self.attributes.extend(attributes);
    }

    /// Sets the request body size. Unknown sizes are recorded as zero.
    pub fn set_request_size(&mut self, size: Option<u64>) {
        self.request_size = size.unwrap_or_default();
    }

    /// Records the elapsed time and both body sizes.
    pub fn record(self, response_size: u64) {
        let duration = self.start.elapsed().as_secs_f64() * 1000.0;

        self.metrics.duration.record(duration, &self.attributes);
        self.metrics.request_size.record(self.request_size, &self.attributes);
        self.metrics.response_size.record(response_size, &self.attributes);
    }
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("start", &self.start)
            .field("request_size", &self.request_size)
            .field("attributes", &self.attributes.len())
            .finish_non_exhaustive()
    }
}
