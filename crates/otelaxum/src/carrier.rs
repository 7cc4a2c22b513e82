use http::HeaderMap;
use opentelemetry::propagation::Extractor;

/// Read-only view over request headers for trace context propagators.
#[derive(Debug, Clone, Copy)]
pub struct HeaderCarrier<'a> {
    headers: &'a HeaderMap,
}

impl<'a> HeaderCarrier<'a> {
    pub fn new(headers: &'a HeaderMap) -> Self {
        Self { headers }
    }
}

impl Extractor for HeaderCarrier<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|name| name.as_str()).collect()
    }
}
