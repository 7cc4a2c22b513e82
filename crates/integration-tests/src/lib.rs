//! Test harness for the tracing layer: axum applications instrumented with in-memory exporters.

use std::{collections::BTreeMap, net::SocketAddr, str::FromStr, sync::Once};

use axum::{Router, body::Body, extract::ConnectInfo};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use logforth::{append::Stderr, filter::EnvFilter};
use opentelemetry::trace::SpanId;
use opentelemetry_sdk::{
    metrics::{
        InMemoryMetricExporter, PeriodicReader, SdkMeterProvider,
        data::{AggregatedMetrics, HistogramDataPoint, Metric, MetricData},
    },
    trace::{InMemorySpanExporter, SdkTracerProvider, SpanData},
};
use otelaxum::{Builder, OtelLayer};
use tower::ServiceExt;

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn,otelaxum=debug".to_string());
        let filter = EnvFilter::from_str(&filter).expect("RUST_LOG must be a valid filter");

        logforth::builder()
            .dispatch(|d| d.filter(filter).append(Stderr::default()))
            .apply();
    });
}

/// Tracer and meter providers exporting to memory.
pub struct Telemetry {
    spans: InMemorySpanExporter,
    metrics: InMemoryMetricExporter,
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        init_logger();

        let spans = InMemorySpanExporter::default();
        let metrics = InMemoryMetricExporter::default();

        let tracer_provider = SdkTracerProvider::builder().with_simple_exporter(spans.clone()).build();

        let meter_provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(metrics.clone()).build())
            .build();

        Self {
            spans,
            metrics,
            tracer_provider,
            meter_provider,
        }
    }

    /// A layer builder reporting to this telemetry.
    pub fn layer(&self, service_name: &str) -> Builder {
        OtelLayer::builder(service_name, &self.tracer_provider, &self.meter_provider)
    }

    /// Every span ended so far.
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.get_finished_spans().unwrap()
    }

    /// The only span ended so far.
    pub fn single_span(&self) -> SpanData {
        let mut spans = self.spans();
        assert_eq!(spans.len(), 1, "expected exactly one span, got {spans:#?}");

        spans.remove(0)
    }

    /// Names of the metrics exported under the scope of the layer, after a flush.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.histograms().into_iter().map(|point| point.name).collect();

        names.sort();
        names.dedup();

        names
    }

    /// Every histogram data point exported under the scope of the layer by a fresh flush.
    pub fn histograms(&self) -> Vec<HistogramPoint> {
        self.meter_provider.force_flush().unwrap();

        let resources = self.metrics.get_finished_metrics().unwrap();

        // Cumulative temporality: the latest export holds every data point.
        resources
            .last()
            .into_iter()
            .flat_map(|resource| resource.scope_metrics())
            .filter(|scope| scope.scope().name() == otelaxum::SCOPE_NAME)
            .flat_map(|scope| scope.metrics())
            .flat_map(histogram_points)
            .collect()
    }

    /// The single data point of the histogram `name`.
    pub fn single_histogram(&self, name: &str) -> HistogramPoint {
        let mut points: Vec<_> = self.histograms().into_iter().filter(|point| point.name == name).collect();
        assert_eq!(points.len(), 1, "expected exactly one {name} data point, got {points:#?}");

        points.remove(0)
    }
}

/// One data point of a histogram, with its sum widened to `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramPoint {
    pub name: String,
    pub count: u64,
    pub sum: f64,
    pub attributes: BTreeMap<String, String>,
}

fn histogram_points(metric: &Metric) -> Vec<HistogramPoint> {
    fn point<T: Copy>(name: &str, data: &HistogramDataPoint<T>, sum: impl Fn(T) -> f64) -> HistogramPoint {
        HistogramPoint {
            name: name.to_string(),
            count: data.count(),
            sum: sum(data.sum()),
            attributes: data
                .attributes()
                .map(|kv| (kv.key.as_str().to_string(), kv.value.to_string()))
                .collect(),
        }
    }

    let name = metric.name();

    match metric.data() {
        AggregatedMetrics::F64(MetricData::Histogram(histogram)) => {
            histogram.data_points().map(|data| point(name, data, |sum| sum)).collect()
        }
        AggregatedMetrics::U64(MetricData::Histogram(histogram)) => {
            histogram.data_points().map(|data| point(name, data, |sum| sum as f64)).collect()
        }
        _ => Vec::new(),
    }
}

/// A response status and its body, read to the end.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Send `request` through `router` and read the whole response body.
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

/// A GET request to `uri`, coming from `peer`.
pub fn get(uri: &str, peer: &str) -> http::request::Builder {
    let peer: SocketAddr = peer.parse().unwrap();

    Request::get(uri).extension(ConnectInfo(peer))
}

/// String value of a span attribute.
pub fn attribute(span: &SpanData, key: &str) -> Option<String> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.to_string())
}

/// Whether the span has a local parent or a remote one.
pub fn has_parent(span: &SpanData) -> bool {
    span.parent_span_id != SpanId::INVALID
}
