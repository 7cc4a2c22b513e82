use axum::{Router, body::Body, routing};
use config::TelemetryConfig;
use http::Request;
use indoc::indoc;
use integration_tests::{Telemetry, has_parent, send};
use opentelemetry::{
    Context,
    baggage::BaggageExt,
    propagation::{Extractor, TextMapCompositePropagator},
    trace::{SpanId, TraceContextExt, TraceId},
};
use std::collections::HashMap;

const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

fn current_trace_id() -> String {
    Context::current().span().span_context().trace_id().to_string()
}

#[tokio::test]
async fn continues_incoming_trace() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route("/", routing::get(|| async { current_trace_id() }))
        .layer(telemetry.layer("checkout").build());

    let request = Request::get("/").header("traceparent", TRACEPARENT).body(Body::empty()).unwrap();
    let response = send(&app, request).await;

    let span = telemetry.single_span();

    assert_eq!(
        span.span_context.trace_id(),
        TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
    );
    assert_eq!(span.parent_span_id, SpanId::from_hex("00f067aa0ba902b7").unwrap());
    assert_eq!(response.body, "4bf92f3577b34da6a3ce929d0e0e4736");
}

#[tokio::test]
async fn malformed_context_starts_new_trace() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route("/", routing::get(|| async { "ok" }))
        .layer(telemetry.layer("checkout").build());

    let request = Request::get("/").header("traceparent", "00-nonsense-01").body(Body::empty()).unwrap();
    send(&app, request).await;

    let span = telemetry.single_span();

    assert!(!has_parent(&span));
    assert!(span.span_context.is_valid());
}

#[tokio::test]
async fn baggage_from_config() {
    let telemetry = Telemetry::new();

    let config = TelemetryConfig::parse(indoc! {r#"
        [propagation]
        trace_context = true
        baggage = true
    "#})
    .unwrap();

    let layer = telemetry.layer("checkout").apply_config(&config).unwrap().build();

    let app = Router::new()
        .route(
            "/",
            routing::get(|| async {
                Context::current()
                    .baggage()
                    .get("tenant")
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }),
        )
        .layer(layer);

    let request = Request::get("/")
        .header("traceparent", TRACEPARENT)
        .header("baggage", "tenant=acme")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    assert_eq!(response.body, "acme");
    assert!(has_parent(&telemetry.single_span()));
}

#[tokio::test]
async fn config_without_propagation_keeps_custom_propagator() {
    let telemetry = Telemetry::new();

    let config = TelemetryConfig::parse(indoc! {r#"
        service_name = "checkout"
    "#})
    .unwrap();

    let layer = telemetry
        .layer("checkout")
        .propagator(TextMapCompositePropagator::new(Vec::new()))
        .apply_config(&config)
        .unwrap()
        .build();

    let app = Router::new()
        .route("/", routing::get(|| async { "ok" }))
        .layer(layer);

    let request = Request::get("/").header("traceparent", TRACEPARENT).body(Body::empty()).unwrap();
    send(&app, request).await;

    assert!(!has_parent(&telemetry.single_span()));
}

#[tokio::test]
async fn baggage_ignored_by_default() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route(
            "/",
            routing::get(|| async { Context::current().baggage().len().to_string() }),
        )
        .layer(telemetry.layer("checkout").build());

    let request = Request::get("/").header("baggage", "tenant=acme").body(Body::empty()).unwrap();

    assert_eq!(send(&app, request).await.body, "0");
}

#[tokio::test]
async fn custom_carrier() {
    let telemetry = Telemetry::new();

    // Reads the trace context from the query string instead of the headers.
    let layer = telemetry
        .layer("checkout")
        .carrier(|parts| {
            let fields: HashMap<String, String> = parts
                .uri
                .query()
                .unwrap_or_default()
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();

            let carrier: Box<dyn Extractor> = Box::new(fields);
            carrier
        })
        .build();

    let app = Router::new()
        .route("/", routing::get(|| async { "ok" }))
        .layer(layer);

    let request = Request::get(format!("/?traceparent={TRACEPARENT}"))
        .header("traceparent", "00-11111111111111111111111111111111-2222222222222222-01")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let span = telemetry.single_span();

    assert_eq!(
        span.span_context.trace_id(),
        TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
    );
}
