use axum::{Router, body::Body, routing};
use config::TelemetryConfig;
use http::{Method, Request, request::Parts};
use indoc::indoc;
use integration_tests::{Telemetry, send};
use opentelemetry::{Context, trace::TraceContextExt};
use otelaxum::Filter;
use std::sync::Arc;

fn has_active_span() -> String {
    Context::current().span().span_context().is_valid().to_string()
}

fn app(layer: otelaxum::Builder) -> Router {
    Router::new()
        .route("/health", routing::get(|| async { has_active_span() }))
        .route("/users", routing::get(|| async { has_active_span() }).options(|| async { has_active_span() }))
        .layer(layer.build())
}

#[tokio::test]
async fn excluded_request_is_not_traced() {
    let telemetry = Telemetry::new();
    let layer = telemetry.layer("checkout").filter(|parts| parts.uri.path() == "/health");
    let app = app(layer);

    let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(response.body, "false");
    assert!(telemetry.spans().is_empty());

    let response = send(&app, Request::get("/users").body(Body::empty()).unwrap()).await;

    assert_eq!(response.body, "true");
    assert_eq!(telemetry.spans().len(), 1);
}

#[tokio::test]
async fn any_filter_excludes() {
    let telemetry = Telemetry::new();

    let filters: Vec<Filter> = vec![
        Arc::new(|parts: &Parts| parts.uri.path() == "/health"),
        Arc::new(|parts: &Parts| parts.method == Method::OPTIONS),
    ];

    let app = app(telemetry.layer("checkout").filters(filters));

    send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    send(&app, Request::options("/users").body(Body::empty()).unwrap()).await;

    assert!(telemetry.spans().is_empty());

    send(&app, Request::get("/users").body(Body::empty()).unwrap()).await;

    assert_eq!(telemetry.spans().len(), 1);
}

#[tokio::test]
async fn empty_filter_list_traces_everything() {
    let telemetry = Telemetry::new();
    let app = app(telemetry.layer("checkout").filters(Vec::new()));

    send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(telemetry.spans().len(), 1);
}

#[tokio::test]
async fn filters_from_config() {
    let telemetry = Telemetry::new();

    let config = TelemetryConfig::parse(indoc! {r#"
        [filter]
        exclude_paths = ["/health"]
        exclude_methods = ["OPTIONS"]
    "#})
    .unwrap();

    let layer = telemetry.layer("checkout").apply_config(&config).unwrap();
    let app = app(layer);

    send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    send(&app, Request::options("/users").body(Body::empty()).unwrap()).await;

    assert!(telemetry.spans().is_empty());

    send(&app, Request::get("/users").body(Body::empty()).unwrap()).await;

    assert_eq!(telemetry.spans().len(), 1);
}
