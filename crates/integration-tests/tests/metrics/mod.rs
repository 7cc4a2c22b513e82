use axum::{Router, body::Body, routing};
use http::Request;
use insta::assert_debug_snapshot;
use integration_tests::{Telemetry, get, send};
use opentelemetry::KeyValue;

#[tokio::test]
async fn server_metrics_are_recorded() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route("/users/{id}", routing::post(|body: String| async move { body }))
        .layer(telemetry.layer("checkout").build());

    let request = get("/users/1", "192.0.2.10:5000")
        .method("POST")
        .header("content-length", "5")
        .body(Body::from("hello"))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.body, "hello");

    assert_debug_snapshot!(telemetry.metric_names(), @r#"
    [
        "http.server.request.body.size",
        "http.server.request.duration",
        "http.server.response.body.size",
    ]
    "#);
}

#[tokio::test]
async fn data_points_carry_sizes_and_attributes() {
    let telemetry = Telemetry::new();

    let layer = telemetry
        .layer("checkout")
        .span_attributes(|_| vec![KeyValue::new("tenant", "acme")])
        .build();

    let app = Router::new()
        .route("/users/{id}", routing::post(|body: String| async move { body }))
        .layer(layer);

    let request = get("/users/1", "192.0.2.10:5000")
        .method("POST")
        .header("content-length", "5")
        .body(Body::from("hello"))
        .unwrap();

    send(&app, request).await;

    let request_size = telemetry.single_histogram("http.server.request.body.size");
    assert_eq!(request_size.count, 1);
    assert_eq!(request_size.sum, 5.0);

    let response_size = telemetry.single_histogram("http.server.response.body.size");
    assert_eq!(response_size.count, 1);
    assert_eq!(response_size.sum, 5.0);
    assert_eq!(response_size.attributes, request_size.attributes);

    let duration = telemetry.single_histogram("http.server.request.duration");
    assert_eq!(duration.count, 1);
    assert!(duration.sum >= 0.0);
    assert_eq!(duration.attributes, request_size.attributes);

    assert_debug_snapshot!(request_size.attributes, @r#"
    {
        "http.request.method": "POST",
        "http.response.status_code": "200",
        "http.route": "/users/{id}",
        "network.protocol.name": "http",
        "network.protocol.version": "1.1",
        "server.address": "checkout",
        "tenant": "acme",
        "url.scheme": "http",
    }
    "#);
}

#[tokio::test]
async fn unknown_request_size_is_recorded_as_zero() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route("/", routing::get(|| async { "ok" }))
        .layer(telemetry.layer("checkout").build());

    send(&app, Request::get("/").body(Body::empty()).unwrap()).await;

    let request_size = telemetry.single_histogram("http.server.request.body.size");
    assert_eq!(request_size.count, 1);
    assert_eq!(request_size.sum, 0.0);

    assert_eq!(telemetry.single_histogram("http.server.response.body.size").sum, 2.0);
}

#[tokio::test]
async fn excluded_requests_record_nothing() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route("/health", routing::get(|| async { "ok" }))
        .layer(telemetry.layer("checkout").filter(|_| true).build());

    send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert!(telemetry.metric_names().is_empty());
}
