use axum::{Extension, Router, body::Body, routing};
use client_ip::{ConfigError, ForwardedHeader, RemoteAddr, RightmostNonPrivate, headers};
use config::TelemetryConfig;
use indoc::indoc;
use integration_tests::{Telemetry, attribute, get, send};
use otelaxum::RouteClientIp;

fn app(layer: otelaxum::Builder) -> Router {
    Router::new().route("/", routing::get(|| async { "ok" })).layer(layer.build())
}

#[tokio::test]
async fn leftmost_forwarded_for() {
    let telemetry = Telemetry::new();
    let app = app(telemetry.layer("checkout"));

    let request = get("/", "10.0.0.7:4242")
        .header("x-forwarded-for", "25.13.12.11")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "client.address").as_deref(), Some("25.13.12.11"));
}

#[tokio::test]
async fn falls_back_to_peer_address() {
    let telemetry = Telemetry::new();
    let app = app(telemetry.layer("checkout"));

    send(&app, get("/", "192.0.2.44:4242").body(Body::empty()).unwrap()).await;

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "client.address").as_deref(), Some("192.0.2.44"));
}

#[tokio::test]
async fn vendor_header() {
    let telemetry = Telemetry::new();
    let app = app(telemetry.layer("checkout"));

    let request = get("/", "10.0.0.7:4242")
        .header("x-forwarded-for", "10.1.1.1, 192.168.0.3")
        .header("cf-connecting-ip", "2001:db8::1")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "client.address").as_deref(), Some("2001:db8::1"));
}

#[tokio::test]
async fn layer_resolver() {
    let telemetry = Telemetry::new();
    let app = app(telemetry.layer("checkout").client_ip_resolver(RemoteAddr::new()));

    let request = get("/", "192.0.2.44:4242")
        .header("x-forwarded-for", "25.13.12.11")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "client.address").as_deref(), Some("192.0.2.44"));
}

#[tokio::test]
async fn route_resolver() {
    let telemetry = Telemetry::new();

    let app = Router::new()
        .route("/", routing::get(|| async { "ok" }))
        .layer(telemetry.layer("checkout").build())
        .layer(Extension(RouteClientIp::new(RightmostNonPrivate::new(
            ForwardedHeader::XForwardedFor,
        ))));

    let request = get("/", "10.0.0.7:4242")
        .header("x-forwarded-for", "1.1.1.1, 25.13.12.11, 10.0.0.2")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "client.address").as_deref(), Some("25.13.12.11"));
}

#[tokio::test]
async fn unresolved_address_is_omitted() {
    let telemetry = Telemetry::new();
    let app = app(telemetry.layer("checkout").client_ip_resolver(RemoteAddr::new()));

    let request = http::Request::get("/")
        .header("x-forwarded-for", "25.13.12.11")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "client.address"), None);
}

#[tokio::test]
async fn resolvers_from_config() {
    let telemetry = Telemetry::new();

    let config = TelemetryConfig::parse(indoc! {r#"
        [[client_ip.resolvers]]
        strategy = "rightmost_trusted_count"
        header = "x-forwarded-for"
        trusted_count = 2

        [[client_ip.resolvers]]
        strategy = "remote_addr"
    "#})
    .unwrap();

    let app = app(telemetry.layer("checkout").apply_config(&config).unwrap());

    let request = get("/", "10.0.0.7:4242")
        .header("x-forwarded-for", "6.6.6.6, 25.13.12.11, 10.0.0.2")
        .body(Body::empty())
        .unwrap();

    send(&app, request).await;

    let request = get("/", "192.0.2.44:4242").body(Body::empty()).unwrap();

    send(&app, request).await;

    let spans = telemetry.spans();
    let addresses: Vec<_> = spans.iter().map(|span| attribute(span, "client.address")).collect();

    assert_eq!(
        addresses,
        [Some("25.13.12.11".to_string()), Some("192.0.2.44".to_string())]
    );
}

#[tokio::test]
async fn invalid_resolver_in_config() {
    let telemetry = Telemetry::new();

    let config = TelemetryConfig::parse(indoc! {r#"
        [[client_ip.resolvers]]
        strategy = "single_ip_header"
        header = "x-forwarded-for"
    "#})
    .unwrap();

    let error = telemetry.layer("checkout").apply_config(&config).err();

    assert_eq!(error, Some(ConfigError::MultiIpHeader(headers::X_FORWARDED_FOR)));
}
