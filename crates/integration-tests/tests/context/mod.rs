use std::panic::AssertUnwindSafe;

use axum::{Extension, Router, body::Body, routing};
use futures::FutureExt;
use http::Request;
use integration_tests::{Telemetry, attribute, send};
use opentelemetry::{
    Context,
    trace::{Status, TraceContextExt},
};
use tower::ServiceExt;

#[derive(Debug, PartialEq)]
struct Caller(&'static str);

fn app(telemetry: &Telemetry) -> Router {
    Router::new()
        .route(
            "/current",
            routing::get(|| async { Context::current().span().span_context().trace_id().to_string() }),
        )
        .route(
            "/extension",
            routing::get(|Extension(cx): Extension<Context>| async move {
                cx.span().span_context().trace_id().to_string()
            }),
        )
        .route("/panic", routing::get(explode))
        .layer(telemetry.layer("checkout").build())
}

#[allow(clippy::panic)]
async fn explode() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn handler_runs_inside_server_span() {
    let telemetry = Telemetry::new();
    let app = app(&telemetry);

    let response = send(&app, Request::get("/current").body(Body::empty()).unwrap()).await;
    let span = telemetry.single_span();

    assert_eq!(response.body, span.span_context.trace_id().to_string());
}

#[tokio::test]
async fn span_context_in_extensions() {
    let telemetry = Telemetry::new();
    let app = app(&telemetry);

    let response = send(&app, Request::get("/extension").body(Body::empty()).unwrap()).await;
    let span = telemetry.single_span();

    assert_eq!(response.body, span.span_context.trace_id().to_string());
}

#[tokio::test]
async fn caller_context_is_restored() {
    let telemetry = Telemetry::new();
    let app = app(&telemetry);

    let _guard = Context::current_with_value(Caller("test")).attach();

    send(&app, Request::get("/current").body(Body::empty()).unwrap()).await;

    assert_eq!(Context::current().get::<Caller>(), Some(&Caller("test")));
    assert!(!Context::current().span().span_context().is_valid());
}

#[tokio::test]
async fn dropped_body_ends_span() {
    let telemetry = Telemetry::new();
    let app = app(&telemetry);

    let response = app
        .clone()
        .oneshot(Request::get("/current").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(telemetry.spans().is_empty());

    drop(response);

    let span = telemetry.single_span();
    assert_eq!(attribute(&span, "http.response.status_code").as_deref(), Some("200"));
}

#[tokio::test]
async fn panicking_handler_still_ends_span() {
    let telemetry = Telemetry::new();
    let app = app(&telemetry);

    let _guard = Context::current_with_value(Caller("test")).attach();

    let result = AssertUnwindSafe(app.clone().oneshot(Request::get("/panic").body(Body::empty()).unwrap()))
        .catch_unwind()
        .await;

    assert!(result.is_err());

    let span = telemetry.single_span();

    assert_eq!(span.name, "GET /panic");
    assert_eq!(span.status, Status::Unset);
    assert_eq!(attribute(&span, "http.response.status_code"), None);
    assert_eq!(Context::current().get::<Caller>(), Some(&Caller("test")));
}
