//! HTTP tracing middleware
//!
//! Creates a server span for every request following OpenTelemetry semantic conventions, and records
//! the HTTP server metrics.

use std::{
    fmt::Display,
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, MatchedPath},
};
use http::{Request, Response};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer, TracerProvider};
use telemetry::{
    metrics::Recorder,
    semconv::{self, RequestAttributesOptions},
};
use tower::Layer;

use crate::{
    Builder, InstrumentedBody,
    builder::Settings,
    context::WithContext,
    finalizer::Finalizer,
    resolver,
};

/// Layer for HTTP tracing
#[derive(Clone, Debug)]
pub struct OtelLayer {
    settings: Arc<Settings>,
}

impl OtelLayer {
    /// Start configuring a layer reporting as `service_name`, with spans created by
    /// `tracer_provider` and metrics by `meter_provider`.
    pub fn builder<T, M>(service_name: impl Into<String>, tracer_provider: &T, meter_provider: &M) -> Builder
    where
        T: TracerProvider,
        T::Tracer: Send + Sync + 'static,
        <T::Tracer as Tracer>::Span: Send + Sync + 'static,
        M: opentelemetry::metrics::MeterProvider + ?Sized,
    {
        Builder::new(service_name, tracer_provider, meter_provider)
    }

    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

impl<Service> Layer<Service> for OtelLayer
where
    Service: Send + Clone,
{
    type Service = OtelService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        OtelService {
            next,
            settings: self.settings.clone(),
        }
    }
}

/// Service that traces HTTP requests
#[derive(Clone, Debug)]
pub struct OtelService<Service> {
    next: Service,
    settings: Arc<Settings>,
}

impl<Service, ReqBody, ResBody> tower::Service<Request<ReqBody>> for OtelService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<ResBody>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: Send + 'static,
    ResBody: http_body::Body<Data = Bytes> + Send + 'static,
{
    type Response = Response<InstrumentedBody<ResBody>>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let (mut parts, body) = req.into_parts();
        let settings = &self.settings;
        let mut next = self.next.clone();

        if settings.is_excluded(&parts) {
            log::debug!("Request {} {} excluded from tracing", parts.method, parts.uri.path());

            let req = Request::from_parts(parts, body);

            return Box::pin(async move {
                let response = next.call(req).await?;
                Ok(response.map(InstrumentedBody::passthrough))
            });
        }

        let parent = {
            let carrier = (settings.carrier)(&parts);
            settings.propagator.extract(&*carrier)
        };

        let route = parts
            .extensions
            .get::<MatchedPath>()
            .map(|matched_path| matched_path.as_str().to_owned());

        let peer_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let options = RequestAttributesOptions {
            server_name: &settings.service_name,
            client_ip: resolver::client_ip(settings.client_ip_resolver.as_deref(), &parts),
            peer_addr,
        };

        let user_attributes = settings
            .span_attributes
            .as_ref()
            .map(|attributes| attributes(&parts))
            .unwrap_or_default();

        let mut attributes = semconv::request_trace_attributes(&parts, options);

        if let Some(route) = &route {
            attributes.push(semconv::route(route));
        }

        attributes.extend(user_attributes.iter().cloned());

        let span_name = settings.span_name(&parts);
        log::debug!("Creating server span '{span_name}'");

        let span = settings
            .tracer
            .span_builder(span_name)
            .with_kind(SpanKind::Server)
            .with_attributes(attributes)
            .start_with_context(&settings.tracer, &parent);

        let cx = parent.with_span(span);

        let mut metrics = Recorder::new(settings.metrics.clone());
        metrics.extend_attributes(semconv::metric_attributes(&parts, &settings.service_name, None));

        if let Some(route) = &route {
            metrics.extend_attributes([semconv::route(route)]);
        }

        metrics.extend_attributes(user_attributes);
        metrics.set_request_size(semconv::request_body_size(&parts));

        let mut finalizer = Finalizer::new(cx.clone(), settings.recorders.acquire(), metrics);

        // Handlers can pick the span up from the extensions when they spawn work of their own.
        parts.extensions.insert(cx.clone());
        let req = Request::from_parts(parts, body);

        let fut = async move {
            match next.call(req).await {
                Ok(response) => {
                    finalizer.observe_status(response.status().as_u16());

                    let (head, body) = response.into_parts();
                    let body = InstrumentedBody::instrumented(body, finalizer);

                    Ok(Response::from_parts(head, body))
                }
                Err(error) => {
                    finalizer.fail(error.to_string());
                    Err(error)
                }
            }
        };

        Box::pin(WithContext::new(fut, cx))
    }
}
