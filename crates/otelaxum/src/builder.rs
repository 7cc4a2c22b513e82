use std::{fmt, sync::Arc};

use axum::extract::MatchedPath;
use client_ip::{
    Chain, ClientIpResolver, ConfigError, ForwardedHeader, LeftmostNonPrivate, RemoteAddr, RightmostNonPrivate,
    RightmostTrustedCount, SingleIpHeader,
};
use config::{FilterConfig, PropagationConfig, ResolverConfig, TelemetryConfig};
use http::{Method, request::Parts};
use opentelemetry::{
    InstrumentationScope, KeyValue,
    global::BoxedTracer,
    metrics::{Meter, MeterProvider},
    propagation::{Extractor, TextMapCompositePropagator, TextMapPropagator},
    trace::{Tracer, TracerProvider},
};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use telemetry::metrics::ServerMetrics;

use crate::{HeaderCarrier, OtelLayer, RecorderPool, SCOPE_NAME, version};

/// Decides whether a request is excluded from tracing. Returning `true` excludes it.
pub type Filter = Arc<dyn Fn(&Parts) -> bool + Send + Sync>;

/// Computes the span name of a request. An empty name falls back to `HTTP {METHOD} route not found`.
pub type SpanNameFormatter = Arc<dyn Fn(&Parts) -> String + Send + Sync>;

/// Computes extra attributes added to the span and to the metrics of a request.
pub type SpanAttributesFn = Arc<dyn Fn(&Parts) -> Vec<KeyValue> + Send + Sync>;

/// Builds the carrier the propagator reads the incoming trace context from.
pub type CarrierFn = Arc<dyn for<'a> Fn(&'a Parts) -> Box<dyn Extractor + 'a> + Send + Sync>;

type Propagator = Arc<dyn TextMapPropagator + Send + Sync>;

/// The span name used when no formatter is configured: `{METHOD} {route}`, or nothing when the
/// request matched no route.
pub fn default_span_name(parts: &Parts) -> String {
    match parts.extensions.get::<MatchedPath>() {
        Some(route) => format!("{} {}", parts.method, route.as_str()),
        None => String::new(),
    }
}

fn header_carrier(parts: &Parts) -> Box<dyn Extractor + '_> {
    Box::new(HeaderCarrier::new(&parts.headers))
}

/// Settings shared read-only by every request going through the layer.
pub(crate) struct Settings {
    pub(crate) service_name: String,
    pub(crate) tracer: BoxedTracer,
    pub(crate) metrics: Arc<ServerMetrics>,
    pub(crate) propagator: Propagator,
    pub(crate) carrier: CarrierFn,
    pub(crate) filters: Vec<Filter>,
    pub(crate) span_name_formatter: SpanNameFormatter,
    pub(crate) span_attributes: Option<SpanAttributesFn>,
    pub(crate) client_ip_resolver: Option<Arc<dyn ClientIpResolver>>,
    pub(crate) recorders: Arc<RecorderPool>,
}

impl Settings {
    pub(crate) fn is_excluded(&self, parts: &Parts) -> bool {
        self.filters.iter().any(|filter| filter(parts))
    }

    pub(crate) fn span_name(&self, parts: &Parts) -> String {
        let name = (self.span_name_formatter)(parts);

        if name.is_empty() {
            return format!("HTTP {} route not found", parts.method);
        }

        name
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("service_name", &self.service_name)
            .field("propagator", &self.propagator)
            .field("filters", &self.filters.len())
            .field("span_attributes", &self.span_attributes.is_some())
            .field("client_ip_resolver", &self.client_ip_resolver.is_some())
            .finish_non_exhaustive()
    }
}

/// Configures an [`OtelLayer`].
///
/// Created with [`OtelLayer::builder`].
pub struct Builder {
    service_name: String,
    tracer: BoxedTracer,
    meter: Meter,
    propagator: Propagator,
    carrier: CarrierFn,
    filters: Vec<Filter>,
    span_name_formatter: SpanNameFormatter,
    span_attributes: Option<SpanAttributesFn>,
    client_ip_resolver: Option<Arc<dyn ClientIpResolver>>,
    max_idle_recorders: usize,
}

impl Builder {
    pub(crate) fn new<T, M>(service_name: impl Into<String>, tracer_provider: &T, meter_provider: &M) -> Self
    where
        T: TracerProvider,
        T::Tracer: Send + Sync + 'static,
        <T::Tracer as Tracer>::Span: Send + Sync + 'static,
        M: MeterProvider + ?Sized,
    {
        let scope = InstrumentationScope::builder(SCOPE_NAME).with_version(version()).build();

        let tracer = BoxedTracer::new(Box::new(tracer_provider.tracer_with_scope(scope.clone())));
        let meter = meter_provider.meter_with_scope(scope);

        Self {
            service_name: service_name.into(),
            tracer,
            meter,
            propagator: Arc::new(TraceContextPropagator::new()),
            carrier: Arc::new(header_carrier),
            filters: Vec::new(),
            span_name_formatter: Arc::new(default_span_name),
            span_attributes: None,
            client_ip_resolver: None,
            max_idle_recorders: crate::recorder::DEFAULT_MAX_IDLE,
        }
    }

    /// The propagator extracting the incoming trace context. Defaults to W3C Trace Context.
    pub fn propagator(mut self, propagator: impl TextMapPropagator + Send + Sync + 'static) -> Self {
        self.propagator = Arc::new(propagator);
        self
    }

    /// How the propagator reads the request. Defaults to the request headers.
    pub fn carrier<F>(mut self, carrier: F) -> Self
    where
        F: for<'a> Fn(&'a Parts) -> Box<dyn Extractor + 'a> + Send + Sync + 'static,
    {
        self.carrier = Arc::new(carrier);
        self
    }

    /// Exclude the requests for which `filter` returns `true`. Filters run on every request.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Parts) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Append several filters at once.
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Name spans with `formatter` instead of [`default_span_name`].
    pub fn span_name_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Parts) -> String + Send + Sync + 'static,
    {
        self.span_name_formatter = Arc::new(formatter);
        self
    }

    /// Add the attributes returned by `attributes` to every span and metric.
    pub fn span_attributes<F>(mut self, attributes: F) -> Self
    where
        F: Fn(&Parts) -> Vec<KeyValue> + Send + Sync + 'static,
    {
        self.span_attributes = Some(Arc::new(attributes));
        self
    }

    /// Resolve the client address with `resolver`, taking precedence over a [`RouteClientIp`]
    /// installed by the router and over the default chain.
    ///
    /// [`RouteClientIp`]: crate::RouteClientIp
    pub fn client_ip_resolver(mut self, resolver: impl ClientIpResolver + 'static) -> Self {
        self.client_ip_resolver = Some(Arc::new(resolver));
        self
    }

    /// Number of idle response recorders kept for reuse.
    pub fn max_idle_recorders(mut self, max_idle: usize) -> Self {
        self.max_idle_recorders = max_idle;
        self
    }

    /// Apply declarative settings on top of the current ones.
    ///
    /// Settings absent from `config` keep their current value. Configured filters are added to the
    /// existing ones, while a `[propagation]` table or a resolver list replaces the propagator or
    /// the resolver set earlier.
    pub fn apply_config(mut self, config: &TelemetryConfig) -> Result<Self, ConfigError> {
        if let Some(service_name) = config.service_name().filter(|name| !name.trim().is_empty()) {
            self.service_name = service_name.to_string();
        }

        if let Some(propagation) = &config.propagation {
            self.propagator = propagator(propagation);
        }

        self.filters.extend(filters(&config.filter));

        if let Some(resolvers) = &config.client_ip.resolvers {
            let chain = resolvers
                .iter()
                .map(resolver)
                .collect::<Result<Vec<_>, _>>()
                .map(Chain::new)?;

            log::debug!("Client addresses resolved by {} configured strategies", chain.len());

            self.client_ip_resolver = Some(Arc::new(chain));
        }

        Ok(self)
    }

    pub fn build(self) -> OtelLayer {
        let settings = Settings {
            metrics: Arc::new(ServerMetrics::new(&self.meter)),
            service_name: self.service_name,
            tracer: self.tracer,
            propagator: self.propagator,
            carrier: self.carrier,
            filters: self.filters,
            span_name_formatter: self.span_name_formatter,
            span_attributes: self.span_attributes,
            client_ip_resolver: self.client_ip_resolver,
            recorders: Arc::new(RecorderPool::new(self.max_idle_recorders)),
        };

        OtelLayer::new(settings)
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("service_name", &self.service_name)
            .field("propagator", &self.propagator)
            .field("filters", &self.filters.len())
            .finish_non_exhaustive()
    }
}

fn propagator(config: &PropagationConfig) -> Propagator {
    let mut propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>> = Vec::new();

    if config.trace_context {
        propagators.push(Box::new(TraceContextPropagator::new()));
    }

    if config.baggage {
        propagators.push(Box::new(BaggagePropagator::new()));
    }

    Arc::new(TextMapCompositePropagator::new(propagators))
}

fn filters(config: &FilterConfig) -> Vec<Filter> {
    let mut filters: Vec<Filter> = Vec::new();

    if !config.exclude_paths.is_empty() {
        let paths = config.exclude_paths.clone();
        filters.push(Arc::new(move |parts: &Parts| {
            paths.iter().any(|path| path == parts.uri.path())
        }));
    }

    let methods: Vec<Method> = config
        .exclude_methods
        .iter()
        .filter_map(|method| match Method::from_bytes(method.as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                log::warn!("Ignoring invalid HTTP method '{method}' in filter.exclude_methods");
                None
            }
        })
        .collect();

    if !methods.is_empty() {
        filters.push(Arc::new(move |parts: &Parts| methods.contains(&parts.method)));
    }

    filters
}

fn resolver(config: &ResolverConfig) -> Result<Box<dyn ClientIpResolver>, ConfigError> {
    let resolver: Box<dyn ClientIpResolver> = match config {
        ResolverConfig::LeftmostNonPrivate { header, limit } => {
            Box::new(LeftmostNonPrivate::new(ForwardedHeader::try_from(header.as_str())?, *limit)?)
        }
        ResolverConfig::RightmostNonPrivate { header } => {
            Box::new(RightmostNonPrivate::new(ForwardedHeader::try_from(header.as_str())?))
        }
        ResolverConfig::RightmostTrustedCount { header, trusted_count } => Box::new(RightmostTrustedCount::new(
            ForwardedHeader::try_from(header.as_str())?,
            *trusted_count,
        )?),
        ResolverConfig::SingleIpHeader { header } => Box::new(SingleIpHeader::from_name(header)?),
        ResolverConfig::RemoteAddr => Box::new(RemoteAddr::new()),
    };

    Ok(resolver)
}
