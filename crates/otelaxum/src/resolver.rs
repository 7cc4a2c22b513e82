use std::{fmt, net::IpAddr, sync::Arc};

use client_ip::{ClientIpResolver, ResolveError, default_resolver};
use http::request::Parts;

/// A client address resolver installed by the router as a request extension.
///
/// Used when the layer itself has no resolver configured.
///
/// ```rust,ignore
/// let resolver = RightmostTrustedCount::new(ForwardedHeader::XForwardedFor, 1)?;
///
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(OtelLayer::builder("svc", &tracer_provider, &meter_provider).build())
///     .layer(Extension(RouteClientIp::new(resolver)));
/// ```
#[derive(Clone)]
pub struct RouteClientIp(Arc<dyn ClientIpResolver>);

impl RouteClientIp {
    pub fn new(resolver: impl ClientIpResolver + 'static) -> Self {
        Self(Arc::new(resolver))
    }
}

impl fmt::Debug for RouteClientIp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RouteClientIp").finish_non_exhaustive()
    }
}

impl ClientIpResolver for RouteClientIp {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        self.0.client_ip(parts)
    }
}

/// Resolve the client address, preferring the layer resolver, then the router's, then the default
/// chain. A miss at the selected level is final.
pub(crate) fn client_ip(layer: Option<&dyn ClientIpResolver>, parts: &Parts) -> Option<IpAddr> {
    let result = match (layer, parts.extensions.get::<RouteClientIp>()) {
        (Some(resolver), _) => resolver.client_ip(parts),
        (None, Some(resolver)) => resolver.client_ip(parts),
        (None, None) => default_resolver().client_ip(parts),
    };

    match result {
        Ok(ip) => Some(ip),
        Err(error) => {
            log::trace!("Client address not resolved: {error}");
            None
        }
    }
}
