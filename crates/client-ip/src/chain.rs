use std::{fmt, net::IpAddr, sync::OnceLock};

use http::request::Parts;

use crate::{
    ClientIpResolver, ForwardedHeader, LeftmostNonPrivate, RemoteAddr, ResolveError, SingleIpHeader, headers,
};

/// Maximum number of forwarding hops the default chain inspects.
pub const DEFAULT_HOP_LIMIT: usize = 15;

static DEFAULT_RESOLVER: OnceLock<Chain> = OnceLock::new();

/// An ordered list of resolvers. The first one to succeed wins.
#[derive(Default)]
pub struct Chain {
    resolvers: Vec<Box<dyn ClientIpResolver>>,
}

impl Chain {
    /// Build a chain trying `resolvers` in order.
    pub fn new(resolvers: Vec<Box<dyn ClientIpResolver>>) -> Self {
        Self { resolvers }
    }

    /// Append a resolver with the lowest priority so far.
    pub fn push(mut self, resolver: impl ClientIpResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Number of resolvers in the chain.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether the chain has no resolver at all.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("resolvers", &self.resolvers.len()).finish()
    }
}

impl ClientIpResolver for Chain {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        let mut last_error = ResolveError::NoResolver;

        for resolver in &self.resolvers {
            match resolver.client_ip(parts) {
                Ok(ip) => return Ok(ip),
                Err(error) => {
                    log::trace!("Client ip resolver skipped: {error}");
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}

/// The resolver used when nothing else is configured.
///
/// Tries, in order:
/// 1. leftmost non-private address of `X-Forwarded-For`
/// 2. leftmost non-private address of `Forwarded`
/// 3. `X-Real-IP`
/// 4. `CF-Connecting-IP`
/// 5. `True-Client-IP`
/// 6. `Fastly-Client-IP`
/// 7. `X-Azure-ClientIP`
/// 8. `X-Appengine-Remote-Addr`
/// 9. `Fly-Client-IP`
/// 10. `X-Azure-SocketIP`
/// 11. the peer address of the connection
///
/// The header based entries are trivially spoofable by clients. Where the address must be trusted,
/// configure a rightmost strategy matching the proxy topology instead.
pub fn default_resolver() -> &'static Chain {
    DEFAULT_RESOLVER.get_or_init(build_default)
}

fn build_default() -> Chain {
    let single_ip_headers = [
        headers::X_REAL_IP,
        headers::CF_CONNECTING_IP,
        headers::TRUE_CLIENT_IP,
        headers::FASTLY_CLIENT_IP,
        headers::X_AZURE_CLIENT_IP,
        headers::X_APPENGINE_REMOTE_ADDR,
        headers::FLY_CLIENT_IP,
        headers::X_AZURE_SOCKET_IP,
    ];

    let mut chain = Chain::default()
        .push(LeftmostNonPrivate::with_default_limit(ForwardedHeader::XForwardedFor))
        .push(LeftmostNonPrivate::with_default_limit(ForwardedHeader::Forwarded));

    for header in single_ip_headers {
        chain = chain.push(SingleIpHeader::builtin(header));
    }

    chain.push(RemoteAddr::new())
}
