use std::net::IpAddr;

use http::request::Parts;

use crate::{ClientIpResolver, ConfigError, DEFAULT_HOP_LIMIT, ForwardedHeader, ResolveError, ip::is_private_or_local};

/// Picks the leftmost valid, non-private address of a forwarding header.
///
/// The leftmost hop is whatever the client claims, so this strategy is trivially spoofable. It is a
/// reasonable best-effort choice for telemetry, never for access control or rate limiting.
#[derive(Debug, Clone)]
pub struct LeftmostNonPrivate {
    header: ForwardedHeader,
    limit: usize,
}

impl LeftmostNonPrivate {
    /// Scan at most `limit` hops of `header`, starting from the left.
    pub fn new(header: ForwardedHeader, limit: usize) -> Result<Self, ConfigError> {
        if limit == 0 {
            return Err(ConfigError::ZeroHopLimit);
        }

        Ok(Self { header, limit })
    }

    pub(crate) fn with_default_limit(header: ForwardedHeader) -> Self {
        Self {
            header,
            limit: DEFAULT_HOP_LIMIT,
        }
    }
}

impl ClientIpResolver for LeftmostNonPrivate {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        let name = self.header.name();

        if !parts.headers.contains_key(&name) {
            return Err(ResolveError::MissingHeader(name));
        }

        self.header
            .hops(&parts.headers)
            .take(self.limit)
            .flatten()
            .find(|ip| !is_private_or_local(*ip))
            .ok_or(ResolveError::NoUsableAddress(name))
    }
}
