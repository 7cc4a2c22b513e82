use std::net::IpAddr;

use http::request::Parts;

use crate::{ClientIpResolver, ConfigError, ForwardedHeader, ResolveError, ip::is_private_or_local};

/// Picks the rightmost non-private address of a forwarding header.
///
/// Suited for deployments where every reverse proxy in front of the server has a private address:
/// the first public hop seen from the right is the address the outermost proxy received the request
/// from. An invalid hop stops the scan, since the chain can no longer be trusted past it.
#[derive(Debug, Clone)]
pub struct RightmostNonPrivate {
    header: ForwardedHeader,
}

impl RightmostNonPrivate {
    /// Read `header` from the right.
    pub fn new(header: ForwardedHeader) -> Self {
        Self { header }
    }
}

impl ClientIpResolver for RightmostNonPrivate {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        let name = self.header.name();

        if !parts.headers.contains_key(&name) {
            return Err(ResolveError::MissingHeader(name));
        }

        let hops: Vec<_> = self.header.hops(&parts.headers).collect();

        for hop in hops.into_iter().rev() {
            match hop {
                Some(ip) if !is_private_or_local(ip) => return Ok(ip),
                Some(_) => continue,
                None => break,
            }
        }

        Err(ResolveError::NoUsableAddress(name))
    }
}

/// Picks the address appended by the outermost of a known number of trusted proxies.
///
/// With `count` trusted proxies each appending the address it received the request from, the client
/// address is the `count`-th hop counted from the right.
#[derive(Debug, Clone)]
pub struct RightmostTrustedCount {
    header: ForwardedHeader,
    count: usize,
}

impl RightmostTrustedCount {
    /// Trust exactly `count` proxies appending to `header`.
    pub fn new(header: ForwardedHeader, count: usize) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::ZeroTrustedCount);
        }

        Ok(Self { header, count })
    }
}

impl ClientIpResolver for RightmostTrustedCount {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        let name = self.header.name();

        if !parts.headers.contains_key(&name) {
            return Err(ResolveError::MissingHeader(name));
        }

        let hops: Vec<_> = self.header.hops(&parts.headers).collect();

        if hops.len() < self.count {
            return Err(ResolveError::NotEnoughHops {
                header: name,
                expected: self.count,
                found: hops.len(),
            });
        }

        hops[hops.len() - self.count].ok_or(ResolveError::NoUsableAddress(name))
    }
}
