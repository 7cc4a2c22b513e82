use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use http::request::Parts;

use crate::{ClientIpResolver, ResolveError};

/// Uses the peer address of the connection.
///
/// The address is read from the [`ConnectInfo`] extension, which axum inserts when the application
/// is served with `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteAddr;

impl RemoteAddr {
    /// Create the resolver.
    pub fn new() -> Self {
        Self
    }
}

impl ClientIpResolver for RemoteAddr {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        let ConnectInfo(addr) = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .ok_or(ResolveError::MissingRemoteAddress)?;

        let ip = addr.ip().to_canonical();

        if ip.is_unspecified() {
            return Err(ResolveError::MissingRemoteAddress);
        }

        Ok(ip)
    }
}
