//! Client IP resolution strategies.
//!
//! A [`ClientIpResolver`] inspects the head of an incoming request and derives the address of the
//! client that issued it, either from a forwarding header set by a reverse proxy or from the peer
//! address of the connection. Resolvers compose into a [`Chain`], which tries each strategy in order
//! and returns the first success.
//!
//! Strategies picking the *leftmost* address of a forwarding header are trivially spoofable by the
//! client. When the address must be trusted, use [`RightmostNonPrivate`] or
//! [`RightmostTrustedCount`] configured for the actual proxy topology.

#![deny(missing_docs)]

mod chain;
mod error;
mod forwarded;
mod ip;
mod leftmost;
mod remote;
mod rightmost;
mod single;

use std::{net::IpAddr, sync::Arc};

use http::request::Parts;

pub use chain::{Chain, DEFAULT_HOP_LIMIT, default_resolver};
pub use error::{ConfigError, ResolveError};
pub use forwarded::ForwardedHeader;
pub use ip::is_private_or_local;
pub use leftmost::LeftmostNonPrivate;
pub use remote::RemoteAddr;
pub use rightmost::{RightmostNonPrivate, RightmostTrustedCount};
pub use single::SingleIpHeader;

/// Header names understood by the built-in resolvers.
pub mod headers {
    use http::HeaderName;

    /// `X-Forwarded-For`, a comma separated list of addresses appended by each proxy.
    pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
    /// `Forwarded` as defined by RFC 7239.
    pub const FORWARDED: HeaderName = http::header::FORWARDED;
    /// `X-Real-IP`, set by nginx and similar proxies.
    pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
    /// `CF-Connecting-IP`, set by Cloudflare.
    pub const CF_CONNECTING_IP: HeaderName = HeaderName::from_static("cf-connecting-ip");
    /// `True-Client-IP`, set by Cloudflare Enterprise and Akamai.
    pub const TRUE_CLIENT_IP: HeaderName = HeaderName::from_static("true-client-ip");
    /// `Fastly-Client-IP`, set by Fastly.
    pub const FASTLY_CLIENT_IP: HeaderName = HeaderName::from_static("fastly-client-ip");
    /// `X-Azure-ClientIP`, set by Azure Front Door.
    pub const X_AZURE_CLIENT_IP: HeaderName = HeaderName::from_static("x-azure-clientip");
    /// `X-Azure-SocketIP`, set by Azure Front Door.
    pub const X_AZURE_SOCKET_IP: HeaderName = HeaderName::from_static("x-azure-socketip");
    /// `X-Appengine-Remote-Addr`, set by Google App Engine.
    pub const X_APPENGINE_REMOTE_ADDR: HeaderName = HeaderName::from_static("x-appengine-remote-addr");
    /// `Fly-Client-IP`, set by Fly.io.
    pub const FLY_CLIENT_IP: HeaderName = HeaderName::from_static("fly-client-ip");
}

/// A strategy deriving the client address from a request head.
pub trait ClientIpResolver: Send + Sync {
    /// Resolve the client address of the request, or explain why it could not be found.
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError>;
}

impl<T> ClientIpResolver for Arc<T>
where
    T: ClientIpResolver + ?Sized,
{
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        (**self).client_ip(parts)
    }
}

impl<T> ClientIpResolver for Box<T>
where
    T: ClientIpResolver + ?Sized,
{
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        (**self).client_ip(parts)
    }
}
