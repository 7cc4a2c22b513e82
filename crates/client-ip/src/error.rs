use http::HeaderName;

/// Reasons a resolver could not derive a client address from a request.
///
/// These are expected outcomes on the request path: callers treat them as "no address" and move on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The header the resolver reads is not present.
    #[error("header {0} is not present in the request")]
    MissingHeader(HeaderName),
    /// The header is present but holds no valid, usable address.
    #[error("header {0} does not contain a usable client address")]
    NoUsableAddress(HeaderName),
    /// The forwarding header has fewer hops than trusted proxies.
    #[error("header {header} has {found} hops, at least {expected} are required")]
    NotEnoughHops {
        /// The forwarding header that was inspected.
        header: HeaderName,
        /// Number of hops required by the configuration.
        expected: usize,
        /// Number of hops found in the request.
        found: usize,
    },
    /// The peer address of the connection is not known for this request.
    #[error("remote address is not available for this request")]
    MissingRemoteAddress,
    /// The chain has no resolver to try.
    #[error("no client ip resolver is configured")]
    NoResolver,
}

/// Errors raised when constructing a resolver from invalid settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The header name is empty or contains invalid characters.
    #[error("invalid header name {0:?}")]
    InvalidHeaderName(String),
    /// The header may carry several addresses and needs a forwarding strategy instead.
    #[error("header {0} can carry several addresses and cannot be used with a single ip resolver")]
    MultiIpHeader(HeaderName),
    /// The header is not `X-Forwarded-For` nor `Forwarded`.
    #[error("header {0} is not a forwarding header")]
    NotForwardingHeader(HeaderName),
    /// A leftmost strategy must scan at least one hop.
    #[error("hop limit must be greater than zero")]
    ZeroHopLimit,
    /// A trusted count strategy needs at least one trusted proxy.
    #[error("trusted proxy count must be greater than zero")]
    ZeroTrustedCount,
}
