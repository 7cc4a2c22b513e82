use serde::Deserialize;

/// Hop limit of the leftmost strategy when none is configured.
pub const DEFAULT_HOP_LIMIT: usize = 15;

/// Client address resolution settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientIpConfig {
    /// Resolvers tried in order, the first success wins. When absent, the built-in default chain is
    /// used unless the router installs its own resolver.
    pub resolvers: Option<Vec<ResolverConfig>>,
}

/// One client address resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case", deny_unknown_fields)]
pub enum ResolverConfig {
    /// First valid, non-private address of a forwarding header. Spoofable by clients.
    LeftmostNonPrivate {
        /// `x-forwarded-for` or `forwarded`.
        header: String,
        /// Maximum number of hops inspected.
        #[serde(default = "default_hop_limit")]
        limit: usize,
    },
    /// Last valid, non-private address of a forwarding header.
    RightmostNonPrivate {
        /// `x-forwarded-for` or `forwarded`.
        header: String,
    },
    /// The address added by the outermost of `trusted_count` trusted proxies.
    RightmostTrustedCount {
        /// `x-forwarded-for` or `forwarded`.
        header: String,
        /// Number of trusted proxies appending to the header.
        trusted_count: usize,
    },
    /// A header carrying a single address, such as `x-real-ip`.
    SingleIpHeader {
        /// The header name.
        header: String,
    },
    /// The peer address of the connection.
    RemoteAddr,
}

fn default_hop_limit() -> usize {
    DEFAULT_HOP_LIMIT
}
