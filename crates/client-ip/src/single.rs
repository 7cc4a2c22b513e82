use std::net::IpAddr;

use http::{HeaderName, request::Parts};

use crate::{ClientIpResolver, ConfigError, ResolveError, headers, ip::parse_ip};

/// Reads the client address from a header carrying exactly one address, such as `X-Real-IP`.
///
/// When the header is repeated the last line wins, since proxies append rather than replace.
#[derive(Debug, Clone)]
pub struct SingleIpHeader {
    header: HeaderName,
}

impl SingleIpHeader {
    /// Read the address from `header`.
    ///
    /// `X-Forwarded-For` and `Forwarded` are rejected: they carry a list of hops and need one of the
    /// forwarding strategies.
    pub fn new(header: HeaderName) -> Result<Self, ConfigError> {
        if header == headers::X_FORWARDED_FOR || header == headers::FORWARDED {
            return Err(ConfigError::MultiIpHeader(header));
        }

        Ok(Self { header })
    }

    /// Same as [`SingleIpHeader::new`], parsing the header name first.
    pub fn from_name(header: &str) -> Result<Self, ConfigError> {
        let name =
            HeaderName::from_bytes(header.as_bytes()).map_err(|_| ConfigError::InvalidHeaderName(header.to_string()))?;

        Self::new(name)
    }

    /// Built-in single address headers, known not to be forwarding headers.
    pub(crate) fn builtin(header: HeaderName) -> Self {
        Self { header }
    }
}

impl ClientIpResolver for SingleIpHeader {
    fn client_ip(&self, parts: &Parts) -> Result<IpAddr, ResolveError> {
        let value = parts
            .headers
            .get_all(&self.header)
            .iter()
            .next_back()
            .ok_or_else(|| ResolveError::MissingHeader(self.header.clone()))?;

        value
            .to_str()
            .ok()
            .and_then(parse_ip)
            .ok_or_else(|| ResolveError::NoUsableAddress(self.header.clone()))
    }
}
