use std::net::IpAddr;

use http::{HeaderMap, HeaderName};

use crate::{ConfigError, headers, ip::parse_ip};

/// A header carrying the list of addresses a request was forwarded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardedHeader {
    /// `X-Forwarded-For: client, proxy1, proxy2`
    XForwardedFor,
    /// `Forwarded: for=client;proto=https, for=proxy1` (RFC 7239)
    Forwarded,
}

impl ForwardedHeader {
    /// The header name this variant reads.
    pub fn name(self) -> HeaderName {
        match self {
            ForwardedHeader::XForwardedFor => headers::X_FORWARDED_FOR,
            ForwardedHeader::Forwarded => headers::FORWARDED,
        }
    }

    /// Every hop of the header, leftmost first, across all header lines.
    ///
    /// Hops are parsed as the iterator advances. Hops that do not hold a valid address yield `None` so
    /// strategies can decide how to treat them.
    pub(crate) fn hops(self, headers: &HeaderMap) -> impl Iterator<Item = Option<IpAddr>> + '_ {
        headers
            .get_all(self.name())
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(move |element| self.parse_hop(element))
    }

    fn parse_hop(self, element: &str) -> Option<IpAddr> {
        #[cfg(test)]
        tests::PARSED_HOPS.with(|parsed| parsed.set(parsed.get() + 1));

        match self {
            ForwardedHeader::XForwardedFor => parse_ip(element),
            ForwardedHeader::Forwarded => forwarded_for(element).and_then(parse_ip),
        }
    }
}

impl TryFrom<&str> for ForwardedHeader {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let name =
            HeaderName::from_bytes(value.as_bytes()).map_err(|_| ConfigError::InvalidHeaderName(value.to_string()))?;

        if name == headers::X_FORWARDED_FOR {
            Ok(ForwardedHeader::XForwardedFor)
        } else if name == headers::FORWARDED {
            Ok(ForwardedHeader::Forwarded)
        } else {
            Err(ConfigError::NotForwardingHeader(name))
        }
    }
}

/// Extract the `for=` parameter of one forwarded element.
fn forwarded_for(element: &str) -> Option<&str> {
    element.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;

        key.trim().eq_ignore_ascii_case("for").then_some(value.trim())
    })
}
