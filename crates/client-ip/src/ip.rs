use std::net::{IpAddr, SocketAddr};

/// Parse a single hop of a forwarding header, or the value of a single address header.
///
/// Accepts bare addresses, `ip:port`, `[ipv6]:port`, double-quoted values and IPv6 zone identifiers.
/// IPv4-mapped IPv6 addresses are returned in their IPv4 form. Unspecified addresses are rejected.
pub(crate) fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim().trim_matches('"').trim();

    if value.is_empty() {
        return None;
    }

    let ip = match value.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => match value.parse::<SocketAddr>() {
            Ok(addr) => addr.ip(),
            Err(_) => strip_decorations(value)?.parse::<IpAddr>().ok()?,
        },
    };

    let ip = ip.to_canonical();

    if ip.is_unspecified() {
        return None;
    }

    Some(ip)
}

/// Remove brackets, port and zone from an IPv6 literal such as `[fe80::1%eth0]:8080`.
fn strip_decorations(value: &str) -> Option<&str> {
    let value = match value.strip_prefix('[') {
        Some(rest) => rest.split_once(']')?.0,
        None => value,
    };

    Some(value.split_once('%').map_or(value, |(addr, _zone)| addr))
}

/// Whether the address belongs to a private, loopback, link-local or otherwise non-routable range.
///
/// Covered ranges: loopback, RFC 1918, shared address space `100.64.0.0/10`, IPv4 and IPv6
/// link-local, IPv6 unique local `fc00::/7` and the unspecified addresses.
pub fn is_private_or_local(ip: IpAddr) -> bool {
    match ip.to_canonical() {
        IpAddr::V4(ip) => {
            let [first, second, ..] = ip.octets();
            let shared = first == 100 && (second & 0b1100_0000) == 0b0100_0000;

            ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_unspecified() || shared
        }
        IpAddr::V6(ip) => ip.is_loopback() || ip.is_unspecified() || ip.is_unique_local() || ip.is_unicast_link_local(),
    }
}
