//! HTTP server attributes following OpenTelemetry semantic conventions
//! See: https://opentelemetry.io/docs/specs/semconv/http/http-spans/

use std::net::{IpAddr, SocketAddr};

use http::{Method, Version, header, request::Parts};
use opentelemetry::{KeyValue, trace::Status};

pub const HTTP_REQUEST_METHOD: &str = "http.request.method";
pub const HTTP_REQUEST_METHOD_ORIGINAL: &str = "http.request.method_original";
pub const HTTP_REQUEST_BODY_SIZE: &str = "http.request.body.size";
pub const HTTP_RESPONSE_BODY_SIZE: &str = "http.response.body.size";
pub const HTTP_RESPONSE_STATUS_CODE: &str = "http.response.status_code";
pub const HTTP_ROUTE: &str = "http.route";
pub const URL_SCHEME: &str = "url.scheme";
pub const URL_PATH: &str = "url.path";
pub const URL_QUERY: &str = "url.query";
pub const SERVER_ADDRESS: &str = "server.address";
pub const SERVER_PORT: &str = "server.port";
pub const CLIENT_ADDRESS: &str = "client.address";
pub const USER_AGENT_ORIGINAL: &str = "user_agent.original";
pub const NETWORK_PEER_ADDRESS: &str = "network.peer.address";
pub const NETWORK_PEER_PORT: &str = "network.peer.port";
pub const NETWORK_PROTOCOL_NAME: &str = "network.protocol.name";
pub const NETWORK_PROTOCOL_VERSION: &str = "network.protocol.version";

/// Method value recorded for methods outside the well-known set.
pub const OTHER_METHOD: &str = "_OTHER";

/// Request details that do not live in the request head.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestAttributesOptions<'a> {
    /// Logical name of the server; takes precedence over the `Host` header for `server.address`.
    pub server_name: &'a str,
    /// Address of the client, as resolved from forwarding headers or the connection.
    pub client_ip: Option<IpAddr>,
    /// Peer address of the connection.
    pub peer_addr: Option<SocketAddr>,
}

/// Attributes describing an incoming request, set when the server span starts.
pub fn request_trace_attributes(parts: &Parts, opts: RequestAttributesOptions<'_>) -> Vec<KeyValue> {
    let mut attributes = Vec::with_capacity(14);

    push_method(&mut attributes, &parts.method);
    attributes.push(KeyValue::new(URL_SCHEME, scheme(parts)));
    push_server(&mut attributes, parts, opts.server_name);

    if let Some(peer) = opts.peer_addr {
        attributes.push(KeyValue::new(NETWORK_PEER_ADDRESS, peer.ip().to_string()));
        attributes.push(KeyValue::new(NETWORK_PEER_PORT, i64::from(peer.port())));
    }

    if let Some(user_agent) = parts.headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        attributes.push(KeyValue::new(USER_AGENT_ORIGINAL, user_agent.to_string()));
    }

    if let Some(client_ip) = opts.client_ip {
        attributes.push(KeyValue::new(CLIENT_ADDRESS, client_ip.to_string()));
    }

    attributes.push(KeyValue::new(URL_PATH, parts.uri.path().to_string()));

    if let Some(query) = parts.uri.query() {
        attributes.push(KeyValue::new(URL_QUERY, query.to_string()));
    }

    if let Some(version) = protocol_version(parts.version) {
        attributes.push(KeyValue::new(NETWORK_PROTOCOL_VERSION, version));
    }

    if let Some(size) = request_body_size(parts) {
        attributes.push(KeyValue::new(HTTP_REQUEST_BODY_SIZE, clamp(size)));
    }

    attributes
}

/// Attributes shared by every HTTP server metric data point.
pub fn metric_attributes(parts: &Parts, server_name: &str, status: Option<u16>) -> Vec<KeyValue> {
    let mut attributes = Vec::with_capacity(8);

    push_method(&mut attributes, &parts.method);
    attributes.push(KeyValue::new(URL_SCHEME, scheme(parts)));
    push_server(&mut attributes, parts, server_name);
    attributes.push(KeyValue::new(NETWORK_PROTOCOL_NAME, "http"));

    if let Some(version) = protocol_version(parts.version) {
        attributes.push(KeyValue::new(NETWORK_PROTOCOL_VERSION, version));
    }

    if let Some(code) = status {
        attributes.push(status_code(code));
    }

    attributes
}

/// The `http.route` attribute.
pub fn route(pattern: &str) -> KeyValue {
    KeyValue::new(HTTP_ROUTE, pattern.to_string())
}

/// The `http.response.status_code` attribute.
pub fn status_code(code: u16) -> KeyValue {
    KeyValue::new(HTTP_RESPONSE_STATUS_CODE, i64::from(code))
}

/// The `http.response.body.size` attribute.
pub fn response_body_size(size: u64) -> KeyValue {
    KeyValue::new(HTTP_RESPONSE_BODY_SIZE, clamp(size))
}

/// Span status of a server span for the given response status code.
///
/// Only server errors mark the span as failed: a 4xx is the client's fault, not the server's.
pub fn server_status(code: u16) -> Status {
    if !(100..600).contains(&code) {
        return Status::error(format!("Invalid HTTP status code {code}"));
    }

    if code >= 500 {
        return Status::error("");
    }

    Status::Unset
}

/// Request body size announced by the `Content-Length` header.
pub fn request_body_size(parts: &Parts) -> Option<u64> {
    parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Whether the method belongs to the set known by the semantic conventions.
pub fn is_known_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET
            | Method::HEAD
            | Method::POST
            | Method::PUT
            | Method::DELETE
            | Method::CONNECT
            | Method::OPTIONS
            | Method::TRACE
            | Method::PATCH
    )
}

fn push_method(attributes: &mut Vec<KeyValue>, method: &Method) {
    if is_known_method(method) {
        attributes.push(KeyValue::new(HTTP_REQUEST_METHOD, method.as_str().to_string()));
    } else {
        attributes.push(KeyValue::new(HTTP_REQUEST_METHOD, OTHER_METHOD));
        attributes.push(KeyValue::new(HTTP_REQUEST_METHOD_ORIGINAL, method.as_str().to_string()));
    }
}

fn push_server(attributes: &mut Vec<KeyValue>, parts: &Parts, server_name: &str) {
    let request_host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| parts.uri.authority().map(|authority| authority.as_str()));

    let (host, port) = match (server_name.is_empty(), request_host) {
        (false, host) => {
            let (name, port) = split_host_port(server_name);
            let port = port.or_else(|| host.and_then(|host| split_host_port(host).1));

            (name, port)
        }
        (true, Some(host)) => split_host_port(host),
        (true, None) => return,
    };

    if !host.is_empty() {
        attributes.push(KeyValue::new(SERVER_ADDRESS, host.to_string()));
    }

    if let Some(port) = port {
        attributes.push(KeyValue::new(SERVER_PORT, i64::from(port)));
    }
}

fn scheme(parts: &Parts) -> String {
    parts.uri.scheme_str().unwrap_or("http").to_string()
}

fn protocol_version(version: Version) -> Option<&'static str> {
    match version {
        Version::HTTP_09 => Some("0.9"),
        Version::HTTP_10 => Some("1.0"),
        Version::HTTP_11 => Some("1.1"),
        Version::HTTP_2 => Some("2"),
        Version::HTTP_3 => Some("3"),
        _ => None,
    }
}

/// Split `host:port` or `[ipv6]:port`.
fn split_host_port(value: &str) -> (&str, Option<u16>) {
    if let Some(rest) = value.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':').and_then(|port| port.parse().ok())),
            None => (value, None),
        };
    }

    match value.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (host, port.parse().ok()),
        _ => (value, None),
    }
}

fn clamp(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
