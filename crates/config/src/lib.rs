//! Declarative settings for the HTTP tracing layer, mapped from a TOML file.

#![deny(missing_docs)]

mod client_ip;
mod loader;

use std::path::Path;

pub use client_ip::{ClientIpConfig, DEFAULT_HOP_LIMIT, ResolverConfig};
use serde::Deserialize;

/// Main configuration structure of the tracing layer.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Logical name of the server, reported as `server.address`.
    #[serde(default)]
    pub service_name: Option<String>,
    /// Which trace context formats are read from incoming requests. When absent, the propagator of
    /// the layer is left untouched.
    #[serde(default)]
    pub propagation: Option<PropagationConfig>,
    /// Requests which are not traced at all.
    #[serde(default)]
    pub filter: FilterConfig,
    /// How the client address is derived.
    #[serde(default)]
    pub client_ip: ClientIpConfig,
}

impl TelemetryConfig {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<TelemetryConfig> {
        loader::load(path.as_ref())
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> anyhow::Result<TelemetryConfig> {
        loader::parse(content)
    }

    /// The configured service name, if any.
    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }
}

/// Trace context propagation formats.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropagationConfig {
    /// W3C Trace Context (`traceparent` and `tracestate`).
    pub trace_context: bool,
    /// W3C Baggage (`baggage`).
    pub baggage: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            trace_context: true,
            baggage: false,
        }
    }
}

impl PropagationConfig {
    /// Whether at least one propagation format is enabled.
    pub fn enabled(&self) -> bool {
        self.trace_context || self.baggage
    }
}

/// Requests excluded from tracing and metrics.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Exact request paths which are never traced, such as health checks.
    pub exclude_paths: Vec<String>,
    /// Request methods which are never traced, case sensitive.
    pub exclude_methods: Vec<String>,
}
