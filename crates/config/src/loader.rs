use std::path::Path;

use anyhow::Context;

use crate::TelemetryConfig;

pub(crate) fn load(path: &Path) -> anyhow::Result<TelemetryConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    parse(&content).with_context(|| format!("Invalid configuration in {}", path.display()))
}

pub(crate) fn parse(content: &str) -> anyhow::Result<TelemetryConfig> {
    let config: TelemetryConfig = toml::from_str(content)?;

    for warning in validate(&config) {
        log::warn!("{warning}");
    }

    Ok(config)
}

/// Settings which are accepted but most likely a mistake.
pub(crate) fn validate(config: &TelemetryConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.propagation.is_some_and(|propagation| !propagation.enabled()) {
        warnings.push("No propagation format enabled, incoming trace context will be ignored".to_string());
    }

    if config.client_ip.resolvers.as_ref().is_some_and(|resolvers| resolvers.is_empty()) {
        warnings.push("client_ip.resolvers is empty, client addresses will never be resolved".to_string());
    }

    if config.service_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        warnings.push("service_name is blank, the name given to the layer is kept".to_string());
    }

    warnings
}
