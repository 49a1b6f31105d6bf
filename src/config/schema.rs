//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::headers::{HeaderFilter, ProcessLookups};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream to forward requests to. Without one, a built-in
    /// status handler answers every request.
    pub upstream: Option<UpstreamConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Values for `{{PROP:name}}` placeholders.
    pub properties: HashMap<String, String>,

    /// Header directives in declaration order: `name[:tag[:phase]] = template`.
    pub headers: IndexMap<String, String>,
}

impl FilterConfig {
    /// Placeholder lookups over the configured properties, with `overrides` taking precedence.
    pub fn lookups(&self, overrides: &HashMap<String, String>) -> ProcessLookups {
        let mut properties = self.properties.clone();
        properties.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        ProcessLookups::new(properties)
    }

    /// Compile the `[headers]` table into a filter.
    pub fn build_filter(&self, overrides: &HashMap<String, String>) -> HeaderFilter {
        HeaderFilter::from_entries(&self.headers, &self.lookups(overrides))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
