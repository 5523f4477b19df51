//! Configuration schema definitions.
//!
//! This module defines the resolved settings for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root settings for the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Listener configuration (host, port).
    pub listener: ListenerSettings,

    /// Environment label (e.g., "development", "production").
    pub environment: String,

    /// Distributed tracing settings.
    pub tracing: TracingSettings,

    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            listener: ListenerSettings::default(),
            environment: "development".to_string(),
            tracing: TracingSettings::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl ServiceSettings {
    /// Whether the environment label selects production behavior.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerSettings {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Port to bind, kept as text the way it arrives from the environment.
    pub port: String,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: "3000".to_string(),
        }
    }
}

impl ListenerSettings {
    /// The `host:port` address the listener binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Tracer settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TracingSettings {
    /// Enable request tracing.
    pub enabled: bool,

    /// Service name reported on every span.
    pub service_name: String,

    /// Fraction of requests sampled (1.0 = every request).
    pub sampling_ratio: f64,

    /// Log each finished span synchronously.
    pub log_spans: bool,
}

impl Default for TracingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: env!("CARGO_PKG_NAME").to_string(),
            sampling_ratio: 1.0,
            log_spans: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Expose a Prometheus endpoint at `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
        }
    }
}
