//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults, so an empty file is a valid configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Proxy path prefix and rewriting limits.
    pub proxy: ProxySettings,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Static UI served outside the proxy prefix.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ProxyConfig {
    /// Replace the port of the bind address, keeping its IP.
    pub fn with_port(mut self, port: u16) -> Self {
        let ip = self
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.ip())
            .unwrap_or_else(|_| [0, 0, 0, 0].into());
        self.listener.bind_address = SocketAddr::new(ip, port).to_string();
        self
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum requests processed concurrently (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Proxy routing and rewriting settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Literal path segment in front of the token (`/<prefix>/<token>/...`).
    pub prefix: String,

    /// Largest HTML body buffered for rewriting. Larger bodies pass through as is.
    pub max_rewrite_body_bytes: usize,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            prefix: "proxy".to_string(),
            max_rewrite_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Timeout configuration for upstream traffic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream timeout (connect + response head + HTML buffering) in seconds.
    pub upstream_secs: u64,

    /// Idle pooled connection timeout in seconds.
    pub idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
            idle_secs: 60,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Static UI configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Serve files for paths outside the proxy prefix.
    pub enabled: bool,

    /// Directory holding `index.html` and friends.
    pub dir: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "public".to_string(),
        }
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
