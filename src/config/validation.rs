//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0, addresses parse)
//! - Check the proxy prefix is a single literal path segment
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    InvalidPrefix(String),
    InvalidLogLevel(String),
    /// A duration or size that must be positive is zero.
    Zero(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(a) => write!(f, "invalid listener.bind_address '{}'", a),
            ValidationError::InvalidMetricsAddress(a) => {
                write!(f, "invalid observability.metrics_address '{}'", a)
            }
            ValidationError::InvalidPrefix(p) => {
                write!(f, "proxy.prefix '{}' must be a single non-empty path segment", p)
            }
            ValidationError::InvalidLogLevel(l) => write!(f, "unknown observability.log_level '{}'", l),
            ValidationError::Zero(field) => write!(f, "{} must be greater than zero", field),
        }
    }
}

impl std::error::Error for ValidationError {}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::Zero("listener.max_connections"));
    }

    let prefix = config.proxy.prefix.trim_matches('/');
    if !is_valid_prefix(prefix) {
        errors.push(ValidationError::InvalidPrefix(config.proxy.prefix.clone()));
    }
    if config.proxy.max_rewrite_body_bytes == 0 {
        errors.push(ValidationError::Zero("proxy.max_rewrite_body_bytes"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.upstream_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Unreserved URL characters only, so the prefix is also a literal route path.
fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}
