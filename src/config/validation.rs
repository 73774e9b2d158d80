//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parseable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("not a valid socket address: {:?}", config.listener.bind_address),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError {
            field: "listener.max_connections".into(),
            message: "must be greater than zero".into(),
        });
    }
    if config.dns.ttl_secs == 0 {
        errors.push(ValidationError {
            field: "dns.ttl_secs".into(),
            message: "must be greater than zero".into(),
        });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError {
            field: "timeouts.connect_secs".into(),
            message: "must be greater than zero".into(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError {
            field: "observability.metrics_address".into(),
            message: format!(
                "not a valid socket address: {:?}",
                config.observability.metrics_address
            ),
        });
    }
    if !config.admin.shutdown_path.starts_with('/') {
        errors.push(ValidationError {
            field: "admin.shutdown_path".into(),
            message: "must start with '/'".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
