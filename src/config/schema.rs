//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// DNS cache settings.
    pub dns: DnsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Operational endpoint settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// DNS cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Cache entry lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

impl DnsConfig {
    /// Cache entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Interval between periodic cache sweeps: one second short of the TTL,
    /// so an entry is removed by the first sweep after it expires.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.ttl_secs.saturating_sub(1).max(1))
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream TCP connect timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { connect_secs: 10 }
    }
}

impl TimeoutConfig {
    /// Upstream TCP connect timeout.
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Whether to expose a Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Address for the metrics endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}

/// Operational endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Origin-form request path that triggers graceful shutdown.
    pub shutdown_path: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            shutdown_path: "/proxy/shutdown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.dns.ttl_secs, 600);
        assert_eq!(config.dns.sweep_interval(), Duration::from_secs(599));
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_sweep_interval_floor() {
        let dns = DnsConfig { ttl_secs: 1 };
        assert_eq!(dns.sweep_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_minimal_toml() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "0.0.0.0:3128"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3128");
        // Unspecified sections keep their defaults.
        assert_eq!(config.timeouts.connect_secs, 10);
        assert_eq!(config.admin.shutdown_path, "/proxy/shutdown");
    }
}
