// ── Runtime registry configuration ──
//
// Describes how the registry reaches cameras. Never touches disk; the CLI
// builds a `RegistryConfig` from its profile file and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use camlink_api::{DiscoveryConfig, TlsMode, TransportConfig};

use crate::retry::RetryPolicy;

/// TLS verification strategy for HTTPS device services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification. Cameras almost always ship self-signed certs.
    #[default]
    DangerAcceptInvalid,
}

/// Configuration for a `DeviceRegistry`.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request SOAP timeout.
    pub timeout: Duration,
    /// Socket settings for WS-Discovery runs.
    pub discovery: DiscoveryConfig,
    /// How long `start_discovery` collects replies by default.
    pub discovery_timeout: Duration,
    /// Retry schedule for health probes.
    pub retry: RetryPolicy,
    /// Devices probed in parallel during a health check. 1 = sequential.
    pub health_concurrency: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
            discovery: DiscoveryConfig::default(),
            discovery_timeout: Duration::from_secs(3),
            retry: RetryPolicy::default(),
            health_concurrency: 1,
        }
    }
}

impl RegistryConfig {
    /// Transport settings shared by every session the registry builds.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}
