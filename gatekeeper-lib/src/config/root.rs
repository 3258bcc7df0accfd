use serde::Deserialize;
use std::net::SocketAddr;

use super::enforcement::EnforcementConfig;
use super::telemetry::{LoggingConfig, TelemetryConfig};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Address and port to listen on
    /// Example: "0.0.0.0:8081" or "127.0.0.1:8081"
    pub listen: SocketAddr,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Enforcement configuration: default mode and per-tier rate limits
    #[serde(default)]
    pub enforcement: EnforcementConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
