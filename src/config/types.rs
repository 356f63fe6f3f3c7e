//! Configuration Types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub pabx: PabxConfig,
    pub polling: PollingConfig,
    pub monitoring: MonitoringConfig,
}

/// PABX server access
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PabxConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Digit count that tells a trunk id apart from an internal extension
    pub trunk_id_length: usize,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Page size requested from the active-calls endpoint
    pub active_calls_top: u32,
}

impl fmt::Debug for PabxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PabxConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("trunk_id_length", &self.trunk_id_length)
            .field("request_timeout", &self.request_timeout)
            .field("active_calls_top", &self.active_calls_top)
            .finish()
    }
}

impl Default for PabxConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            trunk_id_length: 5,
            request_timeout: Duration::from_secs(15),
            active_calls_top: 100,
        }
    }
}

/// Timer cadence for the polling engine
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    #[serde(with = "humantime_serde")]
    pub fast_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub slow_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub renewal_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub restart_backoff: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            fast_interval: Duration::from_secs(5),
            slow_interval: Duration::from_secs(30),
            renewal_interval: Duration::from_secs(59 * 60),
            restart_backoff: Duration::from_secs(60),
        }
    }
}

/// Metrics endpoint and logging
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub metrics_addr: SocketAddr,
    pub metric_prefix: String,
    pub log_level: String,
    /// Export CPU/memory/fd metrics of this process (Linux only)
    pub process_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            metric_prefix: "pabx".to_string(),
            log_level: "info".to_string(),
            process_metrics: true,
        }
    }
}
