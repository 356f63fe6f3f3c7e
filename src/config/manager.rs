//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file, with environment overrides applied on top
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let mut config = if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            tracing::warn!("Configuration file not found at {}, using defaults", path.display());
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }
}

impl Config {
    /// Override fields from environment-style key lookups
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("PABX_URL") {
            self.pabx.base_url = base_url;
        }

        // PABX_RAMALID/PABX_RAMALPASS are the older names; the new ones win
        if let Some(username) = lookup("PABX_USERNAME").or_else(|| lookup("PABX_RAMALID")) {
            self.pabx.username = username;
        }

        if let Some(password) = lookup("PABX_PASSWORD").or_else(|| lookup("PABX_RAMALPASS")) {
            self.pabx.password = password;
        }

        if let Some(length) = lookup("PABX_TRUNKID_LENGTH") {
            self.pabx.trunk_id_length = length
                .parse::<usize>()
                .with_context(|| format!("Invalid PABX_TRUNKID_LENGTH: {}", length))?;
        }

        if let Some(interval) = lookup("PABX_FAST_INTERVAL") {
            self.polling.fast_interval = parse_env_duration("PABX_FAST_INTERVAL", &interval)?;
        }

        if let Some(interval) = lookup("PABX_SLOW_INTERVAL") {
            self.polling.slow_interval = parse_env_duration("PABX_SLOW_INTERVAL", &interval)?;
        }

        if let Some(interval) = lookup("PABX_RENEWAL_INTERVAL") {
            self.polling.renewal_interval = parse_env_duration("PABX_RENEWAL_INTERVAL", &interval)?;
        }

        if let Some(backoff) = lookup("PABX_RESTART_BACKOFF") {
            self.polling.restart_backoff = parse_env_duration("PABX_RESTART_BACKOFF", &backoff)?;
        }

        if let Some(port) = lookup("PORT") {
            let port = port
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT: {}", port))?;
            self.monitoring.metrics_addr.set_port(port);
        }

        if let Some(prefix) = lookup("PROM_PREFIX") {
            self.monitoring.metric_prefix = prefix;
        }

        if let Some(log_level) = lookup("PABX_LOG_LEVEL") {
            self.monitoring.log_level = log_level;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_pabx_config()
            .with_context(|| "PABX configuration validation failed")?;

        self.validate_polling_config()
            .with_context(|| "Polling configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_pabx_config(&self) -> Result<()> {
        if self.pabx.base_url.is_empty() {
            bail!("pabx.base_url must be set");
        }

        if !self.pabx.base_url.starts_with("http://") && !self.pabx.base_url.starts_with("https://") {
            bail!("pabx.base_url must start with http:// or https://");
        }

        if self.pabx.username.is_empty() {
            bail!("pabx.username must be set");
        }

        if self.pabx.password.is_empty() {
            bail!("pabx.password must be set");
        }

        if self.pabx.trunk_id_length == 0 {
            bail!("pabx.trunk_id_length must be greater than 0");
        }

        if self.pabx.request_timeout.is_zero() {
            bail!("pabx.request_timeout must be greater than 0");
        }

        if self.pabx.active_calls_top == 0 {
            bail!("pabx.active_calls_top must be greater than 0");
        }

        Ok(())
    }

    fn validate_polling_config(&self) -> Result<()> {
        let intervals = [
            ("fast_interval", self.polling.fast_interval),
            ("slow_interval", self.polling.slow_interval),
            ("renewal_interval", self.polling.renewal_interval),
            ("restart_backoff", self.polling.restart_backoff),
        ];

        for (name, interval) in intervals {
            if interval.is_zero() {
                bail!("polling.{} must be greater than 0", name);
            }
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let prefix = &self.monitoring.metric_prefix;
        let valid_prefix = regex::Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$")?;
        if !prefix.is_empty() && !valid_prefix.is_match(prefix) {
            bail!("monitoring.metric_prefix '{}' is not a valid metric name prefix", prefix);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!("monitoring.log_level must be one of: {}", valid_log_levels.join(", "));
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        base_url: Option<&str>,
        port: Option<u16>,
        trunk_id_length: Option<usize>,
        log_level: Option<&str>,
    ) {
        if let Some(base_url) = base_url {
            self.pabx.base_url = base_url.to_string();
            tracing::info!("CLI override: PABX base URL set to {}", base_url);
        }

        if let Some(port) = port {
            self.monitoring.metrics_addr.set_port(port);
            tracing::info!("CLI override: metrics port set to {}", port);
        }

        if let Some(length) = trunk_id_length {
            self.pabx.trunk_id_length = length;
            tracing::info!("CLI override: trunk id length set to {}", length);
        }

        if let Some(level) = log_level {
            self.monitoring.log_level = level.to_string();
        }
    }

    /// Address the metrics listener binds to
    pub fn metrics_addr(&self) -> SocketAddr {
        self.monitoring.metrics_addr
    }
}

fn parse_env_duration(key: &str, value: &str) -> Result<Duration> {
    humantime::parse_duration(value).with_context(|| format!("Invalid {}: {}", key, value))
}
