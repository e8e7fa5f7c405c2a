//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Notification delivery configuration.
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Background scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this deployment.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Push notification delivery configuration.
///
/// When `webhook_url` is unset, push delivery is disabled and notifications
/// are only persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationConfig {
    /// Endpoint that receives signed push payloads (mobile push relay).
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Shared secret used to sign push payloads.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Background scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Interval in seconds between reschedule-deadline sweeps.
    #[serde(default = "default_sweep_seconds")]
    pub reschedule_sweep_seconds: u64,
    /// Interval in seconds between pending-refund processing runs.
    #[serde(default = "default_refund_seconds")]
    pub refund_process_seconds: u64,
    /// Retention period in days for terminal reschedule requests.
    #[serde(default = "default_retention_days")]
    pub request_retention_days: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            reschedule_sweep_seconds: default_sweep_seconds(),
            refund_process_seconds: default_refund_seconds(),
            request_retention_days: default_retention_days(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_sweep_seconds() -> u64 {
    30
}

const fn default_refund_seconds() -> u64 {
    60
}

const fn default_retention_days() -> u32 {
    90
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PEERSUP_ENV`)
    /// 3. Environment variables with `PEERSUP` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PEERSUP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PEERSUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PEERSUP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_settings_default() {
        let settings = SchedulerSettings::default();
        assert_eq!(settings.reschedule_sweep_seconds, 30);
        assert_eq!(settings.refund_process_seconds, 60);
        assert_eq!(settings.request_retention_days, 90);
    }

    #[test]
    fn test_notification_config_default_disabled() {
        let config = NotificationConfig::default();
        assert!(config.webhook_url.is_none());
        assert!(config.webhook_secret.is_none());
    }
}
