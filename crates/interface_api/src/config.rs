//! API configuration

use serde::Deserialize;
use std::time::Duration;

use core_kernel::Timezone;

/// Where claims are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local store, lost on restart
    Memory,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
    pub storage: StorageBackend,
    /// Timezone that decides which calendar day "today" is
    pub timezone: Timezone,
    /// Seconds between time-bar sweeps; 0 disables the sweep
    pub sweep_interval_secs: u64,
    /// Days before a deadline at which analysts are warned
    pub timebar_warning_days: i64,
    /// Username of an admin created at startup on the memory backend
    pub bootstrap_admin: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/claims".to_string(),
            db_max_connections: 10,
            log_level: "info".to_string(),
            json_logs: false,
            storage: StorageBackend::Postgres,
            timezone: Timezone::default(),
            sweep_interval_secs: 3600,
            timebar_warning_days: domain_claims::timebar::DEFAULT_WARNING_DAYS,
            bootstrap_admin: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("jwt_secret", defaults.jwt_secret)?
            .set_default("jwt_expiration_secs", defaults.jwt_expiration_secs as i64)?
            .set_default("database_url", defaults.database_url)?
            .set_default("db_max_connections", i64::from(defaults.db_max_connections))?
            .set_default("log_level", defaults.log_level)?
            .set_default("json_logs", defaults.json_logs)?
            .set_default("storage", "postgres")?
            .set_default("timezone", defaults.timezone.name())?
            .set_default("sweep_interval_secs", defaults.sweep_interval_secs as i64)?
            .set_default("timebar_warning_days", defaults.timebar_warning_days)?
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Sweep period, or `None` when the sweep is disabled
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.timebar_warning_days, 30);
        assert_eq!(config.sweep_interval(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_interval_disables_sweep() {
        let config = ApiConfig {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.sweep_interval().is_none());
    }

    #[test]
    fn test_storage_backend_names() {
        let memory: StorageBackend = serde_json::from_str("\"memory\"").unwrap();
        assert_eq!(memory, StorageBackend::Memory);
        let postgres: StorageBackend = serde_json::from_str("\"postgres\"").unwrap();
        assert_eq!(postgres, StorageBackend::Postgres);
    }
}
