//! Backend connection configuration.
//!
//! Configuration is loaded from (highest priority first):
//! 1. Environment variables (`RETSU_REDIS_HOST`, `RETSU_REDIS_PORT`,
//!    `RETSU_REDIS_DB`)
//! 2. Default values (`localhost`, `6379`, `0`)
//!
//! The tracking stores never read the environment themselves; the
//! constructing code does, through [`TrackingConfig::from_env`].

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

/// Environment variable overriding [`TrackingConfig::host`].
pub const ENV_REDIS_HOST: &str = "RETSU_REDIS_HOST";
/// Environment variable overriding [`TrackingConfig::port`].
pub const ENV_REDIS_PORT: &str = "RETSU_REDIS_PORT";
/// Environment variable overriding [`TrackingConfig::db`].
pub const ENV_REDIS_DB: &str = "RETSU_REDIS_DB";

/// Connection settings for the key-value backend.
///
/// # Examples
///
/// ```
/// use retsu::config::TrackingConfig;
///
/// let config = TrackingConfig::default();
/// assert_eq!(config.redis_url(), "redis://localhost:6379/0");
///
/// let config = TrackingConfig::default().with_host("cache").with_db(3);
/// assert_eq!(config.redis_url(), "redis://cache:6379/3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Backend host name.
    pub host: String,

    /// Backend TCP port.
    pub port: u16,

    /// Database index.
    pub db: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
        }
    }
}

impl TrackingConfig {
    /// Loads defaults overridden by the `RETSU_REDIS_*` environment
    /// variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Sets the host (builder pattern).
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port (builder pattern).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the database index (builder pattern).
    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    /// Connection URL understood by the Redis client.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }

    /// Checks the settings before a connection is attempted.
    ///
    /// # Errors
    ///
    /// [`TrackingError::Config`] if the host is empty or the database index
    /// is negative.
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.host.trim().is_empty() {
            return Err(TrackingError::Config("host must not be empty".to_string()));
        }
        if self.db < 0 {
            return Err(TrackingError::Config(format!(
                "database index must not be negative, got {}",
                self.db
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from an arbitrary variable source. Values that do
    /// not parse keep the current setting.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup(ENV_REDIS_HOST) {
            self.host = host;
        }

        if let Some(port) = lookup(ENV_REDIS_PORT) {
            match port.parse() {
                Ok(v) => self.port = v,
                Err(e) => {
                    tracing::warn!(value = %port, error = %e, "ignoring invalid {ENV_REDIS_PORT}");
                },
            }
        }

        if let Some(db) = lookup(ENV_REDIS_DB) {
            match db.parse() {
                Ok(v) => self.db = v,
                Err(e) => {
                    tracing::warn!(value = %db, error = %e, "ignoring invalid {ENV_REDIS_DB}");
                },
            }
        }
    }
}
