//! Application settings loaded from config.toml
//!
//! Every field has a default, so a missing file or a partial file is fine. Environment
//! variables (`BIND_ADDRESS`, `DATABASE_URL`) override the file after it is parsed, which
//! lets `.env` files and container environments adjust a deployment without editing TOML.

use crate::config::database::{DEFAULT_DATABASE_URL, get_database_url};
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Store settings
    pub database: DatabaseConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to
    pub bind_address: String,
    /// Watchdog limit for a whole request, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

impl ServerConfig {
    /// Watchdog limit as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// `[database]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
    /// Limit for a single store operation, in milliseconds
    pub query_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            query_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    /// Per-operation limit as a [`Duration`].
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl AppConfig {
    /// Applies `BIND_ADDRESS` and `DATABASE_URL` overrides from the environment.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind_address) = std::env::var("BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }
        self.database.url = get_database_url(&self.database.url);
        self
    }

    /// Rejects settings the service cannot run with.
    ///
    /// # Errors
    /// Returns `Error::Config` when a timeout is zero or the database URL is empty.
    pub fn validate(&self) -> Result<()> {
        if self.server.request_timeout_ms == 0 {
            return Err(Error::Config {
                message: "server.request_timeout_ms must be greater than zero".to_string(),
            });
        }
        if self.database.query_timeout_ms == 0 {
            return Err(Error::Config {
                message: "database.query_timeout_ms must be greater than zero".to_string(),
            });
        }
        if self.database.url.trim().is_empty() {
            return Err(Error::Config {
                message: "database.url cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads application configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the config.toml file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration the service starts with.
///
/// Reads `CONFIG_PATH` (default `./config.toml`), falling back to built-in defaults when
/// the file does not exist, then applies environment overrides and validates the result.
///
/// # Errors
/// Returns `Error::Config` if an existing file cannot be parsed or the final settings
/// are invalid.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let file_config = if Path::new(&path).exists() {
        tracing::debug!("Loading configuration from {}", path);
        load_config(&path)?
    } else {
        tracing::info!("No configuration file at {}, using defaults", path);
        AppConfig::default()
    };
    let config = file_config.with_env_overrides();

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_address = "127.0.0.1:9000"
            request_timeout_ms = 2000

            [database]
            url = "sqlite::memory:"
            query_timeout_ms = 250
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.query_timeout(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [database]
            query_timeout_ms = 100
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert_eq!(config.server.request_timeout_ms, 15_000);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(config.database.query_timeout_ms, 100);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = AppConfig::default();
        config.database.query_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let mut config = AppConfig::default();
        config.server.request_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("does/not/exist.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
