//! Configuration management for the safety inspection server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which [`crate::store::DocumentStore`] implementation backs the services
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Firestore,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Firestore => "firestore",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub project_id: Option<String>,
    pub database: String,
    pub base_url: String,
    /// `host:port` of a local Firestore emulator; overrides `base_url`
    pub emulator_host: Option<String>,
    /// Fixed OAuth2 bearer token; takes precedence over `credentials_file`
    pub access_token: Option<String>,
    /// Service account key file used to mint access tokens
    pub credentials_file: Option<String>,
    /// Token endpoint of the GCE metadata server, the last credential fallback
    pub metadata_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

/// Argon2id cost parameters for employee passwords
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SAFETY_STORE__MAX_RETRIES=5 sets store.max_retries
            .add_source(
                Environment::with_prefix("SAFETY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("store.project_id", env::var("FIRESTORE_PROJECT_ID").ok())?
            .set_override_option("store.emulator_host", env::var("FIRESTORE_EMULATOR_HOST").ok())?
            .set_override_option("store.access_token", env::var("FIRESTORE_ACCESS_TOKEN").ok())?
            .set_override_option(
                "store.credentials_file",
                env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            )?
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Firestore
            && self.store.project_id.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Message(
                "store.project_id is required for the firestore backend".to_string(),
            ));
        }
        if self.security.argon2_parallelism == 0 || self.security.argon2_iterations == 0 {
            return Err(ConfigError::Message(
                "argon2 iterations and parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            project_id: None,
            database: "(default)".to_string(),
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            emulator_host: None,
            access_token: None,
            credentials_file: None,
            metadata_url: "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token"
                .to_string(),
            timeout_secs: 10,
            max_retries: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            security: SecurityConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_the_memory_store() {
        let config = AppConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn firestore_requires_a_project() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Firestore;
        assert!(config.validate().is_err());

        config.store.project_id = Some("inspections".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_partial_sections() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                host = "127.0.0.1"
                port = 9000

                [store]
                backend = "firestore"
                project_id = "inspections"
                max_retries = 5

                [logging]
                level = "debug"
                format = "json"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.max_retries, 5);
        assert_eq!(config.store.database, "(default)");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.security.argon2_iterations, 2);
    }
}
