use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

pub mod environment;
pub mod resolver;

pub use environment::{EnvName, Environment};
pub use resolver::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("key must not be empty")]
    EmptyKey,

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Typed view over the resolved mapping for the settings the process itself
/// needs at start-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log_event: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub driver: StoreDriver,
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: StoreDriver::Postgres,
            url: None,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            max_connections: 10,
        }
    }
}

impl AppConfig {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let parsed: AppConfig = serde_json::from_value(config.all().clone())?;
        Ok(parsed.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }

        self
    }
}
