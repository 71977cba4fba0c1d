//! Configuration loading and management
//!
//! Configuration is read from an optional YAML file and then overridden by a
//! handful of environment variables. Every section has defaults, so an empty
//! document (or no file at all) yields a working in-memory server on
//! `127.0.0.1:4000`.

use crate::core::ConfigError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable naming the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "BOOKSHELF_CONFIG";
/// Overrides `server.bind_address`
pub const BIND_ADDRESS_ENV: &str = "BOOKSHELF_BIND_ADDRESS";
/// Overrides `storage.uri` when the MongoDB backend is selected
pub const MONGODB_URI_ENV: &str = "BOOKSHELF_MONGODB_URI";
/// Overrides `logging.filter`
pub const LOG_FILTER_ENV: &str = "BOOKSHELF_LOG";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_address: SocketAddr,

    /// Path of the GraphQL endpoint
    pub graphql_path: String,

    /// Serve the GraphQL Playground on GET requests to the endpoint
    pub playground: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 4000)),
            graphql_path: "/graphql".to_string(),
            playground: true,
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory collections, lost on restart
    Memory {
        /// Preload sample authors and books
        #[serde(default)]
        seed: bool,
    },
    /// MongoDB collections `books` and `authors`
    Mongodb {
        uri: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory { seed: false }
    }
}

fn default_database() -> String {
    "bookshelf".to_string()
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file named by `BOOKSHELF_CONFIG` (if any) and apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(BIND_ADDRESS_ENV) {
            self.server.bind_address = addr.parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.bind_address".to_string(),
                message: format!("'{}' is not a socket address", addr),
            })?;
        }

        if let Some(uri) = lookup(MONGODB_URI_ENV) {
            match &mut self.storage {
                StorageConfig::Mongodb { uri: current, .. } => *current = uri,
                StorageConfig::Memory { .. } => {
                    self.storage = StorageConfig::Mongodb {
                        uri,
                        database: default_database(),
                    }
                }
            }
        }

        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            self.logging.filter = filter;
        }

        Ok(())
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.server.graphql_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "server.graphql_path".to_string(),
                message: "must start with '/'".to_string(),
            });
        }

        if self.server.graphql_path.trim_end_matches('/').is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.graphql_path".to_string(),
                message: "must not be the root path".to_string(),
            });
        }

        if let StorageConfig::Mongodb { uri, database } = &self.storage {
            if uri.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "storage.uri".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            if database.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "storage.database".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }
}
