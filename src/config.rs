//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Where transactions are stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// PostgreSQL table `table` reached through `database_url`
    Postgres {
        database_url: String,
        max_connections: u32,
        table: String,
    },
    /// Process-local collection; contents are lost on exit
    Memory,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage backend and its settings
    pub storage: StorageConfig,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "postgres".to_string());

        let storage = match backend.as_str() {
            "postgres" => {
                let database_url =
                    lookup("DATABASE_URL").ok_or(ConfigError::MissingEnv("DATABASE_URL"))?;

                let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?;

                let table = lookup("COLLECTION_NAME").unwrap_or_else(|| "transactions".to_string());
                if !is_identifier(&table) {
                    return Err(ConfigError::InvalidValue("COLLECTION_NAME"));
                }

                StorageConfig::Postgres {
                    database_url,
                    max_connections,
                    table,
                }
            }
            "memory" => StorageConfig::Memory,
            _ => return Err(ConfigError::InvalidValue("STORAGE_BACKEND")),
        };

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = parse_or(&lookup, "PORT", 5000)?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        Ok(Self {
            storage,
            host,
            port,
            environment,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue(key)),
        None => Ok(default),
    }
}

/// Lowercase SQL identifier: `[a-z_][a-z0-9_]*`
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
