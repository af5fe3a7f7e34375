//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string. Without it the service
//!   runs on the in-memory store.
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `UPLOAD_DIR` - Directory served as `uploads/` (default: ./uploads)
//! - `NATS_URL` - NATS server for order events; publishing is off when unset

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct Config {
    /// Contains the database password.
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    pub upload_dir: PathBuf,
    pub nats_url: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("upload_dir", &self.upload_dir)
            .field("nats_url", &self.nats_url)
            .finish()
    }
}

impl Config {
    /// Reads the process environment. Callers load `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or_default = |key: &str, default: &str| optional(key).unwrap_or_else(|| default.to_string());

        let host = or_default("HOST", "0.0.0.0")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = or_default("PORT", "8083")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let max_connections = or_default("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidEnvVar("DATABASE_MAX_CONNECTIONS".to_string(), "expected a positive integer".to_string()))?;

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            host,
            port,
            max_connections,
            upload_dir: PathBuf::from(or_default("UPLOAD_DIR", "./uploads")),
            nats_url: optional("NATS_URL"),
        })
    }

    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8083");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert!(config.database_url.is_none());
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let config = load(&[("PORT", "9000"), ("HOST", "127.0.0.1"), ("DATABASE_URL", "postgres://u:p@db/food"), ("NATS_URL", " ")]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(config.database_url.as_deref(), Some("postgres://u:p@db/food"));
        assert!(config.nats_url.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(ConfigError::InvalidEnvVar(k, _)) if k == "PORT"));
        assert!(matches!(load(&[("HOST", "localhost:1")]), Err(ConfigError::InvalidEnvVar(k, _)) if k == "HOST"));
        assert!(load(&[("DATABASE_MAX_CONNECTIONS", "0")]).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://u:hunter2@db/food")]).unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
