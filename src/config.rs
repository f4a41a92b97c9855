//! Environment-driven configuration
//!
//! Values come from the process environment, which `main` first populates
//! from a `.env` file when one exists.

use std::path::PathBuf;

/// Secret used when `JWT_SECRET` is not set. Only suitable for development.
pub const DEV_JWT_SECRET: &str = "ledgerly-dev-secret";

const DEFAULT_LOG_FILTER: &str = "ledgerly=debug,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT value: {0}")]
    InvalidPort(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// Path of the redb database file
    pub database_url: String,
    pub jwt_secret: String,
    /// Optional JSON file of official links loaded at startup
    pub seed_file: Option<PathBuf>,
    pub log_filter: String,
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which returns the value of a variable.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8080,
        };

        Ok(Self {
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "ledgerly.db".to_string()),
            jwt_secret: get("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            seed_file: get("SEED_FILE").map(PathBuf::from),
            log_filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}
