//! Process configuration, read from environment variables.
//!
//! Every setting has a default except the database: without `DATABASE_URL`
//! (or the older `POSTGRESQL_URI`) the process runs on the in-memory store.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use tally_auth::PasswordHasherConfig;
pub use tally_observability::LogFormat;

use crate::db::DatabaseConfig;

/// Used when `JWT_SECRET` is unset. Local development only.
pub const DEV_SIGNING_SECRET: &str = "dev-insecure-secret-change-me";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub signing_secret: String,
    pub token_ttl: Duration,
    pub database: Option<DatabaseConfig>,
    pub store_timeout: Duration,
    pub password: PasswordHasherConfig,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let signing_secret = match lookup("JWT_SECRET") {
            Some(secret) if secret.is_empty() => return Err(ConfigError::Empty("JWT_SECRET")),
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using development secret");
                DEV_SIGNING_SECRET.to_string()
            }
        };

        let token_ttl = Duration::from_secs(positive(&get, "TOKEN_TTL_SECS", 7200)?);
        let store_timeout = Duration::from_millis(positive(&get, "STORE_TIMEOUT_MS", 5000)?);

        let database = match get("DATABASE_URL").or_else(|| get("POSTGRESQL_URI")) {
            Some(url) => {
                let mut db = DatabaseConfig::new(url);
                db.max_connections = parse_or(&get, "DB_MAX_CONNECTIONS", db.max_connections)?;
                db.min_connections = parse_or(&get, "DB_MIN_CONNECTIONS", db.min_connections)?;
                db.max_lifetime =
                    Duration::from_secs(positive(&get, "DB_MAX_LIFETIME_SECS", 3600)?);
                db.acquire_timeout =
                    Duration::from_millis(positive(&get, "DB_ACQUIRE_TIMEOUT_MS", 5000)?);
                if db.min_connections > db.max_connections {
                    return Err(ConfigError::Invalid {
                        key: "DB_MIN_CONNECTIONS",
                        value: db.min_connections.to_string(),
                        reason: format!("exceeds DB_MAX_CONNECTIONS ({})", db.max_connections),
                    });
                }
                Some(db)
            }
            None => None,
        };

        let defaults = PasswordHasherConfig::default();
        let password = PasswordHasherConfig {
            memory_kib: parse_or(&get, "PASSWORD_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&get, "PASSWORD_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&get, "PASSWORD_PARALLELISM", defaults.parallelism)?,
        };

        let log_format = parse_or(&get, "LOG_FORMAT", LogFormat::default())?;

        Ok(Self {
            bind_addr,
            signing_secret,
            token_ttl,
            database,
            store_timeout,
            password,
            log_format,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("signing_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("database", &self.database)
            .field("store_timeout", &self.store_timeout)
            .field("password", &self.password)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
