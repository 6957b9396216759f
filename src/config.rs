// src/config.rs

//! Service configuration, read from the environment (and `.env` in development).

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when STORE_BACKEND=postgres")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

/// Connection pool bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    /// PostgreSQL connection URL, required for the postgres backend
    pub database_url: Option<String>,
    pub http_host: String,
    pub http_port: u16,
    pub pool: PoolSettings,
    /// Deadline applied to store reads issued by the HTTP layer
    pub read_timeout: Duration,
    pub run_migrations: bool,
    /// Load the demo catalog into the in-memory store
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any key lookup. Unset or empty keys take their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match get("STORE_BACKEND") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: raw,
            })?,
            None => StoreBackend::Postgres,
        };

        let database_url = get("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Config {
            backend,
            database_url,
            http_host: get("HTTP_HOST").unwrap_or_else(|| "127.0.0.1".into()),
            http_port: parse_or(&get, "HTTP_PORT", 8080)?,
            pool: PoolSettings {
                max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
                min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", 0)?,
                max_lifetime: Duration::from_secs(parse_or(&get, "DB_MAX_LIFETIME_SECS", 30 * 60)?),
                idle_timeout: Duration::from_secs(parse_or(&get, "DB_IDLE_TIMEOUT_SECS", 5 * 60)?),
                acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            },
            read_timeout: Duration::from_millis(parse_or(&get, "READ_TIMEOUT_MS", 3000)?),
            run_migrations: parse_bool_or(&get, "RUN_MIGRATIONS", true)?,
            seed_demo_data: parse_bool_or(&get, "SEED_DEMO_DATA", false)?,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.http_host.clone(), self.http_port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/kasir")]).unwrap();

        assert_eq!(config.backend, StoreBackend::Postgres);
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8080));
        assert_eq!(config.pool.max_connections, 10);
        assert_eq!(config.pool.max_lifetime, Duration::from_secs(1800));
        assert_eq!(config.pool.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.read_timeout, Duration::from_secs(3));
        assert!(config.run_migrations);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn postgres_backend_requires_a_database_url() {
        let err = config_from(&[]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config =
            config_from(&[("STORE_BACKEND", "memory"), ("SEED_DEMO_DATA", "yes")]).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert!(config.seed_demo_data);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = config_from(&[("STORE_BACKEND", "memory"), ("HTTP_PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "HTTP_PORT",
                value: "eighty".into()
            }
        );
    }
}
