//! Runtime configuration read from the environment (and `.env`, if present).

use std::env;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub session_ttl_minutes: i64,
    pub strict_status_transitions: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageBackend::Postgres,
            database_url: None,
            db_pool_size: 10,
            session_ttl_minutes: 24 * 60,
            strict_status_transitions: false,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Loads `.env` and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(value) = lookup("RENTAL_STORAGE") {
            config.storage = match value.to_ascii_lowercase().as_str() {
                "postgres" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                _ => return Err(ConfigError::Invalid { key: "RENTAL_STORAGE", value }),
            };
        }

        config.database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if config.storage == StorageBackend::Postgres && config.database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        if let Some(value) = lookup("RENTAL_DB_POOL_SIZE") {
            config.db_pool_size = match value.parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::Invalid { key: "RENTAL_DB_POOL_SIZE", value }),
            };
        }

        if let Some(value) = lookup("RENTAL_SESSION_TTL_MINUTES") {
            config.session_ttl_minutes = match value.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => return Err(ConfigError::Invalid { key: "RENTAL_SESSION_TTL_MINUTES", value }),
            };
        }

        if let Some(value) = lookup("RENTAL_STRICT_STATUS_TRANSITIONS") {
            config.strict_status_transitions = parse_bool(&value)
                .ok_or(ConfigError::Invalid { key: "RENTAL_STRICT_STATUS_TRANSITIONS", value })?;
        }

        if let Some(value) = lookup("RENTAL_LOG_FORMAT") {
            config.log_format = match value.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::Invalid { key: "RENTAL_LOG_FORMAT", value }),
            };
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn postgres_requires_database_url() {
        assert_eq!(config_from(&[]), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn memory_storage_needs_no_database() {
        let config = config_from(&[("RENTAL_STORAGE", "memory")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.session_ttl_minutes, 1440);
        assert!(!config.strict_status_transitions);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/rentals"),
            ("RENTAL_DB_POOL_SIZE", "4"),
            ("RENTAL_SESSION_TTL_MINUTES", "30"),
            ("RENTAL_STRICT_STATUS_TRANSITIONS", "yes"),
            ("RENTAL_LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/rentals"));
        assert_eq!(config.db_pool_size, 4);
        assert_eq!(config.session_ttl_minutes, 30);
        assert!(config.strict_status_transitions);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            config_from(&[("RENTAL_STORAGE", "memory"), ("RENTAL_SESSION_TTL_MINUTES", "-5")]),
            Err(ConfigError::Invalid { key: "RENTAL_SESSION_TTL_MINUTES", .. })
        ));
        assert!(matches!(
            config_from(&[("RENTAL_STORAGE", "sqlite")]),
            Err(ConfigError::Invalid { key: "RENTAL_STORAGE", .. })
        ));
    }
}
