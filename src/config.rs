//! Runtime configuration, read from the environment (and `.env` when present)
use crate::error::Result;
use std::path::PathBuf;
use std::str::FromStr;

pub const DB_PATH: &str = "FLEET_DB_PATH";
pub const DB_TEMPORARY: &str = "FLEET_DB_TEMPORARY";
pub const CACHE_CAPACITY: &str = "FLEET_CACHE_CAPACITY";
pub const FLUSH_EVERY_MS: &str = "FLEET_FLUSH_EVERY_MS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetConfig {
    pub db_path: PathBuf,
    pub temporary: bool,
    pub cache_capacity: u64, // bytes
    pub flush_every_ms: Option<u64>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("fleet.db"),
            temporary: false,
            cache_capacity: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
        }
    }
}

impl FleetConfig {
    /// Loads `.env` if there is one, then overlays the `FLEET_*` variables on the defaults.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = lookup(DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(DB_TEMPORARY) {
            config.temporary = parse(DB_TEMPORARY, &value)?;
        }
        if let Some(value) = lookup(CACHE_CAPACITY) {
            config.cache_capacity = parse(CACHE_CAPACITY, &value)?;
        }
        if let Some(value) = lookup(FLUSH_EVERY_MS) {
            // 0 turns periodic flushing off
            config.flush_every_ms = match parse(FLUSH_EVERY_MS, &value)? {
                0 => None,
                ms => Some(ms),
            };
        }
        Ok(config)
    }

    pub fn sled_config(&self) -> sled::Config {
        sled::Config::new()
            .path(&self.db_path)
            .temporary(self.temporary)
            .cache_capacity(self.cache_capacity)
            .flush_every_ms(self.flush_every_ms)
    }

    pub fn open(&self) -> Result<sled::Db> {
        Ok(self.sled_config().open()?)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> std::result::Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = FleetConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn overlays_variables() {
        let config = FleetConfig::from_lookup(lookup(&[
            (DB_PATH, "/tmp/fleet-test.db"),
            (DB_TEMPORARY, "true"),
            (CACHE_CAPACITY, "1024"),
            (FLUSH_EVERY_MS, "0"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/fleet-test.db"));
        assert!(config.temporary);
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.flush_every_ms, None);
    }

    #[test]
    fn rejects_garbage() {
        let err = FleetConfig::from_lookup(lookup(&[(CACHE_CAPACITY, "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: CACHE_CAPACITY,
                value: "lots".into()
            }
        );
    }

    #[test]
    fn opens_a_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = FleetConfig {
            db_path: dir.path().join("config.db"),
            temporary: true,
            ..FleetConfig::default()
        };
        let db = config.open().unwrap();
        assert!(!db.was_recovered());
    }
}
