// SPDX-License-Identifier: Apache-2.0

//! Federation configuration
//!
//! Every field has a default, so an empty JSON object (or no configuration at
//! all) yields a working in-memory setup. `FEDERA_*` environment variables are
//! layered over whatever was loaded.

use std::path::{Path, PathBuf};

use federa_core::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

use crate::engine::registry::DuplicatePolicy;

pub const ENV_LOCAL_PATH: &str = "FEDERA_LOCAL_PATH";
pub const ENV_LOCAL_THREADS: &str = "FEDERA_LOCAL_THREADS";
pub const ENV_DUPLICATE_CONNECTIONS: &str = "FEDERA_DUPLICATE_CONNECTIONS";
pub const ENV_CACHE_PREFIX: &str = "FEDERA_CACHE_PREFIX";
pub const ENV_LOG_FILTER: &str = "FEDERA_LOG_FILTER";
pub const ENV_LOG_DIR: &str = "FEDERA_LOG_DIR";
pub const ENV_LOG_RETENTION_DAYS: &str = "FEDERA_LOG_RETENTION_DAYS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    pub local_engine: LocalEngineConfig,
    pub duplicate_connections: DuplicatePolicy,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// The embedded DuckDB database cached results are installed into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalEngineConfig {
    /// File path, or `:memory:`
    pub path: String,
    /// DuckDB worker threads; engine default when unset
    pub threads: Option<usize>,
}

impl Default for LocalEngineConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            threads: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Prefix of generated cache table names
    pub name_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name_prefix: "federa_cache".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub filter: String,
    /// Log directory; platform data directory when unset
    pub directory: Option<PathBuf>,
    pub retention_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "federa=info".to_string(),
            directory: None,
            retention_days: 14,
        }
    }
}

impl FederationConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("Invalid configuration JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> EngineResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EngineError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> EngineResult<Self> {
        Self::default().with_env(std::env::vars())
    }

    /// Applies `FEDERA_*` overrides from `vars`; unrelated variables are ignored.
    pub fn with_env<I>(mut self, vars: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_LOCAL_PATH => self.local_engine.path = value,
                ENV_LOCAL_THREADS => {
                    self.local_engine.threads = Some(parse_number(&key, &value)?);
                }
                ENV_DUPLICATE_CONNECTIONS => {
                    self.duplicate_connections = match value.trim().to_lowercase().as_str() {
                        "reject" => DuplicatePolicy::Reject,
                        "replace" => DuplicatePolicy::Replace,
                        other => {
                            return Err(EngineError::config(format!(
                                "{key} must be 'reject' or 'replace', got '{other}'"
                            )))
                        }
                    };
                }
                ENV_CACHE_PREFIX => self.cache.name_prefix = value,
                ENV_LOG_FILTER => self.logging.filter = value,
                ENV_LOG_DIR => self.logging.directory = Some(PathBuf::from(value)),
                ENV_LOG_RETENTION_DAYS => {
                    self.logging.retention_days = parse_number(&key, &value)?;
                }
                _ => {}
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.local_engine.threads == Some(0) {
            return Err(EngineError::config("local_engine.threads must be at least 1"));
        }
        let prefix = &self.cache.name_prefix;
        if prefix.is_empty()
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(EngineError::config(format!(
                "cache.name_prefix must be a non-empty identifier, got '{prefix}'"
            )));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> EngineResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::config(format!("{key} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_json_gives_defaults() {
        let config = FederationConfig::from_json("{}").unwrap();
        assert_eq!(config, FederationConfig::default());
        assert_eq!(config.local_engine.path, ":memory:");
        assert_eq!(config.duplicate_connections, DuplicatePolicy::Reject);
        assert_eq!(config.cache.name_prefix, "federa_cache");
        assert_eq!(config.logging.retention_days, 14);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = FederationConfig::from_json(
            r#"{"duplicate_connections": "replace", "cache": {"name_prefix": "tmp"}}"#,
        )
        .unwrap();
        assert_eq!(config.duplicate_connections, DuplicatePolicy::Replace);
        assert_eq!(config.cache.name_prefix, "tmp");
        assert_eq!(config.logging.filter, "federa=info");
    }

    #[test]
    fn env_overrides_layer_over_defaults() {
        let config = FederationConfig::default()
            .with_env(vars(&[
                (ENV_LOCAL_THREADS, "4"),
                (ENV_DUPLICATE_CONNECTIONS, "Replace"),
                (ENV_LOG_DIR, "/tmp/federa-logs"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();
        assert_eq!(config.local_engine.threads, Some(4));
        assert_eq!(config.duplicate_connections, DuplicatePolicy::Replace);
        assert_eq!(config.logging.directory, Some(PathBuf::from("/tmp/federa-logs")));
        assert_eq!(config.local_engine.path, ":memory:");
    }

    #[test]
    fn bad_values_are_config_errors() {
        let err = FederationConfig::default()
            .with_env(vars(&[(ENV_LOCAL_THREADS, "many")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));

        let err = FederationConfig::default()
            .with_env(vars(&[(ENV_DUPLICATE_CONNECTIONS, "merge")]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));

        assert!(FederationConfig::from_json(r#"{"cache": {"name_prefix": "a-b"}}"#).is_err());
        assert!(FederationConfig::from_json(r#"{"local_engine": {"threads": 0}}"#).is_err());
    }

    #[test]
    fn reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federa.json");
        std::fs::write(&path, r#"{"local_engine": {"path": "cache.duckdb"}}"#).unwrap();

        let config = FederationConfig::from_json_file(&path).unwrap();
        assert_eq!(config.local_engine.path, "cache.duckdb");
    }
}
