//! # Configuration Module
//!
//! Server configuration, layered from lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config path`)
//! 3. Environment variables (`SCHOOLHUB_*`)
//! 4. Command-line flags (applied by the CLI)
//!
//! ## Environment Variables
//!
//! - `SCHOOLHUB_HOST`, `SCHOOLHUB_PORT`
//! - `SCHOOLHUB_DATABASE`, `SCHOOLHUB_BACKEND` (`redb` | `file`)
//! - `SCHOOLHUB_CORS_ORIGINS`: comma-separated origins, or `*` for all
//! - `SCHOOLHUB_RATE_LIMIT`: requests per second, `0` disables
//! - `SCHOOLHUB_API_KEY`: if set, requires Bearer token authentication
//! - `SCHOOLHUB_POLL_INTERVAL`: notification poller period in seconds
//! - `SCHOOLHUB_BODY_LIMIT`: maximum request body in bytes

use clap::ValueEnum;
use schoolhub_core::SchoolError;
use schoolhub_core::primitives::DEFAULT_POLL_INTERVAL_SECS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default requests per second for the global rate limiter.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default maximum request body (2 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Smallest accepted poller period.
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;

/// Largest configuration file read from disk (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config file: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl From<ConfigError> for SchoolError {
    fn from(e: ConfigError) -> Self {
        SchoolError::Validation(e.to_string())
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Where the school lives on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// redb database (ACID, written on every change)
    #[default]
    Redb,
    /// In-memory school saved as a canonical snapshot file
    File,
}

impl Backend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redb => "redb",
            Self::File => "file",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redb" => Ok(Self::Redb),
            "file" => Ok(Self::File),
            other => Err(format!("unknown backend '{}' (expected redb or file)", other)),
        }
    }
}

// =============================================================================
// SERVER CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database: PathBuf,
    pub backend: Backend,
    /// Empty means localhost only; `["*"]` allows every origin.
    pub cors_origins: Vec<String>,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    /// Bearer token required on every route except `/health`.
    pub api_key: Option<String>,
    pub poll_interval_secs: u64,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database: PathBuf::from("schoolhub.db"),
            backend: Backend::Redb,
            cors_origins: Vec::new(),
            rate_limit: DEFAULT_RATE_LIMIT,
            api_key: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: format!("'{}': {}", value, e),
    })
}

impl ServerConfig {
    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let read_error = |reason: String| ConfigError::Read {
            path: path.to_path_buf(),
            reason,
        };
        let metadata = std::fs::metadata(path).map_err(|e| read_error(e.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(read_error(format!(
                "file size {} exceeds maximum {}",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Overlay `SCHOOLHUB_*` variables read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("SCHOOLHUB_HOST") {
            self.host = v;
        }
        if let Some(v) = lookup("SCHOOLHUB_PORT") {
            self.port = parse_env("SCHOOLHUB_PORT", &v)?;
        }
        if let Some(v) = lookup("SCHOOLHUB_DATABASE") {
            self.database = PathBuf::from(v);
        }
        if let Some(v) = lookup("SCHOOLHUB_BACKEND") {
            self.backend = parse_env("SCHOOLHUB_BACKEND", &v)?;
        }
        if let Some(v) = lookup("SCHOOLHUB_CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("SCHOOLHUB_RATE_LIMIT") {
            self.rate_limit = parse_env("SCHOOLHUB_RATE_LIMIT", &v)?;
        }
        if let Some(v) = lookup("SCHOOLHUB_API_KEY") {
            self.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = lookup("SCHOOLHUB_POLL_INTERVAL") {
            self.poll_interval_secs = parse_env("SCHOOLHUB_POLL_INTERVAL", &v)?;
        }
        if let Some(v) = lookup("SCHOOLHUB_BODY_LIMIT") {
            self.body_limit_bytes = parse_env("SCHOOLHUB_BODY_LIMIT", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                key: "poll_interval_secs",
                reason: format!("must be at least {} second", MIN_POLL_INTERVAL_SECS),
            });
        }
        if self.body_limit_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "body_limit_bytes",
                reason: "must be positive".to_string(),
            });
        }
        if self.api_key.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid {
                key: "api_key",
                reason: "must not be empty when set".to_string(),
            });
        }
        Ok(())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.poll_interval_secs, 60);
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = ServerConfig::from_toml_str(
            r#"
            port = 9000
            backend = "file"
            cors_origins = ["https://school.example"]
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.cors_origins, vec!["https://school.example"]);
    }

    #[test]
    fn unknown_toml_key_rejected() {
        let err = ServerConfig::from_toml_str("prot = 80").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = ServerConfig::from_toml_str("port = 9000\nrate_limit = 5").unwrap();
        config
            .apply_env(env(&[
                ("SCHOOLHUB_PORT", "9100"),
                ("SCHOOLHUB_CORS_ORIGINS", "http://a.test, http://b.test,"),
                ("SCHOOLHUB_API_KEY", "secret"),
                ("SCHOOLHUB_BACKEND", "FILE"),
            ]))
            .unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.backend, Backend::File);
    }

    #[test]
    fn bad_env_value_names_the_key() {
        let mut config = ServerConfig::default();
        let err = config
            .apply_env(env(&[("SCHOOLHUB_POLL_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("SCHOOLHUB_POLL_INTERVAL"));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let config = ServerConfig {
            poll_interval_secs: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "poll_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn config_file_is_read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"0.0.0.0\"\npoll_interval_secs = 5").unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.poll_interval_secs, 5);
    }

    #[test]
    fn missing_config_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
