//! Primary node configuration.
//!
//! Loaded from a JSON file (path from `MODELRUNNER_CONFIG`, default
//! `./modelrunner.json`) with every field overridable by an environment
//! variable of the same `SCREAMING_SNAKE_CASE` name.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "MODELRUNNER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./modelrunner.json";
const DEFAULT_PREFIX: &str = "modelrunner";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrimaryConfig {
    #[serde(default)]
    pub redis_url: String,
    #[serde(default)]
    pub primary_url: String,
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Listening port for the external web tier; this core never binds a
    /// socket itself, but the knob is carried so one config file serves
    /// both the core and whatever HTTP front-end a deployment adds.
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl PrimaryConfig {
    /// Read `MODELRUNNER_CONFIG` (or the default path) if present, then
    /// apply process environment overrides, then validate required
    /// fields.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_optional_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_optional_file(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("parsing config file {path}")),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err).with_context(|| format!("reading config file {path}")),
        }
    }

    fn apply_env_overrides(&mut self, get_env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get_env("REDIS_URL") {
            self.redis_url = v;
        }
        if let Some(v) = get_env("PRIMARY_URL") {
            self.primary_url = v;
        }
        if let Some(v) = get_env("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get_env("PORT") {
            self.port = v.parse().ok();
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.redis_url.is_empty() {
            anyhow::bail!("redis_url is required (config file field or REDIS_URL env var)");
        }
        if self.primary_url.is_empty() {
            anyhow::bail!("primary_url is required (config file field or PRIMARY_URL env var)");
        }
        if self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("data_dir is required (config file field or DATA_DIR env var)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut config = PrimaryConfig {
            redis_url: "redis://file-value".to_string(),
            primary_url: "http://file-value".to_string(),
            data_dir: PathBuf::from("data"),
            prefix: default_prefix(),
            port: None,
        };
        config.apply_env_overrides(|key| match key {
            "REDIS_URL" => Some("redis://env-value".to_string()),
            _ => None,
        });
        assert_eq!(config.redis_url, "redis://env-value");
        assert_eq!(config.primary_url, "http://file-value");
    }

    #[test]
    fn validate_rejects_missing_required_fields() {
        let config = PrimaryConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_fully_populated_config() {
        let config = PrimaryConfig {
            redis_url: "redis://localhost".to_string(),
            primary_url: "http://primary.example".to_string(),
            data_dir: PathBuf::from("data"),
            prefix: default_prefix(),
            port: Some(8080),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_optional_file_falls_back_to_default_when_missing() {
        let config = PrimaryConfig::from_optional_file("/nonexistent/path/modelrunner.json").unwrap();
        assert_eq!(config.redis_url, "");
    }

    #[test]
    fn from_optional_file_parses_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modelrunner.json");
        std::fs::write(
            &path,
            r#"{"redis_url":"redis://localhost","primary_url":"http://primary.example","data_dir":"data"}"#,
        )
        .unwrap();
        let config = PrimaryConfig::from_optional_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.redis_url, "redis://localhost");
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }
}
