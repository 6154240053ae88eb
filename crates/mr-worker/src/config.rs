//! Worker node configuration. Mirrors [`mr_primary::config::PrimaryConfig`]'s
//! loading mechanics, with the addition of the per-model command table.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "MODELRUNNER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./modelrunner.json";
const DEFAULT_PREFIX: &str = "modelrunner";
const MODEL_COMMAND_ENV_PREFIX: &str = "MODEL_COMMAND_";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorkerConfig {
    #[serde(default)]
    pub redis_url: String,
    #[serde(default)]
    pub worker_url: String,
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub model_commands: HashMap<String, String>,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Listening port for the external web tier; unused by this core.
    #[serde(default)]
    pub port: Option<u16>,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl WorkerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_optional_file(&path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.apply_model_command_overrides(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    /// The command line configured for this worker's own model.
    pub fn own_model_command(&self) -> anyhow::Result<&str> {
        self.model_commands
            .get(&self.model)
            .map(|s| s.as_str())
            .ok_or_else(|| anyhow::anyhow!("no model_command configured for model {:?}", self.model))
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
        if let Some(v) = get_env("WORKER_URL") {
            self.worker_url = v;
        }
        if let Some(v) = get_env("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get_env("MODEL") {
            self.model = v;
        }
        if let Some(v) = get_env("PORT") {
            self.port = v.parse().ok();
        }
    }

    fn apply_model_command_overrides(&mut self, env_vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in env_vars {
            if let Some(model_name) = key.strip_prefix(MODEL_COMMAND_ENV_PREFIX) {
                self.model_commands.insert(model_name.to_lowercase(), value);
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.redis_url.is_empty() {
            anyhow::bail!("redis_url is required (config file field or REDIS_URL env var)");
        }
        if self.worker_url.is_empty() {
            anyhow::bail!("worker_url is required (config file field or WORKER_URL env var)");
        }
        if self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("data_dir is required (config file field or DATA_DIR env var)");
        }
        if self.model.is_empty() {
            anyhow::bail!("model is required (config file field or MODEL env var)");
        }
        if !self.model_commands.contains_key(&self.model) {
            anyhow::bail!("no model_command configured for this worker's model {:?}", self.model);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut config = WorkerConfig {
            model: "sequencer".to_string(),
            ..Default::default()
        };
        config.apply_env_overrides(|key| match key {
            "MODEL" => Some("networker".to_string()),
            _ => None,
        });
        assert_eq!(config.model, "networker");
    }

    #[test]
    fn model_command_env_vars_are_lowercased_into_the_map() {
        let mut config = WorkerConfig::default();
        config.apply_model_command_overrides(
            vec![
                ("MODEL_COMMAND_SEQUENCER".to_string(), "/bin/seq".to_string()),
                ("UNRELATED_VAR".to_string(), "ignored".to_string()),
            ]
            .into_iter(),
        );
        assert_eq!(config.model_commands.get("sequencer").map(String::as_str), Some("/bin/seq"));
        assert_eq!(config.model_commands.len(), 1);
    }

    #[test]
    fn validate_requires_a_command_for_the_configured_model() {
        let config = WorkerConfig {
            redis_url: "redis://localhost".to_string(),
            worker_url: "http://worker.example".to_string(),
            data_dir: PathBuf::from("data"),
            model: "sequencer".to_string(),
            model_commands: HashMap::new(),
            prefix: default_prefix(),
            port: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_fully_populated_config() {
        let mut commands = HashMap::new();
        commands.insert("sequencer".to_string(), "/bin/seq".to_string());
        let config = WorkerConfig {
            redis_url: "redis://localhost".to_string(),
            worker_url: "http://worker.example".to_string(),
            data_dir: PathBuf::from("data"),
            model: "sequencer".to_string(),
            model_commands: commands,
            prefix: default_prefix(),
            port: None,
        };
        assert!(config.validate().is_ok());
    }
}
