use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::error::{AppError, Result};

const ENV_PROJECT_ID: &str = "BONUSBOOST_PROJECT_ID";
const ENV_PUBLIC_KEY: &str = "BONUSBOOST_PUBLIC_KEY";
const ENV_STORE_URL: &str = "BONUSBOOST_STORE_URL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Remote,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub project_id: Option<String>,
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_generation_delay")]
    pub generation_delay_ms: u64,

    #[serde(default = "default_analysis_delay")]
    pub analysis_delay_ms: u64,

    #[serde(default = "default_connection_test_delay")]
    pub connection_test_delay_ms: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bonus-boost");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("records.db").to_string_lossy().to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_generation_delay() -> u64 {
    3000
}

fn default_analysis_delay() -> u64 {
    2000
}

fn default_connection_test_delay() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            db_path: default_db_path(),
            remote: RemoteConfig::default(),
            public_base_url: default_public_base_url(),
            request_timeout_secs: default_request_timeout(),
            generation_delay_ms: default_generation_delay(),
            analysis_delay_ms: default_analysis_delay(),
            connection_test_delay_ms: default_connection_test_delay(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bonus-boost")
            .join("config.toml")
    }

    /// Environment variables win over the config file for record store credentials.
    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(ENV_PROJECT_ID) {
            self.remote.project_id = Some(value);
        }
        if let Ok(value) = std::env::var(ENV_PUBLIC_KEY) {
            self.remote.public_key = Some(value);
        }
        if let Ok(value) = std::env::var(ENV_STORE_URL) {
            self.remote.base_url = Some(value);
        }
    }

    /// Reject configurations that would talk to the record store with missing credentials.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.public_base_url)
            .map_err(|e| AppError::Config(format!("public_base_url: {}", e)))?;

        if self.backend != Backend::Remote {
            return Ok(());
        }

        let base_url = non_blank(&self.remote.base_url)
            .ok_or_else(|| AppError::Config(format!("{} is not set", ENV_STORE_URL)))?;
        Url::parse(base_url).map_err(|e| AppError::Config(format!("remote.base_url: {}", e)))?;

        if non_blank(&self.remote.project_id).is_none() {
            return Err(AppError::Config(format!("{} is not set", ENV_PROJECT_ID)));
        }
        if non_blank(&self.remote.public_key).is_none() {
            return Err(AppError::Config(format!("{} is not set", ENV_PUBLIC_KEY)));
        }
        Ok(())
    }

    /// Settings for tests and `--memory` runs: no delays, nothing on disk.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            db_path: String::new(),
            remote: RemoteConfig::default(),
            public_base_url: default_public_base_url(),
            request_timeout_secs: default_request_timeout(),
            generation_delay_ms: 0,
            analysis_delay_ms: 0,
            connection_test_delay_ms: 0,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote_config() -> Config {
        Config {
            backend: Backend::Remote,
            remote: RemoteConfig {
                base_url: Some("https://records.example.test/api".to_string()),
                project_id: Some("proj_123".to_string()),
                public_key: Some("pk_live".to_string()),
            },
            ..Config::in_memory()
        }
    }

    #[test]
    fn test_remote_config_with_credentials_is_valid() {
        assert!(remote_config().validate().is_ok());
    }

    #[test]
    fn test_missing_project_id_fails_fast() {
        let mut config = remote_config();
        config.remote.project_id = None;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains(ENV_PROJECT_ID)));
    }

    #[test]
    fn test_blank_public_key_fails_fast() {
        let mut config = remote_config();
        config.remote.public_key = Some("   ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_backends_need_no_credentials() {
        assert!(Config::in_memory().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            backend = "remote"
            public_base_url = "https://bonus.example.test"

            [remote]
            project_id = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Remote);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.generation_delay_ms, 3000);
        assert_eq!(config.remote.project_id.as_deref(), Some("abc"));
        assert!(config.remote.public_key.is_none());
    }
}
