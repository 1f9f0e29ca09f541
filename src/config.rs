use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "RECIPEREVIEW_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "recipereview.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File system error: {0}")]
    IO(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    YAMLError(#[from] serde_yaml::Error),
    #[error("Configuration error: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3004".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "recipereview.db".to_string(),
        }
    }
}

/// Credentials and endpoint for the Edamam recipe API.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_key: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.edamam.com/api/recipes/v2".to_string(),
            app_id: String::new(),
            app_key: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ReviewsConfig {
    pub page_size: i64,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self { page_size: 6 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub reviews: ReviewsConfig,
    pub auth: AuthConfig,
}

impl Config {
    /// Loads the YAML file named by `RECIPEREVIEW_CONFIG` (or `recipereview.yml`
    /// when it exists), then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets and deployment specifics come from the environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("RECIPEREVIEW_ADDR") {
            self.server.addr = addr;
        }
        if let Some(path) = lookup("RECIPEREVIEW_DATABASE") {
            self.database.path = path;
        }
        if let Some(app_id) = lookup("EDAMAM_APP_ID") {
            self.search.app_id = app_id;
        }
        if let Some(app_key) = lookup("EDAMAM_APP_KEY") {
            self.search.app_key = app_key;
        }
        if self.search.app_id.is_empty() || self.search.app_key.is_empty() {
            warn!("Edamam credentials not set, recipe search will be rejected upstream");
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reviews.page_size < 1 {
            return Err(ConfigError::Invalid(
                "reviews.page_size must be at least 1".to_string(),
            ));
        }
        if self.search.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "search.timeout_secs must be at least 1".to_string(),
            ));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::Invalid(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reviews.page_size, 6);
        assert_eq!(config.search.base_url, "https://api.edamam.com/api/recipes/v2");
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
            server:
              addr: "0.0.0.0:8000"
            search:
              timeout_secs: 3
        "#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.server.addr, "0.0.0.0:8000");
        assert_eq!(config.server.static_dir, "static");
        assert_eq!(config.search.timeout_secs, 3);
        assert_eq!(config.database.path, "recipereview.db");
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database:\n  path: /tmp/reviews.db").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.database.path, "/tmp/reviews.db");
    }

    #[test]
    fn test_invalid_yaml() {
        let result = Config::from_yaml_str("reviews: [not, a, map]");
        assert!(matches!(result, Err(ConfigError::YAMLError(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("EDAMAM_APP_ID", "id-123"),
            ("EDAMAM_APP_KEY", "key-456"),
            ("RECIPEREVIEW_DATABASE", ":memory:"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.search.app_id, "id-123");
        assert_eq!(config.search.app_key, "key-456");
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.server.addr, "127.0.0.1:3004");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.reviews.page_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.auth.bcrypt_cost = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bcrypt_cost"));
    }
}
