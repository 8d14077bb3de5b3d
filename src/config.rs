use crate::transport::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub anthropic_api_key: Option<String>,
    pub max_attempts: u32,
    /// Whether session records are written at all.
    pub auto_save: bool,
    /// Overrides `~/.patrick-logs`.
    pub log_dir: Option<PathBuf>,
    pub model: String,
    pub max_tokens: u32,
    pub use_mock: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            auto_save: true,
            log_dir: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            use_mock: false,
        }
    }
}

impl Config {
    /// Load configuration from file, environment variables, or create default
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads the file at `path`, falling back to defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file found, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Environment variables override the config file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            self.anthropic_api_key = Some(api_key);
        }
        if lookup("PATRICK_USE_MOCK").is_some() {
            self.use_mock = true;
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf> {
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".patrick"))
    }

    /// Directory session records are written to.
    pub fn log_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.log_dir {
            return Ok(dir.clone());
        }
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".patrick-logs"))
    }

    /// Returns the API key, ignoring blank values.
    pub fn get_api_key(&self) -> Option<&str> {
        self.anthropic_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    pub fn show_config_info(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());
        println!(
            "Status: {}",
            if config_path.exists() {
                "Found"
            } else {
                "Not found (using defaults)"
            }
        );
        println!(
            "API Key: {}",
            if self.get_api_key().is_some() { "Set" } else { "Not set" }
        );
        println!("Max attempts: {}", self.max_attempts);
        println!("Auto save: {}", self.auto_save);
        println!("Log directory: {}", self.log_dir()?.display());
        println!("Model: {}", self.model);
        println!("Mock mode: {}", self.use_mock);

        println!("\nTo set API key:");
        println!("  patrick config --set-api-key <your-key>");
        println!("\nOr set environment variable:");
        println!("  export ANTHROPIC_API_KEY=<your-key>");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_attempts, 5);
        assert!(config.auto_save);
        assert!(config.get_api_key().is_none());
        assert_eq!(config.model, "claude-sonnet-4-20250514");
        assert_eq!(config.max_tokens, 1500);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_attempts = 3\nauto_save = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.max_attempts, 3);
        assert!(!config.auto_save);
        assert_eq!(config.max_tokens, 1500);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_attempts = \"many\"").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let config = Config {
            anthropic_api_key: Some("sk-ant-test".to_string()),
            max_attempts: 7,
            log_dir: Some(temp.path().join("logs")),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_env_api_key_overrides_file() {
        let mut config = Config {
            anthropic_api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        config.apply_env(env(&[("ANTHROPIC_API_KEY", "from-env")]));
        assert_eq!(config.get_api_key(), Some("from-env"));
    }

    #[test]
    fn test_empty_env_api_key_is_ignored() {
        let mut config = Config {
            anthropic_api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        config.apply_env(env(&[("ANTHROPIC_API_KEY", "")]));
        assert_eq!(config.get_api_key(), Some("from-file"));
    }

    #[test]
    fn test_env_enables_mock_mode() {
        let mut config = Config::default();
        config.apply_env(env(&[("PATRICK_USE_MOCK", "1")]));
        assert!(config.is_mock_mode());
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = Config {
            anthropic_api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert!(config.get_api_key().is_none());
    }

    #[test]
    fn test_log_dir_override() {
        let config = Config {
            log_dir: Some(PathBuf::from("/tmp/patrick-logs-test")),
            ..Config::default()
        };
        assert_eq!(config.log_dir().unwrap(), PathBuf::from("/tmp/patrick-logs-test"));
    }
}
