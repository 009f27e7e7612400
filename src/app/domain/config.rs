use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::infrastructure::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Quiet period before a burst of edits is written to the store.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Undo steps kept in memory.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Language assigned to uploads without a recognizable suffix.
    #[serde(default = "default_fallback_language")]
    pub fallback_language: String,

    /// Override for the project database location.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

fn default_save_debounce_ms() -> u64 {
    1000
}

fn default_max_history() -> usize {
    50
}

fn default_fallback_language() -> String {
    "en".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: default_save_debounce_ms(),
            max_history: default_max_history(),
            fallback_language: default_fallback_language(),
            store_path: None,
        }
    }
}

impl AppConfig {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Database path: the configured override or the platform data dir.
    pub fn resolved_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push("shotstudio");
            path.push("projects.sqlite3");
            path
        })
    }

    /// Load config from disk, or create default if not exists
    pub fn load() -> Self {
        Self::load_from(&Self::get_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to parse config {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                let default = Self::default();
                if let Err(e) = default.save_to(path) {
                    log::debug!("Could not write default config: {}", e);
                }
                default
            }
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.save_to(&Self::get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Get config file path (cross-platform)
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("shotstudio");
        path.push("config.json");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.save_debounce_ms, 1000);
        assert_eq!(config.save_debounce(), Duration::from_secs(1));
        assert_eq!(config.max_history, 50);
        assert_eq!(config.fallback_language, "en");
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{"max_history": 10}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_history, 10);
        assert_eq!(config.save_debounce_ms, 1000);
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig::load_from(&path);
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = AppConfig {
            fallback_language: "de".into(),
            store_path: Some(dir.path().join("db.sqlite3")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        let loaded = AppConfig::load_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.resolved_store_path(), dir.path().join("db.sqlite3"));
    }
}
