use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub links: LinkConfig,
    pub documents: DocumentConfig,
}

/// Shareable approval link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Base URL under which approval share links are served.
    pub base_url: String,
}

/// Document version housekeeping configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Number of draft versions kept per campaign during cleanup.
    pub keep_draft_versions: usize,
    /// Maximum number of versions returned by a history read.
    pub history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            links: LinkConfig::default(),
            documents: DocumentConfig::default(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            keep_draft_versions: 3,
            history_limit: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/pressgate/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse config at {}: {e} — using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file at {} — using defaults",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("pressgate").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.links.base_url, "http://localhost:3000");
        assert_eq!(config.documents.keep_draft_versions, 3);
        assert_eq!(config.documents.history_limit, 50);
    }

    #[test]
    fn test_config_load_missing_file() {
        // Should return defaults without panicking
        let config = AppConfig::load();
        assert_eq!(config.documents.keep_draft_versions, 3);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.links.base_url, config.links.base_url);
    }
}
