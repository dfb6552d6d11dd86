//! Configuration Management
//!
//! Handles persistent configuration storage for halyard.

use crate::resource::{RequestProfile, SignalingConfig, DEFAULT_TAG};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// API root used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Root URL of the Halyard API
    #[serde(default)]
    pub base_url: Option<String>,
    /// Identifier sent when creating instances with signaling enabled
    #[serde(default)]
    pub user_id: Option<String>,
    /// Tags applied to created instances and images
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Signaling server passed to new instances
    #[serde(default)]
    pub signaling: Option<SignalingConfig>,
    /// Base image branch for new instances
    #[serde(default)]
    pub branch: Option<String>,
    /// Base image build target for new instances
    #[serde(default)]
    pub target: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("halyard").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_at(Self::config_path().as_deref())
    }

    fn save_at(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => self.save_to(path),
            None => anyhow::bail!("No configuration directory available on this system"),
        }
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Get effective base URL (config > default)
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Get effective signaling server (config > build-time env > disabled)
    pub fn effective_signaling(&self) -> Option<SignalingConfig> {
        self.signaling
            .clone()
            .or_else(SignalingConfig::from_build_env)
    }

    /// Get effective tags (config > default tag)
    pub fn effective_tags(&self) -> Vec<String> {
        match &self.tags {
            Some(tags) if !tags.is_empty() => tags.clone(),
            _ => vec![DEFAULT_TAG.to_string()],
        }
    }

    /// Build the request profile new clients are created with
    pub fn request_profile(&self) -> RequestProfile {
        RequestProfile {
            tags: self.effective_tags(),
            signaling: self.effective_signaling(),
            branch: self.branch.clone(),
            target: self.target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("halyard-config-test-{}-{}", name, uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.effective_tags(), vec!["kradtke-ssh".to_string()]);
    }

    #[test]
    fn test_empty_tags_fall_back_to_default() {
        let config = Config {
            tags: Some(vec![]),
            ..Config::default()
        };
        assert_eq!(config.effective_tags(), vec![DEFAULT_TAG.to_string()]);
    }

    #[test]
    fn test_configured_signaling_wins() {
        let config = Config {
            signaling: Some(SignalingConfig::new("192.168.1.10", "8444")),
            ..Config::default()
        };
        let profile = config.request_profile();
        assert_eq!(
            profile.signaling,
            Some(SignalingConfig::new("192.168.1.10", "8444"))
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = temp_config_path("roundtrip");
        let config = Config {
            base_url: Some("http://halyard.internal:8080/".to_string()),
            user_id: Some("00042".to_string()),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_save_without_config_dir_fails() {
        let err = Config::default().save_at(None).unwrap_err();
        assert!(err.to_string().contains("No configuration directory"));

        let path = temp_config_path("save-at");
        Config::default().save_at(Some(&path)).unwrap();
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_or_corrupt_file_yields_default() {
        let path = temp_config_path("corrupt");
        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = serde_json::from_str(r#"{"user_id": "00001"}"#).unwrap();
        assert_eq!(config.user_id.as_deref(), Some("00001"));
        assert!(config.base_url.is_none());
        assert!(config.signaling.is_none());
    }
}
