//! Configuration Management
//!
//! Handles persistent configuration storage for boxmeta.

use crate::api::client::DEFAULT_BASE_URL;
use crate::api::error::{Error, Result};
use crate::metadata::template::ENTERPRISE_SCOPE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the API root
pub const BASE_URL_ENV_VAR: &str = "BOX_API_BASE_URL";

/// Keys accepted by [`Config::set`] and [`Config::unset`]
pub const CONFIG_KEYS: &[&str] = &["access_token", "base_url", "default_scope"];

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Access token used when none is given on the command line or environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// API root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Scope used for template commands
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_scope: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("boxmeta").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from(&path)
    }

    /// Load configuration from a specific file; missing or unreadable files
    /// yield the defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| Error::Config("no configuration directory on this system".to_string()))?;

        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Cannot create {:?}: {}", parent, e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Cannot write {:?}: {}", path, e)))?;

        Ok(())
    }

    /// Get effective API root (env > config > default)
    pub fn effective_base_url(&self) -> String {
        std::env::var(BASE_URL_ENV_VAR)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Get effective template scope (config > enterprise)
    pub fn effective_scope(&self) -> String {
        self.default_scope
            .clone()
            .unwrap_or_else(|| ENTERPRISE_SCOPE.to_string())
    }

    /// Set one value by key. Does not save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidInput(format!("'{}' must not be empty", key)));
        }

        match key {
            "access_token" => self.access_token = Some(value.to_string()),
            "base_url" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| Error::InvalidInput(format!("invalid base_url '{}': {}", value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(Error::InvalidInput(format!(
                        "base_url must be http or https, got '{}'",
                        parsed.scheme()
                    )));
                }
                self.base_url = Some(value.trim_end_matches('/').to_string());
            }
            "default_scope" => self.default_scope = Some(value.to_string()),
            _ => return Err(unknown_key(key)),
        }

        Ok(())
    }

    /// Clear one value by key. Does not save.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        match key {
            "access_token" => self.access_token = None,
            "base_url" => self.base_url = None,
            "default_scope" => self.default_scope = None,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Copy with the access token masked, for display
    pub fn redacted(&self) -> Self {
        Self {
            access_token: self.access_token.as_ref().map(|_| "[REDACTED]".to_string()),
            ..self.clone()
        }
    }
}

fn unknown_key(key: &str) -> Error {
    Error::InvalidInput(format!(
        "unknown config key '{}' (expected one of: {})",
        key,
        CONFIG_KEYS.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_scope(), "enterprise");
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = serde_json::from_str(r#"{"default_scope": "enterprise_67890"}"#).unwrap();
        assert_eq!(config.effective_scope(), "enterprise_67890");
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("boxmeta-missing-config-test.json");
        let _ = std::fs::remove_file(&path);
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("boxmeta-config-test-{}", std::process::id()));
        let path = dir.join("config.json");

        let config = Config {
            access_token: None,
            base_url: Some("http://localhost:9000/2.0".to_string()),
            default_scope: Some("enterprise_1".to_string()),
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_set_and_unset() {
        let mut config = Config::default();
        config.set("default_scope", "enterprise_67890").unwrap();
        config.set("base_url", "http://localhost:9000/2.0/").unwrap();
        config.set("access_token", "abc123").unwrap();

        assert_eq!(config.effective_scope(), "enterprise_67890");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:9000/2.0"));
        assert_eq!(config.access_token.as_deref(), Some("abc123"));

        config.unset("access_token").unwrap();
        assert!(config.access_token.is_none());
        assert_eq!(config.effective_scope(), "enterprise_67890");
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = Config::default();
        assert!(matches!(config.set("colour", "blue"), Err(Error::InvalidInput(_))));
        assert!(matches!(config.unset("colour"), Err(Error::InvalidInput(_))));
        assert!(matches!(config.set("base_url", "not a url"), Err(Error::InvalidInput(_))));
        assert!(matches!(config.set("base_url", "ftp://example.com"), Err(Error::InvalidInput(_))));
        assert!(matches!(config.set("default_scope", "  "), Err(Error::InvalidInput(_))));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_then_save_persists() {
        let dir = std::env::temp_dir().join(format!("boxmeta-config-set-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = Config::load_from(&path);
        config.set("default_scope", "enterprise_1").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path);
        assert_eq!(reloaded.default_scope.as_deref(), Some("enterprise_1"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_redacted_hides_token() {
        let config = Config {
            access_token: Some("secret".to_string()),
            base_url: None,
            default_scope: Some("enterprise".to_string()),
        };
        let shown = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("[REDACTED]"));
        assert!(shown.contains("enterprise"));
    }
}
