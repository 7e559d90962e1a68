// Application Configuration
// Defaults, then an optional TOML file, then `.env` and the process environment

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ============================================================================
// App Constants
// ============================================================================

/// Application identifier used for the data directory
pub const APP_IDENTIFIER: &str = "com.chatbi.ChatBI";

/// Config file name inside the data directory
pub const CONFIG_FILE: &str = "config.toml";

/// Workflow API base URL used when none is configured
pub const DEFAULT_DIFY_API_URL: &str = "https://api.dify.ai";

/// End-user identifier sent with the application's data queries
pub const DEFAULT_QUERY_USER: &str = "user-001";

/// Request timeout for the application's workflow client
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

pub const ENV_CONFIG_PATH: &str = "CHATBI_CONFIG";
pub const ENV_DIFY_API_URL: &str = "DIFY_API_URL";
pub const ENV_DIFY_API_KEY: &str = "DIFY_API_KEY";
pub const ENV_USER: &str = "CHATBI_USER";
pub const ENV_TIMEOUT_MS: &str = "CHATBI_TIMEOUT_MS";
pub const ENV_DB_PATH: &str = "CHATBI_DB_PATH";

/// Get the application data directory
pub fn get_app_data_dir() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|p| p.join(APP_IDENTIFIER))
        .ok_or_else(|| "Could not determine application data directory".to_string())
}

/// Read an environment variable, ignoring blank values
pub fn read_env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// AppConfig
// ============================================================================

/// Resolved application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    /// Workflow API base URL; unset means no external endpoint
    pub dify_api_url: Option<String>,
    /// Workflow API key
    #[serde(skip_serializing)]
    pub dify_api_key: Option<String>,
    /// End-user identifier for data queries
    pub user: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// SQLite database location; unset means the data directory
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dify_api_url: None,
            dify_api_key: None,
            user: DEFAULT_QUERY_USER.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from every source
    pub fn load() -> Result<Self, String> {
        let _ = dotenvy::from_filename("../.env").or_else(|_| dotenvy::dotenv());

        let mut config = match read_env_trimmed(ENV_CONFIG_PATH) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => match get_app_data_dir() {
                Ok(dir) if dir.join(CONFIG_FILE).exists() => {
                    Self::from_file(&dir.join(CONFIG_FILE))?
                }
                _ => Self::default(),
            },
        };

        config.apply_env(read_env_trimmed);
        Ok(config)
    }

    /// Load a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        log::debug!("[config] Loaded {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse TOML content; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let mut config: AppConfig =
            toml::from_str(content).map_err(|e| format!("Invalid config file: {}", e))?;
        config.dify_api_url = normalize(config.dify_api_url.take());
        config.dify_api_key = normalize(config.dify_api_key.take());
        if config.user.trim().is_empty() {
            config.user = DEFAULT_QUERY_USER.to_string();
        }
        Ok(config)
    }

    /// Overlay values from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DIFY_API_URL) {
            self.dify_api_url = Some(url);
        }
        if let Some(key) = lookup(ENV_DIFY_API_KEY) {
            self.dify_api_key = Some(key);
        }
        if let Some(user) = lookup(ENV_USER) {
            self.user = user;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout_ms = ms,
                _ => log::warn!("[config] Ignoring invalid {}: {}", ENV_TIMEOUT_MS, raw),
            }
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }
    }

    /// True when both an external endpoint and a key are configured
    pub fn has_external_workflow(&self) -> bool {
        self.dify_api_url.is_some() && self.dify_api_key.is_some()
    }

    /// Base URL for the workflow client
    pub fn workflow_base_url(&self) -> &str {
        self.dify_api_url.as_deref().unwrap_or(DEFAULT_DIFY_API_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.user, "user-001");
        assert_eq!(config.timeout_ms, 60_000);
        assert!(!config.has_external_workflow());
        assert_eq!(config.workflow_base_url(), "https://api.dify.ai");
    }

    #[test]
    fn test_toml_partial_and_blank_values() {
        let config = AppConfig::from_toml_str(
            r#"
            dify_api_url = "http://localhost:5001"
            dify_api_key = "   "
            timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.dify_api_url.as_deref(), Some("http://localhost:5001"));
        assert!(config.dify_api_key.is_none());
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.user, "user-001");
        assert!(!config.has_external_workflow());
    }

    #[test]
    fn test_invalid_toml() {
        let err = AppConfig::from_toml_str("timeout_ms = \"soon\"").unwrap_err();
        assert!(err.starts_with("Invalid config file"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::from_toml_str("user = \"from-file\"").unwrap();
        config.apply_env(lookup_from(&[
            (ENV_DIFY_API_URL, "https://dify.example.com"),
            (ENV_DIFY_API_KEY, "app-key"),
            (ENV_USER, "from-env"),
            (ENV_DB_PATH, "/tmp/chat.db"),
        ]));

        assert!(config.has_external_workflow());
        assert_eq!(config.user, "from-env");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/chat.db")));
    }

    #[test]
    fn test_invalid_timeout_env_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(lookup_from(&[(ENV_TIMEOUT_MS, "0")]));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);

        config.apply_env(lookup_from(&[(ENV_TIMEOUT_MS, "abc")]));
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);

        config.apply_env(lookup_from(&[(ENV_TIMEOUT_MS, "2500")]));
        assert_eq!(config.timeout_ms, 2500);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "dify_api_key = \"secret\"\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.dify_api_key.as_deref(), Some("secret"));

        let serialized = toml::to_string(&config).unwrap();
        assert!(!serialized.contains("secret"));

        assert!(AppConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }
}
