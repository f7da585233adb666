mod settings;

pub use settings::{
    Credentials, FileSettingsStore, MemorySettingsStore, SettingKey, Settings, SettingsStore,
};

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{BriefError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion API configuration
    #[serde(default)]
    pub groq: GroqConfig,

    /// Browser configuration
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroqConfig {
    /// Bearer token for the completion endpoint
    pub api_key: Option<String>,

    /// Model identifier, falls back to the built-in default when unset
    pub model: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (transport default when unset)
    pub timeout_secs: Option<u64>,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Browser executable path (overrides auto-discovery)
    pub executable: Option<String>,

    /// Remote debugging port
    #[serde(default = "default_cdp_port")]
    pub cdp_port: u16,

    /// Launch headless
    #[serde(default)]
    pub headless: bool,

    /// User data directory for launched browsers
    pub user_data_dir: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            cdp_port: default_cdp_port(),
            headless: false,
            user_data_dir: None,
        }
    }
}

fn default_cdp_port() -> u16 {
    9222
}

impl Config {
    /// Load configuration from all sources (defaults, file, env)
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific file, then the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // TABBRIEF_GROQ__API_KEY -> groq.api_key
            .merge(Env::prefixed("TABBRIEF_").split("__"))
            .extract()
            .map_err(|e| BriefError::ConfigError(e.to_string()))
    }

    /// Load only what is persisted on disk, so saving never captures env overrides
    pub fn load_file(path: &Path) -> Result<Self> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| BriefError::ConfigError(e.to_string()))
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tabbrief")
            .join("config.toml")
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| BriefError::ConfigError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set a value by dotted key
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "groq.api_key" | "apiKeyValue" => self.groq.api_key = non_empty(value),
            "groq.model" | "modelValue" => self.groq.model = non_empty(value),
            "groq.base_url" => self.groq.base_url = value.trim().to_string(),
            "groq.timeout_secs" => {
                self.groq.timeout_secs = match value.trim() {
                    "" => None,
                    v => Some(v.parse().map_err(|_| {
                        BriefError::ConfigError("timeout_secs must be a number".to_string())
                    })?),
                }
            }
            "browser.executable" => self.browser.executable = non_empty(value),
            "browser.cdp_port" => {
                self.browser.cdp_port = value.trim().parse().map_err(|_| {
                    BriefError::ConfigError("cdp_port must be a port number".to_string())
                })?
            }
            "browser.headless" => {
                self.browser.headless = value.trim().parse().map_err(|_| {
                    BriefError::ConfigError("headless must be true or false".to_string())
                })?
            }
            "browser.user_data_dir" => self.browser.user_data_dir = non_empty(value),
            _ => {
                return Err(BriefError::ConfigError(format!(
                    "Unknown config key: {}",
                    key
                )))
            }
        }
        Ok(())
    }

    /// Get a value by dotted key
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value = match key {
            "groq.api_key" | "apiKeyValue" => self.groq.api_key.clone(),
            "groq.model" | "modelValue" => self.groq.model.clone(),
            "groq.base_url" => Some(self.groq.base_url.clone()),
            "groq.timeout_secs" => self.groq.timeout_secs.map(|t| t.to_string()),
            "browser.executable" => self.browser.executable.clone(),
            "browser.cdp_port" => Some(self.browser.cdp_port.to_string()),
            "browser.headless" => Some(self.browser.headless.to_string()),
            "browser.user_data_dir" => self.browser.user_data_dir.clone(),
            _ => {
                return Err(BriefError::ConfigError(format!(
                    "Unknown config key: {}",
                    key
                )))
            }
        };
        Ok(value)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
