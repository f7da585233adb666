use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use super::Config;
use crate::error::{BriefError, Result};

/// The two persisted settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SettingKey {
    ApiKey,
    Model,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::ApiKey, SettingKey::Model];

    /// Name the value is stored under
    pub fn storage_name(&self) -> &'static str {
        match self {
            SettingKey::ApiKey => "apiKeyValue",
            SettingKey::Model => "modelValue",
        }
    }

    /// Dotted path inside the config file
    pub fn config_key(&self) -> &'static str {
        match self {
            SettingKey::ApiKey => "groq.api_key",
            SettingKey::Model => "groq.model",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

impl FromStr for SettingKey {
    type Err = BriefError;

    fn from_str(s: &str) -> Result<Self> {
        SettingKey::ALL
            .into_iter()
            .find(|k| k.storage_name() == s || k.config_key() == s)
            .ok_or_else(|| BriefError::ConfigError(format!("Unknown setting: {}", s)))
    }
}

pub type Settings = BTreeMap<SettingKey, String>;

/// Key-value persistence for the credential settings. Last write wins per key.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored values; absent keys are omitted from the mapping.
    fn get(&self, keys: &[SettingKey]) -> Result<Settings>;

    /// Writes each given key independently.
    fn set(&self, values: Settings) -> Result<()>;
}

/// Settings backed by the TOML config file
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Self {
        Self::new(Config::config_path())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, keys: &[SettingKey]) -> Result<Settings> {
        let config = Config::load_from(&self.path)?;
        let mut found = Settings::new();
        for key in keys {
            if let Some(value) = config.get_value(key.config_key())? {
                found.insert(*key, value);
            }
        }
        Ok(found)
    }

    fn set(&self, values: Settings) -> Result<()> {
        let mut config = Config::load_file(&self.path)?;
        for (key, value) in &values {
            config.set_value(key.config_key(), value)?;
        }
        config.save_to(&self.path)?;
        tracing::debug!("Saved {} setting(s) to {}", values.len(), self.path.display());
        Ok(())
    }
}

/// In-process settings, used when nothing should touch the disk
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(values: Settings) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, keys: &[SettingKey]) -> Result<Settings> {
        let values = self
            .values
            .lock()
            .map_err(|_| BriefError::Other("settings lock poisoned".to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| values.get(k).map(|v| (*k, v.clone())))
            .collect())
    }

    fn set(&self, updates: Settings) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| BriefError::Other("settings lock poisoned".to_string()))?;
        values.extend(updates);
        Ok(())
    }
}

/// API key and model as entered by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub model: Option<String>,
}

impl Credentials {
    /// Read both settings once
    pub fn load(store: &dyn SettingsStore) -> Result<Self> {
        let mut settings = store.get(&SettingKey::ALL)?;
        Ok(Self {
            api_key: settings.remove(&SettingKey::ApiKey).unwrap_or_default(),
            model: settings.remove(&SettingKey::Model),
        })
    }

    /// Apply one-off overrides (command-line flags) on top of stored values
    pub fn with_overrides(mut self, api_key: Option<&str>, model: Option<&str>) -> Self {
        if let Some(key) = api_key {
            self.api_key = key.to_string();
        }
        if let Some(model) = model {
            self.model = Some(model.to_string());
        }
        self
    }
}
