use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::completion::CompletionSettings;
use crate::core::conversation::DEFAULT_INSTRUCTION;
use crate::core::error::DynError;

/// Bump this when adding new fields with non-trivial defaults.
/// When a loaded config has a lower version, it is re-saved to disk
/// so that users see the new keys in their `config.toml`.
const CURRENT_CONFIG_VERSION: u32 = 1;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const KNOWN_MODELS: [&str; 4] = [
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
];

const TEMPERATURE_RANGE: (f32, f32) = (0.0, 2.0);
const MAX_TOKENS_RANGE: (u32, u32) = (256, 8192);

fn default_temperature() -> f32 {
    1.0
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_llm_response_timeout_ms() -> u64 {
    180_000
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub config_version: u32,
    pub api_key: Option<String>,
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
    #[serde(default = "default_llm_response_timeout_ms")]
    pub llm_response_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_version: 0,
            api_key: None,
            model: Some(DEFAULT_MODEL.to_string()),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: None,
            llm_response_timeout_ms: default_llm_response_timeout_ms(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

impl Settings {
    fn global_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".skinchat")
    }

    pub fn global_config_path() -> PathBuf {
        Self::global_config_dir().join("config.toml")
    }

    pub fn load_global() -> Self {
        Self::load_from(&Self::global_config_path())
    }

    fn current_defaults() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION,
            ..Self::default()
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::current_defaults();
        }

        // An unreadable or unparsable file is left as-is; only a clean parse
        // of an older version is migrated on disk.
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Failed to read {}: {e}. Using defaults.", path.display());
                return Self::current_defaults();
            }
        };
        let mut settings: Self = match toml::from_str(&content) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to parse {}: {e}. Using defaults.", path.display());
                return Self::current_defaults();
            }
        };

        // Re-save when config is from an older version so new fields
        // (with their defaults) appear in the file on disk.
        if settings.config_version < CURRENT_CONFIG_VERSION {
            settings.config_version = CURRENT_CONFIG_VERSION;
            if let Err(e) = settings.save_to(path) {
                log::warn!("Failed to migrate config to v{CURRENT_CONFIG_VERSION}: {e}");
            }
        }
        settings
    }

    pub fn save(&self) -> Result<(), DynError> {
        self.save_to(&Self::global_config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), DynError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, &content)?;
        Ok(())
    }

    /// An empty key clears the stored one.
    pub fn set_api_key(&mut self, key: &str) {
        self.api_key = non_empty(Some(key));
    }

    /// Stored key, else `GEMINI_API_KEY`.
    pub fn chat_api_key(&self) -> Option<String> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok().as_deref())
    }

    fn api_key_with_env(&self, env_value: Option<&str>) -> Option<String> {
        non_empty(self.api_key.as_deref()).or_else(|| non_empty(env_value))
    }

    pub fn model(&self) -> String {
        non_empty(self.model.as_deref()).unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn set_model(&mut self, model: &str) -> Result<(), String> {
        let model = model.trim();
        if !KNOWN_MODELS.contains(&model) {
            return Err(format!(
                "Unknown model '{}'. Choose one of: {}",
                model,
                KNOWN_MODELS.join(", ")
            ));
        }
        self.model = Some(model.to_string());
        Ok(())
    }

    pub fn temperature(&self) -> f32 {
        if self.temperature.is_nan() {
            return default_temperature();
        }
        self.temperature
            .clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1)
    }

    pub fn set_temperature(&mut self, value: f32) -> Result<(), String> {
        if !value.is_finite() {
            return Err("Temperature must be a number".to_string());
        }
        self.temperature = value.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1);
        Ok(())
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.clamp(MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1)
    }

    pub fn set_max_tokens(&mut self, value: u32) {
        self.max_tokens = value.clamp(MAX_TOKENS_RANGE.0, MAX_TOKENS_RANGE.1);
    }

    pub fn system_prompt(&self) -> String {
        non_empty(self.system_prompt.as_deref()).unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string())
    }

    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.system_prompt = non_empty(Some(prompt));
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            api_key: self.chat_api_key(),
            model: self.model(),
            temperature: self.temperature(),
            max_output_tokens: self.max_tokens(),
            response_timeout: Duration::from_millis(self.llm_response_timeout_ms.max(1)),
        }
    }
}
