//! Configuration loading and validation for Promptloom.
//!
//! Loads a TOML file, applies environment-variable overrides, and validates
//! all settings before anything runs. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {message}")]
    Validation { message: String },
}

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Global prompt budget settings
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Conversation history store settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Condensation engine settings
    #[serde(default)]
    pub condenser: CondenserConfig,

    /// Prompt assembly settings
    #[serde(default)]
    pub assembly: AssemblyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum tokens for a fully assembled prompt.
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: default_max_prompt_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Token ceiling for the stored conversation history.
    #[serde(default = "default_history_max_tokens")]
    pub max_tokens: usize,

    /// Exempt system messages from storage-time eviction.
    #[serde(default)]
    pub protect_system: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_history_max_tokens(),
            protect_system: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondenserConfig {
    /// Summarizer output above `target × overshoot_factor` is discarded.
    #[serde(default = "default_overshoot_factor")]
    pub overshoot_factor: f32,

    /// Characters per token for the first truncation pass.
    #[serde(default = "default_truncate_ratio")]
    pub truncate_chars_per_token: f32,

    /// Characters per token for the final hard cut.
    #[serde(default = "default_hard_cut_ratio")]
    pub hard_cut_chars_per_token: f32,
}

impl Default for CondenserConfig {
    fn default() -> Self {
        Self {
            overshoot_factor: default_overshoot_factor(),
            truncate_chars_per_token: default_truncate_ratio(),
            hard_cut_chars_per_token: default_hard_cut_ratio(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyConfig {
    /// Component keys in descending priority.
    #[serde(default = "default_priority_order")]
    pub priority_order: Vec<String>,

    /// Keys truncated (rather than omitted) when first and over budget.
    #[serde(default = "default_critical_keys")]
    pub critical_keys: Vec<String>,

    /// Characters per token for assembly-side truncation.
    #[serde(default = "default_assembly_truncate_ratio")]
    pub truncate_chars_per_token: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            priority_order: default_priority_order(),
            critical_keys: default_critical_keys(),
            truncate_chars_per_token: default_assembly_truncate_ratio(),
        }
    }
}

fn default_max_prompt_tokens() -> usize {
    4096
}
fn default_history_max_tokens() -> usize {
    1024
}
fn default_overshoot_factor() -> f32 {
    1.2
}
fn default_truncate_ratio() -> f32 {
    3.5
}
fn default_hard_cut_ratio() -> f32 {
    3.0
}
fn default_assembly_truncate_ratio() -> usize {
    3
}
fn default_priority_order() -> Vec<String> {
    vec![
        "user_query".into(),
        "system_message".into(),
        "task_instructions".into(),
        "history".into(),
        "retrieved_knowledge".into(),
    ]
}
fn default_critical_keys() -> Vec<String> {
    vec!["user_query".into(), "system_message".into()]
}

impl AppConfig {
    /// Load from a TOML file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Defaults plus environment overrides, for when no file is given.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse from a TOML string (no overrides), mainly for tests.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_usize("PROMPTLOOM_MAX_PROMPT_TOKENS") {
            self.budget.max_prompt_tokens = v;
        }
        if let Some(v) = env_usize("PROMPTLOOM_HISTORY_MAX_TOKENS") {
            self.history.max_tokens = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.budget.max_prompt_tokens == 0 {
            return Err(validation("budget.max_prompt_tokens must be positive"));
        }
        if self.history.max_tokens == 0 {
            return Err(validation("history.max_tokens must be positive"));
        }
        if self.condenser.overshoot_factor < 1.0 {
            return Err(validation("condenser.overshoot_factor must be >= 1.0"));
        }
        if self.condenser.truncate_chars_per_token <= 0.0
            || self.condenser.hard_cut_chars_per_token <= 0.0
        {
            return Err(validation("condenser character ratios must be positive"));
        }
        if self.condenser.hard_cut_chars_per_token > self.condenser.truncate_chars_per_token {
            return Err(validation(
                "condenser.hard_cut_chars_per_token must not exceed truncate_chars_per_token",
            ));
        }
        if self.assembly.priority_order.is_empty() {
            return Err(validation("assembly.priority_order must not be empty"));
        }
        if self.assembly.truncate_chars_per_token == 0 {
            return Err(validation(
                "assembly.truncate_chars_per_token must be positive",
            ));
        }
        for key in &self.assembly.critical_keys {
            if !self.assembly.priority_order.contains(key) {
                warn!(key = %key, "critical key not present in priority_order");
            }
        }
        Ok(())
    }
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn env_usize(name: &str) -> Option<usize> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(name, %raw, "ignoring unparseable environment override");
                None
            }
        },
        Err(_) => None,
    }
}
