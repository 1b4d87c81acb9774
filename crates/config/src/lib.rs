//! Configuration loading, validation, and management for attachkit.
//!
//! Loads configuration from `~/.attachkit/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use attachkit_core::FileLimitSource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default folder searched for instruction files.
pub const DEFAULT_INSTRUCTIONS_LOCATION: &str = ".github/prompts";

/// Default instruction file extension.
pub const DEFAULT_INSTRUCTIONS_EXTENSION: &str = ".prompt.md";

/// The root configuration structure.
///
/// Maps directly to `~/.attachkit/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// File attachment limits
    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// Instruction file discovery
    #[serde(default)]
    pub instructions: InstructionsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Maximum number of concurrently attached files. 0 disables file
    /// attachments entirely (everything is queued).
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_max_files() -> usize {
    10
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
        }
    }
}

impl FileLimitSource for AttachmentsConfig {
    fn file_limit(&self) -> usize {
        self.max_files
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Folders (relative to each workspace root) holding instruction files.
    ///
    /// Kept as a raw value: users write a string, a list, or something
    /// invalid, and [`InstructionsConfig::locations`] normalizes all three.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<toml::Value>,

    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_true() -> bool {
    true
}
fn default_extension() -> String {
    DEFAULT_INSTRUCTIONS_EXTENSION.into()
}

impl Default for InstructionsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locations: None,
            extension: default_extension(),
        }
    }
}

impl InstructionsConfig {
    /// Effective instruction locations.
    ///
    /// Falls back to [`DEFAULT_INSTRUCTIONS_LOCATION`] when the value is
    /// missing, has the wrong type, or holds no usable strings.
    pub fn locations(&self) -> Vec<String> {
        let configured: Vec<String> = match &self.locations {
            Some(toml::Value::String(s)) => vec![s.trim().to_string()],
            Some(toml::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_string())
                .collect(),
            Some(other) => {
                tracing::info!(
                    value_type = other.type_str(),
                    "Ignoring instructions.locations of unsupported type"
                );
                Vec::new()
            }
            None => Vec::new(),
        };

        let configured: Vec<String> = configured.into_iter().filter(|s| !s.is_empty()).collect();
        if configured.is_empty() {
            vec![DEFAULT_INSTRUCTIONS_LOCATION.to_string()]
        } else {
            configured
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.attachkit/config.toml).
    ///
    /// Environment overrides:
    /// - `ATTACHKIT_CONFIG_DIR` replaces the config directory
    /// - `ATTACHKIT_MAX_FILES` replaces `attachments.max_files`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(raw) = std::env::var("ATTACHKIT_MAX_FILES") {
            match raw.trim().parse::<usize>() {
                Ok(limit) => config.attachments.max_files = limit,
                Err(_) => tracing::warn!(value = %raw, "Ignoring unparsable ATTACHKIT_MAX_FILES"),
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        match std::env::var("ATTACHKIT_CONFIG_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs_home().join(".attachkit"),
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.instructions.extension;
        if ext.len() < 2 || !ext.starts_with('.') {
            return Err(ConfigError::ValidationError(format!(
                "instructions.extension must start with '.' and name an extension, got '{ext}'"
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.instructions.locations = Some(toml::Value::Array(vec![toml::Value::String(
            DEFAULT_INSTRUCTIONS_LOCATION.into(),
        )]));
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
