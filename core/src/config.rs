use crate::conversation::ContextPolicy;
use crate::errors::{DoctorError, DoctorResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Models offered by the model picker
pub const AVAILABLE_MODELS: [&str; 3] = ["gemini-1.0-pro", "gemini-1.5-pro", "gemini-1.5-flash"];

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Configuration for the assistant and the hospital finder.
///
/// The API key is deliberately absent: it is supplied per session and never written to disk.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DoctorConfig {
    pub model_name: Option<String>,
    pub gemini_base_url: Option<String>,
    pub overpass_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub max_context_turns: Option<usize>,
    pub max_context_chars: Option<usize>,
    pub default_latitude: Option<f64>,
    pub default_longitude: Option<f64>,
    pub default_radius_meters: Option<u32>,
    pub log_level: Option<String>,
}

impl Default for DoctorConfig {
    fn default() -> Self {
        Self {
            model_name: Some(DEFAULT_MODEL.to_string()),
            gemini_base_url: Some(DEFAULT_GEMINI_BASE_URL.to_string()),
            overpass_url: Some(DEFAULT_OVERPASS_URL.to_string()),
            request_timeout_secs: Some(60),
            max_context_turns: Some(40),
            max_context_chars: Some(32_000),
            default_latitude: Some(37.7749),
            default_longitude: Some(-122.4194),
            default_radius_meters: Some(5000),
            log_level: Some("warn".to_string()),
        }
    }
}

impl DoctorConfig {
    /// Loads configuration from a file if it exists, otherwise returns the default config
    pub fn load_from_file(path: &Path) -> DoctorResult<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                DoctorError::ConfigError(format!("Failed to read config file: {}", e))
            })?;

            let config: Self = toml::from_str(&content).map_err(|e| {
                DoctorError::ConfigError(format!("Failed to parse config file: {}", e))
            })?;

            // Fields left out of the file fall back to the defaults
            Ok(Self::default().merge(&config))
        } else {
            Ok(Self::default())
        }
    }

    /// Saves configuration to a file
    pub fn save_to_file(&self, path: &Path) -> DoctorResult<()> {
        let content = toml::to_string(self).map_err(|e| {
            DoctorError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DoctorError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            DoctorError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Merges this config with another config, preferring values from the other config if present
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            gemini_base_url: other
                .gemini_base_url
                .clone()
                .or_else(|| self.gemini_base_url.clone()),
            overpass_url: other.overpass_url.clone().or_else(|| self.overpass_url.clone()),
            request_timeout_secs: other.request_timeout_secs.or(self.request_timeout_secs),
            max_context_turns: other.max_context_turns.or(self.max_context_turns),
            max_context_chars: other.max_context_chars.or(self.max_context_chars),
            default_latitude: other.default_latitude.or(self.default_latitude),
            default_longitude: other.default_longitude.or(self.default_longitude),
            default_radius_meters: other.default_radius_meters.or(self.default_radius_meters),
            log_level: other.log_level.clone().or_else(|| self.log_level.clone()),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model_name.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn gemini_base_url(&self) -> &str {
        self.gemini_base_url
            .as_deref()
            .unwrap_or(DEFAULT_GEMINI_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn overpass_url(&self) -> &str {
        self.overpass_url.as_deref().unwrap_or(DEFAULT_OVERPASS_URL)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.unwrap_or(60))
    }

    /// Truncation policy applied to prior turns before they are forwarded to the model
    pub fn context_policy(&self) -> ContextPolicy {
        ContextPolicy {
            max_turns: self.max_context_turns.filter(|n| *n > 0),
            max_chars: self.max_context_chars.filter(|n| *n > 0),
        }
    }
}

/// Helper function to get default config directory
pub fn get_default_config_dir(app_name: &str) -> DoctorResult<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        DoctorError::ConfigError("Could not determine config directory".to_string())
    })?;

    Ok(config_dir.join(app_name))
}

/// Helper function to get default config file path
pub fn get_default_config_file(app_name: &str) -> DoctorResult<PathBuf> {
    let config_dir = get_default_config_dir(app_name)?;
    Ok(config_dir.join("config.toml"))
}
