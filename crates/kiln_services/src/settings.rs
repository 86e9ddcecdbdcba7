//! Settings management
//!
//! Settings live in an optional JSON file. Missing keys fall back to
//! defaults, and a couple of environment variables override the file.

use std::path::Path;

use kiln_render::window::WindowConfig;
use kiln_render::{ApiVersion, DevicePreference, InstanceConfig, RenderConfig, ValidationMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides `graphics.validation` (off | on | auto)
pub const VALIDATION_ENV: &str = "KILN_VALIDATION";
/// Overrides `graphics.preferred_gpu`
pub const GPU_ENV: &str = "KILN_GPU";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    InvalidOverride { var: &'static str, value: String },
}

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub graphics: GraphicsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    pub validation: ValidationMode,
    pub device_preference: DevicePreference,
    pub preferred_gpu: Option<String>,
    pub api_version: ApiVersion,
}

impl Default for WindowSettings {
    fn default() -> Self {
        let window = WindowConfig::default();
        Self {
            title: window.title,
            width: window.width,
            height: window.height,
        }
    }
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            validation: ValidationMode::Auto,
            device_preference: DevicePreference::HighPerformance,
            preferred_gpu: None,
            api_version: ApiVersion::V1_0,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when no path is given or the
    /// file does not exist. Environment overrides are applied afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                tracing::warn!("Settings file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: shown.clone(),
            source,
        })?;
        let settings = Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: shown.clone(),
            source,
        })?;
        tracing::info!("Loaded settings from {}", shown);
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Apply overrides looked up through `lookup` (the process environment in
    /// production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(VALIDATION_ENV) {
            self.graphics.validation = match value.trim().to_ascii_lowercase().as_str() {
                "off" | "0" | "false" => ValidationMode::Off,
                "on" | "1" | "true" => ValidationMode::On,
                "auto" => ValidationMode::Auto,
                _ => {
                    return Err(SettingsError::InvalidOverride {
                        var: VALIDATION_ENV,
                        value,
                    })
                }
            };
            tracing::debug!("{VALIDATION_ENV} -> {:?}", self.graphics.validation);
        }

        if let Some(value) = lookup(GPU_ENV) {
            let value = value.trim();
            self.graphics.preferred_gpu = (!value.is_empty()).then(|| value.to_string());
        }

        Ok(())
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            title: self.window.title.clone(),
            width: self.window.width,
            height: self.window.height,
        }
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            instance: InstanceConfig {
                application_name: self.window.title.clone(),
                api_version: self.graphics.api_version,
                validation: self.graphics.validation,
                ..InstanceConfig::default()
            },
            device: kiln_render::DeviceRequirements {
                preference: self.graphics.device_preference,
                preferred_name: self.graphics.preferred_gpu.clone(),
                ..Default::default()
            },
        }
    }
}
