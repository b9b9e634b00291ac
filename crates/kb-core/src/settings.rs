//! Persisted settings and converted models (RON format)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::export::ExportOptions;
use crate::import::ImportOptions;
use crate::math::EigenTolerance;
use crate::model::KinematicModel;

/// Everything a conversion run can be configured with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub import: ImportOptions,
    pub export: ExportOptions,
    /// Threshold for treating closed-form eigenvalues as repeated
    pub eigen_tolerance: EigenTolerance,
}

impl Settings {
    /// Serialize to pretty RON
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SettingsError::Serialize(e.to_string()))
    }

    pub fn from_ron(content: &str) -> Result<Self, SettingsError> {
        ron::from_str(content).map_err(|e| SettingsError::Deserialize(e.to_string()))
    }
}

/// Save settings to a RON file
pub fn save_settings(settings: &Settings, path: impl AsRef<Path>) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let content = settings.to_ron()?;
    std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
    tracing::info!("Saved settings to {:?}", path);
    Ok(())
}

/// Load settings from a RON file
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
    let settings = Settings::from_ron(&content)?;
    tracing::info!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Save a converted model to a RON file
pub fn save_model(model: &KinematicModel, path: impl AsRef<Path>) -> Result<(), SettingsError> {
    let path = path.as_ref();
    let content = ron::ser::to_string_pretty(model, ron::ser::PrettyConfig::default())
        .map_err(|e| SettingsError::Serialize(e.to_string()))?;
    std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
    tracing::info!("Saved model '{}' to {:?}", model.name, path);
    Ok(())
}

/// Load a converted model from a RON file
pub fn load_model(path: impl AsRef<Path>) -> Result<KinematicModel, SettingsError> {
    let content =
        std::fs::read_to_string(path.as_ref()).map_err(|e| SettingsError::Io(e.to_string()))?;
    ron::from_str(&content).map_err(|e| SettingsError::Deserialize(e.to_string()))
}

/// Settings-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
