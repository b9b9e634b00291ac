//! Export options for URDF generation

use serde::{Deserialize, Serialize};

/// Export options for URDF generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Robot name for the root element; the model's name when unset
    pub robot_name: Option<String>,
}

impl ExportOptions {
    pub fn with_robot_name(name: impl Into<String>) -> Self {
        Self {
            robot_name: Some(name.into()),
        }
    }
}
