//! Material definitions

use serde::{Deserialize, Serialize};

/// `<material>`, either declared at robot level or inline in a visual
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescription {
    pub name: String,
    /// RGBA in 0..1
    pub color: Option<[f64; 4]>,
    pub texture: Option<String>,
}

impl MaterialDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, rgba: [f64; 4]) -> Self {
        self.color = Some(rgba);
        self
    }

    /// Only a name, referring to a robot-level material
    pub fn is_reference(&self) -> bool {
        self.color.is_none() && self.texture.is_none()
    }
}
