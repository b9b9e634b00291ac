//! Mass properties of a link

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pose::Pose;
use crate::math::InertiaMatrix;

/// Whether a physics engine should trust the stored tensor or recompute it
/// from collision geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InertiaCalculationMode {
    /// Use the parent's choice, falling back to the stored tensor
    #[default]
    InheritFallbackManual,
    /// Use the parent's choice, falling back to recomputation
    InheritFallbackAutomatic,
    ForceManual,
    ForceAutomatic,
}

impl InertiaCalculationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InheritFallbackManual => "inherit-fallback-manual",
            Self::InheritFallbackAutomatic => "inherit-fallback-automatic",
            Self::ForceManual => "force-manual",
            Self::ForceAutomatic => "force-automatic",
        }
    }

    pub fn all() -> &'static [InertiaCalculationMode] {
        &[
            Self::InheritFallbackManual,
            Self::InheritFallbackAutomatic,
            Self::ForceManual,
            Self::ForceAutomatic,
        ]
    }
}

impl fmt::Display for InertiaCalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InertiaCalculationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// `<inertial>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inertial {
    /// Center of mass and inertial axes in the link frame
    pub origin: Option<Pose>,
    /// Mass in kg
    pub mass: f64,
    pub inertia: InertiaMatrix,
    pub calculation_mode: Option<InertiaCalculationMode>,
}

impl Inertial {
    pub fn new(mass: f64, inertia: InertiaMatrix) -> Self {
        Self {
            origin: None,
            mass,
            inertia,
            calculation_mode: None,
        }
    }

    pub fn with_origin(mut self, origin: Pose) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn origin_or_identity(&self) -> Pose {
        self.origin.unwrap_or_default()
    }
}
