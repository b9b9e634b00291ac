//! Import options

use serde::{Deserialize, Serialize};

use crate::convert::ConversionSettings;
use crate::inertial::InertialSettings;

/// Options for turning a description into a kinematic model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Axis conventions and length unit of the output
    pub conversion: ConversionSettings,
    /// Mass/inertia floors and defaults
    pub inertial: InertialSettings,
    /// Merge bodies across fixed and zero-range revolute joints
    pub optimize_fixed_joints: bool,
}

impl ImportOptions {
    pub fn with_conversion(mut self, conversion: ConversionSettings) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_fixed_joint_optimization(mut self, enabled: bool) -> Self {
        self.optimize_fixed_joints = enabled;
        self
    }
}
