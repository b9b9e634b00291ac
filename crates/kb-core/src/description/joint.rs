//! Joint definitions

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::pose::Pose;
use crate::constants::{DEFAULT_DAMPING, DEFAULT_SPRING, ZERO_RANGE_TOLERANCE};

/// Joint type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JointType {
    #[default]
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
}

impl JointType {
    /// Check if this joint type has an axis
    pub fn has_axis(&self) -> bool {
        matches!(
            self,
            JointType::Revolute | JointType::Continuous | JointType::Prismatic | JointType::Planar
        )
    }

    /// Check if this joint type has limits
    pub fn has_limits(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Prismatic)
    }

    /// Name used in the `type` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            JointType::Fixed => "fixed",
            JointType::Revolute => "revolute",
            JointType::Continuous => "continuous",
            JointType::Prismatic => "prismatic",
            JointType::Floating => "floating",
            JointType::Planar => "planar",
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(JointType::Fixed),
            "revolute" => Ok(JointType::Revolute),
            "continuous" => Ok(JointType::Continuous),
            "prismatic" => Ok(JointType::Prismatic),
            "floating" => Ok(JointType::Floating),
            "planar" => Ok(JointType::Planar),
            other => Err(other.to_string()),
        }
    }
}

/// `<limit>`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointLimit {
    /// Lower position limit (rad or m)
    pub lower: f64,
    /// Upper position limit (rad or m)
    pub upper: f64,
    /// Maximum effort (N or Nm), infinite when unspecified
    pub effort: f64,
    /// Maximum velocity (rad/s or m/s)
    pub velocity: f64,
}

impl Default for JointLimit {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 0.0,
            effort: f64::INFINITY,
            velocity: 0.0,
        }
    }
}

impl JointLimit {
    /// Create limits with specified range
    pub fn with_range(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            ..Default::default()
        }
    }

    pub fn is_zero_range(&self) -> bool {
        (self.upper - self.lower).abs() <= ZERO_RANGE_TOLERANCE
    }
}

/// `<dynamics>`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointDynamics {
    pub spring: f64,
    pub damping: f64,
    pub friction: f64,
}

impl Default for JointDynamics {
    fn default() -> Self {
        Self {
            spring: DEFAULT_SPRING,
            damping: DEFAULT_DAMPING,
            friction: 0.0,
        }
    }
}

/// `<mimic>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointMimic {
    pub joint: String,
    pub multiplier: f64,
    pub offset: f64,
}

impl JointMimic {
    pub fn new(joint: impl Into<String>) -> Self {
        Self {
            joint: joint.into(),
            multiplier: 1.0,
            offset: 0.0,
        }
    }
}

/// `<calibration>`, carried through unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub rising: Option<f64>,
    pub falling: Option<f64>,
}

/// `<safety_controller>`, carried through unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyController {
    pub soft_lower_limit: f64,
    pub soft_upper_limit: f64,
    pub k_position: f64,
    pub k_velocity: f64,
}

/// A joint between two links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointDescription {
    pub name: String,
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    pub origin: Option<Pose>,
    /// Unit axis in the joint frame
    pub axis: DVec3,
    pub calibration: Option<Calibration>,
    pub dynamics: Option<JointDynamics>,
    pub limit: Option<JointLimit>,
    pub mimic: Option<JointMimic>,
    pub safety_controller: Option<SafetyController>,
}

impl JointDescription {
    pub fn new(
        name: impl Into<String>,
        joint_type: JointType,
        parent: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            joint_type,
            parent: parent.into(),
            child: child.into(),
            origin: None,
            axis: DVec3::X,
            calibration: None,
            dynamics: None,
            limit: None,
            mimic: None,
            safety_controller: None,
        }
    }

    /// The declared limit, or the parse defaults when none was given
    pub fn limit_or_default(&self) -> JointLimit {
        self.limit.unwrap_or_default()
    }

    pub fn origin_or_identity(&self) -> Pose {
        self.origin.unwrap_or_default()
    }

    /// Fixed joints, and revolute joints whose limits allow no motion
    pub fn is_rigid(&self) -> bool {
        match self.joint_type {
            JointType::Fixed => true,
            JointType::Revolute => self.limit.is_some_and(|limit| limit.is_zero_range()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_type_names() {
        for name in ["fixed", "revolute", "continuous", "prismatic", "floating", "planar"] {
            let joint_type: JointType = name.parse().unwrap();
            assert_eq!(joint_type.as_str(), name);
        }
        assert_eq!("spherical".parse::<JointType>(), Err("spherical".to_string()));
    }

    #[test]
    fn test_limit_defaults() {
        let joint = JointDescription::new("j", JointType::Revolute, "a", "b");
        let limit = joint.limit_or_default();
        assert_eq!(limit.lower, 0.0);
        assert_eq!(limit.upper, 0.0);
        assert!(limit.effort.is_infinite());
        assert_eq!(limit.velocity, 0.0);
    }

    #[test]
    fn test_is_rigid() {
        let mut joint = JointDescription::new("j", JointType::Revolute, "a", "b");
        assert!(!joint.is_rigid());

        joint.limit = Some(JointLimit::with_range(0.5, 0.5));
        assert!(joint.is_rigid());

        joint.limit = Some(JointLimit::with_range(-1.0, 1.0));
        assert!(!joint.is_rigid());

        joint.joint_type = JointType::Fixed;
        assert!(joint.is_rigid());

        joint.joint_type = JointType::Prismatic;
        joint.limit = Some(JointLimit::with_range(0.0, 0.0));
        assert!(!joint.is_rigid());
    }
}
