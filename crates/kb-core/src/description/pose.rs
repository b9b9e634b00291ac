//! Origin poses as written in the description

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// `<origin xyz=".." rpy=".."/>`
///
/// `rpy` is roll/pitch/yaw about the fixed X, Y and Z axes, applied in that
/// order, so the rotation is `Rz(yaw) · Ry(pitch) · Rx(roll)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub xyz: DVec3,
    pub rpy: DVec3,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        xyz: DVec3::ZERO,
        rpy: DVec3::ZERO,
    };

    pub fn new(xyz: DVec3, rpy: DVec3) -> Self {
        Self { xyz, rpy }
    }

    pub fn from_translation(xyz: DVec3) -> Self {
        Self {
            xyz,
            rpy: DVec3::ZERO,
        }
    }

    /// Build from a translation and rotation quaternion
    pub fn from_parts(xyz: DVec3, rotation: DQuat) -> Self {
        Self {
            xyz,
            rpy: quat_to_rpy(rotation),
        }
    }

    pub fn rotation(&self) -> DQuat {
        rpy_to_quat(self.rpy)
    }

    pub fn is_identity(&self) -> bool {
        self.xyz == DVec3::ZERO && self.rpy == DVec3::ZERO
    }
}

/// Fixed-axis roll/pitch/yaw to quaternion
pub fn rpy_to_quat(rpy: DVec3) -> DQuat {
    DQuat::from_rotation_z(rpy.z) * DQuat::from_rotation_y(rpy.y) * DQuat::from_rotation_x(rpy.x)
}

/// Quaternion to fixed-axis roll/pitch/yaw
pub fn quat_to_rpy(rotation: DQuat) -> DVec3 {
    let m = DMat3::from_quat(rotation.normalize());
    // m.col(j)[i] is row i, column j
    let r20 = m.x_axis.z;
    let pitch = (-r20).clamp(-1.0, 1.0).asin();

    let (roll, yaw) = if r20.abs() < 1.0 - 1e-12 {
        (
            m.y_axis.z.atan2(m.z_axis.z),
            m.x_axis.y.atan2(m.x_axis.x),
        )
    } else {
        // Gimbal lock: only roll ± yaw is defined, put it all in roll
        ((-m.z_axis.y).atan2(m.y_axis.y), 0.0)
    };

    let rpy = DVec3::new(roll, pitch, yaw);
    DVec3::new(clean(rpy.x), clean(rpy.y), clean(rpy.z))
}

fn clean(angle: f64) -> f64 {
    if angle == 0.0 { 0.0 } else { angle }
}
