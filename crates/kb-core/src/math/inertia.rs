//! Inertia tensor types

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Inertia tensor (symmetric 3x3 matrix) as stored in the description
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InertiaMatrix {
    pub ixx: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyy: f64,
    pub iyz: f64,
    pub izz: f64,
}

impl InertiaMatrix {
    pub fn diagonal(ixx: f64, iyy: f64, izz: f64) -> Self {
        Self {
            ixx,
            iyy,
            izz,
            ..Default::default()
        }
    }

    pub fn to_mat3(&self) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(self.ixx, self.ixy, self.ixz),
            DVec3::new(self.ixy, self.iyy, self.iyz),
            DVec3::new(self.ixz, self.iyz, self.izz),
        )
    }

    /// Read the upper triangle of `m`; the lower one is ignored
    pub fn from_mat3(m: &DMat3) -> Self {
        Self {
            ixx: m.x_axis.x,
            ixy: m.y_axis.x,
            ixz: m.z_axis.x,
            iyy: m.y_axis.y,
            iyz: m.z_axis.y,
            izz: m.z_axis.z,
        }
    }

    /// Round every component to `digits` decimal places
    pub fn rounded(&self, digits: i32) -> Self {
        Self {
            ixx: round_to_digits(self.ixx, digits),
            ixy: round_to_digits(self.ixy, digits),
            ixz: round_to_digits(self.ixz, digits),
            iyy: round_to_digits(self.iyy, digits),
            iyz: round_to_digits(self.iyz, digits),
            izz: round_to_digits(self.izz, digits),
        }
    }

    /// Get as array [ixx, ixy, ixz, iyy, iyz, izz]
    pub fn to_array(&self) -> [f64; 6] {
        [self.ixx, self.ixy, self.ixz, self.iyy, self.iyz, self.izz]
    }
}

impl From<&urdf_rs::Inertia> for InertiaMatrix {
    fn from(inertia: &urdf_rs::Inertia) -> Self {
        Self {
            ixx: inertia.ixx,
            ixy: inertia.ixy,
            ixz: inertia.ixz,
            iyy: inertia.iyy,
            iyz: inertia.iyz,
            izz: inertia.izz,
        }
    }
}

/// Diagonalized inertia: `rotation · diag(moments) · rotationᵗ` is the tensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrincipalInertia {
    pub moments: DVec3,
    pub rotation: DQuat,
}

impl Default for PrincipalInertia {
    fn default() -> Self {
        Self {
            moments: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl PrincipalInertia {
    pub fn to_matrix(&self) -> DMat3 {
        let r = DMat3::from_quat(self.rotation);
        r * DMat3::from_diagonal(self.moments) * r.transpose()
    }

    /// Raise every moment below `floor` to exactly `floor`.
    /// Returns true when anything changed.
    pub fn clamp_min(&mut self, floor: f64) -> bool {
        let clamped = self.moments.max(DVec3::splat(floor));
        let changed = clamped != self.moments;
        self.moments = clamped;
        changed
    }
}

pub fn round_to_digits(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    // Keep -0.0 out of written output
    if rounded == 0.0 { 0.0 } else { rounded }
}
