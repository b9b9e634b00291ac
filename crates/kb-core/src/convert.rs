//! Axis convention and unit conversion
//!
//! Every supported convention is a signed permutation of the description's
//! forward/left/up axes, so conversion never mixes components: positions are
//! permuted and negated, rotations follow the axial-vector rule and tensors are
//! conjugated `P·M·Pᵗ`. All entries are 0 or ±1, which keeps conversion of
//! exact values exact.

use std::fmt;
use std::str::FromStr;

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::description::Pose;

/// Axis layout of a coordinate frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AxisConvention {
    /// x forward, y left, z up (URDF / ROS body frames)
    #[default]
    Flu,
    /// x east, y north, z up
    Enu,
    /// x north, y east, z down
    Ned,
    /// x right, y up, z forward (left-handed, Y-up engines)
    Ruf,
}

impl AxisConvention {
    /// Map from forward/left/up into this convention
    fn flu_to_self(&self) -> SignedPermutation {
        match self {
            AxisConvention::Flu => SignedPermutation::IDENTITY,
            AxisConvention::Enu => SignedPermutation::new([(1, -1.0), (0, 1.0), (2, 1.0)]),
            AxisConvention::Ned => SignedPermutation::new([(0, 1.0), (1, -1.0), (2, -1.0)]),
            AxisConvention::Ruf => SignedPermutation::new([(1, -1.0), (2, 1.0), (0, 1.0)]),
        }
    }

    pub fn is_right_handed(&self) -> bool {
        self.flu_to_self().determinant() > 0.0
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AxisConvention::Flu => "flu",
            AxisConvention::Enu => "enu",
            AxisConvention::Ned => "ned",
            AxisConvention::Ruf => "ruf",
        }
    }
}

impl fmt::Display for AxisConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AxisConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flu" => Ok(AxisConvention::Flu),
            "enu" => Ok(AxisConvention::Enu),
            "ned" => Ok(AxisConvention::Ned),
            "ruf" => Ok(AxisConvention::Ruf),
            other => Err(format!("unknown axis convention '{other}'")),
        }
    }
}

/// Unit of length used by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LengthUnit {
    /// Meters (URDF standard)
    #[default]
    Meters,
    Millimeters,
    Centimeters,
    Inches,
}

impl LengthUnit {
    /// Target units per meter
    pub fn per_meter(&self) -> f64 {
        match self {
            LengthUnit::Meters => 1.0,
            LengthUnit::Millimeters => 1000.0,
            LengthUnit::Centimeters => 100.0,
            LengthUnit::Inches => 1.0 / 0.0254,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LengthUnit::Meters => "m",
            LengthUnit::Millimeters => "mm",
            LengthUnit::Centimeters => "cm",
            LengthUnit::Inches => "in",
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" | "meters" => Ok(LengthUnit::Meters),
            "mm" | "millimeters" => Ok(LengthUnit::Millimeters),
            "cm" | "centimeters" => Ok(LengthUnit::Centimeters),
            "in" | "inches" => Ok(LengthUnit::Inches),
            other => Err(format!("unknown length unit '{other}'")),
        }
    }
}

/// Conversion parameters, passed explicitly wherever conversion happens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionSettings {
    pub source: AxisConvention,
    pub target: AxisConvention,
    pub length_unit: LengthUnit,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            source: AxisConvention::Flu,
            target: AxisConvention::Ruf,
            length_unit: LengthUnit::Meters,
        }
    }
}

impl ConversionSettings {
    /// No axis change and meters
    pub fn identity() -> Self {
        Self {
            source: AxisConvention::Flu,
            target: AxisConvention::Flu,
            length_unit: LengthUnit::Meters,
        }
    }
}

/// Matrix with exactly one ±1 per row and column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedPermutation {
    matrix: DMat3,
}

impl SignedPermutation {
    pub const IDENTITY: Self = Self {
        matrix: DMat3::IDENTITY,
    };

    /// `rows[i] = (j, s)` means output component i is `s` times input component j
    pub fn new(rows: [(usize, f64); 3]) -> Self {
        let mut cols = [DVec3::ZERO; 3];
        for (i, (j, sign)) in rows.into_iter().enumerate() {
            cols[j][i] = sign;
        }
        Self {
            matrix: DMat3::from_cols(cols[0], cols[1], cols[2]),
        }
    }

    pub fn matrix(&self) -> DMat3 {
        self.matrix
    }

    pub fn determinant(&self) -> f64 {
        self.matrix.determinant()
    }

    pub fn inverse(&self) -> Self {
        Self {
            matrix: self.matrix.transpose(),
        }
    }

    /// `self` followed by `next`
    pub fn then(&self, next: &SignedPermutation) -> Self {
        Self {
            matrix: next.matrix * self.matrix,
        }
    }

    pub fn vector(&self, v: DVec3) -> DVec3 {
        self.matrix * v
    }

    /// Permute magnitudes only (box extents, scale factors)
    pub fn extent(&self, v: DVec3) -> DVec3 {
        DMat3::from_cols(
            self.matrix.x_axis.abs(),
            self.matrix.y_axis.abs(),
            self.matrix.z_axis.abs(),
        ) * v
    }

    /// Rotations are axial: the vector part flips with the handedness
    pub fn rotation(&self, q: DQuat) -> DQuat {
        let axis = self.matrix * DVec3::new(q.x, q.y, q.z) * self.determinant();
        DQuat::from_xyzw(axis.x, axis.y, axis.z, q.w)
    }

    pub fn tensor(&self, m: &DMat3) -> DMat3 {
        self.matrix * *m * self.matrix.transpose()
    }
}

/// Rigid transform in the target convention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    /// Apply `self` to a point expressed in the child frame
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.translation + self.rotation * point
    }

    /// `self` followed by `child` (child expressed in self's frame)
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.transform_point(child.translation),
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        Transform {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.translation == DVec3::ZERO && self.rotation == DQuat::IDENTITY
    }
}

/// Applies [`ConversionSettings`] to positions, rotations, tensors and sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    settings: ConversionSettings,
    permutation: SignedPermutation,
    scale: f64,
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self::new(&ConversionSettings::default())
    }
}

impl CoordinateConverter {
    pub fn new(settings: &ConversionSettings) -> Self {
        let permutation = settings
            .source
            .flu_to_self()
            .inverse()
            .then(&settings.target.flu_to_self());
        Self {
            settings: *settings,
            permutation,
            scale: settings.length_unit.per_meter(),
        }
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    pub fn permutation(&self) -> &SignedPermutation {
        &self.permutation
    }

    pub fn position(&self, v: DVec3) -> DVec3 {
        self.permutation.vector(v) * self.scale
    }

    pub fn position_back(&self, v: DVec3) -> DVec3 {
        self.permutation.inverse().vector(v / self.scale)
    }

    /// Unit directions (joint axes): permuted, never scaled
    pub fn direction(&self, v: DVec3) -> DVec3 {
        self.permutation.vector(v)
    }

    pub fn direction_back(&self, v: DVec3) -> DVec3 {
        self.permutation.inverse().vector(v)
    }

    /// Axes of rotation are axial vectors and flip with the handedness
    pub fn rotation_axis(&self, v: DVec3) -> DVec3 {
        self.permutation.vector(v) * self.permutation.determinant()
    }

    pub fn rotation_axis_back(&self, v: DVec3) -> DVec3 {
        self.permutation.inverse().vector(v) * self.permutation.determinant()
    }

    pub fn rotation(&self, q: DQuat) -> DQuat {
        self.permutation.rotation(q)
    }

    pub fn rotation_back(&self, q: DQuat) -> DQuat {
        self.permutation.inverse().rotation(q)
    }

    /// Inertia scales with length squared
    pub fn inertia(&self, m: &DMat3) -> DMat3 {
        self.permutation.tensor(m) * (self.scale * self.scale)
    }

    pub fn inertia_back(&self, m: &DMat3) -> DMat3 {
        self.permutation.inverse().tensor(m) * (1.0 / (self.scale * self.scale))
    }

    pub fn length(&self, value: f64) -> f64 {
        value * self.scale
    }

    pub fn length_back(&self, value: f64) -> f64 {
        value / self.scale
    }

    /// Extents along each axis, with unit scaling
    pub fn size(&self, v: DVec3) -> DVec3 {
        self.permutation.extent(v) * self.scale
    }

    pub fn size_back(&self, v: DVec3) -> DVec3 {
        self.permutation.inverse().extent(v / self.scale)
    }

    /// Dimensionless per-axis factors
    pub fn scale_factors(&self, v: DVec3) -> DVec3 {
        self.permutation.extent(v)
    }

    pub fn scale_factors_back(&self, v: DVec3) -> DVec3 {
        self.permutation.inverse().extent(v)
    }

    pub fn pose(&self, pose: &Pose) -> Transform {
        Transform {
            translation: self.position(pose.xyz),
            rotation: self.rotation(pose.rotation()),
        }
    }

    pub fn pose_back(&self, transform: &Transform) -> Pose {
        Pose::from_parts(
            self.position_back(transform.translation),
            self.rotation_back(transform.rotation),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: DVec3, b: DVec3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-12);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
    }

    fn converter(target: AxisConvention, unit: LengthUnit) -> CoordinateConverter {
        CoordinateConverter::new(&ConversionSettings {
            source: AxisConvention::Flu,
            target,
            length_unit: unit,
        })
    }

    #[test]
    fn test_ruf_positions() {
        let c = converter(AxisConvention::Ruf, LengthUnit::Meters);
        // forward -> +z, left -> -x, up -> +y
        assert_eq!(c.position(DVec3::X), DVec3::Z);
        assert_eq!(c.position(DVec3::Y), -DVec3::X);
        assert_eq!(c.position(DVec3::Z), DVec3::Y);
        assert!(!AxisConvention::Ruf.is_right_handed());
        assert!(AxisConvention::Enu.is_right_handed());
    }

    #[test]
    fn test_units() {
        let c = converter(AxisConvention::Flu, LengthUnit::Millimeters);
        assert_vec_eq(c.position(DVec3::new(0.001, 0.0, 0.0)), DVec3::new(1.0, 0.0, 0.0));
        let m = DMat3::from_diagonal(DVec3::splat(1e-6));
        assert_relative_eq!(c.inertia(&m).x_axis.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.length_back(25.4), 0.0254, epsilon = 1e-15);
    }

    #[test]
    fn test_rotation_matches_conjugated_matrix() {
        let q = DQuat::from_euler(glam::EulerRot::XYZ, 0.3, -0.5, 1.1);
        for target in [
            AxisConvention::Flu,
            AxisConvention::Enu,
            AxisConvention::Ned,
            AxisConvention::Ruf,
        ] {
            let c = converter(target, LengthUnit::Meters);
            let p = c.permutation().matrix();
            let expected = p * DMat3::from_quat(q) * p.transpose();
            let converted = DMat3::from_quat(c.rotation(q));
            assert!(crate::math::matrix::relative_eq(&converted, &expected, 1e-12));

            // Rotating then converting equals converting then rotating
            let v = DVec3::new(0.2, -1.0, 0.7);
            assert_vec_eq(c.position(q * v), c.rotation(q) * c.position(v));
        }
    }

    #[test]
    fn test_round_trip_through_each_convention() {
        let pose = Pose::new(DVec3::new(1.0, -2.0, 3.0), DVec3::new(0.1, 0.2, -0.3));
        for target in [AxisConvention::Enu, AxisConvention::Ned, AxisConvention::Ruf] {
            let c = converter(target, LengthUnit::Inches);
            let back = c.pose_back(&c.pose(&pose));
            assert_vec_eq(back.xyz, pose.xyz);
            assert_vec_eq(back.rpy, pose.rpy);
        }
    }

    #[test]
    fn test_non_flu_source() {
        let c = CoordinateConverter::new(&ConversionSettings {
            source: AxisConvention::Enu,
            target: AxisConvention::Ned,
            length_unit: LengthUnit::Meters,
        });
        // east is right of forward(north): ENU x -> NED y
        assert_eq!(c.position(DVec3::X), DVec3::Y);
        assert_eq!(c.position(DVec3::Z), -DVec3::Z);
    }

    #[test]
    fn test_extent_is_unsigned() {
        let c = converter(AxisConvention::Ruf, LengthUnit::Centimeters);
        assert_vec_eq(c.size(DVec3::new(1.0, 2.0, 3.0)), DVec3::new(200.0, 300.0, 100.0));
        assert_vec_eq(c.size_back(DVec3::new(200.0, 300.0, 100.0)), DVec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_transform_compose_and_inverse() {
        let a = Transform::new(DVec3::new(1.0, 0.0, 0.0), DQuat::from_rotation_z(0.5));
        let b = Transform::new(DVec3::new(0.0, 2.0, 0.0), DQuat::from_rotation_x(-0.2));
        let ab = a.mul_transform(&b);
        let p = DVec3::new(0.3, 0.4, 0.5);
        assert_vec_eq(ab.transform_point(p), a.transform_point(b.transform_point(p)));

        let identity = ab.mul_transform(&ab.inverse());
        assert_vec_eq(identity.translation, DVec3::ZERO);
        assert_relative_eq!(identity.rotation.w.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("RUF".parse::<AxisConvention>(), Ok(AxisConvention::Ruf));
        assert_eq!("in".parse::<LengthUnit>(), Ok(LengthUnit::Inches));
        assert!("feet".parse::<LengthUnit>().is_err());
    }
}
