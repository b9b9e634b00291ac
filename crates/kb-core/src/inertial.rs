//! Resolution of described inertials into rigid bodies and back
//!
//! Import clamps mass, converts the tensor into the target convention,
//! diagonalizes it and floors the principal moments. Export composes the
//! principal frame back into a full tensor relative to the inertial axes and
//! converts it to the description's convention.

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING, DEFAULT_MIN_INERTIA, DEFAULT_MIN_MASS,
    INERTIA_ROUND_DIGITS,
};
use crate::convert::CoordinateConverter;
use crate::description::{InertiaCalculationMode, Inertial, Pose};
use crate::diagnostics::{Warning, WarningSink};
use crate::math::{InertiaMatrix, PrincipalInertia, diagonalize};

/// Floors and defaults applied while resolving inertials
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InertialSettings {
    /// Smallest accepted mass (kg)
    pub min_mass: f64,
    /// Smallest accepted principal moment (target units)
    pub min_inertia: f64,
    /// Used for inertials without a `calculation_mode`
    pub default_mode: Option<InertiaCalculationMode>,
    pub default_linear_damping: f64,
    pub default_angular_damping: f64,
}

impl Default for InertialSettings {
    fn default() -> Self {
        Self {
            min_mass: DEFAULT_MIN_MASS,
            min_inertia: DEFAULT_MIN_INERTIA,
            default_mode: None,
            default_linear_damping: DEFAULT_LINEAR_DAMPING,
            default_angular_damping: DEFAULT_ANGULAR_DAMPING,
        }
    }
}

/// Mass properties of one link in the target convention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub mass: f64,
    /// Center of mass in the link frame
    pub center_of_mass: DVec3,
    /// Orientation of the described inertial axes in the link frame
    pub inertial_axis_rotation: DQuat,
    /// Principal moments; the rotation is relative to the link frame
    pub principal: PrincipalInertia,
    pub calculation_mode: InertiaCalculationMode,
    /// Whether the mode came from the document rather than a default
    pub mode_declared: bool,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl RigidBody {
    /// Full tensor about the center of mass, in link-frame axes
    pub fn inertia_tensor(&self) -> DMat3 {
        self.principal.to_matrix()
    }
}

/// Converts between [`Inertial`] and [`RigidBody`]
#[derive(Debug)]
pub struct InertialResolver<'a> {
    converter: &'a CoordinateConverter,
    settings: &'a InertialSettings,
    mode_default_reported: bool,
}

impl<'a> InertialResolver<'a> {
    pub fn new(converter: &'a CoordinateConverter, settings: &'a InertialSettings) -> Self {
        Self {
            converter,
            settings,
            mode_default_reported: false,
        }
    }

    pub fn settings(&self) -> &InertialSettings {
        self.settings
    }

    /// Resolve one link's inertial
    pub fn resolve(
        &mut self,
        link: &str,
        inertial: &Inertial,
        sink: &mut dyn WarningSink,
    ) -> RigidBody {
        let mut mass = inertial.mass;
        // `!(a >= b)` also catches NaN
        if !(mass >= self.settings.min_mass) {
            sink.warn(Warning::MassClamped {
                link: link.to_string(),
                mass,
                clamped: self.settings.min_mass,
            });
            mass = self.settings.min_mass;
        }

        let origin = inertial.origin_or_identity();
        let center_of_mass = self.converter.position(origin.xyz);
        let inertial_axis_rotation = self.converter.rotation(origin.rotation());

        let tensor = self.converter.inertia(&inertial.inertia.to_mat3());
        let mut principal = diagonalize(&tensor);

        let original = principal.moments;
        if principal.clamp_min(self.settings.min_inertia) {
            sink.warn(Warning::InertiaClamped {
                link: link.to_string(),
                original,
                clamped: principal.moments,
            });
        }
        principal.rotation = (inertial_axis_rotation * principal.rotation).normalize();

        let (calculation_mode, mode_declared) = self.calculation_mode(inertial, sink);

        tracing::debug!(
            "Resolved inertial of '{}': mass {}, moments {:?}",
            link,
            mass,
            principal.moments
        );

        RigidBody {
            mass,
            center_of_mass,
            inertial_axis_rotation,
            principal,
            calculation_mode,
            mode_declared,
            linear_damping: self.settings.default_linear_damping,
            angular_damping: self.settings.default_angular_damping,
        }
    }

    /// Declared mode, else the configured default, else the fallback which is
    /// reported once per resolver
    fn calculation_mode(
        &mut self,
        inertial: &Inertial,
        sink: &mut dyn WarningSink,
    ) -> (InertiaCalculationMode, bool) {
        if let Some(mode) = inertial.calculation_mode {
            return (mode, true);
        }
        if let Some(mode) = self.settings.default_mode {
            return (mode, false);
        }

        let mode = InertiaCalculationMode::default();
        if !self.mode_default_reported {
            self.mode_default_reported = true;
            sink.warn(Warning::CalculationModeDefaulted { mode });
        }
        (mode, false)
    }

    /// Convert a body back to the description's convention
    pub fn export(&self, body: &RigidBody) -> Inertial {
        let relative = (body.inertial_axis_rotation.inverse() * body.principal.rotation).normalize();
        let local = PrincipalInertia {
            moments: body.principal.moments,
            rotation: relative,
        };
        let tensor = self.converter.inertia_back(&local.to_matrix());

        let origin = Pose::from_parts(
            self.converter.position_back(body.center_of_mass),
            self.converter.rotation_back(body.inertial_axis_rotation),
        );

        Inertial {
            origin: (!origin.is_identity()).then_some(origin),
            mass: body.mass,
            inertia: InertiaMatrix::from_mat3(&tensor).rounded(INERTIA_ROUND_DIGITS),
            calculation_mode: body.mode_declared.then_some(body.calculation_mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{AxisConvention, ConversionSettings, LengthUnit};
    use crate::diagnostics::Warnings;
    use approx::assert_relative_eq;

    fn ruf() -> CoordinateConverter {
        CoordinateConverter::new(&ConversionSettings::default())
    }

    fn sorted(v: DVec3) -> [f64; 3] {
        let mut values = v.to_array();
        values.sort_by(f64::total_cmp);
        values
    }

    #[test]
    fn test_mass_is_clamped_with_warning() {
        let converter = ruf();
        let settings = InertialSettings::default();
        let mut resolver = InertialResolver::new(&converter, &settings);
        let mut warnings = Warnings::new();

        let inertial = Inertial::new(0.0, InertiaMatrix::diagonal(0.1, 0.1, 0.1));
        let body = resolver.resolve("foot", &inertial, &mut warnings);

        assert_eq!(body.mass, 0.1);
        assert!(warnings.iter().any(|w| matches!(
            w,
            Warning::MassClamped { link, clamped, .. } if link == "foot" && *clamped == 0.1
        )));
    }

    #[test]
    fn test_inertia_floor_is_exact() {
        let converter = ruf();
        let settings = InertialSettings::default();
        let mut resolver = InertialResolver::new(&converter, &settings);
        let mut warnings = Warnings::new();

        let inertial = Inertial::new(1.0, InertiaMatrix::diagonal(1e-9, 0.2, 0.0));
        let body = resolver.resolve("tip", &inertial, &mut warnings);

        let moments = sorted(body.principal.moments);
        assert_eq!(moments[0], 1e-6);
        assert_eq!(moments[1], 1e-6);
        assert_relative_eq!(moments[2], 0.2, epsilon = 1e-12);
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, Warning::InertiaClamped { link, .. } if link == "tip"))
        );
    }

    #[test]
    fn test_mode_default_reported_once() {
        let converter = ruf();
        let settings = InertialSettings::default();
        let mut resolver = InertialResolver::new(&converter, &settings);
        let mut warnings = Warnings::new();

        let inertial = Inertial::new(1.0, InertiaMatrix::diagonal(0.1, 0.1, 0.1));
        resolver.resolve("a", &inertial, &mut warnings);
        let body = resolver.resolve("b", &inertial, &mut warnings);

        let defaulted = warnings
            .iter()
            .filter(|w| matches!(w, Warning::CalculationModeDefaulted { .. }))
            .count();
        assert_eq!(defaulted, 1);
        assert_eq!(body.calculation_mode, InertiaCalculationMode::InheritFallbackManual);
        assert!(!body.mode_declared);
    }

    #[test]
    fn test_configured_mode_is_silent() {
        let converter = ruf();
        let settings = InertialSettings {
            default_mode: Some(InertiaCalculationMode::ForceAutomatic),
            ..Default::default()
        };
        let mut resolver = InertialResolver::new(&converter, &settings);
        let mut warnings = Warnings::new();

        let inertial = Inertial::new(1.0, InertiaMatrix::diagonal(0.1, 0.1, 0.1));
        let body = resolver.resolve("a", &inertial, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(body.calculation_mode, InertiaCalculationMode::ForceAutomatic);
    }

    #[test]
    fn test_com_follows_position_conversion() {
        let converter = ruf();
        let settings = InertialSettings::default();
        let mut resolver = InertialResolver::new(&converter, &settings);

        let inertial = Inertial::new(1.0, InertiaMatrix::diagonal(0.1, 0.2, 0.3))
            .with_origin(Pose::from_translation(DVec3::new(1.0, 2.0, 3.0)));
        let body = resolver.resolve("a", &inertial, &mut Warnings::new());
        assert_eq!(body.center_of_mass, DVec3::new(-2.0, 3.0, 1.0));

        // Principal moments are a permutation of the FLU diagonal
        assert_eq!(sorted(body.principal.moments), [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_export_inverts_resolve() {
        let settings = InertialSettings::default();
        let inertial = Inertial {
            origin: Some(Pose::new(DVec3::new(0.1, -0.2, 0.3), DVec3::new(0.2, 0.4, -0.6))),
            mass: 2.0,
            inertia: InertiaMatrix {
                ixx: 0.3,
                ixy: 0.02,
                ixz: -0.01,
                iyy: 0.25,
                iyz: 0.03,
                izz: 0.2,
            },
            calculation_mode: Some(InertiaCalculationMode::ForceManual),
        };

        for target in [AxisConvention::Flu, AxisConvention::Ned, AxisConvention::Ruf] {
            let converter = CoordinateConverter::new(&ConversionSettings {
                source: AxisConvention::Flu,
                target,
                length_unit: LengthUnit::Centimeters,
            });
            let mut resolver = InertialResolver::new(&converter, &settings);
            let body = resolver.resolve("a", &inertial, &mut Warnings::new());
            let back = resolver.export(&body);

            assert_eq!(back.mass, 2.0);
            assert_eq!(back.calculation_mode, inertial.calculation_mode);
            let (a, b) = (back.inertia.to_array(), inertial.inertia.to_array());
            for i in 0..6 {
                assert_relative_eq!(a[i], b[i], epsilon = 1e-9);
            }
            let origin = back.origin.unwrap();
            let expected = inertial.origin.unwrap();
            assert_relative_eq!(origin.xyz.x, expected.xyz.x, epsilon = 1e-9);
            assert_relative_eq!(origin.rpy.z, expected.rpy.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_export_elides_identity_origin() {
        let converter = ruf();
        let settings = InertialSettings::default();
        let mut resolver = InertialResolver::new(&converter, &settings);
        let inertial = Inertial::new(1.0, InertiaMatrix::diagonal(0.1, 0.2, 0.3));

        let body = resolver.resolve("a", &inertial, &mut Warnings::new());
        let back = resolver.export(&body);
        assert!(back.origin.is_none());
        assert_eq!(back.inertia, InertiaMatrix::diagonal(0.1, 0.2, 0.3));
        assert!(back.calculation_mode.is_none());
    }
}
