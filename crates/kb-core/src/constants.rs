//! Global constants for kb-core

/// Smallest mass a resolved rigid body may carry (kg)
pub const DEFAULT_MIN_MASS: f64 = 0.1;

/// Floor for each principal moment of inertia (kg·m²)
pub const DEFAULT_MIN_INERTIA: f64 = 1e-6;

/// Maximum quaternion-Jacobi sweeps when diagonalizing an inertia tensor
pub const JACOBI_MAX_ITERATIONS: usize = 24;

/// Above this |cot(2φ)| the Jacobi update uses the asymptotic form of tan(φ)
pub const JACOBI_LARGE_COT: f64 = 1e12;

/// Relative threshold under which two eigenvalues are treated as equal
pub const DEFAULT_EIGEN_TOLERANCE: f64 = 1e-9;

/// Decimal places kept for inertia components written on export
pub const INERTIA_ROUND_DIGITS: i32 = 10;

/// Decimal places kept for converted poses, axes and lengths on export
pub const EXPORT_ROUND_DIGITS: i32 = 12;

/// Axis vectors shorter than this are replaced by the default axis
pub const MIN_AXIS_NORM: f64 = 1e-6;

/// |upper - lower| at or below which a revolute joint counts as locked
pub const ZERO_RANGE_TOLERANCE: f64 = 1e-9;

/// `<dynamics spring>` when the attribute is absent
pub const DEFAULT_SPRING: f64 = 1000.0;

/// `<dynamics damping>` when the attribute is absent
pub const DEFAULT_DAMPING: f64 = 10.0;

/// Linear damping assigned to freshly resolved bodies
pub const DEFAULT_LINEAR_DAMPING: f64 = 0.0;

/// Angular damping assigned to freshly resolved bodies
pub const DEFAULT_ANGULAR_DAMPING: f64 = 0.05;
