//! Closed-form eigen decomposition of real symmetric 3×3 matrices
//!
//! Eigenvalues come from the trigonometric solution of the characteristic
//! cubic. Eigenvectors are recovered with an orthogonal-complement
//! construction: the eigenvector of the best separated eigenvalue is the
//! largest cross product of two rows of `M - λI`, the second one solves a 2×2
//! problem inside the plane orthogonal to it, and the third is their cross
//! product.
//!
//! The production path is [`super::diagonalize`]; this module is kept as an
//! independent reference used for validation.

use std::f64::consts::PI;

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use super::matrix::{frobenius_inner, max_abs, shift_diagonal, trace};
use crate::constants::DEFAULT_EIGEN_TOLERANCE;

/// Relative threshold deciding when eigenvalues are considered equal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EigenTolerance(pub f64);

impl Default for EigenTolerance {
    fn default() -> Self {
        Self(DEFAULT_EIGEN_TOLERANCE)
    }
}

impl EigenTolerance {
    fn equal(&self, a: f64, b: f64, scale: f64) -> bool {
        (a - b).abs() <= self.0 * scale.max(f64::MIN_POSITIVE)
    }
}

/// Eigenvalues in descending order: `λ0 ≥ λ1 ≥ λ2`
pub fn eigenvalues(m: &DMat3) -> DVec3 {
    let q = trace(m) / 3.0;
    let shifted = shift_diagonal(m, q);
    let p = (frobenius_inner(&shifted, &shifted) / 6.0).sqrt();

    if p <= f64::EPSILON * q.abs().max(f64::MIN_POSITIVE) {
        return DVec3::splat(q);
    }

    let b = shifted * (1.0 / p);
    let r = (b.determinant() / 2.0).clamp(-1.0, 1.0);
    let theta = r.acos() / 3.0;

    let largest = q + 2.0 * p * theta.cos();
    let smallest = q + 2.0 * p * (theta + 2.0 * PI / 3.0).cos();
    // The trace fixes the middle one without another cosine
    let middle = 3.0 * q - largest - smallest;

    DVec3::new(largest, middle, smallest)
}

/// Full decomposition: eigenvalues ascending and a right-handed rotation whose
/// columns are the matching unit eigenvectors.
pub fn symmetric_eigen(m: &DMat3, tolerance: EigenTolerance) -> (DVec3, DMat3) {
    let scale = max_abs(m);
    if scale == 0.0 {
        return (DVec3::ZERO, DMat3::IDENTITY);
    }

    // Work on a unit-scale copy to keep the cubic well conditioned
    let normalized = *m * (1.0 / scale);
    let values = eigenvalues(&normalized);
    let vectors = eigenvectors(&normalized, values, tolerance);

    let mut pairs = [
        (values.x, vectors[0]),
        (values.y, vectors[1]),
        (values.z, vectors[2]),
    ];
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut rotation = DMat3::from_cols(pairs[0].1, pairs[1].1, pairs[2].1);
    if rotation.determinant() < 0.0 {
        rotation.z_axis = -rotation.z_axis;
    }

    (
        DVec3::new(pairs[0].0, pairs[1].0, pairs[2].0) * scale,
        rotation,
    )
}

/// Unit eigenvectors matching `values` (same order as `values`)
pub fn eigenvectors(m: &DMat3, values: DVec3, tolerance: EigenTolerance) -> [DVec3; 3] {
    let spread = (values.x - values.z).abs().max(values.x.abs()).max(values.z.abs());

    // Any repeated pair leaves the 2×2 step without a unique answer
    let degenerate = tolerance.equal(values.x, values.y, spread)
        || tolerance.equal(values.y, values.z, spread);
    if degenerate {
        return [DVec3::X, DVec3::Y, DVec3::Z];
    }

    // Start from the eigenvalue farthest from the middle one
    let gap_first = (values.x - values.y).abs();
    let gap_last = (values.y - values.z).abs();
    let (first, second, third) = if gap_first >= gap_last {
        (0, 1, 2)
    } else {
        (2, 1, 0)
    };

    let evec_first = eigenvector_from_rows(m, values[first]);
    let evec_second = eigenvector_in_complement(m, evec_first, values[second]);
    let evec_third = evec_first.cross(evec_second);

    let mut result = [DVec3::ZERO; 3];
    result[first] = evec_first;
    result[second] = evec_second;
    result[third] = evec_third;
    result
}

/// Eigenvector for a simple eigenvalue from the null space of `M - λI`
fn eigenvector_from_rows(m: &DMat3, lambda: f64) -> DVec3 {
    let shifted = shift_diagonal(m, lambda);
    let (r0, r1, r2) = (shifted.row(0), shifted.row(1), shifted.row(2));

    let candidates = [r0.cross(r1), r0.cross(r2), r1.cross(r2)];
    let (best, best_len2) = candidates
        .iter()
        .map(|c| (*c, c.length_squared()))
        .fold((DVec3::X, 0.0), |acc, item| if item.1 > acc.1 { item } else { acc });

    if best_len2 > 0.0 {
        best / best_len2.sqrt()
    } else {
        DVec3::X
    }
}

/// Orthonormal pair spanning the plane orthogonal to unit `w`
fn orthogonal_complement(w: DVec3) -> (DVec3, DVec3) {
    let u = if w.x.abs() > w.y.abs() {
        let inv = 1.0 / (w.x * w.x + w.z * w.z).sqrt();
        DVec3::new(-w.z * inv, 0.0, w.x * inv)
    } else {
        let inv = 1.0 / (w.y * w.y + w.z * w.z).sqrt();
        DVec3::new(0.0, w.z * inv, -w.y * inv)
    };
    (u, w.cross(u))
}

/// Second eigenvector, solved as a 2×2 problem in the complement of `evec`
fn eigenvector_in_complement(m: &DMat3, evec: DVec3, lambda: f64) -> DVec3 {
    let (u, v) = orthogonal_complement(evec);
    let au = *m * u;
    let av = *m * v;

    let mut m00 = u.dot(au) - lambda;
    let mut m01 = u.dot(av);
    let mut m11 = v.dot(av) - lambda;
    let (abs00, abs01, abs11) = (m00.abs(), m01.abs(), m11.abs());

    if abs00.max(abs01) >= abs11 {
        if abs00.max(abs01) == 0.0 {
            return u;
        }
        if abs00 >= abs01 {
            m01 /= m00;
            m00 = 1.0 / (1.0 + m01 * m01).sqrt();
            m01 *= m00;
        } else {
            m00 /= m01;
            m01 = 1.0 / (1.0 + m00 * m00).sqrt();
            m00 *= m01;
        }
        u * m01 - v * m00
    } else {
        if abs11.max(abs01) == 0.0 {
            return u;
        }
        if abs11 >= abs01 {
            m01 /= m11;
            m11 = 1.0 / (1.0 + m01 * m01).sqrt();
            m01 *= m11;
        } else {
            m11 /= m01;
            m01 = 1.0 / (1.0 + m11 * m11).sqrt();
            m11 *= m01;
        }
        u * m11 - v * m01
    }
}
