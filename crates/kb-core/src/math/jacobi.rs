//! Quaternion-Jacobi diagonalization of symmetric 3×3 tensors
//!
//! Each sweep rotates the working frame about one axis to cancel the largest
//! off-diagonal entry of `Rᵗ M R`. The rotation is accumulated as a
//! quaternion, so the result stays orthonormal regardless of how many sweeps
//! run, and the loop is bounded by [`JACOBI_MAX_ITERATIONS`].

use glam::{DMat3, DQuat, DVec3};

use super::inertia::PrincipalInertia;
use super::matrix::diagonal;
use crate::constants::{JACOBI_LARGE_COT, JACOBI_MAX_ITERATIONS};

/// Diagonalize a symmetric tensor.
///
/// Moments are returned in the order of the rotated frame's axes, not sorted.
/// `PrincipalInertia::to_matrix` reconstructs `m`.
pub fn diagonalize(m: &DMat3) -> PrincipalInertia {
    let mut q = DQuat::IDENTITY;

    for _ in 0..JACOBI_MAX_ITERATIONS {
        let r = DMat3::from_quat(q);
        let d = r.transpose() * *m * r;

        // (d12, d02, d01): off-diagonal entry facing each axis
        let offdiag = DVec3::new(d.z_axis.y, d.z_axis.x, d.y_axis.x);
        let om = offdiag.abs();
        let k = if om.x > om.y && om.x > om.z {
            0
        } else if om.y > om.z {
            1
        } else {
            2
        };

        if offdiag[k] == 0.0 {
            break;
        }

        let k1 = (k + 1) % 3;
        let k2 = (k + 2) % 3;

        // cot(2φ) for the rotation in the (k1, k2) plane
        let mut theta = (d.col(k2)[k2] - d.col(k1)[k1]) / (2.0 * offdiag[k]);
        let sgn = if theta < 0.0 { -1.0 } else { 1.0 };
        theta *= sgn;

        let root = if theta < JACOBI_LARGE_COT {
            (theta * theta + 1.0).sqrt()
        } else {
            theta
        };
        let t = sgn / (theta + root);
        let c = 1.0 / (t * t + 1.0).sqrt();
        if c == 1.0 {
            // Angle too small to change anything
            break;
        }

        let mut axis = DVec3::ZERO;
        axis[k] = -sgn * ((1.0 - c) / 2.0).sqrt();
        let w = (1.0 - axis[k] * axis[k]).sqrt();
        if w == 1.0 {
            break;
        }

        q = (q * DQuat::from_xyzw(axis.x, axis.y, axis.z, w)).normalize();
    }

    let r = DMat3::from_quat(q);
    PrincipalInertia {
        moments: diagonal(&(r.transpose() * *m * r)),
        rotation: q,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::eigen::{EigenTolerance, eigenvalues, symmetric_eigen};
    use crate::math::matrix::relative_eq;
    use approx::assert_relative_eq;

    /// Reproducible xorshift64 sequence in [-1, 1)
    struct XorShift(u64);

    impl XorShift {
        fn next_f64(&mut self) -> f64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 >> 11) as f64 / (1u64 << 52) as f64 - 1.0
        }

        fn quat(&mut self) -> DQuat {
            let v = DVec3::new(self.next_f64(), self.next_f64(), self.next_f64());
            DQuat::from_scaled_axis(v * std::f64::consts::PI)
        }

        /// Physically plausible tensor: positive moments in a random frame
        fn tensor(&mut self) -> DMat3 {
            let moments = DVec3::new(
                self.next_f64().abs() + 0.01,
                self.next_f64().abs() + 0.01,
                self.next_f64().abs() + 0.01,
            );
            let r = DMat3::from_quat(self.quat());
            r * DMat3::from_diagonal(moments) * r.transpose()
        }
    }

    fn sorted(v: DVec3) -> [f64; 3] {
        let mut values = v.to_array();
        values.sort_by(f64::total_cmp);
        values
    }

    #[test]
    fn test_diagonal_input_is_unchanged() {
        let m = DMat3::from_diagonal(DVec3::new(0.1, 0.2, 0.3));
        let principal = diagonalize(&m);
        assert_eq!(principal.rotation, DQuat::IDENTITY);
        assert_eq!(principal.moments, DVec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_rotation_is_normalized() {
        let m = DMat3::from_cols(
            DVec3::new(1.0, 0.4, -0.2),
            DVec3::new(0.4, 2.0, 0.6),
            DVec3::new(-0.2, 0.6, 3.0),
        );
        let principal = diagonalize(&m);
        assert_relative_eq!(principal.rotation.length(), 1.0, epsilon = 1e-12);
        assert!(relative_eq(&principal.to_matrix(), &m, 1e-9));
    }

    #[test]
    fn test_single_coupling_term() {
        // [[1, 1], [1, 1]] in the xy-plane has eigenvalues 0 and 2
        let m = DMat3::from_cols(
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 5.0),
        );
        let principal = diagonalize(&m);
        let values = sorted(principal.moments);
        assert_relative_eq!(values[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(values[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(values[2], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_random_tensors_reconstruct_and_match_closed_form() {
        let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);

        for _ in 0..500 {
            let m = rng.tensor();
            let principal = diagonalize(&m);
            assert!(relative_eq(&principal.to_matrix(), &m, 1e-4));

            let jacobi = sorted(principal.moments);
            let closed = sorted(eigenvalues(&m));
            let scale = closed[2].abs();
            for i in 0..3 {
                assert!((jacobi[i] - closed[i]).abs() <= 1e-4 * scale);
            }
        }
    }

    #[test]
    fn test_near_diagonal_tensors() {
        let mut rng = XorShift(42);

        for _ in 0..200 {
            let base = DMat3::from_diagonal(DVec3::new(
                rng.next_f64().abs() + 0.1,
                rng.next_f64().abs() + 0.1,
                rng.next_f64().abs() + 0.1,
            ));
            let (a, b, c) = (
                rng.next_f64() * 1e-7,
                rng.next_f64() * 1e-7,
                rng.next_f64() * 1e-7,
            );
            let noise = DMat3::from_cols(
                DVec3::new(0.0, a, b),
                DVec3::new(a, 0.0, c),
                DVec3::new(b, c, 0.0),
            );
            let m = base + noise;
            let principal = diagonalize(&m);
            assert!(relative_eq(&principal.to_matrix(), &m, 1e-4));
        }
    }

    #[test]
    fn test_highly_coupled_tensor_agrees_with_closed_form() {
        let m = DMat3::from_cols(
            DVec3::new(1.0, 0.99, 0.98),
            DVec3::new(0.99, 1.0, 0.99),
            DVec3::new(0.98, 0.99, 1.0),
        );
        let principal = diagonalize(&m);
        assert!(relative_eq(&principal.to_matrix(), &m, 1e-4));

        let (closed, rotation) = symmetric_eigen(&m, EigenTolerance::default());
        assert_relative_eq!(rotation.determinant(), 1.0, epsilon = 1e-9);
        let jacobi = sorted(principal.moments);
        for i in 0..3 {
            assert!((jacobi[i] - closed[i]).abs() <= 1e-4 * closed.z);
        }
    }
}
