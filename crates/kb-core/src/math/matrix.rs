//! Symmetric 3×3 matrix helpers on top of `glam::DMat3`

use glam::{DMat3, DVec3};

/// Sum of the diagonal
pub fn trace(m: &DMat3) -> f64 {
    m.x_axis.x + m.y_axis.y + m.z_axis.z
}

pub fn determinant(m: &DMat3) -> f64 {
    m.determinant()
}

pub fn transpose(m: &DMat3) -> DMat3 {
    m.transpose()
}

pub fn matmul(a: &DMat3, b: &DMat3) -> DMat3 {
    *a * *b
}

/// Add `s` to every element
pub fn add_scalar(m: &DMat3, s: f64) -> DMat3 {
    let splat = DVec3::splat(s);
    DMat3::from_cols(m.x_axis + splat, m.y_axis + splat, m.z_axis + splat)
}

/// Subtract `s` from every element
pub fn sub_scalar(m: &DMat3, s: f64) -> DMat3 {
    add_scalar(m, -s)
}

pub fn mul_scalar(m: &DMat3, s: f64) -> DMat3 {
    *m * s
}

/// Element-wise inner product `A : B`
pub fn frobenius_inner(a: &DMat3, b: &DMat3) -> f64 {
    a.x_axis.dot(b.x_axis) + a.y_axis.dot(b.y_axis) + a.z_axis.dot(b.z_axis)
}

/// Diagonal entries as a vector
pub fn diagonal(m: &DMat3) -> DVec3 {
    DVec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z)
}

/// Largest absolute element
pub fn max_abs(m: &DMat3) -> f64 {
    m.x_axis
        .abs()
        .max(m.y_axis.abs())
        .max(m.z_axis.abs())
        .max_element()
}

/// `m - λI`
pub fn shift_diagonal(m: &DMat3, lambda: f64) -> DMat3 {
    *m - DMat3::from_diagonal(DVec3::splat(lambda))
}

/// Symmetric part `(M + Mᵗ) / 2`
pub fn symmetrize(m: &DMat3) -> DMat3 {
    (*m + m.transpose()) * 0.5
}

/// Element-wise comparison relative to the larger of the two magnitudes
pub fn relative_eq(a: &DMat3, b: &DMat3, tolerance: f64) -> bool {
    let scale = max_abs(a).max(max_abs(b)).max(f64::MIN_POSITIVE);
    max_abs(&(*a - *b)) <= tolerance * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> DMat3 {
        DMat3::from_cols(
            DVec3::new(4.0, 1.0, 2.0),
            DVec3::new(1.0, 5.0, 3.0),
            DVec3::new(2.0, 3.0, 6.0),
        )
    }

    #[test]
    fn test_trace_and_determinant() {
        let m = sample();
        assert_relative_eq!(trace(&m), 15.0);
        // 4(30-9) - 1(6-6) + 2(3-10)
        assert_relative_eq!(determinant(&m), 70.0, epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_ops() {
        let m = sample();
        let shifted = add_scalar(&m, 1.0);
        assert_relative_eq!(shifted.y_axis.x, 2.0);
        let back = sub_scalar(&shifted, 1.0);
        assert!(relative_eq(&back, &m, 1e-15));
        assert_relative_eq!(mul_scalar(&m, 2.0).z_axis.z, 12.0);
    }

    #[test]
    fn test_frobenius_inner_is_squared_norm() {
        let m = DMat3::from_diagonal(DVec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(frobenius_inner(&m, &m), 14.0);
    }

    #[test]
    fn test_symmetrize() {
        let m = DMat3::from_cols(
            DVec3::new(1.0, 2.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.0, 0.0, 1.0),
        );
        let s = symmetrize(&m);
        assert_relative_eq!(s.x_axis.y, 1.0);
        assert_relative_eq!(s.y_axis.x, 1.0);
    }
}
