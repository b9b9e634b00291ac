//! Inertia algebra on symmetric 3×3 matrices

pub mod eigen;
mod inertia;
mod jacobi;
pub mod matrix;

pub use eigen::{EigenTolerance, eigenvalues, eigenvectors, symmetric_eigen};
pub use inertia::{InertiaMatrix, PrincipalInertia, round_to_digits};
pub use jacobi::diagonalize;
