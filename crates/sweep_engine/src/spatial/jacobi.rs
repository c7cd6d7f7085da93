//! Cyclic Jacobi eigen-decomposition of symmetric 3x3 matrices
//!
//! Used to find the principal axes of a triangle set's covariance. Runs in
//! f64; the covariance of a large mesh loses too much precision in f32.

use nalgebra::{Matrix3, Vector3};

/// Off-diagonal pairs visited by each sweep
const PIVOTS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Eigenvalues and eigenvectors of a symmetric 3x3 matrix
#[derive(Debug, Clone, Copy)]
pub struct SymmetricEigen3 {
    /// Eigenvalues, in no particular order
    pub eigenvalues: Vector3<f64>,
    /// Matching unit eigenvectors as columns
    pub eigenvectors: Matrix3<f64>,
    /// Sweeps performed
    pub sweeps: usize,
    /// Whether the off-diagonal mass fell below the tolerance
    pub converged: bool,
}

fn off_diagonal_norm(a: &Matrix3<f64>) -> f64 {
    (a[(0, 1)].powi(2) + a[(0, 2)].powi(2) + a[(1, 2)].powi(2)).sqrt()
}

/// Diagonalizes `matrix` by repeated plane rotations
///
/// Stops when the off-diagonal norm drops to `tolerance` times the
/// Frobenius norm, or after `max_sweeps` sweeps. A non-converged result
/// still holds the best iterate reached.
pub fn jacobi_eigen(matrix: &Matrix3<f64>, max_sweeps: usize, tolerance: f64) -> SymmetricEigen3 {
    let mut a = *matrix;
    let mut v = Matrix3::<f64>::identity();

    let scale = a.norm();
    let threshold = tolerance * scale;
    let mut sweeps = 0;

    while off_diagonal_norm(&a) > threshold {
        if sweeps == max_sweeps {
            return SymmetricEigen3 {
                eigenvalues: a.diagonal(),
                eigenvectors: v,
                sweeps,
                converged: false,
            };
        }

        for (p, q) in PIVOTS {
            let apq = a[(p, q)];
            if apq == 0.0 {
                continue;
            }

            let theta = (a[(q, q)] - a[(p, p)]) / (2.0 * apq);
            let t = theta.signum() / (theta.abs() + theta.hypot(1.0));
            let c = 1.0 / t.hypot(1.0);
            let s = t * c;

            let mut rotation = Matrix3::<f64>::identity();
            rotation[(p, p)] = c;
            rotation[(q, q)] = c;
            rotation[(p, q)] = s;
            rotation[(q, p)] = -s;

            a = rotation.transpose() * a * rotation;
            // Clean the annihilated pair so rounding does not leak back in
            a[(p, q)] = 0.0;
            a[(q, p)] = 0.0;
            v *= rotation;
        }
        sweeps += 1;
    }

    SymmetricEigen3 {
        eigenvalues: a.diagonal(),
        eigenvectors: v,
        sweeps,
        converged: true,
    }
}
