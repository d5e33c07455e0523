// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Real linear solves.

use ndarray::{s, Array1, Array2, Axis};

use crate::error::{Error, Result};

/// Pivots below this magnitude (relative to the largest entry) are singular.
const SINGULAR_TOL: f64 = 1e-13;

/// Solve A * X = B for X using Gaussian elimination with partial pivoting.
pub fn solve(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(Error::dimension("solve (square system)", n, a.ncols()));
    }
    if b.nrows() != n {
        return Err(Error::dimension("solve (right-hand side rows)", n, b.nrows()));
    }
    let m = b.ncols();

    // Augmented matrix [A | B]
    let mut aug = Array2::<f64>::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(a);
    aug.slice_mut(s![.., n..]).assign(b);

    let scale = a.iter().fold(0.0_f64, |acc, x| acc.max(x.abs())).max(1.0);

    for col in 0..n {
        let (max_row, max_val) = (col..n)
            .map(|row| (row, aug[[row, col]].abs()))
            .fold((col, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });

        if max_val < SINGULAR_TOL * scale {
            return Err(Error::Numerical(format!(
                "matrix is singular (pivot {:.3e} in column {})",
                max_val, col
            )));
        }

        if max_row != col {
            for j in 0..(n + m) {
                aug.swap([col, j], [max_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for row in (col + 1)..n {
            let factor = aug[[row, col]] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..(n + m) {
                let val = aug[[col, j]];
                aug[[row, j]] -= factor * val;
            }
        }
    }

    // Back substitution
    let mut x = Array2::<f64>::zeros((n, m));
    for row in (0..n).rev() {
        let pivot = aug[[row, row]];
        for j in 0..m {
            let mut sum = aug[[row, n + j]];
            for k in (row + 1)..n {
                sum -= aug[[row, k]] * x[[k, j]];
            }
            x[[row, j]] = sum / pivot;
        }
    }
    Ok(x)
}

/// Inverse of a square matrix.
pub fn inverse(a: &Array2<f64>) -> Result<Array2<f64>> {
    solve(a, &Array2::eye(a.nrows()))
}

/// Least-squares solution of A x ≈ b via the normal equations.
///
/// The columns of `a` must be linearly independent.
pub fn least_squares(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if a.nrows() != b.len() {
        return Err(Error::dimension("least_squares (rows)", a.nrows(), b.len()));
    }
    let at = a.t();
    let gram = at.dot(a);
    let rhs = at.dot(b).insert_axis(Axis(1));
    let x = solve(&gram, &rhs)?;
    Ok(x.column(0).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_matrix_close;
    use ndarray::array;

    #[test]
    fn test_solve_identity() {
        let b = array![[1.0, 2.0], [3.0, 4.0]];
        let x = solve(&Array2::eye(2), &b).unwrap();
        assert_matrix_close(&x, &b, 1e-15);
    }

    #[test]
    fn test_solve_requires_pivoting() {
        let a = array![[0.0, 1.0], [1.0, 0.0]];
        let b = array![[2.0], [3.0]];
        let x = solve(&a, &b).unwrap();
        assert_matrix_close(&x, &array![[3.0], [2.0]], 1e-15);
    }

    #[test]
    fn test_inverse_round_trip() {
        let a = array![[4.0, 7.0, 1.0], [2.0, 6.0, 0.5], [1.0, 0.0, 3.0]];
        let inv = inverse(&a).unwrap();
        assert_matrix_close(&a.dot(&inv), &Array2::eye(3), 1e-12);
    }

    #[test]
    fn test_singular_matrix_is_an_error() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(inverse(&a), Err(Error::Numerical(_))));
    }

    #[test]
    fn test_least_squares_exact_fit() {
        // Overdetermined but consistent system
        let a = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let b = array![2.0, -1.0, 1.0];
        let x = least_squares(&a, &b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_rejects_bad_rhs() {
        let a = Array2::<f64>::eye(3);
        let b = Array2::<f64>::zeros((2, 1));
        assert!(matches!(solve(&a, &b), Err(Error::DimensionMismatch { .. })));
    }
}
