// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermitian eigen-problems and PSD Cholesky factors.
//!
//! Both go through LAPACK (`heevd` / `potrf`) via ndarray-linalg. Only the
//! lower triangle of the input is read, so inputs are checked for
//! Hermiticity first.

use ndarray::{Array1, Array2};
use ndarray_linalg::{Cholesky, Eigh, UPLO};
use num_complex::Complex64;

use crate::error::{Error, Result};

/// Diagonal shifts tried before a PSD Cholesky factorization gives up.
const MAX_SHIFTS: usize = 12;

fn check_hermitian(a: &Array2<Complex64>, context: &str) -> Result<()> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(Error::dimension(context, n, a.ncols()));
    }
    let scale = a.iter().fold(1.0_f64, |acc, z| acc.max(z.norm()));
    for i in 0..n {
        for j in i..n {
            if (a[[i, j]] - a[[j, i]].conj()).norm() > 1e-10 * scale {
                return Err(Error::InvalidOperation(format!(
                    "{}: matrix is not Hermitian at ({}, {})",
                    context, i, j
                )));
            }
        }
    }
    Ok(())
}

/// Eigen-decomposition of a Hermitian matrix.
///
/// Eigenvalues come back in ascending order with the matching eigenvectors
/// as columns.
pub fn hermitian_eigh(a: &Array2<Complex64>) -> Result<(Array1<f64>, Array2<Complex64>)> {
    check_hermitian(a, "hermitian_eigh")?;
    if a.is_empty() {
        return Ok((Array1::zeros(0), a.clone()));
    }
    Ok(a.eigh(UPLO::Lower)?)
}

/// Eigenvalues of a Hermitian matrix in ascending order.
pub fn hermitian_eigenvalues(a: &Array2<Complex64>) -> Result<Vec<f64>> {
    let (vals, _) = hermitian_eigh(a)?;
    Ok(vals.to_vec())
}

/// Projection of a Hermitian matrix onto the positive semi-definite cone.
///
/// Returns the projected matrix (negative eigenvalues clipped to zero) and
/// the smallest eigenvalue of the input.
pub fn hermitian_psd_projection(a: &Array2<Complex64>) -> Result<(Array2<Complex64>, f64)> {
    let (vals, vecs) = hermitian_eigh(a)?;
    let Some(&min_eigenvalue) = vals.first() else {
        return Ok((a.clone(), 0.0));
    };
    let clipped = Array2::from_diag(&vals.mapv(|x| Complex64::new(x.max(0.0), 0.0)));
    let vecs_dag = vecs.t().mapv(|z| z.conj());
    Ok((vecs.dot(&clipped).dot(&vecs_dag), min_eigenvalue))
}

/// Lower-triangular L with L L† = A for a positive semi-definite A.
///
/// A singular A is factored with a small diagonal shift; columns whose
/// pivot came only from the shift are zeroed, so rank deficiency yields
/// zero columns rather than an error.
pub fn cholesky_psd(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(Error::dimension("cholesky_psd (square input)", n, a.ncols()));
    }
    if n == 0 {
        return Ok(a.clone());
    }
    if let Ok(l) = a.cholesky(UPLO::Lower) {
        return Ok(l);
    }

    let scale = (0..n).map(|i| a[[i, i]].re.abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return Ok(Array2::zeros((n, n)));
    }
    let mut shift = f64::EPSILON * n as f64 * scale;
    for _ in 0..MAX_SHIFTS {
        let shifted = a + &Array2::from_diag(&Array1::from_elem(n, Complex64::new(shift, 0.0)));
        if let Ok(mut l) = shifted.cholesky(UPLO::Lower) {
            for j in 0..n {
                if l[[j, j]].norm_sqr() <= 2.0 * shift {
                    l.column_mut(j).fill(Complex64::new(0.0, 0.0));
                }
            }
            return Ok(l);
        }
        shift *= 10.0;
    }
    Err(Error::Numerical(format!(
        "Cholesky factorization failed after {} diagonal shifts; matrix is not positive semi-definite",
        MAX_SHIFTS
    )))
}
