// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense linear-algebra kernels used by the operator model.
//!
//! Superoperators in the Pauli-product basis are real, so the exponential,
//! logarithm and linear solves work on `Array2<f64>`. The non-Hamiltonian
//! coefficient matrix of a Lindblad generator is complex Hermitian; its
//! eigenvalues, positive-part projection and Cholesky factor live in
//! [`eigh`].
//!
//! # Modules
//!
//! - [`expm`]: Matrix exponential via scaling-and-squaring + Padé(13)
//! - [`logm`]: Matrix logarithm via inverse scaling-and-squaring
//! - [`solve`]: Gaussian elimination, inverse, least squares
//! - [`eigh`]: Hermitian eigensolver, PSD projection and Cholesky (LAPACK)

pub mod eigh;
pub mod expm;
pub mod logm;
pub mod solve;

pub use eigh::{cholesky_psd, hermitian_eigenvalues, hermitian_eigh, hermitian_psd_projection};
pub use expm::matrix_exp;
pub use logm::matrix_log;
pub use solve::{inverse, least_squares, solve};

use ndarray::Array2;

/// 1-norm of a real matrix: max column sum of absolute values.
pub fn norm_1(a: &Array2<f64>) -> f64 {
    a.columns()
        .into_iter()
        .map(|col| col.iter().map(|x| x.abs()).sum::<f64>())
        .fold(0.0, f64::max)
}

/// Largest absolute elementwise difference between two matrices of equal shape.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
