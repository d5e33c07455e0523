// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matrix exponential via scaling-and-squaring with Padé(13) approximation.
//!
//! Implements the algorithm from:
//!   Higham (2005), "The Scaling and Squaring Method for the Matrix
//!   Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.
//!
//! Lindblad generators in the Pauli-product basis are real, so this
//! variant works on `Array2<f64>` and reports a singular Padé denominator
//! as an error instead of substituting a fallback.

use ndarray::Array2;

use super::norm_1;
use super::solve::solve;
use crate::error::{Error, Result};

/// theta_13 from Higham Table 10.2.
const THETA_13: f64 = 5.37;

/// Padé(13,13) coefficients b_k / b_0, Higham (2005) eq. (10.33).
const PADE_COEFFS: [f64; 14] = [
    1.0,
    0.5,
    0.12,
    1.833_333_333_333_333_3e-2,
    1.992_753_623_188_405_7e-3,
    1.630_434_782_608_695_8e-4,
    1.035_196_687_370_600_3e-5,
    5.175_983_436_853_002e-7,
    2.043_151_356_652_500_8e-8,
    6.306_022_705_717_595e-10,
    1.483_770_048_404_14e-11,
    2.529_153_491_597_966e-13,
    2.810_170_546_219_962_3e-15,
    1.544_049_750_670_308_8e-17,
];

/// Compute exp(A) for a real square matrix.
///
/// # Errors
/// `DimensionMismatch` if `a` is not square, `Numerical` if the Padé
/// denominator is singular (only possible for non-finite input).
pub fn matrix_exp(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(Error::dimension("matrix_exp (square input)", n, a.ncols()));
    }
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    if n == 1 {
        return Ok(Array2::from_elem((1, 1), a[[0, 0]].exp()));
    }
    if a.iter().any(|x| !x.is_finite()) {
        return Err(Error::Numerical("matrix_exp input is not finite".into()));
    }

    // Choose s such that ||A/2^s||_1 < theta_13
    let norm = norm_1(a);
    let s = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as i32
    } else {
        0
    };

    let a_scaled = a * 2f64.powi(-s);
    let mut result = pade13(&a_scaled)?;

    // exp(A) = exp(A/2^s)^(2^s)
    for _ in 0..s {
        result = result.dot(&result);
    }
    Ok(result)
}

/// Padé(13,13) approximation of exp(A) for ||A||_1 <= theta_13.
fn pade13(a: &Array2<f64>) -> Result<Array2<f64>> {
    let b = &PADE_COEFFS;
    let eye = Array2::<f64>::eye(a.nrows());

    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    // U = A [A6 (b13 A6 + b11 A4 + b9 A2) + b7 A6 + b5 A4 + b3 A2 + b1 I]
    let w1 = &a6 * b[13] + &a4 * b[11] + &a2 * b[9];
    let w2 = w1.dot(&a6) + &a6 * b[7] + &a4 * b[5] + &a2 * b[3] + &eye * b[1];
    let u = a.dot(&w2);

    // V = A6 (b12 A6 + b10 A4 + b8 A2) + b6 A6 + b4 A4 + b2 A2 + b0 I
    let v1 = &a6 * b[12] + &a4 * b[10] + &a2 * b[8];
    let v = v1.dot(&a6) + &a6 * b[6] + &a4 * b[4] + &a2 * b[2] + &eye * b[0];

    // exp(A) ≈ (V - U)^{-1} (V + U)
    solve(&(&v - &u), &(&v + &u))
        .map_err(|e| Error::Numerical(format!("Padé denominator is singular: {}", e)))
}
