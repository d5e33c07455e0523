// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Real matrix logarithm via inverse scaling-and-squaring.
//!
//! Repeated Denman–Beavers square roots bring A close to the identity,
//! the Gregory series log(X) = 2 Σ Z^(2k+1)/(2k+1), Z = (X - I)(X + I)^{-1}
//! is summed there, and the result is scaled back by 2^k.
//!
//! Ref: Higham, "Functions of Matrices" (2008), §6.3 and §11.5.
//!
//! Only the principal real logarithm is produced; matrices with negative
//! real eigenvalues have none and are reported as `Numerical` errors.

use ndarray::Array2;

use super::solve::{inverse, solve};
use super::{max_abs_diff, norm_1};
use crate::error::{Error, Result};

/// Square roots are taken until ||X - I||_1 drops below this.
const NEAR_IDENTITY: f64 = 0.25;
const MAX_SQRT_STEPS: usize = 48;
const MAX_DB_ITERATIONS: usize = 64;
const MAX_SERIES_TERMS: usize = 200;

/// Compute the principal logarithm of a real square matrix.
pub fn matrix_log(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(Error::dimension("matrix_log (square input)", n, a.ncols()));
    }
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }
    if n == 1 {
        let x = a[[0, 0]];
        if x <= 0.0 {
            return Err(Error::Numerical(format!(
                "no real logarithm of scalar {}",
                x
            )));
        }
        return Ok(Array2::from_elem((1, 1), x.ln()));
    }

    let eye = Array2::<f64>::eye(n);
    let mut x = a.clone();
    let mut k = 0;
    while norm_1(&(&x - &eye)) > NEAR_IDENTITY {
        if k == MAX_SQRT_STEPS {
            return Err(Error::Numerical(
                "matrix_log: square roots did not approach the identity".into(),
            ));
        }
        x = sqrtm_denman_beavers(&x)?;
        k += 1;
    }

    let z = solve(&(&x + &eye), &(&x - &eye))?;
    let z2 = z.dot(&z);
    let mut power = z.clone();
    let mut sum = z;
    for term in 1..MAX_SERIES_TERMS {
        power = power.dot(&z2);
        let contribution = &power / (2 * term + 1) as f64;
        let size = norm_1(&contribution);
        sum += &contribution;
        if size < 1e-18 {
            break;
        }
    }

    Ok(sum * (2.0 * 2f64.powi(k as i32)))
}

/// Principal square root by the Denman–Beavers iteration.
fn sqrtm_denman_beavers(a: &Array2<f64>) -> Result<Array2<f64>> {
    let mut y = a.clone();
    let mut z = Array2::<f64>::eye(a.nrows());
    for _ in 0..MAX_DB_ITERATIONS {
        let y_inv = inverse(&y)?;
        let z_inv = inverse(&z)?;
        let y_next = (&y + &z_inv) * 0.5;
        let z_next = (&z + &y_inv) * 0.5;
        let change = max_abs_diff(&y_next, &y);
        y = y_next;
        z = z_next;
        if change <= 1e-14 * norm_1(&y).max(1.0) {
            return Ok(y);
        }
    }
    Err(Error::Numerical(
        "matrix square root did not converge".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::matrix_exp;
    use crate::test_utils::assert_matrix_close;
    use ndarray::array;

    #[test]
    fn test_log_identity_is_zero() {
        let result = matrix_log(&Array2::eye(4)).unwrap();
        assert_matrix_close(&result, &Array2::zeros((4, 4)), 1e-15);
    }

    #[test]
    fn test_log_diagonal() {
        let a = array![[2.0, 0.0], [0.0, 0.5]];
        let result = matrix_log(&a).unwrap();
        let expected = array![[2.0_f64.ln(), 0.0], [0.0, 0.5_f64.ln()]];
        assert_matrix_close(&result, &expected, 1e-12);
    }

    #[test]
    fn test_log_inverts_exp() {
        let g = array![
            [0.0, 0.0, 0.0, 0.0],
            [0.0, -0.02, -0.3, 0.01],
            [0.0, 0.3, -0.02, 0.0],
            [0.01, 0.0, 0.0, -0.01]
        ];
        let m = matrix_exp(&g).unwrap();
        let back = matrix_log(&m).unwrap();
        assert_matrix_close(&back, &g, 1e-10);
    }

    #[test]
    fn test_log_of_far_rotation() {
        // Rotation by 2.0 rad needs several square roots
        let theta = 2.0_f64;
        let a = array![[theta.cos(), -theta.sin()], [theta.sin(), theta.cos()]];
        let result = matrix_log(&a).unwrap();
        assert_matrix_close(&result, &array![[0.0, -theta], [theta, 0.0]], 1e-10);
    }

    #[test]
    fn test_log_negative_scalar_fails() {
        assert!(matrix_log(&array![[-1.0]]).is_err());
    }

    #[test]
    fn test_log_singular_fails() {
        let a = array![[1.0, 0.0], [0.0, 0.0]];
        assert!(matrix_log(&a).is_err());
    }
}
