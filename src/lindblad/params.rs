// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parameter encodings of the non-Hamiltonian block.
//!
//! For `n` non-Hamiltonian basis elements the block is an `n × n`
//! Hermitian coefficient matrix η plus (in `diag_affine` mode) `n` affine
//! coefficients. Parameter layouts:
//!
//! | nonham_mode   | cptp                  | depol      | unconstrained          |
//! |---------------|-----------------------|------------|------------------------|
//! | `all`         | n² (factor L, η=LL†)  | invalid    | n² (Re/Im parts of η)  |
//! | `diagonal`    | n  (η_ii = p_i²)      | 1 (p²)     | n  (η_ii = p_i)        |
//! | `diag_affine` | n + n                 | 1 + n      | n + n                  |
//!
//! In the `all` layouts a parameter matrix P (row-major) holds diagonal
//! entries on its diagonal, real parts below and imaginary parts above.
//! Affine coefficients are always stored unconstrained after the η block.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::warn;

use super::types::{NonHamMode, ParamMode};
use crate::error::{Error, Result};
use crate::linalg::{cholesky_psd, hermitian_eigenvalues, hermitian_psd_projection};

/// Eigenvalues above `-NEGATIVITY_TOL · scale` count as non-negative.
const NEGATIVITY_TOL: f64 = 1e-10;

/// Non-Hamiltonian coefficients in dense form.
#[derive(Debug, Clone, PartialEq)]
pub struct NonHamBlock {
    /// Hermitian η, `n × n`; off-diagonals are zero in diagonal modes.
    pub eta: Array2<Complex64>,
    /// Affine coefficients (empty unless `diag_affine`).
    pub affine: Vec<f64>,
}

impl NonHamBlock {
    pub fn zeros(n: usize, nonham_mode: NonHamMode) -> Self {
        Self {
            eta: Array2::zeros((n, n)),
            affine: if nonham_mode.has_affine() {
                vec![0.0; n]
            } else {
                Vec::new()
            },
        }
    }

    pub fn len(&self) -> usize {
        self.eta.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.eta.nrows() == 0
    }

    /// Smallest eigenvalue of η (0 for an empty block).
    pub fn min_eigenvalue(&self) -> Result<f64> {
        if self.is_empty() {
            return Ok(0.0);
        }
        Ok(hermitian_eigenvalues(&self.eta)?[0])
    }
}

/// Parameters used by the η block alone.
fn num_eta_params(nonham_mode: NonHamMode, param_mode: ParamMode, n: usize) -> usize {
    match (nonham_mode, param_mode) {
        (NonHamMode::All, _) => n * n,
        (_, ParamMode::Depol) => usize::from(n > 0),
        _ => n,
    }
}

/// Total parameters of the non-Hamiltonian block.
pub fn num_nonham_params(nonham_mode: NonHamMode, param_mode: ParamMode, n: usize) -> usize {
    let affine = if nonham_mode.has_affine() { n } else { 0 };
    num_eta_params(nonham_mode, param_mode, n) + affine
}

/// Decode parameters into η and affine coefficients.
///
/// Every real input gives a valid block; in `cptp` and `depol` modes the
/// resulting η is positive semi-definite by construction.
pub fn params_to_block(
    nonham_mode: NonHamMode,
    param_mode: ParamMode,
    n: usize,
    params: &[f64],
) -> NonHamBlock {
    let mut block = NonHamBlock::zeros(n, nonham_mode);
    let n_eta = num_eta_params(nonham_mode, param_mode, n);
    let (eta_params, affine_params) = params.split_at(n_eta.min(params.len()));

    match (nonham_mode, param_mode) {
        (NonHamMode::All, ParamMode::Unconstrained) => {
            for i in 0..n {
                block.eta[[i, i]] = Complex64::new(eta_params[i * n + i], 0.0);
                for j in 0..i {
                    let z = Complex64::new(eta_params[i * n + j], eta_params[j * n + i]);
                    block.eta[[i, j]] = z;
                    block.eta[[j, i]] = z.conj();
                }
            }
        }
        (NonHamMode::All, _) => {
            let mut l = Array2::<Complex64>::zeros((n, n));
            for i in 0..n {
                l[[i, i]] = Complex64::new(eta_params[i * n + i], 0.0);
                for j in 0..i {
                    l[[i, j]] = Complex64::new(eta_params[i * n + j], eta_params[j * n + i]);
                }
            }
            let l_dag = l.t().mapv(|z| z.conj());
            block.eta = l.dot(&l_dag);
        }
        (_, ParamMode::Depol) => {
            if let Some(&p) = eta_params.first() {
                for i in 0..n {
                    block.eta[[i, i]] = Complex64::new(p * p, 0.0);
                }
            }
        }
        (_, ParamMode::Cptp) => {
            for (i, &p) in eta_params.iter().enumerate() {
                block.eta[[i, i]] = Complex64::new(p * p, 0.0);
            }
        }
        (_, ParamMode::Unconstrained) => {
            for (i, &p) in eta_params.iter().enumerate() {
                block.eta[[i, i]] = Complex64::new(p, 0.0);
            }
        }
    }

    if nonham_mode.has_affine() {
        block.affine = affine_params.to_vec();
    }
    block
}

/// Encode η and affine coefficients as parameters.
///
/// In `cptp`/`depol` modes an η outside the representable set (negative
/// eigenvalues, unequal depolarization rates) is projected onto it when
/// `truncate` is set and rejected otherwise.
pub fn block_to_params(
    nonham_mode: NonHamMode,
    param_mode: ParamMode,
    block: &NonHamBlock,
    truncate: bool,
) -> Result<Vec<f64>> {
    let n = block.len();
    let scale = block.eta.iter().fold(1.0_f64, |acc, z| acc.max(z.norm()));
    let tol = NEGATIVITY_TOL * scale;
    let mut params = Vec::with_capacity(num_nonham_params(nonham_mode, param_mode, n));

    match (nonham_mode, param_mode) {
        (NonHamMode::All, ParamMode::Unconstrained) => {
            let mut p = vec![0.0; n * n];
            for i in 0..n {
                p[i * n + i] = block.eta[[i, i]].re;
                for j in 0..i {
                    p[i * n + j] = block.eta[[i, j]].re;
                    p[j * n + i] = block.eta[[i, j]].im;
                }
            }
            params.extend(p);
        }
        (NonHamMode::All, _) => {
            let eta = psd_or_truncate(&block.eta, tol, truncate)?;
            let l = cholesky_psd(&eta)?;
            let mut p = vec![0.0; n * n];
            for i in 0..n {
                p[i * n + i] = l[[i, i]].re;
                for j in 0..i {
                    p[i * n + j] = l[[i, j]].re;
                    p[j * n + i] = l[[i, j]].im;
                }
            }
            params.extend(p);
        }
        (_, ParamMode::Depol) => {
            if n > 0 {
                let diag: Vec<f64> = (0..n).map(|i| block.eta[[i, i]].re).collect();
                let mean = diag.iter().sum::<f64>() / n as f64;
                if diag.iter().any(|d| (d - mean).abs() > tol) {
                    if !truncate {
                        return Err(Error::InvalidOperation(
                            "depolarizing generator needs equal stochastic rates".into(),
                        ));
                    }
                    warn!(mean, "averaging unequal stochastic rates into one depolarization rate");
                }
                params.push(checked_sqrt(mean, tol, truncate)?);
            }
        }
        (_, ParamMode::Cptp) => {
            for i in 0..n {
                params.push(checked_sqrt(block.eta[[i, i]].re, tol, truncate)?);
            }
        }
        (_, ParamMode::Unconstrained) => {
            params.extend((0..n).map(|i| block.eta[[i, i]].re));
        }
    }

    if nonham_mode.has_affine() {
        if block.affine.len() != n {
            return Err(Error::dimension("affine coefficients", n, block.affine.len()));
        }
        params.extend_from_slice(&block.affine);
    }
    Ok(params)
}

fn psd_or_truncate(eta: &Array2<Complex64>, tol: f64, truncate: bool) -> Result<Array2<Complex64>> {
    if eta.is_empty() {
        return Ok(eta.clone());
    }
    let (projected, min_eigenvalue) = hermitian_psd_projection(eta)?;
    if min_eigenvalue >= -tol {
        return Ok(eta.clone());
    }
    if !truncate {
        return Err(Error::InvalidOperation(format!(
            "stochastic coefficient matrix is not positive semi-definite (min eigenvalue {:.3e})",
            min_eigenvalue
        )));
    }
    warn!(min_eigenvalue, "truncating stochastic coefficients to the positive cone");
    Ok(projected)
}

fn checked_sqrt(rate: f64, tol: f64, truncate: bool) -> Result<f64> {
    if rate >= 0.0 {
        return Ok(rate.sqrt());
    }
    if rate >= -tol {
        return Ok(0.0);
    }
    if !truncate {
        return Err(Error::InvalidOperation(format!(
            "negative stochastic rate {:.3e} cannot be represented",
            rate
        )));
    }
    warn!(rate, "truncating negative stochastic rate to zero");
    Ok(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_vector_close, random_vector, seeded_rng};
    use approx::assert_relative_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_param_counts() {
        use NonHamMode::*;
        use ParamMode::*;
        assert_eq!(num_nonham_params(All, Cptp, 3), 9);
        assert_eq!(num_nonham_params(All, Unconstrained, 3), 9);
        assert_eq!(num_nonham_params(Diagonal, Cptp, 3), 3);
        assert_eq!(num_nonham_params(Diagonal, Depol, 3), 1);
        assert_eq!(num_nonham_params(DiagAffine, Depol, 3), 4);
        assert_eq!(num_nonham_params(DiagAffine, Unconstrained, 3), 6);
        assert_eq!(num_nonham_params(Diagonal, Depol, 0), 0);
    }

    #[test]
    fn test_cptp_eta_is_psd_for_random_params() {
        let mut rng = seeded_rng(7);
        for _ in 0..50 {
            let params = random_vector(&mut rng, 9, 2.0);
            let block = params_to_block(NonHamMode::All, ParamMode::Cptp, 3, &params);
            let min = block.min_eigenvalue().unwrap();
            assert!(min > -1e-12, "negative eigenvalue {}", min);
        }
    }

    #[test]
    fn test_cptp_round_trip_through_eta() {
        let mut rng = seeded_rng(11);
        let mut params = random_vector(&mut rng, 9, 1.0);
        // Positive factor diagonal makes the Cholesky factor unique
        for i in 0..3 {
            params[i * 3 + i] = params[i * 3 + i].abs() + 0.1;
        }
        let block = params_to_block(NonHamMode::All, ParamMode::Cptp, 3, &params);
        let back = block_to_params(NonHamMode::All, ParamMode::Cptp, &block, false).unwrap();
        assert_vector_close(&back, &params, 1e-10);
    }

    #[test]
    fn test_unconstrained_all_layout() {
        // P = [[a, b], [c, d]] → η = [[a, c - ib], [c + ib, d]]
        let block = params_to_block(
            NonHamMode::All,
            ParamMode::Unconstrained,
            2,
            &[0.1, 0.2, 0.3, 0.4],
        );
        assert_eq!(block.eta[[0, 0]], c(0.1, 0.0));
        assert_eq!(block.eta[[1, 0]], c(0.3, 0.2));
        assert_eq!(block.eta[[0, 1]], c(0.3, -0.2));
        assert_eq!(block.eta[[1, 1]], c(0.4, 0.0));
        let back =
            block_to_params(NonHamMode::All, ParamMode::Unconstrained, &block, false).unwrap();
        assert_eq!(back, vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_non_psd_rejected_or_truncated() {
        let mut block = NonHamBlock::zeros(2, NonHamMode::All);
        block.eta[[0, 0]] = c(0.1, 0.0);
        block.eta[[1, 1]] = c(-0.05, 0.0);
        assert!(matches!(
            block_to_params(NonHamMode::All, ParamMode::Cptp, &block, false),
            Err(Error::InvalidOperation(_))
        ));
        let params = block_to_params(NonHamMode::All, ParamMode::Cptp, &block, true).unwrap();
        let back = params_to_block(NonHamMode::All, ParamMode::Cptp, 2, &params);
        assert_relative_eq!(back.eta[[0, 0]].re, 0.1, epsilon = 1e-12);
        assert_relative_eq!(back.eta[[1, 1]].re, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_depol_shares_one_rate() {
        let block = params_to_block(NonHamMode::Diagonal, ParamMode::Depol, 3, &[0.2]);
        for i in 0..3 {
            assert_relative_eq!(block.eta[[i, i]].re, 0.04, epsilon = 1e-15);
        }
        let back = block_to_params(NonHamMode::Diagonal, ParamMode::Depol, &block, false).unwrap();
        assert_vector_close(&back, &[0.2], 1e-14);

        let mut uneven = block.clone();
        uneven.eta[[0, 0]] = c(0.1, 0.0);
        assert!(block_to_params(NonHamMode::Diagonal, ParamMode::Depol, &uneven, false).is_err());
        assert!(block_to_params(NonHamMode::Diagonal, ParamMode::Depol, &uneven, true).is_ok());
    }

    #[test]
    fn test_diag_affine_appends_affine() {
        let params = [0.1, 0.2, -0.3, 0.05];
        let block = params_to_block(NonHamMode::DiagAffine, ParamMode::Cptp, 2, &params);
        assert_relative_eq!(block.eta[[0, 0]].re, 0.01, epsilon = 1e-15);
        assert_relative_eq!(block.eta[[1, 1]].re, 0.04, epsilon = 1e-15);
        assert_eq!(block.affine, vec![-0.3, 0.05]);
        let back =
            block_to_params(NonHamMode::DiagAffine, ParamMode::Cptp, &block, false).unwrap();
        assert_vector_close(&back, &params, 1e-14);
    }

    #[test]
    fn test_unconstrained_diagonal_allows_negative_rates() {
        let block = params_to_block(NonHamMode::Diagonal, ParamMode::Unconstrained, 2, &[-0.1, 0.2]);
        assert_relative_eq!(block.min_eigenvalue().unwrap(), -0.1, epsilon = 1e-12);
    }
}
