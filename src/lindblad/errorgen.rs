// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parameterized Lindblad error generators.
//!
//! The generator is the real Liouville matrix
//!
//!   L = Σ_k h_k H_k + Re(Σ_ij η_ij O_ij) + Σ_i a_i A_i
//!
//! over a Hamiltonian basis {P_k} and a non-Hamiltonian basis {P_i}. The
//! parameter vector is `[h..., nonham block..., affine...]`, with the
//! non-Hamiltonian block encoded as described in [`super::params`].

use std::collections::HashSet;

use ndarray::{Array1, Array2, Zip};
use num_complex::Complex64;
use tracing::{debug, warn};

use super::params::{block_to_params, num_nonham_params, params_to_block, NonHamBlock};
use super::superop::{affine_superop, hamiltonian_superop, stochastic_superop};
use super::types::{validate_modes, ErrgenCoeffs, ErrorTerm, NonHamMode, ParamMode};
use crate::basis::{Basis, BasisDict, CMatrix};
use crate::error::{Error, Result};
use crate::linalg::least_squares;
use crate::validation::{validate_param_length, validate_square};

/// Relative tolerance for treating a coefficient's imaginary part as zero.
const REAL_TOL: f64 = 1e-12;

/// Components of a generator outside the term span beyond this are reported.
const RESIDUAL_TOL: f64 = 1e-6;

/// A Lindblad generator with Hamiltonian, stochastic and affine terms.
#[derive(Debug, Clone)]
pub struct LindbladErrorgen {
    basis: Basis,
    nonham_mode: NonHamMode,
    param_mode: ParamMode,
    truncate: bool,
    ham_labels: Vec<String>,
    nonham_labels: Vec<String>,
    basis_dict: BasisDict,
    ham_superops: Vec<Array2<f64>>,
    /// `all`: n² entries, (i, j) at `i * n + j`; diagonal modes: n entries.
    nonham_superops: Vec<Array2<Complex64>>,
    affine_superops: Vec<Array2<f64>>,
    params: Vec<f64>,
}

impl LindbladErrorgen {
    /// Zero generator on a Liouville space of dimension `dim`.
    pub fn new(
        dim: usize,
        ham_basis: &BasisDict,
        nonham_basis: &BasisDict,
        nonham_mode: NonHamMode,
        param_mode: ParamMode,
        truncate: bool,
    ) -> Result<Self> {
        validate_modes(nonham_mode, param_mode)?;
        let basis = Basis::for_dim(dim)?;
        let mdim = basis.matrix_dim();

        let mut basis_dict = BasisDict::new();
        for (label, m) in ham_basis.iter().chain(nonham_basis.iter()) {
            if m.nrows() != mdim || m.ncols() != mdim {
                return Err(Error::dimension(
                    format!("basis element '{}'", label),
                    mdim,
                    m.nrows().max(m.ncols()),
                ));
            }
            basis_dict
                .entry(label.clone())
                .or_insert_with(|| m.clone());
        }

        let ham_superops = ham_basis
            .values()
            .map(|p| hamiltonian_superop(&basis, p))
            .collect();
        let nonham: Vec<&CMatrix> = nonham_basis.values().collect();
        let b = &basis;
        let nonham_superops = if nonham_mode.is_diagonal() {
            nonham
                .iter()
                .map(|p| stochastic_superop(b, p, p))
                .collect()
        } else {
            nonham
                .iter()
                .flat_map(|&pi| nonham.iter().map(move |&pj| stochastic_superop(b, pi, pj)))
                .collect()
        };
        let affine_superops = if nonham_mode.has_affine() {
            nonham.iter().map(|p| affine_superop(b, p)).collect()
        } else {
            Vec::new()
        };

        let num_params =
            ham_basis.len() + num_nonham_params(nonham_mode, param_mode, nonham_basis.len());
        Ok(Self {
            basis,
            nonham_mode,
            param_mode,
            truncate,
            ham_labels: ham_basis.keys().cloned().collect(),
            nonham_labels: nonham_basis.keys().cloned().collect(),
            basis_dict,
            ham_superops,
            nonham_superops,
            affine_superops,
            params: vec![0.0; num_params],
        })
    }

    /// Build a generator whose `get_coeffs()` reproduces `coeffs`.
    ///
    /// Hamiltonian and affine coefficients must be real, and so must the
    /// diagonal stochastic ones. An off-diagonal `S(i,j)` implies its
    /// Hermitian partner `S(j,i)`; giving both inconsistently is an error.
    pub fn from_coeffs(
        coeffs: &ErrgenCoeffs,
        nonham_mode: NonHamMode,
        param_mode: ParamMode,
        truncate: bool,
    ) -> Result<Self> {
        validate_modes(nonham_mode, param_mode)?;

        let mut ham_labels: Vec<String> = Vec::new();
        let mut nonham_labels: Vec<String> = Vec::new();
        for term in coeffs.coeffs.keys() {
            match term {
                ErrorTerm::Hamiltonian { basis_index } => push_unique(&mut ham_labels, basis_index),
                ErrorTerm::Stochastic { basis_i, basis_j } => {
                    if basis_i != basis_j && nonham_mode.is_diagonal() {
                        return Err(Error::InvalidOperation(format!(
                            "off-diagonal term {} needs nonham_mode 'all', got '{}'",
                            term, nonham_mode
                        )));
                    }
                    push_unique(&mut nonham_labels, basis_i);
                    push_unique(&mut nonham_labels, basis_j);
                }
                ErrorTerm::Affine { basis_index } => {
                    if !nonham_mode.has_affine() {
                        return Err(Error::InvalidOperation(format!(
                            "affine term {} needs nonham_mode 'diag_affine', got '{}'",
                            term, nonham_mode
                        )));
                    }
                    push_unique(&mut nonham_labels, basis_index);
                }
            }
        }

        let lookup = |labels: &[String]| -> Result<BasisDict> {
            labels
                .iter()
                .map(|l| {
                    coeffs
                        .basis
                        .get(l)
                        .map(|m| (l.clone(), m.clone()))
                        .ok_or_else(|| Error::UnknownLabel(format!("basis element '{}'", l)))
                })
                .collect()
        };
        let ham_basis = lookup(&ham_labels)?;
        let nonham_basis = lookup(&nonham_labels)?;
        let mdim = ham_basis
            .values()
            .chain(nonham_basis.values())
            .next()
            .map(|m| m.nrows())
            .ok_or_else(|| {
                Error::InvalidOperation(
                    "cannot infer the dimension of an empty coefficient set".into(),
                )
            })?;

        let mut errgen = Self::new(
            mdim * mdim,
            &ham_basis,
            &nonham_basis,
            nonham_mode,
            param_mode,
            truncate,
        )?;

        let position = |labels: &[String], l: &String| labels.iter().position(|x| x == l);
        let mut ham = vec![0.0; ham_labels.len()];
        let mut block = NonHamBlock::zeros(nonham_labels.len(), nonham_mode);
        let mut given: HashSet<(usize, usize)> = HashSet::new();

        for (term, &value) in &coeffs.coeffs {
            match term {
                ErrorTerm::Hamiltonian { basis_index } => {
                    if let Some(k) = position(&ham_labels, basis_index) {
                        ham[k] = require_real(term, value)?;
                    }
                }
                ErrorTerm::Stochastic { basis_i, basis_j } => {
                    let (Some(a), Some(b)) = (
                        position(&nonham_labels, basis_i),
                        position(&nonham_labels, basis_j),
                    ) else {
                        continue;
                    };
                    if a == b {
                        block.eta[[a, a]] = Complex64::new(require_real(term, value)?, 0.0);
                        continue;
                    }
                    if given.contains(&(b, a)) {
                        let partner = block.eta[[a, b]];
                        if (partner - value).norm() > REAL_TOL * value.norm().max(1.0) {
                            return Err(Error::InvalidOperation(format!(
                                "{} = {} is not the conjugate of its partner {}",
                                term,
                                value,
                                partner.conj()
                            )));
                        }
                    }
                    block.eta[[a, b]] = value;
                    block.eta[[b, a]] = value.conj();
                    given.insert((a, b));
                }
                ErrorTerm::Affine { basis_index } => {
                    if let Some(k) = position(&nonham_labels, basis_index) {
                        block.affine[k] = require_real(term, value)?;
                    }
                }
            }
        }

        let mut params = ham;
        params.extend(block_to_params(nonham_mode, param_mode, &block, truncate)?);
        errgen.params = params;
        debug!(
            num_ham = ham_labels.len(),
            num_nonham = nonham_labels.len(),
            num_params = errgen.params.len(),
            "built Lindblad generator from coefficients"
        );
        Ok(errgen)
    }

    /// Decompose a dense generator matrix against the given bases.
    ///
    /// Components outside the span of the error terms are dropped with a
    /// warning.
    pub fn from_generator(
        generator: &Array2<f64>,
        ham_basis: &BasisDict,
        nonham_basis: &BasisDict,
        nonham_mode: NonHamMode,
        param_mode: ParamMode,
        truncate: bool,
    ) -> Result<Self> {
        let mut errgen = Self::new(
            generator.nrows(),
            ham_basis,
            nonham_basis,
            nonham_mode,
            param_mode,
            truncate,
        )?;
        errgen.set_generator(generator)?;
        Ok(errgen)
    }

    /// Re-fit the parameters so that `to_dense()` best matches `generator`.
    ///
    /// The bases and modes are kept, so the parameter count never changes.
    pub fn set_generator(&mut self, generator: &Array2<f64>) -> Result<()> {
        let d = self.basis.dim();
        validate_square("Lindblad generator", generator, d)?;

        let columns = self.term_columns();
        let target: Array1<f64> = generator.iter().copied().collect();
        let target_norm = target.dot(&target).sqrt();

        let (coeffs, residual) = if columns.is_empty() {
            (Vec::new(), target_norm)
        } else {
            let mut t = Array2::<f64>::zeros((d * d, columns.len()));
            for (k, col) in columns.iter().enumerate() {
                for (r, &x) in col.iter().enumerate() {
                    t[[r, k]] = x;
                }
            }
            let c = least_squares(&t, &target)?;
            let diff = t.dot(&c) - &target;
            (c.to_vec(), diff.dot(&diff).sqrt())
        };
        if residual > RESIDUAL_TOL * target_norm.max(1.0) {
            warn!(
                residual,
                "generator has components outside the error basis; they are dropped"
            );
        }

        let (mut params, block) = self.split_term_coeffs(&coeffs);
        params.extend(block_to_params(
            self.nonham_mode,
            self.param_mode,
            &block,
            self.truncate,
        )?);
        self.params = params;
        Ok(())
    }

    /// Real Liouville matrices whose span is the set of representable
    /// generators, in the order of [`Self::split_term_coeffs`].
    fn term_columns(&self) -> Vec<Array2<f64>> {
        let mut cols = self.ham_superops.clone();
        let n = self.nonham_labels.len();
        if self.nonham_mode.is_diagonal() {
            cols.extend(self.nonham_superops.iter().map(|s| s.mapv(|z| z.re)));
        } else {
            for i in 0..n {
                cols.push(self.nonham_superops[i * n + i].mapv(|z| z.re));
                for j in 0..i {
                    let oij = &self.nonham_superops[i * n + j];
                    let oji = &self.nonham_superops[j * n + i];
                    // η_ij = a + ib contributes a·Re(O_ij + O_ji) − b·Im(O_ij − O_ji)
                    cols.push((oij + oji).mapv(|z| z.re));
                    cols.push((oij - oji).mapv(|z| -z.im));
                }
            }
        }
        cols.extend(self.affine_superops.iter().cloned());
        cols
    }

    /// Split linear term coefficients into Hamiltonian values and a block.
    fn split_term_coeffs(&self, coeffs: &[f64]) -> (Vec<f64>, NonHamBlock) {
        let nh = self.ham_labels.len();
        let n = self.nonham_labels.len();
        let mut block = NonHamBlock::zeros(n, self.nonham_mode);
        if coeffs.is_empty() {
            return (vec![0.0; nh], block);
        }
        let mut k = nh;
        if self.nonham_mode.is_diagonal() {
            for i in 0..n {
                block.eta[[i, i]] = Complex64::new(coeffs[k], 0.0);
                k += 1;
            }
        } else {
            for i in 0..n {
                block.eta[[i, i]] = Complex64::new(coeffs[k], 0.0);
                k += 1;
                for j in 0..i {
                    let z = Complex64::new(coeffs[k], coeffs[k + 1]);
                    block.eta[[i, j]] = z;
                    block.eta[[j, i]] = z.conj();
                    k += 2;
                }
            }
        }
        if self.nonham_mode.has_affine() {
            block.affine = coeffs[k..k + n].to_vec();
        }
        (coeffs[..nh].to_vec(), block)
    }

    /// Liouville dimension.
    pub fn dim(&self) -> usize {
        self.basis.dim()
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn nonham_mode(&self) -> NonHamMode {
        self.nonham_mode
    }

    pub fn param_mode(&self) -> ParamMode {
        self.param_mode
    }

    pub fn truncate(&self) -> bool {
        self.truncate
    }

    pub fn ham_labels(&self) -> &[String] {
        &self.ham_labels
    }

    pub fn nonham_labels(&self) -> &[String] {
        &self.nonham_labels
    }

    /// Hamiltonian basis as a dictionary.
    pub fn ham_basis(&self) -> BasisDict {
        self.sub_basis(&self.ham_labels)
    }

    /// Non-Hamiltonian basis as a dictionary.
    pub fn nonham_basis(&self) -> BasisDict {
        self.sub_basis(&self.nonham_labels)
    }

    fn sub_basis(&self, labels: &[String]) -> BasisDict {
        labels
            .iter()
            .filter_map(|l| self.basis_dict.get(l).map(|m| (l.clone(), m.clone())))
            .collect()
    }

    pub fn num_params(&self) -> usize {
        self.params.len()
    }

    pub fn to_vector(&self) -> Vec<f64> {
        self.params.clone()
    }

    /// Set the parameters. Any finite vector of the right length is valid.
    pub fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("LindbladErrorgen::from_vector", self.params.len(), v)?;
        self.params.copy_from_slice(v);
        Ok(())
    }

    /// Current η and affine coefficients.
    pub fn nonham_block(&self) -> NonHamBlock {
        let nh = self.ham_labels.len();
        params_to_block(
            self.nonham_mode,
            self.param_mode,
            self.nonham_labels.len(),
            &self.params[nh..],
        )
    }

    /// The generator matrix L itself (not its exponential).
    pub fn to_dense(&self) -> Array2<f64> {
        let d = self.basis.dim();
        let mut out = Array2::<f64>::zeros((d, d));
        let nh = self.ham_labels.len();
        for (&h, sup) in self.params[..nh].iter().zip(&self.ham_superops) {
            if h != 0.0 {
                out.scaled_add(h, sup);
            }
        }

        let block = self.nonham_block();
        let n = block.len();
        if self.nonham_mode.is_diagonal() {
            for (i, sup) in self.nonham_superops.iter().enumerate() {
                let rate = block.eta[[i, i]].re;
                if rate != 0.0 {
                    Zip::from(&mut out).and(sup).for_each(|o, s| *o += rate * s.re);
                }
            }
        } else {
            for i in 0..n {
                for j in 0..n {
                    let eta = block.eta[[i, j]];
                    if eta.norm() == 0.0 {
                        continue;
                    }
                    Zip::from(&mut out)
                        .and(&self.nonham_superops[i * n + j])
                        .for_each(|o, s| *o += (eta * s).re);
                }
            }
        }

        for (&a, sup) in block.affine.iter().zip(&self.affine_superops) {
            if a != 0.0 {
                out.scaled_add(a, sup);
            }
        }
        out
    }

    /// Coefficients of every representable term plus the basis they use.
    pub fn get_coeffs(&self) -> ErrgenCoeffs {
        let mut out = ErrgenCoeffs {
            basis: self.basis_dict.clone(),
            ..Default::default()
        };
        for (label, &h) in self.ham_labels.iter().zip(&self.params) {
            out.coeffs
                .insert(ErrorTerm::hamiltonian(label.clone()), Complex64::new(h, 0.0));
        }
        let block = self.nonham_block();
        let labels = &self.nonham_labels;
        if self.nonham_mode.is_diagonal() {
            for (i, label) in labels.iter().enumerate() {
                out.coeffs
                    .insert(ErrorTerm::pauli_stochastic(label.clone()), block.eta[[i, i]]);
            }
        } else {
            for (i, li) in labels.iter().enumerate() {
                for (j, lj) in labels.iter().enumerate() {
                    out.coeffs.insert(
                        ErrorTerm::stochastic(li.clone(), lj.clone()),
                        block.eta[[i, j]],
                    );
                }
            }
        }
        for (label, &a) in labels.iter().zip(&block.affine) {
            out.coeffs
                .insert(ErrorTerm::affine(label.clone()), Complex64::new(a, 0.0));
        }
        out
    }

    /// Fail with `NonPositiveErrorGenerator` if η has a negative eigenvalue.
    ///
    /// `cptp` and `depol` generators always pass.
    pub fn check_positivity(&self) -> Result<()> {
        let block = self.nonham_block();
        let min_eigenvalue = block.min_eigenvalue()?;
        let scale = block.eta.iter().fold(1.0_f64, |acc, z| acc.max(z.norm()));
        if min_eigenvalue < -1e-10 * scale {
            return Err(Error::NonPositiveErrorGenerator { min_eigenvalue });
        }
        Ok(())
    }
}

fn push_unique(labels: &mut Vec<String>, label: &str) {
    if !labels.iter().any(|l| l == label) {
        labels.push(label.to_string());
    }
}

fn require_real(term: &ErrorTerm, value: Complex64) -> Result<f64> {
    if value.im.abs() > REAL_TOL * value.norm().max(1.0) {
        return Err(Error::InvalidOperation(format!(
            "coefficient of {} must be real, got {}",
            term, value
        )));
    }
    Ok(value.re)
}
