// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operators of the form exp(L) · U0.

use ndarray::Array2;

use super::{op_ref, LinearOperator, OpRef, StaticOp};
use crate::basis::BasisDict;
use crate::error::{Error, Result};
use crate::lindblad::{ErrgenCoeffs, LindbladErrorgen, NonHamMode, ParamMode};
use crate::linalg::{inverse, matrix_exp, matrix_log};
use crate::validation::validate_square;

/// A fixed base operator followed by an exponentiated error generator.
///
/// Only the generator carries parameters; the base is a reference point.
#[derive(Debug, Clone)]
pub struct LindbladOp {
    base: OpRef,
    errgen: LindbladErrorgen,
}

impl LindbladOp {
    pub fn new(base: OpRef, errgen: LindbladErrorgen) -> Result<Self> {
        let base_dim = base.read().dim();
        if base_dim != errgen.dim() {
            return Err(Error::dimension("LindbladOp base", errgen.dim(), base_dim));
        }
        Ok(Self { base, errgen })
    }

    /// exp(L) with an identity base.
    pub fn from_errgen(errgen: LindbladErrorgen) -> Self {
        Self {
            base: op_ref(StaticOp::identity(errgen.dim())),
            errgen,
        }
    }

    /// Fit a generator so that exp(L) · base reproduces `gate`.
    ///
    /// L = log(gate · base⁻¹) is decomposed against the given bases; a
    /// missing base means the identity.
    pub fn from_operator_matrix(
        gate: &Array2<f64>,
        base: Option<OpRef>,
        ham_basis: &BasisDict,
        nonham_basis: &BasisDict,
        nonham_mode: NonHamMode,
        param_mode: ParamMode,
        truncate: bool,
    ) -> Result<Self> {
        let dim = gate.nrows();
        validate_square("LindbladOp gate", gate, dim)?;
        let base = base.unwrap_or_else(|| op_ref(StaticOp::identity(dim)));
        let errgen =
            LindbladErrorgen::new(dim, ham_basis, nonham_basis, nonham_mode, param_mode, truncate)?;
        let mut op = Self::new(base, errgen)?;
        op.set_dense(gate)?;
        Ok(op)
    }

    pub fn errgen(&self) -> &LindbladErrorgen {
        &self.errgen
    }

    pub fn base(&self) -> &OpRef {
        &self.base
    }

    pub fn get_errgen_coeffs(&self) -> ErrgenCoeffs {
        self.errgen.get_coeffs()
    }

    fn base_dense(&self) -> Result<Array2<f64>> {
        self.base.read().to_dense().map_err(|e| match e {
            Error::NotDenseRepresentable(msg) => {
                Error::NotDenseRepresentable(format!("Lindblad base operator: {}", msg))
            }
            other => other,
        })
    }
}

impl LinearOperator for LindbladOp {
    fn dim(&self) -> usize {
        self.errgen.dim()
    }

    fn kind(&self) -> &'static str {
        "lindblad"
    }

    fn num_params(&self) -> usize {
        self.errgen.num_params()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.errgen.to_vector()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        self.errgen.from_vector(v)
    }

    fn to_dense(&self) -> Result<Array2<f64>> {
        let exp_l = matrix_exp(&self.errgen.to_dense())?;
        Ok(exp_l.dot(&self.base_dense()?))
    }

    /// Re-fit the generator to log(m · base⁻¹); the parameter count is kept.
    fn set_dense(&mut self, m: &Array2<f64>) -> Result<()> {
        validate_square("LindbladOp::set_dense", m, self.dim())?;
        let base_inv = inverse(&self.base_dense()?)?;
        let generator = matrix_log(&m.dot(&base_inv))?;
        self.errgen.set_generator(&generator)
    }

    fn check_positivity(&self) -> Result<()> {
        self.errgen.check_positivity()?;
        self.base.read().check_positivity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::pauli_error_basis;
    use crate::test_utils::{assert_matrix_close, random_vector, seeded_rng, x_pi2_static};
    use approx::assert_relative_eq;

    fn one_qubit_errgen(nonham_mode: NonHamMode, param_mode: ParamMode) -> LindbladErrorgen {
        let basis = pauli_error_basis(1).unwrap();
        LindbladErrorgen::new(4, &basis, &basis, nonham_mode, param_mode, false).unwrap()
    }

    #[test]
    fn test_zero_generator_returns_base() {
        let x = x_pi2_static();
        let op = LindbladOp::new(x.clone(), one_qubit_errgen(NonHamMode::All, ParamMode::Cptp))
            .unwrap();
        assert_eq!(op.num_params(), 12);
        assert_matrix_close(&op.to_dense().unwrap(), &x.read().to_dense().unwrap(), 1e-15);
    }

    #[test]
    fn test_fit_reproduces_noisy_gate() {
        let mut errgen = one_qubit_errgen(NonHamMode::All, ParamMode::Cptp);
        let mut rng = seeded_rng(21);
        let mut params = random_vector(&mut rng, 12, 0.05);
        for i in 0..3 {
            params[3 + i * 3 + i] = params[3 + i * 3 + i].abs() + 0.05;
        }
        errgen.from_vector(&params).unwrap();
        let x = x_pi2_static();
        let noisy = LindbladOp::new(x.clone(), errgen).unwrap();
        let gate = noisy.to_dense().unwrap();

        let basis = pauli_error_basis(1).unwrap();
        let fitted = LindbladOp::from_operator_matrix(
            &gate,
            Some(x),
            &basis,
            &basis,
            NonHamMode::All,
            ParamMode::Cptp,
            false,
        )
        .unwrap();
        assert_matrix_close(&fitted.to_dense().unwrap(), &gate, 1e-9);
        crate::test_utils::assert_vector_close(&fitted.to_vector(), &params, 1e-8);
    }

    #[test]
    fn test_set_dense_without_base_captures_rotation() {
        let target = x_pi2_static().read().to_dense().unwrap();
        let mut op = LindbladOp::from_errgen(one_qubit_errgen(NonHamMode::Diagonal, ParamMode::Cptp));
        assert_eq!(op.num_params(), 6);
        op.set_dense(&target).unwrap();
        assert_matrix_close(&op.to_dense().unwrap(), &target, 1e-10);

        // X(π/2) = exp(-i (π/4) X) is a pure H(X) term of π/4
        let coeffs = op.get_errgen_coeffs().coeffs;
        let hx = coeffs[&crate::lindblad::ErrorTerm::hamiltonian("X")];
        assert_relative_eq!(hx.re, std::f64::consts::FRAC_PI_4, epsilon = 1e-10);
        let sx = coeffs[&crate::lindblad::ErrorTerm::pauli_stochastic("X")];
        assert_relative_eq!(sx.re, 0.0, epsilon = 1e-10);
        assert_eq!(op.num_params(), 6);
    }

    #[test]
    fn test_parameters_delegate_to_generator() {
        let mut op = LindbladOp::from_errgen(one_qubit_errgen(NonHamMode::Diagonal, ParamMode::Depol));
        assert_eq!(op.num_params(), 4);
        op.from_vector(&[0.0, 0.0, 0.0, 0.1]).unwrap();
        assert_eq!(op.errgen().to_vector(), vec![0.0, 0.0, 0.0, 0.1]);
        let dense = op.to_dense().unwrap();
        // Uniform Pauli noise shrinks every non-identity component equally
        assert_relative_eq!(dense[[1, 1]], dense[[2, 2]], epsilon = 1e-14);
        assert_relative_eq!(dense[[2, 2]], dense[[3, 3]], epsilon = 1e-14);
        assert!(dense[[1, 1]] < 1.0);
        assert_relative_eq!(dense[[0, 0]], 1.0, epsilon = 1e-14);
        assert!(op.from_vector(&[0.1]).is_err());
    }

    #[test]
    fn test_base_dimension_checked() {
        let errgen = one_qubit_errgen(NonHamMode::All, ParamMode::Cptp);
        assert!(LindbladOp::new(op_ref(StaticOp::identity(16)), errgen).is_err());
    }

    #[test]
    fn test_unconstrained_positivity_surfaces() {
        let mut op =
            LindbladOp::from_errgen(one_qubit_errgen(NonHamMode::Diagonal, ParamMode::Unconstrained));
        op.from_vector(&[0.0, 0.0, 0.0, 0.01, -0.02, 0.0]).unwrap();
        assert!(matches!(
            op.check_positivity(),
            Err(Error::NonPositiveErrorGenerator { .. })
        ));

        let wrapped = crate::operators::ComposedOp::new(4, vec![x_pi2_static(), op_ref(op)]).unwrap();
        assert!(wrapped.check_positivity().is_err());
    }
}
