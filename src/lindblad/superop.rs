// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Elementary error-generator superoperators.
//!
//! Each error term acts on density matrices as
//!
//!   H_P(ρ)    = -i[P, ρ]
//!   O_ij(ρ)   = P_i ρ P_j† − ½{P_j† P_i, ρ}
//!   A_P(ρ)    = Tr(ρ) P / d
//!
//! and is turned into a matrix in the Pauli-product Liouville basis.
//! A physical dissipator γ(LρL† − ½{L†L, ρ}) is O_LL scaled by γ.
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.

use ndarray::Array2;
use num_complex::Complex64;

use super::types::CollapseOperator;
use crate::basis::{dagger, Basis, CMatrix};

/// -i[P, ρ]
pub fn hamiltonian_action(p: &CMatrix, rho: &CMatrix) -> CMatrix {
    let i = Complex64::new(0.0, 1.0);
    (p.dot(rho) - rho.dot(p)) * -i
}

/// P_i ρ P_j† − ½{P_j† P_i, ρ}
pub fn stochastic_action(pi: &CMatrix, pj: &CMatrix, rho: &CMatrix) -> CMatrix {
    let pj_dag = dagger(pj);
    let pj_dag_pi = pj_dag.dot(pi);
    let half = Complex64::new(0.5, 0.0);
    pi.dot(rho).dot(&pj_dag) - (pj_dag_pi.dot(rho) + rho.dot(&pj_dag_pi)) * half
}

/// Tr(ρ) P / d
pub fn affine_action(p: &CMatrix, rho: &CMatrix) -> CMatrix {
    let d = rho.nrows() as f64;
    let trace: Complex64 = rho.diag().sum();
    p * (trace / d)
}

/// D[L](ρ) = γ (L ρ L† − ½ L†L ρ − ½ ρ L†L)
pub fn dissipator(op: &CollapseOperator, rho: &CMatrix) -> CMatrix {
    if op.rate == 0.0 {
        return Array2::zeros(rho.raw_dim());
    }
    stochastic_action(&op.matrix, &op.matrix, rho) * Complex64::new(op.rate, 0.0)
}

/// Liouville matrix of H_P.
pub fn hamiltonian_superop(basis: &Basis, p: &CMatrix) -> Array2<f64> {
    basis.superop(|rho| hamiltonian_action(p, rho))
}

/// Liouville matrix of O_ij (complex; only Hermitian combinations are real).
pub fn stochastic_superop(basis: &Basis, pi: &CMatrix, pj: &CMatrix) -> Array2<Complex64> {
    basis.superop_complex(|rho| stochastic_action(pi, pj, rho))
}

/// Liouville matrix of A_P.
pub fn affine_superop(basis: &Basis, p: &CMatrix) -> Array2<f64> {
    basis.superop(|rho| affine_action(p, rho))
}
