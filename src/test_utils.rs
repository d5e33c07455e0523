// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities for model tests.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::basis::Basis;
use crate::model::Model;
use crate::operators::{op_ref, OpRef, StaticOp};
use crate::spam::{FullVec, TpPovm};

/// Assert two real matrices agree elementwise within `tol`.
pub fn assert_matrix_close(actual: &Array2<f64>, expected: &Array2<f64>, tol: f64) {
    assert_eq!(
        actual.dim(),
        expected.dim(),
        "shape mismatch: {:?} vs {:?}",
        actual.dim(),
        expected.dim()
    );
    for ((i, j), a) in actual.indexed_iter() {
        let e = expected[[i, j]];
        assert!(
            (a - e).abs() <= tol,
            "element ({}, {}) differs: {} vs {} (tol {})",
            i,
            j,
            a,
            e,
            tol
        );
    }
}

/// Assert two real vectors agree elementwise within `tol`.
pub fn assert_vector_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "entry {} differs: {} vs {} (tol {})",
            i,
            a,
            e,
            tol
        );
    }
}

/// Seeded generator so failures are reproducible.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Uniform random values in `[-scale, scale)`.
pub fn random_vector(rng: &mut StdRng, len: usize, scale: f64) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-scale..scale)).collect()
}

/// Uniform random real matrix with entries in `[-scale, scale)`.
pub fn random_matrix(rng: &mut StdRng, dim: usize, scale: f64) -> Array2<f64> {
    Array2::from_shape_fn((dim, dim), |_| rng.gen_range(-scale..scale))
}

/// Static X(π/2) rotation on one qubit.
pub fn x_pi2_static() -> OpRef {
    let basis = Basis::pauli_product(1).unwrap();
    let m = basis
        .rotation_superop("X", std::f64::consts::FRAC_PI_2)
        .unwrap();
    op_ref(StaticOp::new(m).unwrap())
}

/// One-qubit model with a |0⟩ prep, a TP computational POVM and no gates.
pub fn one_qubit_model() -> Model {
    let mut model = Model::qubits(1).unwrap();
    let basis = Basis::pauli_product(1).unwrap();
    let rho0 = basis.ket_vector("0").unwrap();
    model
        .add_prep("rho0", FullVec::new(rho0).unwrap())
        .unwrap();
    let effects: Vec<(String, Array1<f64>)> = basis
        .bitstrings()
        .into_iter()
        .map(|b| {
            let v = basis.ket_vector(&b).unwrap();
            (b, v)
        })
        .collect();
    model
        .add_povm("Mdefault", TpPovm::new(effects).unwrap())
        .unwrap();
    model
}
