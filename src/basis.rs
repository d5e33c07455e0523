// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pauli-product bases and Liouville-space conversions.
//!
//! Density matrices of n qubits are represented as real vectors of length
//! 4^n by expanding them in the normalised Pauli-product ("pp") basis
//! B_k = σ_{k1} ⊗ … ⊗ σ_{kn} / √(2^n). Every Hermiticity-preserving
//! linear map then becomes a real 4^n × 4^n matrix, M_jk = Tr(B_j Λ(B_k)).
//!
//! Error terms of a Lindblad generator use the *unnormalised* Pauli
//! products (σx, σx⊗σy, …) so that a coefficient of 0.1 on `"X"` means
//! H = 0.1 σx.

use indexmap::IndexMap;
use ndarray::{linalg::kron, Array1, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result};
use crate::validation::validate_num_qubits;

/// Complex square matrix acting on the Hilbert space.
pub type CMatrix = Array2<Complex64>;

/// Mapping from basis label (e.g. `"X"`, `"XZ"`) to its matrix.
pub type BasisDict = IndexMap<String, CMatrix>;

const PAULI_CHARS: [char; 4] = ['I', 'X', 'Y', 'Z'];

/// Single-qubit Pauli matrix for `I`, `X`, `Y` or `Z`.
pub fn pauli(label: char) -> Option<CMatrix> {
    let z = Complex64::new(0.0, 0.0);
    let one = Complex64::new(1.0, 0.0);
    let i = Complex64::new(0.0, 1.0);
    let m = match label {
        'I' => [[one, z], [z, one]],
        'X' => [[z, one], [one, z]],
        'Y' => [[z, -i], [i, z]],
        'Z' => [[one, z], [z, -one]],
        _ => return None,
    };
    Some(Array2::from_shape_fn((2, 2), |(r, c)| m[r][c]))
}

/// Unnormalised Pauli product for a label such as `"XIZ"`.
///
/// The first character acts on the first (most significant) tensor factor.
pub fn pauli_product(label: &str) -> Result<CMatrix> {
    if label.is_empty() {
        return Err(Error::UnknownLabel("empty Pauli label".into()));
    }
    let mut m = Array2::from_elem((1, 1), Complex64::new(1.0, 0.0));
    for ch in label.chars() {
        let p = pauli(ch)
            .ok_or_else(|| Error::UnknownLabel(format!("Pauli label '{}'", label)))?;
        m = kron(&m, &p);
    }
    Ok(m)
}

/// All Pauli labels on `num_qubits` qubits, identity first.
pub fn pauli_labels(num_qubits: usize) -> Vec<String> {
    let mut labels = vec![String::new()];
    for _ in 0..num_qubits {
        labels = labels
            .iter()
            .flat_map(|prefix| PAULI_CHARS.iter().map(move |c| format!("{}{}", prefix, c)))
            .collect();
    }
    labels
}

/// Unnormalised Pauli error basis on `num_qubits` qubits (identity excluded).
pub fn pauli_error_basis(num_qubits: usize) -> Result<BasisDict> {
    validate_num_qubits(num_qubits)?;
    pauli_labels(num_qubits)
        .into_iter()
        .filter(|l| l.chars().any(|c| c != 'I'))
        .map(|l| pauli_product(&l).map(|m| (l, m)))
        .collect()
}

/// Tr(A B) without forming the product.
pub fn trace_product(a: &CMatrix, b: &CMatrix) -> Complex64 {
    let n = a.nrows();
    let mut sum = Complex64::new(0.0, 0.0);
    for i in 0..n {
        for k in 0..n {
            sum += a[[i, k]] * b[[k, i]];
        }
    }
    sum
}

/// Conjugate transpose (dagger) of a matrix.
pub fn dagger(m: &CMatrix) -> CMatrix {
    m.t().mapv(|z| z.conj())
}

/// Normalised Pauli-product basis of a multi-qubit Liouville space.
#[derive(Debug, Clone)]
pub struct Basis {
    num_qubits: usize,
    labels: Vec<String>,
    matrices: Vec<CMatrix>,
}

impl Basis {
    /// Build the "pp" basis for `num_qubits` qubits.
    pub fn pauli_product(num_qubits: usize) -> Result<Self> {
        validate_num_qubits(num_qubits)?;
        let norm = Complex64::new(1.0 / 2f64.powi(num_qubits as i32).sqrt(), 0.0);
        let labels = pauli_labels(num_qubits);
        let matrices = labels
            .iter()
            .map(|l| pauli_product(l).map(|m| m * norm))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            num_qubits,
            labels,
            matrices,
        })
    }

    /// Basis for the Hilbert-space dimension `matrix_dim` (must be 2^n).
    pub fn for_matrix_dim(matrix_dim: usize) -> Result<Self> {
        if !matrix_dim.is_power_of_two() || matrix_dim < 2 {
            return Err(Error::InvalidOperation(format!(
                "Pauli-product basis needs a power-of-two matrix dimension, got {}",
                matrix_dim
            )));
        }
        Self::pauli_product(matrix_dim.trailing_zeros() as usize)
    }

    /// Basis for the Liouville dimension `dim` (must be 4^n).
    pub fn for_dim(dim: usize) -> Result<Self> {
        let matrix_dim = (dim as f64).sqrt().round() as usize;
        if matrix_dim * matrix_dim != dim {
            return Err(Error::InvalidOperation(format!(
                "Liouville dimension {} is not a perfect square",
                dim
            )));
        }
        Self::for_matrix_dim(matrix_dim)
    }

    /// Short name used in model files.
    pub fn name(&self) -> &'static str {
        "pp"
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Liouville dimension (4^n).
    pub fn dim(&self) -> usize {
        self.matrices.len()
    }

    /// Hilbert-space dimension (2^n).
    pub fn matrix_dim(&self) -> usize {
        1 << self.num_qubits
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn matrices(&self) -> &[CMatrix] {
        &self.matrices
    }

    /// Value of the first Liouville component of any unit-trace state.
    pub fn trace_normalization(&self) -> f64 {
        1.0 / (self.matrix_dim() as f64).sqrt()
    }

    fn check_matrix(&self, m: &CMatrix, context: &str) -> Result<()> {
        let d = self.matrix_dim();
        if m.nrows() != d || m.ncols() != d {
            return Err(Error::dimension(context, d, m.nrows().max(m.ncols())));
        }
        Ok(())
    }

    /// Liouville vector of a Hermitian matrix: v_k = Tr(B_k ρ).
    pub fn to_liouville(&self, rho: &CMatrix) -> Result<Array1<f64>> {
        self.check_matrix(rho, "Basis::to_liouville")?;
        Ok(self
            .matrices
            .iter()
            .map(|b| trace_product(b, rho).re)
            .collect())
    }

    /// Matrix with Liouville coordinates `v`: ρ = Σ v_k B_k.
    pub fn from_liouville(&self, v: &Array1<f64>) -> Result<CMatrix> {
        if v.len() != self.dim() {
            return Err(Error::dimension("Basis::from_liouville", self.dim(), v.len()));
        }
        let d = self.matrix_dim();
        let mut rho = CMatrix::zeros((d, d));
        for (b, &x) in self.matrices.iter().zip(v.iter()) {
            if x != 0.0 {
                rho = rho + b * Complex64::new(x, 0.0);
            }
        }
        Ok(rho)
    }

    /// Complex superoperator matrix M_jk = Tr(B_j f(B_k)).
    pub fn superop_complex<F>(&self, f: F) -> Array2<Complex64>
    where
        F: Fn(&CMatrix) -> CMatrix,
    {
        let n = self.dim();
        let mut m = Array2::<Complex64>::zeros((n, n));
        for (k, bk) in self.matrices.iter().enumerate() {
            let image = f(bk);
            for (j, bj) in self.matrices.iter().enumerate() {
                m[[j, k]] = trace_product(bj, &image);
            }
        }
        m
    }

    /// Real superoperator matrix of a Hermiticity-preserving map.
    pub fn superop<F>(&self, f: F) -> Array2<f64>
    where
        F: Fn(&CMatrix) -> CMatrix,
    {
        self.superop_complex(f).mapv(|z| z.re)
    }

    /// Liouville vector of the identity; the total every TP POVM sums to.
    pub fn identity_vector(&self) -> Array1<f64> {
        let mut v = Array1::zeros(self.dim());
        v[0] = (self.matrix_dim() as f64).sqrt();
        v
    }

    /// Liouville vector of the computational projector |b⟩⟨b| for a bitstring.
    pub fn ket_vector(&self, bits: &str) -> Result<Array1<f64>> {
        if bits.len() != self.num_qubits {
            return Err(Error::dimension(
                format!("ket '{}' length", bits),
                self.num_qubits,
                bits.len(),
            ));
        }
        let index = usize::from_str_radix(bits, 2)
            .map_err(|_| Error::UnknownLabel(format!("bitstring '{}'", bits)))?;
        let d = self.matrix_dim();
        let mut rho = CMatrix::zeros((d, d));
        rho[[index, index]] = Complex64::new(1.0, 0.0);
        self.to_liouville(&rho)
    }

    /// All computational bitstrings, `"00"`, `"01"`, … in index order.
    pub fn bitstrings(&self) -> Vec<String> {
        (0..self.matrix_dim())
            .map(|i| format!("{:0width$b}", i, width = self.num_qubits))
            .collect()
    }

    /// Superoperator of ρ ↦ U ρ U†.
    pub fn unitary_superop(&self, u: &CMatrix) -> Result<Array2<f64>> {
        self.check_matrix(u, "Basis::unitary_superop")?;
        let u_dag = dagger(u);
        Ok(self.superop(|rho| u.dot(rho).dot(&u_dag)))
    }

    /// Superoperator of the rotation exp(-i θ P / 2) about a Pauli product P.
    pub fn rotation_superop(&self, pauli_label: &str, angle: f64) -> Result<Array2<f64>> {
        let p = pauli_product(pauli_label)?;
        self.check_matrix(&p, "Basis::rotation_superop")?;
        let eye = CMatrix::eye(self.matrix_dim());
        // P² = I, so exp(-iθP/2) = cos(θ/2) I - i sin(θ/2) P
        let u = eye * Complex64::new((angle / 2.0).cos(), 0.0)
            + p * Complex64::new(0.0, -(angle / 2.0).sin());
        self.unitary_superop(&u)
    }
}
