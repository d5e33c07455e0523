// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tensor-product state-space descriptions.
//!
//! A state space is an ordered list of factor labels (`"Q0"`, `"Q1"`, …),
//! each with its Liouville dimension (4 for a qubit). The ambient dimension
//! is the product of the factor dimensions, and the first factor is the
//! most significant digit of a flattened index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::validation::validate_num_qubits;

/// Liouville dimension of one qubit.
pub const QUBIT_DIM: usize = 4;

/// Ordered tensor-product factors with their dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpace {
    labels: Vec<String>,
    dims: Vec<usize>,
}

impl StateSpace {
    /// Create a state space from `(label, dimension)` pairs.
    pub fn new<S: Into<String>>(factors: Vec<(S, usize)>) -> Result<Self> {
        let mut labels = Vec::with_capacity(factors.len());
        let mut dims = Vec::with_capacity(factors.len());
        for (label, dim) in factors {
            let label = label.into();
            if dim == 0 {
                return Err(Error::InvalidOperation(format!(
                    "state-space factor '{}' has dimension 0",
                    label
                )));
            }
            if labels.contains(&label) {
                return Err(Error::InvalidOperation(format!(
                    "duplicate state-space label '{}'",
                    label
                )));
            }
            labels.push(label);
            dims.push(dim);
        }
        if labels.is_empty() {
            return Err(Error::InvalidOperation(
                "state space needs at least one factor".into(),
            ));
        }
        Ok(Self { labels, dims })
    }

    /// `n` qubits labelled `Q0..Q{n-1}`.
    pub fn qubits(n: usize) -> Result<Self> {
        validate_num_qubits(n)?;
        Self::new((0..n).map(|i| (format!("Q{}", i), QUBIT_DIM)).collect())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn num_factors(&self) -> usize {
        self.labels.len()
    }

    /// Ambient Liouville dimension (product of factor dimensions).
    pub fn dim(&self) -> usize {
        self.dims.iter().product()
    }

    /// Position of a factor label.
    pub fn index_of(&self, label: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| Error::UnknownLabel(format!("state-space factor '{}'", label)))
    }

    /// Dimension of a factor by label.
    pub fn factor_dim(&self, label: &str) -> Result<usize> {
        Ok(self.dims[self.index_of(label)?])
    }

    /// Number of qubits, if every factor is a qubit.
    pub fn num_qubits(&self) -> Option<usize> {
        self.dims
            .iter()
            .all(|&d| d == QUBIT_DIM)
            .then_some(self.dims.len())
    }

    /// Density-matrix dimension (`dmDim`): square root of the ambient dimension.
    pub fn dm_dim(&self) -> usize {
        (self.dim() as f64).sqrt().round() as usize
    }

    /// Block dimensions (`blockDims`); a single tensor-product block.
    pub fn block_dims(&self) -> Vec<usize> {
        vec![self.dm_dim()]
    }
}

impl fmt::Display for StateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .labels
            .iter()
            .zip(&self.dims)
            .map(|(l, d)| format!("{}:{}", l, d))
            .collect();
        write!(f, "[{}]", parts.join(" ⊗ "))
    }
}
