// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense operators: static, fully parameterized, and trace-preserving.

use ndarray::{s, Array2};

use super::LinearOperator;
use crate::error::{Error, Result};
use crate::validation::{
    validate_depolarization, validate_finite, validate_param_length, validate_square,
    validate_tp_matrix,
};

fn checked_matrix(context: &str, m: Array2<f64>) -> Result<Array2<f64>> {
    validate_square(context, &m, m.nrows())?;
    let values: Vec<f64> = m.iter().copied().collect();
    validate_finite(context, &values)?;
    Ok(m.as_standard_layout().into_owned())
}

/// Scale rows 1.. (the non-identity output components) by `1 - amount`.
fn depolarize_rows(matrix: &mut Array2<f64>, amount: f64) -> Result<()> {
    validate_depolarization(amount)?;
    matrix
        .slice_mut(s![1.., ..])
        .mapv_inplace(|x| x * (1.0 - amount));
    Ok(())
}

/// Fixed matrix with no parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticOp {
    matrix: Array2<f64>,
}

impl StaticOp {
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        Ok(Self {
            matrix: checked_matrix("StaticOp", matrix)?,
        })
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: Array2::eye(dim),
        }
    }
}

impl LinearOperator for StaticOp {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn kind(&self) -> &'static str {
        "static"
    }

    fn num_params(&self) -> usize {
        0
    }

    fn to_vector(&self) -> Vec<f64> {
        Vec::new()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        if v.is_empty() {
            return Ok(());
        }
        Err(Error::InvalidOperation(format!(
            "static operator has no parameters, got {}",
            v.len()
        )))
    }

    fn to_dense(&self) -> Result<Array2<f64>> {
        Ok(self.matrix.clone())
    }
}

/// Every matrix element is a parameter (row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct FullOp {
    matrix: Array2<f64>,
}

impl FullOp {
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        Ok(Self {
            matrix: checked_matrix("FullOp", matrix)?,
        })
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: Array2::eye(dim),
        }
    }
}

impl LinearOperator for FullOp {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn kind(&self) -> &'static str {
        "full"
    }

    fn num_params(&self) -> usize {
        self.matrix.len()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.matrix.iter().copied().collect()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("FullOp::from_vector", self.matrix.len(), v)?;
        for (dst, &src) in self.matrix.iter_mut().zip(v) {
            *dst = src;
        }
        Ok(())
    }

    fn to_dense(&self) -> Result<Array2<f64>> {
        Ok(self.matrix.clone())
    }

    fn set_dense(&mut self, m: &Array2<f64>) -> Result<()> {
        validate_square("FullOp::set_dense", m, self.dim())?;
        self.matrix = checked_matrix("FullOp::set_dense", m.clone())?;
        Ok(())
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        depolarize_rows(&mut self.matrix, amount)
    }
}

/// First row fixed to `[1, 0, ..., 0]`; the remaining rows are parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TpOp {
    matrix: Array2<f64>,
}

impl TpOp {
    /// Fails with `InvalidOperation` unless the first row is `[1, 0, ..., 0]`.
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        let mut matrix = checked_matrix("TpOp", matrix)?;
        if matrix.nrows() == 0 {
            return Err(Error::InvalidOperation("TpOp needs dimension > 0".into()));
        }
        validate_tp_matrix("TpOp", &matrix)?;
        matrix.row_mut(0).fill(0.0);
        matrix[[0, 0]] = 1.0;
        Ok(Self { matrix })
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            matrix: Array2::eye(dim),
        }
    }
}

impl LinearOperator for TpOp {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn kind(&self) -> &'static str {
        "tp"
    }

    fn num_params(&self) -> usize {
        let d = self.dim();
        d * d.saturating_sub(1)
    }

    fn to_vector(&self) -> Vec<f64> {
        self.matrix.slice(s![1.., ..]).iter().copied().collect()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("TpOp::from_vector", self.num_params(), v)?;
        for (dst, &src) in self.matrix.slice_mut(s![1.., ..]).iter_mut().zip(v) {
            *dst = src;
        }
        Ok(())
    }

    fn to_dense(&self) -> Result<Array2<f64>> {
        Ok(self.matrix.clone())
    }

    fn set_dense(&mut self, m: &Array2<f64>) -> Result<()> {
        validate_square("TpOp::set_dense", m, self.dim())?;
        *self = TpOp::new(m.clone())?;
        Ok(())
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        depolarize_rows(&mut self.matrix, amount)
    }
}
