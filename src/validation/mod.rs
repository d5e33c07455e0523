// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for operator and model construction.

use ndarray::{Array1, Array2};

use crate::error::{Error, Result};

/// Maximum number of qubits a Pauli-product model may span.
pub const MAX_QUBITS: usize = 4;

/// Tolerance for structurally fixed values (TP rows, identity sums).
pub const FIXED_VALUE_TOL: f64 = 1e-10;

/// Validate a qubit count for basis construction.
pub fn validate_num_qubits(num_qubits: usize) -> Result<()> {
    if num_qubits == 0 {
        return Err(Error::InvalidOperation(
            "number of qubits must be greater than 0".into(),
        ));
    }
    if num_qubits > MAX_QUBITS {
        return Err(Error::InvalidOperation(format!(
            "{} qubits exceeds the supported maximum of {}",
            num_qubits, MAX_QUBITS
        )));
    }
    Ok(())
}

/// Validate the length of a parameter vector handed to `from_vector`.
pub fn validate_param_length(context: &str, expected: usize, values: &[f64]) -> Result<()> {
    if values.len() != expected {
        return Err(Error::dimension(context, expected, values.len()));
    }
    validate_finite(context, values)
}

/// Reject NaN and infinite entries.
pub fn validate_finite(context: &str, values: &[f64]) -> Result<()> {
    for (i, val) in values.iter().enumerate() {
        if val.is_nan() {
            return Err(Error::InvalidOperation(format!(
                "{}: contains NaN at index {}",
                context, i
            )));
        }
        if val.is_infinite() {
            return Err(Error::InvalidOperation(format!(
                "{}: contains Inf at index {}",
                context, i
            )));
        }
    }
    Ok(())
}

/// Validate that a matrix is square with the given dimension.
pub fn validate_square(context: &str, m: &Array2<f64>, dim: usize) -> Result<()> {
    if m.nrows() != m.ncols() {
        return Err(Error::dimension(
            format!("{} (square matrix)", context),
            m.nrows(),
            m.ncols(),
        ));
    }
    if m.nrows() != dim {
        return Err(Error::dimension(context, dim, m.nrows()));
    }
    Ok(())
}

/// Validate that the first row of an operator matrix is `[1, 0, ..., 0]`.
pub fn validate_tp_matrix(context: &str, m: &Array2<f64>) -> Result<()> {
    for (j, &val) in m.row(0).iter().enumerate() {
        let expected = if j == 0 { 1.0 } else { 0.0 };
        if (val - expected).abs() > FIXED_VALUE_TOL {
            return Err(Error::InvalidOperation(format!(
                "{}: first row must be [1, 0, ..., 0], element {} is {}",
                context, j, val
            )));
        }
    }
    Ok(())
}

/// Validate that the first element of a vector equals its fixed value.
pub fn validate_tp_vector(context: &str, v: &Array1<f64>, expected: f64) -> Result<()> {
    if v.is_empty() {
        return Err(Error::dimension(context, 1, 0));
    }
    if (v[0] - expected).abs() > FIXED_VALUE_TOL {
        return Err(Error::InvalidOperation(format!(
            "{}: first element must be {}, got {}",
            context, expected, v[0]
        )));
    }
    Ok(())
}

/// Validate a depolarization strength.
pub fn validate_depolarization(amount: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&amount) {
        return Err(Error::InvalidOperation(format!(
            "depolarization amount must be in [0, 1], got {}",
            amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validate_num_qubits() {
        assert!(validate_num_qubits(1).is_ok());
        assert!(validate_num_qubits(MAX_QUBITS).is_ok());
        assert!(validate_num_qubits(0).is_err());
        assert!(validate_num_qubits(MAX_QUBITS + 1).is_err());
    }

    #[test]
    fn test_validate_param_length() {
        assert!(validate_param_length("op", 2, &[0.0, 1.0]).is_ok());
        assert!(matches!(
            validate_param_length("op", 3, &[0.0, 1.0]),
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));
        assert!(matches!(
            validate_param_length("op", 2, &[0.0, f64::NAN]),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_validate_tp_matrix() {
        let good = array![[1.0, 0.0], [0.3, 0.9]];
        assert!(validate_tp_matrix("op", &good).is_ok());
        let bad = array![[0.9, 0.0], [0.0, 1.0]];
        assert!(matches!(
            validate_tp_matrix("op", &bad),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_validate_tp_vector() {
        let v = array![0.5, 0.1];
        assert!(validate_tp_vector("vec", &v, 0.5).is_ok());
        assert!(validate_tp_vector("vec", &v, 0.7).is_err());
    }

    #[test]
    fn test_validate_square() {
        let m = Array2::<f64>::zeros((2, 3));
        assert!(validate_square("m", &m, 2).is_err());
        assert!(validate_square("m", &Array2::eye(4), 4).is_ok());
        assert!(validate_square("m", &Array2::eye(4), 16).is_err());
    }

    #[test]
    fn test_validate_depolarization() {
        assert!(validate_depolarization(0.1).is_ok());
        assert!(validate_depolarization(-0.1).is_err());
        assert!(validate_depolarization(1.5).is_err());
    }
}
