// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for gate-set models.

use std::fmt;

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Model error types.
#[derive(Debug)]
pub enum Error {
    /// Parameter-vector length or operator dimension disagreement
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },
    /// A structurally required value was violated, or the object does not
    /// support the requested mutation
    InvalidOperation(String),
    /// Dense materialization requested on an object that has no dense form
    NotDenseRepresentable(String),
    /// The non-Hamiltonian coefficient matrix of an unconstrained
    /// generator has a negative eigenvalue
    NonPositiveErrorGenerator { min_eigenvalue: f64 },
    /// No prep, POVM, operation, outcome or basis element with this label
    UnknownLabel(String),
    /// A numerical kernel failed (singular solve, logarithm did not converge)
    Numerical(String),
    /// Configuration error
    Config(String),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl Error {
    /// Shorthand for a [`Error::DimensionMismatch`].
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DimensionMismatch {
                context,
                expected,
                actual,
            } => write!(
                f,
                "Dimension mismatch in {}: expected {}, got {}",
                context, expected, actual
            ),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::NotDenseRepresentable(msg) => write!(f, "Not dense representable: {}", msg),
            Error::NonPositiveErrorGenerator { min_eigenvalue } => write!(
                f,
                "Non-positive error generator: coefficient matrix has eigenvalue {:.3e}",
                min_eigenvalue
            ),
            Error::UnknownLabel(label) => write!(f, "Unknown label: {}", label),
            Error::Numerical(msg) => write!(f, "Numerical error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<ndarray_linalg::error::LinalgError> for Error {
    fn from(e: ndarray_linalg::error::LinalgError) -> Self {
        Error::Numerical(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_display_dimension_mismatch() {
        let e = Error::dimension("FullOp::from_vector", 16, 12);
        assert_eq!(
            e.to_string(),
            "Dimension mismatch in FullOp::from_vector: expected 16, got 12"
        );
    }

    #[test]
    fn test_error_display_invalid_operation() {
        let e = Error::InvalidOperation("static operator has no parameters".into());
        assert_eq!(
            e.to_string(),
            "Invalid operation: static operator has no parameters"
        );
    }

    #[test]
    fn test_error_display_not_dense() {
        let e = Error::NotDenseRepresentable("factor 2".into());
        assert_eq!(e.to_string(), "Not dense representable: factor 2");
    }

    #[test]
    fn test_error_display_non_positive() {
        let e = Error::NonPositiveErrorGenerator {
            min_eigenvalue: -0.25,
        };
        assert!(e.to_string().contains("-2.500e-1"));
    }

    #[test]
    fn test_error_display_config() {
        let e = Error::Config("bad qubit count".into());
        assert_eq!(e.to_string(), "Configuration error: bad qubit count");
    }

    #[test]
    fn test_io_error_has_source() {
        let e = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(e.to_string(), "IO error: gone");
        assert!(e.source().is_some());
    }

    #[test]
    fn test_other_errors_have_no_source() {
        assert!(Error::UnknownLabel("Gx".into()).source().is_none());
        assert!(Error::Numerical("singular".into()).source().is_none());
    }

    #[test]
    fn test_from_yaml_error() {
        let err: std::result::Result<Vec<u32>, _> = serde_yaml::from_str("{{not: valid");
        let e: Error = err.unwrap_err().into();
        assert!(matches!(e, Error::Serialization(_)));
    }
}
