// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad error generators for noisy gates and SPAM.
//!
//! A generator in Gorini–Kossakowski–Sudarshan–Lindblad form,
//!
//!   L(ρ) = -i[H, ρ] + Σ_ij η_ij (P_i ρ P_j† − ½{P_j† P_i, ρ}) + Tr(ρ) A,
//!
//! is stored as Hamiltonian, stochastic and affine coefficients over a
//! basis of (unnormalised) Pauli products and exposed as a real parameter
//! vector. In `cptp` mode η is parameterized through a Cholesky-like
//! factor, so every parameter vector yields a completely positive exp(L).
//!
//! This module provides:
//! - [`ErrorTerm`] descriptors with `H(X)` / `S(X,Y)` / `A(Z)` notation
//! - [`LindbladErrorgen`] with coefficient and dense-generator constructors
//! - Physical T1/T2 channels ([`CollapseOperator`]) converted to coefficients
//!
//! # Example
//!
//! ```ignore
//! use qubit_os_model::lindblad::{
//!     ErrgenCoeffs, ErrorTerm, LindbladErrorgen, NonHamMode, ParamMode,
//! };
//! use num_complex::Complex64;
//!
//! let coeffs = ErrgenCoeffs::from_pauli_terms([
//!     (ErrorTerm::hamiltonian("X"), Complex64::new(0.1, 0.0)),
//!     (ErrorTerm::pauli_stochastic("X"), Complex64::new(0.1, 0.0)),
//! ])?;
//! let errgen = LindbladErrorgen::from_coeffs(&coeffs, NonHamMode::All, ParamMode::Cptp, false)?;
//! assert_eq!(errgen.num_params(), 2);
//! ```
//!
//! # References
//!
//! - Lindblad, G. (1976). Commun. Math. Phys. 48, 119.
//!   DOI: 10.1007/BF01608499
//! - Gorini, V., Kossakowski, A., & Sudarshan, E. C. G. (1976). J. Math. Phys. 17, 821.
//!   DOI: 10.1063/1.522979
//! - Breuer, H.-P. & Petruccione, F. (2002). "The Theory of Open Quantum Systems." Oxford.

pub mod errorgen;
pub mod params;
pub mod superop;
pub mod types;

pub use errorgen::LindbladErrorgen;
pub use params::NonHamBlock;
pub use types::{CoeffDict, CollapseOperator, ErrgenCoeffs, ErrorTerm, NonHamMode, ParamMode};
