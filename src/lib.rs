// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS parameterized gate-set models
//!
//! This crate represents quantum operations, state preparations and
//! measurements as parameterized objects in the Pauli-product Liouville
//! basis, and assembles them into models with a single flat parameter
//! vector.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Config (YAML) ──► ModelBuilder         │
//! ├─────────────────────────────────────────┤
//! │   Model: preps / povms / operations      │
//! │   ParamAllocator (shared leaves, layout) │
//! ├──────────────────┬──────────────────────┤
//! │   operators      │   spam               │
//! │   dense, Lindblad│   vectors, POVMs     │
//! │   composed,      │                      │
//! │   embedded       │                      │
//! ├──────────────────┴──────────────────────┤
//! │   lindblad (error generators), basis,    │
//! │   linalg (expm / logm / eigh)            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`builder`]: Model construction from configuration
//! - [`model`]: Models and parameter allocation
//! - [`operators`]: Parameterized gates
//! - [`spam`]: State preparations and POVMs
//! - [`lindblad`]: Lindblad error generators
//! - [`nqnoise`]: Generated low-weight n-qubit noise models
//! - [`io`]: Dense text format
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod basis;
pub mod builder;
pub mod config;
pub mod error;
pub mod io;
pub mod linalg;
pub mod lindblad;
pub mod model;
pub mod nqnoise;
pub mod operators;
pub mod spam;
pub mod statespace;
pub mod validation;

pub use builder::ModelBuilder;
pub use config::Config;
pub use error::{Error, Result};
pub use model::Model;
pub use operators::{op_ref, LinearOperator, OpRef};
pub use spam::{povm_ref, spam_ref, Povm, PovmRef, SpamRef, SpamVector};
pub use statespace::StateSpace;

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
