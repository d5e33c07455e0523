// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! State preparations, measurement effects, and POVMs.
//!
//! SPAM vectors are Liouville vectors of density matrices (preps) or of
//! measurement operators (effects). They follow the same parameter
//! contract as operators: `to_vector`, `from_vector`, `to_dense`.

pub mod dense;
pub mod lindblad;
pub mod povm;

pub use dense::{tp_normalization, FullVec, StaticVec, TpVec};
pub use lindblad::{LindbladVec, SpamRole};
pub use povm::{povm_ref, Povm, PovmRef, TpPovm, UnconstrainedPovm};

use std::fmt;
use std::sync::Arc;

use ndarray::Array1;
use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Shared, lockable handle to a SPAM vector.
pub type SpamRef = Arc<RwLock<dyn SpamVector>>;

/// Wrap a SPAM vector in a shared handle.
pub fn spam_ref<T: SpamVector + 'static>(v: T) -> SpamRef {
    Arc::new(RwLock::new(v))
}

/// A parameterized Liouville vector.
pub trait SpamVector: fmt::Debug + Send + Sync {
    fn dim(&self) -> usize;

    fn kind(&self) -> &'static str;

    fn num_params(&self) -> usize;

    fn to_vector(&self) -> Vec<f64>;

    /// Overwrite the parameters. A failed call leaves the vector unchanged.
    fn from_vector(&mut self, v: &[f64]) -> Result<()>;

    fn to_dense(&self) -> Result<Array1<f64>>;

    fn set_dense(&mut self, _v: &Array1<f64>) -> Result<()> {
        Err(Error::InvalidOperation(format!(
            "{} vector cannot be set from a dense vector",
            self.kind()
        )))
    }

    /// Scale all non-identity components by `1 - amount`.
    fn depolarize(&mut self, _amount: f64) -> Result<()> {
        Err(Error::InvalidOperation(format!(
            "{} vector cannot be depolarized",
            self.kind()
        )))
    }
}
