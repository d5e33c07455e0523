// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Parameterized linear operators (gates) in Liouville representation.
//!
//! Every operator maps to and from a flat parameter vector and can be
//! materialized as a dense `dim × dim` real matrix:
//!
//! - [`StaticOp`], [`FullOp`], [`TpOp`]: dense matrices with 0, dim² and
//!   dim(dim-1) parameters
//! - [`LindbladOp`]: exp(L) · U0 with the parameters of the generator L
//! - [`ComposedOp`]: sequential application of shared factors
//! - [`EmbeddedOp`]: a subsystem operator acting as identity elsewhere
//!
//! Operators are shared through [`OpRef`] handles. Composite operators only
//! learn their parameter layout when a [`ParamAllocator`] binds them; see
//! [`crate::model`].

pub mod composed;
pub mod dense;
pub mod embedded;
pub mod lindblad;

pub use composed::ComposedOp;
pub use dense::{FullOp, StaticOp, TpOp};
pub use embedded::EmbeddedOp;
pub use lindblad::LindbladOp;

use std::fmt;
use std::sync::Arc;

use ndarray::Array2;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::model::ParamAllocator;

/// Shared, lockable handle to an operator.
///
/// A factor may be referenced by several composites at once; identity of
/// the handle (not equality of values) decides parameter sharing.
pub type OpRef = Arc<RwLock<dyn LinearOperator>>;

/// Wrap an operator in a shared handle.
pub fn op_ref<T: LinearOperator + 'static>(op: T) -> OpRef {
    Arc::new(RwLock::new(op))
}

/// Identity of a shared object, used to deduplicate during allocation.
pub fn object_id<T: ?Sized>(handle: &Arc<RwLock<T>>) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

/// A parameterized linear map on a Liouville space.
pub trait LinearOperator: fmt::Debug + Send + Sync {
    /// Ambient dimension.
    fn dim(&self) -> usize;

    /// Short parameterization name ("static", "full", "tp", ...).
    fn kind(&self) -> &'static str;

    /// Number of free parameters.
    fn num_params(&self) -> usize;

    /// Current parameter values.
    fn to_vector(&self) -> Vec<f64>;

    /// Overwrite the parameters. A failed call leaves the operator unchanged.
    fn from_vector(&mut self, v: &[f64]) -> Result<()>;

    /// Dense matrix of the operator.
    fn to_dense(&self) -> Result<Array2<f64>>;

    /// Update the operator in place so that `to_dense()` equals `m`.
    fn set_dense(&mut self, _m: &Array2<f64>) -> Result<()> {
        Err(Error::InvalidOperation(format!(
            "{} operator cannot be set from a dense matrix",
            self.kind()
        )))
    }

    /// Contract all non-identity components by `1 - amount`.
    fn depolarize(&mut self, _amount: f64) -> Result<()> {
        Err(Error::InvalidOperation(format!(
            "{} operator cannot be depolarized",
            self.kind()
        )))
    }

    /// Whether parameters come from child operators bound by an allocator.
    fn is_composite(&self) -> bool {
        false
    }

    /// Direct child operators.
    fn factors(&self) -> Vec<OpRef> {
        Vec::new()
    }

    /// Bind child operators through `alloc` and record the local layout.
    ///
    /// Returns the global parameter indices this operator reads, in the
    /// order of its own parameter vector.
    fn bind(&mut self, _alloc: &mut ParamAllocator) -> Result<Vec<usize>> {
        Ok(Vec::new())
    }

    /// True when a structural change invalidated the bound layout.
    fn needs_binding(&self) -> bool {
        false
    }

    /// Check that every Lindblad generator reachable from this operator
    /// has a positive semidefinite non-Hamiltonian block.
    fn check_positivity(&self) -> Result<()> {
        self.factors()
            .iter()
            .try_for_each(|f| f.read().check_positivity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_tracks_identity_not_value() {
        let a = op_ref(StaticOp::identity(4));
        let b = op_ref(StaticOp::identity(4));
        let a2 = a.clone();
        assert_eq!(object_id(&a), object_id(&a2));
        assert_ne!(object_id(&a), object_id(&b));
    }

    #[test]
    fn test_default_mutators_are_rejected() {
        let op = op_ref(StaticOp::identity(4));
        let mut guard = op.write();
        assert!(matches!(
            guard.set_dense(&Array2::eye(4)),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            guard.depolarize(0.1),
            Err(Error::InvalidOperation(_))
        ));
        assert!(!guard.is_composite());
        assert!(guard.factors().is_empty());
    }
}
