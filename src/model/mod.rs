// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Models: labeled preps, POVMs and operations over one state space.
//!
//! A model owns the global parameter vector. Allocation is lazy: it runs
//! on the first call that needs it and again only after a structural
//! change (adding, removing or replacing an object, or mutating a
//! composite's factor list).
//!
//! # Example
//!
//! ```
//! use qubit_os_model::model::Model;
//! use qubit_os_model::operators::{ComposedOp, FullOp, StaticOp, TpOp, op_ref, LinearOperator};
//!
//! let mut model = Model::qubits(1).unwrap();
//! let factors = vec![
//!     op_ref(StaticOp::identity(4)),
//!     op_ref(TpOp::identity(4)),
//!     op_ref(FullOp::identity(4)),
//! ];
//! let composed = model
//!     .add_operation("Gc", ComposedOp::new(4, factors).unwrap())
//!     .unwrap();
//! assert_eq!(composed.read().num_params(), 0);
//! assert_eq!(model.num_params().unwrap(), 28);
//! assert_eq!(composed.read().num_params(), 28);
//! ```

pub mod allocator;

pub use allocator::{
    AllocationEntry, Collection, LeafSlot, ParamAllocation, ParamAllocator, ParamOwner,
};

use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use tracing::debug;

use crate::basis::Basis;
use crate::error::{Error, Result};
use crate::operators::{op_ref, LinearOperator, OpRef};
use crate::spam::{povm_ref, spam_ref, Povm, PovmRef, SpamRef, SpamVector};
use crate::statespace::StateSpace;

/// A complete parameterized model.
#[derive(Debug)]
pub struct Model {
    state_space: StateSpace,
    basis: Basis,
    preps: IndexMap<String, SpamRef>,
    povms: IndexMap<String, PovmRef>,
    operations: IndexMap<String, OpRef>,
    allocation: Option<ParamAllocation>,
}

fn unknown(collection: Collection, label: &str) -> Error {
    Error::UnknownLabel(format!("{} '{}'", collection, label))
}

fn duplicate(collection: Collection, label: &str) -> Error {
    Error::InvalidOperation(format!("{} '{}' already exists", collection, label))
}

impl Model {
    pub fn new(state_space: StateSpace) -> Result<Self> {
        let basis = Basis::for_dim(state_space.dim())?;
        Ok(Self {
            state_space,
            basis,
            preps: IndexMap::new(),
            povms: IndexMap::new(),
            operations: IndexMap::new(),
            allocation: None,
        })
    }

    /// Empty model on `num_qubits` qubits labeled `Q0, Q1, ...`.
    pub fn qubits(num_qubits: usize) -> Result<Self> {
        Self::new(StateSpace::qubits(num_qubits)?)
    }

    pub fn state_space(&self) -> &StateSpace {
        &self.state_space
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    /// Liouville dimension of every object in the model.
    pub fn dim(&self) -> usize {
        self.state_space.dim()
    }

    fn check_dim(&self, context: String, dim: usize) -> Result<()> {
        if dim != self.dim() {
            return Err(Error::dimension(context, self.dim(), dim));
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.allocation = None;
    }

    // ---- preps ----

    pub fn add_prep<T: SpamVector + 'static>(&mut self, label: &str, v: T) -> Result<SpamRef> {
        let handle = spam_ref(v);
        self.add_prep_ref(label, handle.clone())?;
        Ok(handle)
    }

    /// Register an existing handle; sharing it elsewhere shares its parameters.
    pub fn add_prep_ref(&mut self, label: &str, v: SpamRef) -> Result<()> {
        if self.preps.contains_key(label) {
            return Err(duplicate(Collection::Prep, label));
        }
        self.check_dim(format!("prep '{}'", label), v.read().dim())?;
        self.preps.insert(label.to_string(), v);
        self.invalidate();
        Ok(())
    }

    /// Substitute the object under `label`, returning the old one.
    pub fn replace_prep(&mut self, label: &str, v: SpamRef) -> Result<SpamRef> {
        self.check_dim(format!("prep '{}'", label), v.read().dim())?;
        let slot = self
            .preps
            .get_mut(label)
            .ok_or_else(|| unknown(Collection::Prep, label))?;
        let old = std::mem::replace(slot, v);
        self.invalidate();
        Ok(old)
    }

    pub fn remove_prep(&mut self, label: &str) -> Result<SpamRef> {
        let old = self
            .preps
            .shift_remove(label)
            .ok_or_else(|| unknown(Collection::Prep, label))?;
        self.invalidate();
        Ok(old)
    }

    /// Update the existing prep in place.
    pub fn set_dense_prep(&mut self, label: &str, v: &Array1<f64>) -> Result<()> {
        self.prep(label)?.write().set_dense(v)
    }

    pub fn prep(&self, label: &str) -> Result<SpamRef> {
        self.preps
            .get(label)
            .cloned()
            .ok_or_else(|| unknown(Collection::Prep, label))
    }

    pub fn prep_labels(&self) -> Vec<String> {
        self.preps.keys().cloned().collect()
    }

    pub fn preps(&self) -> &IndexMap<String, SpamRef> {
        &self.preps
    }

    // ---- povms ----

    pub fn add_povm<T: Povm + 'static>(&mut self, label: &str, p: T) -> Result<PovmRef> {
        let handle = povm_ref(p);
        self.add_povm_ref(label, handle.clone())?;
        Ok(handle)
    }

    pub fn add_povm_ref(&mut self, label: &str, p: PovmRef) -> Result<()> {
        if self.povms.contains_key(label) {
            return Err(duplicate(Collection::Povm, label));
        }
        self.check_dim(format!("povm '{}'", label), p.read().dim())?;
        self.povms.insert(label.to_string(), p);
        self.invalidate();
        Ok(())
    }

    pub fn replace_povm(&mut self, label: &str, p: PovmRef) -> Result<PovmRef> {
        self.check_dim(format!("povm '{}'", label), p.read().dim())?;
        let slot = self
            .povms
            .get_mut(label)
            .ok_or_else(|| unknown(Collection::Povm, label))?;
        let old = std::mem::replace(slot, p);
        self.invalidate();
        Ok(old)
    }

    pub fn remove_povm(&mut self, label: &str) -> Result<PovmRef> {
        let old = self
            .povms
            .shift_remove(label)
            .ok_or_else(|| unknown(Collection::Povm, label))?;
        self.invalidate();
        Ok(old)
    }

    /// Update one effect of an existing POVM in place.
    pub fn set_dense_effect(&mut self, povm: &str, effect: &str, v: &Array1<f64>) -> Result<()> {
        self.povm(povm)?.write().set_effect_dense(effect, v)
    }

    pub fn povm(&self, label: &str) -> Result<PovmRef> {
        self.povms
            .get(label)
            .cloned()
            .ok_or_else(|| unknown(Collection::Povm, label))
    }

    pub fn povm_labels(&self) -> Vec<String> {
        self.povms.keys().cloned().collect()
    }

    pub fn povms(&self) -> &IndexMap<String, PovmRef> {
        &self.povms
    }

    // ---- operations ----

    pub fn add_operation<T: LinearOperator + 'static>(
        &mut self,
        label: &str,
        op: T,
    ) -> Result<OpRef> {
        let handle = op_ref(op);
        self.add_operation_ref(label, handle.clone())?;
        Ok(handle)
    }

    pub fn add_operation_ref(&mut self, label: &str, op: OpRef) -> Result<()> {
        if self.operations.contains_key(label) {
            return Err(duplicate(Collection::Operation, label));
        }
        self.check_dim(format!("operation '{}'", label), op.read().dim())?;
        self.operations.insert(label.to_string(), op);
        self.invalidate();
        Ok(())
    }

    pub fn replace_operation(&mut self, label: &str, op: OpRef) -> Result<OpRef> {
        self.check_dim(format!("operation '{}'", label), op.read().dim())?;
        let slot = self
            .operations
            .get_mut(label)
            .ok_or_else(|| unknown(Collection::Operation, label))?;
        let old = std::mem::replace(slot, op);
        self.invalidate();
        Ok(old)
    }

    pub fn remove_operation(&mut self, label: &str) -> Result<OpRef> {
        let old = self
            .operations
            .shift_remove(label)
            .ok_or_else(|| unknown(Collection::Operation, label))?;
        self.invalidate();
        Ok(old)
    }

    /// Update the existing operation in place; fails for static or composite kinds.
    pub fn set_dense_operation(&mut self, label: &str, m: &Array2<f64>) -> Result<()> {
        self.operation(label)?.write().set_dense(m)
    }

    pub fn operation(&self, label: &str) -> Result<OpRef> {
        self.operations
            .get(label)
            .cloned()
            .ok_or_else(|| unknown(Collection::Operation, label))
    }

    pub fn operation_labels(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    pub fn operations(&self) -> &IndexMap<String, OpRef> {
        &self.operations
    }

    // ---- parameters ----

    fn is_stale(&self) -> bool {
        match &self.allocation {
            None => true,
            Some(a) => {
                a.is_stale() || self.operations.values().any(|op| op.read().needs_binding())
            }
        }
    }

    /// Allocate global parameter indices if anything changed since the last pass.
    pub fn refresh(&mut self) -> Result<&ParamAllocation> {
        if self.is_stale() {
            let allocation = self.allocate()?;
            self.allocation = Some(allocation);
        }
        self.allocation
            .as_ref()
            .ok_or_else(|| Error::InvalidOperation("parameter allocation missing".into()))
    }

    fn allocate(&self) -> Result<ParamAllocation> {
        let mut alloc = ParamAllocator::new();
        let mut entries = Vec::new();

        let mut push = |alloc: &ParamAllocator,
                        label: &str,
                        collection: Collection,
                        kind: &str,
                        start: usize,
                        indices: Vec<usize>| {
            entries.push(AllocationEntry {
                label: label.to_string(),
                collection,
                kind: kind.to_string(),
                range: start..alloc.total(),
                num_params: indices.len(),
                indices,
            });
        };

        for (label, v) in &self.preps {
            let start = alloc.total();
            let indices = alloc.bind_spam(v);
            let kind = v.read().kind();
            push(&alloc, label, Collection::Prep, kind, start, indices);
        }
        for (label, p) in &self.povms {
            let start = alloc.total();
            let indices = alloc.bind_povm(p);
            let kind = p.read().kind();
            push(&alloc, label, Collection::Povm, kind, start, indices);
        }
        for (label, op) in &self.operations {
            let start = alloc.total();
            let indices = alloc.bind_operator(op)?;
            let kind = op.read().kind();
            debug!(label = %label, num_params = indices.len(), "bound operation");
            push(&alloc, label, Collection::Operation, kind, start, indices);
        }
        Ok(alloc.finish(entries))
    }

    /// Size of the global parameter vector.
    pub fn num_params(&mut self) -> Result<usize> {
        Ok(self.refresh()?.total())
    }

    pub fn to_vector(&mut self) -> Result<Vec<f64>> {
        Ok(self.refresh()?.to_vector())
    }

    /// Set every parameter at once; on failure nothing changes.
    pub fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        self.refresh()?.from_vector(v)
    }

    /// The current parameter table.
    pub fn allocation(&mut self) -> Result<&ParamAllocation> {
        self.refresh()
    }

    // ---- evaluation ----

    /// Dense product of a sequence; the first label is applied first.
    pub fn product<S: AsRef<str>>(&self, labels: &[S]) -> Result<Array2<f64>> {
        let mut product = Array2::<f64>::eye(self.dim());
        for label in labels {
            let m = self.operation(label.as_ref())?.read().to_dense()?;
            product = m.dot(&product);
        }
        Ok(product)
    }

    /// Outcome probabilities of `povm` after `prep` and the operation sequence.
    pub fn probabilities<S: AsRef<str>>(
        &self,
        prep: &str,
        povm: &str,
        labels: &[S],
    ) -> Result<IndexMap<String, f64>> {
        let rho = self.prep(prep)?.read().to_dense()?;
        let state = self.product(labels)?.dot(&rho);
        let effects = self.povm(povm)?.read().effects_dense()?;
        Ok(effects
            .into_iter()
            .map(|(label, e)| (label, e.dot(&state)))
            .collect())
    }
}
