// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Global parameter allocation.
//!
//! Allocation walks the object graph once, in model order. Every distinct
//! leaf (an object that owns its parameters) claims a contiguous range of
//! the global vector the first time it is reached; a leaf reached again
//! through another label or parent reuses its range. Composite operators
//! own nothing and record the indices of their children instead.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::operators::{object_id, OpRef};
use crate::spam::{PovmRef, SpamRef};
use crate::validation::validate_param_length;

/// Which model collection a top-level object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Prep,
    Povm,
    Operation,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prep => write!(f, "prep"),
            Self::Povm => write!(f, "povm"),
            Self::Operation => write!(f, "operation"),
        }
    }
}

/// An object that stores parameter values.
#[derive(Debug, Clone)]
pub enum ParamOwner {
    Op(OpRef),
    Spam(SpamRef),
    Povm(PovmRef),
}

impl ParamOwner {
    pub fn num_params(&self) -> usize {
        match self {
            Self::Op(o) => o.read().num_params(),
            Self::Spam(s) => s.read().num_params(),
            Self::Povm(p) => p.read().num_params(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Op(o) => o.read().kind(),
            Self::Spam(s) => s.read().kind(),
            Self::Povm(p) => p.read().kind(),
        }
    }

    pub fn to_vector(&self) -> Vec<f64> {
        match self {
            Self::Op(o) => o.read().to_vector(),
            Self::Spam(s) => s.read().to_vector(),
            Self::Povm(p) => p.read().to_vector(),
        }
    }

    pub fn from_vector(&self, v: &[f64]) -> Result<()> {
        match self {
            Self::Op(o) => o.write().from_vector(v),
            Self::Spam(s) => s.write().from_vector(v),
            Self::Povm(p) => p.write().from_vector(v),
        }
    }
}

/// A leaf and the global range holding its parameters.
#[derive(Debug, Clone)]
pub struct LeafSlot {
    pub owner: ParamOwner,
    pub range: Range<usize>,
}

/// One row of the allocation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationEntry {
    pub label: String,
    pub collection: Collection,
    pub kind: String,
    /// Range newly claimed while binding this object (may be empty).
    pub range: Range<usize>,
    /// Global indices this object reads, including shared ones.
    pub indices: Vec<usize>,
    pub num_params: usize,
}

/// Walks the object graph and hands out global parameter indices.
#[derive(Debug, Default)]
pub struct ParamAllocator {
    next: usize,
    claimed: HashMap<usize, Vec<usize>>,
    in_progress: HashSet<usize>,
    leaves: Vec<LeafSlot>,
}

impl ParamAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of indices handed out so far.
    pub fn total(&self) -> usize {
        self.next
    }

    /// The leaf whose range contains global index `index`.
    pub fn leaf_containing(&self, index: usize) -> Option<&LeafSlot> {
        // Leaves are claimed in increasing index order
        let k = self.leaves.partition_point(|l| l.range.end <= index);
        self.leaves.get(k).filter(|l| l.range.contains(&index))
    }

    fn claim(&mut self, id: usize, owner: ParamOwner) -> Vec<usize> {
        let n = owner.num_params();
        let range = self.next..self.next + n;
        self.next += n;
        if n > 0 {
            self.leaves.push(LeafSlot {
                owner,
                range: range.clone(),
            });
        }
        let indices: Vec<usize> = range.collect();
        self.claimed.insert(id, indices.clone());
        indices
    }

    /// Bind an operator, recursing into composites.
    pub fn bind_operator(&mut self, op: &OpRef) -> Result<Vec<usize>> {
        let id = object_id(op);
        if let Some(indices) = self.claimed.get(&id) {
            return Ok(indices.clone());
        }
        if !self.in_progress.insert(id) {
            return Err(Error::InvalidOperation(
                "operator graph contains a cycle".into(),
            ));
        }
        let result = self.bind_unclaimed(id, op);
        self.in_progress.remove(&id);
        result
    }

    fn bind_unclaimed(&mut self, id: usize, op: &OpRef) -> Result<Vec<usize>> {
        let composite = {
            let guard = op.try_read().ok_or_else(|| {
                Error::InvalidOperation("operator is locked during allocation".into())
            })?;
            guard.is_composite()
        };
        if !composite {
            return Ok(self.claim(id, ParamOwner::Op(op.clone())));
        }
        let mut guard = op.try_write().ok_or_else(|| {
            Error::InvalidOperation("operator is locked during allocation".into())
        })?;
        let indices = guard.bind(self)?;
        self.claimed.insert(id, indices.clone());
        Ok(indices)
    }

    pub fn bind_spam(&mut self, v: &SpamRef) -> Vec<usize> {
        let id = object_id(v);
        if let Some(indices) = self.claimed.get(&id) {
            return indices.clone();
        }
        self.claim(id, ParamOwner::Spam(v.clone()))
    }

    pub fn bind_povm(&mut self, p: &PovmRef) -> Vec<usize> {
        let id = object_id(p);
        if let Some(indices) = self.claimed.get(&id) {
            return indices.clone();
        }
        self.claim(id, ParamOwner::Povm(p.clone()))
    }

    /// Finish allocation, producing the table for `entries`.
    pub fn finish(self, entries: Vec<AllocationEntry>) -> ParamAllocation {
        debug!(
            total = self.next,
            leaves = self.leaves.len(),
            objects = entries.len(),
            "parameter allocation complete"
        );
        ParamAllocation {
            entries,
            leaves: self.leaves,
            total: self.next,
        }
    }
}

/// Frozen result of an allocation pass.
#[derive(Debug, Clone)]
pub struct ParamAllocation {
    entries: Vec<AllocationEntry>,
    leaves: Vec<LeafSlot>,
    total: usize,
}

impl ParamAllocation {
    pub fn entries(&self) -> &[AllocationEntry] {
        &self.entries
    }

    pub fn leaves(&self) -> &[LeafSlot] {
        &self.leaves
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// True when a leaf's parameter count no longer matches its range.
    pub fn is_stale(&self) -> bool {
        self.leaves
            .iter()
            .any(|l| l.owner.num_params() != l.range.len())
    }

    pub fn to_vector(&self) -> Vec<f64> {
        let mut v = vec![0.0; self.total];
        for leaf in &self.leaves {
            v[leaf.range.clone()].copy_from_slice(&leaf.owner.to_vector());
        }
        v
    }

    /// Distribute `v` to every leaf; on failure all leaves are restored.
    pub fn from_vector(&self, v: &[f64]) -> Result<()> {
        validate_param_length("Model::from_vector", self.total, v)?;
        let snapshot = self.to_vector();
        for (k, leaf) in self.leaves.iter().enumerate() {
            if let Err(e) = leaf.owner.from_vector(&v[leaf.range.clone()]) {
                for prev in &self.leaves[..k] {
                    // Previously accepted values
                    let _ = prev.owner.from_vector(&snapshot[prev.range.clone()]);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{op_ref, ComposedOp, EmbeddedOp, FullOp, StaticOp, TpOp};
    use crate::spam::{spam_ref, FullVec};
    use crate::statespace::StateSpace;
    use ndarray::Array1;
    use parking_lot::RwLock;
    use std::sync::Arc;

    #[test]
    fn test_leaves_claim_contiguous_ranges() {
        let mut alloc = ParamAllocator::new();
        let a = op_ref(FullOp::identity(4));
        let b = op_ref(TpOp::identity(4));
        assert_eq!(alloc.bind_operator(&a).unwrap(), (0..16).collect::<Vec<_>>());
        assert_eq!(alloc.bind_operator(&b).unwrap(), (16..28).collect::<Vec<_>>());
        assert_eq!(alloc.bind_operator(&a).unwrap(), (0..16).collect::<Vec<_>>());
        assert_eq!(alloc.total(), 28);
    }

    #[test]
    fn test_composite_reuses_claimed_factor() {
        let mut alloc = ParamAllocator::new();
        let shared = op_ref(TpOp::identity(4));
        alloc.bind_operator(&shared).unwrap();
        let composed = op_ref(
            ComposedOp::new(4, vec![op_ref(FullOp::identity(4)), shared.clone()]).unwrap(),
        );
        let indices = alloc.bind_operator(&composed).unwrap();
        let expected: Vec<usize> = (12..28).chain(0..12).collect();
        assert_eq!(indices, expected);
        assert_eq!(composed.read().num_params(), 28);
    }

    #[test]
    fn test_nested_composites() {
        let inner = op_ref(
            ComposedOp::new(4, vec![op_ref(StaticOp::identity(4)), op_ref(TpOp::identity(4))])
                .unwrap(),
        );
        let ss = StateSpace::qubits(2).unwrap();
        let outer = op_ref(EmbeddedOp::new(ss, &["Q0"], inner.clone()).unwrap());
        let mut alloc = ParamAllocator::new();
        assert_eq!(alloc.bind_operator(&outer).unwrap().len(), 12);
        assert_eq!(outer.read().num_params(), 12);
        assert_eq!(inner.read().num_params(), 12);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let a_typed = Arc::new(RwLock::new(ComposedOp::new(4, Vec::new()).unwrap()));
        let a: OpRef = a_typed.clone();
        let b = op_ref(ComposedOp::new(4, vec![a.clone()]).unwrap());
        // a -> b -> a is refused before it can reach the allocator
        assert!(matches!(
            a_typed.write().append_factor(b.clone()),
            Err(Error::InvalidOperation(_))
        ));
        a_typed.write().append_factor(op_ref(TpOp::identity(4))).unwrap();
        let mut alloc = ParamAllocator::new();
        assert_eq!(alloc.bind_operator(&b).unwrap(), (0..12).collect::<Vec<_>>());
        assert_eq!(alloc.bind_operator(&a).unwrap(), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_allocation_round_trip_and_rollback() {
        let mut alloc = ParamAllocator::new();
        let prep = spam_ref(FullVec::new(Array1::from(vec![0.7, 0.0, 0.0, 0.7])).unwrap());
        let op = op_ref(FullOp::identity(4));
        let prep_ix = alloc.bind_spam(&prep);
        let op_ix = alloc.bind_operator(&op).unwrap();
        let table = alloc.finish(vec![
            AllocationEntry {
                label: "rho0".into(),
                collection: Collection::Prep,
                kind: "full".into(),
                range: 0..4,
                num_params: prep_ix.len(),
                indices: prep_ix,
            },
            AllocationEntry {
                label: "Gi".into(),
                collection: Collection::Operation,
                kind: "full".into(),
                range: 4..20,
                num_params: op_ix.len(),
                indices: op_ix,
            },
        ]);
        assert_eq!(table.total(), 20);
        let before = table.to_vector();
        assert_eq!(&before[..4], &[0.7, 0.0, 0.0, 0.7]);

        let mut v = before.clone();
        v[4] = 0.9;
        table.from_vector(&v).unwrap();
        assert_eq!(op.read().to_vector()[0], 0.9);

        let mut bad = v.clone();
        bad[0] = 0.1;
        bad[19] = f64::NAN;
        assert!(table.from_vector(&bad).is_err());
        assert_eq!(table.to_vector(), v);
        assert!(!table.is_stale());
    }
}
