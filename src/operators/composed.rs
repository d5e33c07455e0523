// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sequential composition of shared operators.
//!
//! A composed operator starts detached: it holds its factors but owns no
//! parameters and reports `num_params() == 0`. Binding it through a
//! [`ParamAllocator`] records a layout over the distinct leaves reachable
//! from its factors, so a leaf shared by several nesting levels appears
//! once. Any structural change drops the layout again until the next bind.

use std::collections::HashSet;
use std::ops::Range;

use ndarray::Array2;

use super::{object_id, LinearOperator, OpRef};
use crate::error::{Error, Result};
use crate::model::{ParamAllocator, ParamOwner};
use crate::validation::validate_param_length;

/// A leaf reachable from the factors and its block of the local vector.
#[derive(Debug, Clone)]
struct LeafParams {
    owner: ParamOwner,
    local: Range<usize>,
}

/// Product of factors; the first factor is applied first.
#[derive(Debug, Clone)]
pub struct ComposedOp {
    dim: usize,
    factors: Vec<OpRef>,
    layout: Option<Vec<LeafParams>>,
}

/// Dimension of a candidate factor, refusing any factor whose subgraph
/// reaches a locked composite. The composite being modified is held under
/// its write lock, so reaching it means the insertion would close a cycle.
fn factor_dim(op: &OpRef) -> Result<usize> {
    let mut seen = HashSet::new();
    check_unlocked(op, &mut seen)?;
    Ok(op.read().dim())
}

fn check_unlocked(op: &OpRef, seen: &mut HashSet<usize>) -> Result<()> {
    if !seen.insert(object_id(op)) {
        return Ok(());
    }
    let children = op
        .try_read()
        .ok_or_else(|| {
            Error::InvalidOperation(
                "factor reaches the composite it is added to; a composite cannot contain itself"
                    .into(),
            )
        })?
        .factors();
    for child in &children {
        check_unlocked(child, seen)?;
    }
    Ok(())
}

impl ComposedOp {
    /// Compose `factors` (possibly none) acting on dimension `dim`.
    pub fn new(dim: usize, factors: Vec<OpRef>) -> Result<Self> {
        for f in &factors {
            let d = factor_dim(f)?;
            if d != dim {
                return Err(Error::dimension("ComposedOp factor", dim, d));
            }
        }
        Ok(Self {
            dim,
            factors,
            layout: None,
        })
    }

    /// Factor handles in application order.
    pub fn factor_refs(&self) -> &[OpRef] {
        &self.factors
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn is_bound(&self) -> bool {
        self.layout.is_some()
    }

    pub fn append_factor(&mut self, op: OpRef) -> Result<()> {
        let index = self.factors.len();
        self.insert_factor(index, op)
    }

    pub fn insert_factor(&mut self, index: usize, op: OpRef) -> Result<()> {
        if index > self.factors.len() {
            return Err(Error::InvalidOperation(format!(
                "factor index {} out of range for {} factors",
                index,
                self.factors.len()
            )));
        }
        let d = factor_dim(&op)?;
        if d != self.dim {
            return Err(Error::dimension("ComposedOp factor", self.dim, d));
        }
        self.factors.insert(index, op);
        self.layout = None;
        Ok(())
    }

    pub fn remove_factor(&mut self, index: usize) -> Result<OpRef> {
        if index >= self.factors.len() {
            return Err(Error::InvalidOperation(format!(
                "factor index {} out of range for {} factors",
                index,
                self.factors.len()
            )));
        }
        self.layout = None;
        Ok(self.factors.remove(index))
    }
}

impl LinearOperator for ComposedOp {
    fn dim(&self) -> usize {
        self.dim
    }

    fn kind(&self) -> &'static str {
        "composed"
    }

    /// 0 until bound, then the total over distinct reachable leaves.
    fn num_params(&self) -> usize {
        self.layout
            .as_ref()
            .map_or(0, |slots| slots.iter().map(|s| s.local.len()).sum())
    }

    fn to_vector(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(self.num_params());
        for slot in self.layout.iter().flatten() {
            v.extend(slot.owner.to_vector());
        }
        v
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("ComposedOp::from_vector", self.num_params(), v)?;
        let Some(slots) = &self.layout else {
            return Ok(());
        };

        let snapshot: Vec<Vec<f64>> = slots.iter().map(|s| s.owner.to_vector()).collect();
        for (k, slot) in slots.iter().enumerate() {
            if let Err(e) = slot.owner.from_vector(&v[slot.local.clone()]) {
                for (prev, old) in slots[..k].iter().zip(&snapshot) {
                    // Restoring values that were accepted before cannot fail
                    let _ = prev.owner.from_vector(old);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn to_dense(&self) -> Result<Array2<f64>> {
        let mut product = Array2::<f64>::eye(self.dim);
        for (k, factor) in self.factors.iter().enumerate() {
            let m = factor.read().to_dense().map_err(|e| match e {
                Error::NotDenseRepresentable(msg) => {
                    Error::NotDenseRepresentable(format!("factor {}: {}", k, msg))
                }
                other => other,
            })?;
            product = m.dot(&product);
        }
        Ok(product)
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn factors(&self) -> Vec<OpRef> {
        self.factors.clone()
    }

    fn bind(&mut self, alloc: &mut ParamAllocator) -> Result<Vec<usize>> {
        let mut seen = HashSet::new();
        let mut global = Vec::new();
        for factor in &self.factors {
            for index in alloc.bind_operator(factor)? {
                if seen.insert(index) {
                    global.push(index);
                }
            }
        }

        // A leaf's indices always arrive as one contiguous block
        let mut slots = Vec::new();
        let mut k = 0;
        while k < global.len() {
            let leaf = alloc.leaf_containing(global[k]).ok_or_else(|| {
                Error::InvalidOperation(format!("index {} has no owning leaf", global[k]))
            })?;
            let n = leaf.range.len();
            let block = global.get(k..k + n);
            if !block.is_some_and(|b| b.iter().copied().eq(leaf.range.clone())) {
                return Err(Error::InvalidOperation(format!(
                    "indices of leaf {:?} are not contiguous in the composed layout",
                    leaf.range
                )));
            }
            slots.push(LeafParams {
                owner: leaf.owner.clone(),
                local: k..k + n,
            });
            k += n;
        }
        self.layout = Some(slots);
        Ok(global)
    }

    fn needs_binding(&self) -> bool {
        let Some(slots) = &self.layout else {
            return true;
        };
        self.factors.iter().any(|f| f.read().needs_binding())
            || slots.iter().any(|s| s.owner.num_params() != s.local.len())
    }
}
