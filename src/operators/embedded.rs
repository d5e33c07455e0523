// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operators embedded into a larger tensor-product space.

use ndarray::Array2;

use super::{LinearOperator, OpRef};
use crate::error::{Error, Result};
use crate::model::ParamAllocator;
use crate::statespace::StateSpace;

/// An operator on some state-space factors, identity on the rest.
///
/// Target labels may be non-contiguous and need not follow the state-space
/// order; the wrapped operator's first tensor factor is the first target.
#[derive(Debug, Clone)]
pub struct EmbeddedOp {
    state_space: StateSpace,
    targets: Vec<String>,
    target_positions: Vec<usize>,
    op: OpRef,
}

impl EmbeddedOp {
    pub fn new<S: AsRef<str>>(state_space: StateSpace, targets: &[S], op: OpRef) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::InvalidOperation(
                "embedding needs at least one target label".into(),
            ));
        }
        let mut positions = Vec::with_capacity(targets.len());
        for t in targets {
            let pos = state_space.index_of(t.as_ref())?;
            if positions.contains(&pos) {
                return Err(Error::InvalidOperation(format!(
                    "target label '{}' given twice",
                    t.as_ref()
                )));
            }
            positions.push(pos);
        }
        let target_dim: usize = positions.iter().map(|&p| state_space.dims()[p]).product();
        let op_dim = op
            .try_read()
            .map(|g| g.dim())
            .ok_or_else(|| Error::InvalidOperation("embedded operator is locked".into()))?;
        if op_dim != target_dim {
            return Err(Error::dimension(
                format!("embedded operator on {:?}", targets.iter().map(|t| t.as_ref()).collect::<Vec<_>>()),
                target_dim,
                op_dim,
            ));
        }
        Ok(Self {
            targets: targets.iter().map(|t| t.as_ref().to_string()).collect(),
            target_positions: positions,
            state_space,
            op,
        })
    }

    pub fn state_space(&self) -> &StateSpace {
        &self.state_space
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// The wrapped operator.
    pub fn embedded_op(&self) -> &OpRef {
        &self.op
    }

    /// Offsets in the full index of every wrapped-operator basis index.
    fn target_offsets(&self, strides: &[usize]) -> Vec<usize> {
        let dims = self.state_space.dims();
        let sub: usize = self.target_positions.iter().map(|&p| dims[p]).product();
        (0..sub)
            .map(|t| {
                let mut rem = t;
                let mut offset = 0;
                for &p in self.target_positions.iter().rev() {
                    offset += (rem % dims[p]) * strides[p];
                    rem /= dims[p];
                }
                offset
            })
            .collect()
    }

    /// Full indices whose target digits are all zero.
    fn spectator_offsets(&self, strides: &[usize]) -> Vec<usize> {
        let dims = self.state_space.dims();
        let mut bases = vec![0];
        for (p, &d) in dims.iter().enumerate() {
            if self.target_positions.contains(&p) {
                continue;
            }
            bases = bases
                .iter()
                .flat_map(|&b| (0..d).map(move |k| b + k * strides[p]))
                .collect();
        }
        bases
    }
}

impl LinearOperator for EmbeddedOp {
    fn dim(&self) -> usize {
        self.state_space.dim()
    }

    fn kind(&self) -> &'static str {
        "embedded"
    }

    fn num_params(&self) -> usize {
        self.op.read().num_params()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.op.read().to_vector()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        self.op.write().from_vector(v)
    }

    fn to_dense(&self) -> Result<Array2<f64>> {
        let inner = self.op.read().to_dense()?;
        let dims = self.state_space.dims();
        let mut strides = vec![1; dims.len()];
        for p in (0..dims.len().saturating_sub(1)).rev() {
            strides[p] = strides[p + 1] * dims[p + 1];
        }

        let offsets = self.target_offsets(&strides);
        let total = self.dim();
        let mut out = Array2::<f64>::zeros((total, total));
        for base in self.spectator_offsets(&strides) {
            for (r, &off_r) in offsets.iter().enumerate() {
                for (c, &off_c) in offsets.iter().enumerate() {
                    out[[base + off_r, base + off_c]] = inner[[r, c]];
                }
            }
        }
        Ok(out)
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn factors(&self) -> Vec<OpRef> {
        vec![self.op.clone()]
    }

    fn bind(&mut self, alloc: &mut ParamAllocator) -> Result<Vec<usize>> {
        alloc.bind_operator(&self.op)
    }

    fn needs_binding(&self) -> bool {
        self.op.read().needs_binding()
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        self.op.write().depolarize(amount)
    }
}
