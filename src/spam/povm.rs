// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Positive operator-valued measures built from labeled effect vectors.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ndarray::Array1;
use parking_lot::RwLock;

use super::{FullVec, SpamVector};
use crate::basis::Basis;
use crate::error::{Error, Result};
use crate::validation::{validate_depolarization, validate_param_length, FIXED_VALUE_TOL};

/// Shared, lockable handle to a POVM.
pub type PovmRef = Arc<RwLock<dyn Povm>>;

/// Wrap a POVM in a shared handle.
pub fn povm_ref<T: Povm + 'static>(p: T) -> PovmRef {
    Arc::new(RwLock::new(p))
}

/// A labeled set of effects with a single parameter vector.
///
/// Parameters are the effects' parameters concatenated in label order.
pub trait Povm: fmt::Debug + Send + Sync {
    fn dim(&self) -> usize;

    fn kind(&self) -> &'static str;

    /// Outcome labels in order.
    fn labels(&self) -> Vec<String>;

    fn num_params(&self) -> usize;

    fn to_vector(&self) -> Vec<f64>;

    fn from_vector(&mut self, v: &[f64]) -> Result<()>;

    fn effect_dense(&self, label: &str) -> Result<Array1<f64>>;

    fn effects_dense(&self) -> Result<IndexMap<String, Array1<f64>>> {
        self.labels()
            .into_iter()
            .map(|l| self.effect_dense(&l).map(|v| (l, v)))
            .collect()
    }

    fn set_effect_dense(&mut self, label: &str, v: &Array1<f64>) -> Result<()>;

    fn depolarize(&mut self, amount: f64) -> Result<()>;
}

fn check_labels<'a>(labels: impl Iterator<Item = &'a String>) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    let mut count = 0;
    for l in labels {
        count += 1;
        if !seen.insert(l.as_str()) {
            return Err(Error::InvalidOperation(format!(
                "effect label '{}' given twice",
                l
            )));
        }
    }
    if count == 0 {
        return Err(Error::InvalidOperation("POVM needs at least one effect".into()));
    }
    Ok(())
}

fn computational_effects(num_qubits: usize) -> Result<Vec<(String, Array1<f64>)>> {
    let basis = Basis::pauli_product(num_qubits)?;
    basis
        .bitstrings()
        .into_iter()
        .map(|b| basis.ket_vector(&b).map(|v| (b, v)))
        .collect()
}

/// Independent effects with no sum constraint.
#[derive(Debug)]
pub struct UnconstrainedPovm {
    dim: usize,
    effects: IndexMap<String, Box<dyn SpamVector>>,
}

impl UnconstrainedPovm {
    pub fn new(effects: Vec<(String, Box<dyn SpamVector>)>) -> Result<Self> {
        check_labels(effects.iter().map(|(l, _)| l))?;
        let dim = effects[0].1.dim();
        for (label, e) in &effects {
            if e.dim() != dim {
                return Err(Error::dimension(format!("effect '{}'", label), dim, e.dim()));
            }
        }
        Ok(Self {
            dim,
            effects: effects.into_iter().collect(),
        })
    }

    /// Fully parameterized effects from dense vectors.
    pub fn from_dense(effects: Vec<(String, Array1<f64>)>) -> Result<Self> {
        let boxed = effects
            .into_iter()
            .map(|(l, v)| FullVec::new(v).map(|e| (l, Box::new(e) as Box<dyn SpamVector>)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(boxed)
    }

    /// Projectors onto the computational basis states of `num_qubits` qubits.
    pub fn computational(num_qubits: usize) -> Result<Self> {
        Self::from_dense(computational_effects(num_qubits)?)
    }

    pub fn effect(&self, label: &str) -> Option<&dyn SpamVector> {
        self.effects.get(label).map(|e| e.as_ref())
    }
}

impl Povm for UnconstrainedPovm {
    fn dim(&self) -> usize {
        self.dim
    }

    fn kind(&self) -> &'static str {
        "unconstrained"
    }

    fn labels(&self) -> Vec<String> {
        self.effects.keys().cloned().collect()
    }

    fn num_params(&self) -> usize {
        self.effects.values().map(|e| e.num_params()).sum()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.effects.values().flat_map(|e| e.to_vector()).collect()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("UnconstrainedPovm::from_vector", self.num_params(), v)?;
        let snapshot = self.to_vector();
        let mut offset = 0;
        let mut failure = None;
        for e in self.effects.values_mut() {
            let n = e.num_params();
            if let Err(err) = e.from_vector(&v[offset..offset + n]) {
                failure = Some(err);
                break;
            }
            offset += n;
        }
        let Some(err) = failure else {
            return Ok(());
        };
        let mut offset = 0;
        for e in self.effects.values_mut() {
            let n = e.num_params();
            // Previously accepted values
            let _ = e.from_vector(&snapshot[offset..offset + n]);
            offset += n;
        }
        Err(err)
    }

    fn effect_dense(&self, label: &str) -> Result<Array1<f64>> {
        self.effects
            .get(label)
            .ok_or_else(|| Error::UnknownLabel(format!("effect '{}'", label)))?
            .to_dense()
    }

    fn set_effect_dense(&mut self, label: &str, v: &Array1<f64>) -> Result<()> {
        self.effects
            .get_mut(label)
            .ok_or_else(|| Error::UnknownLabel(format!("effect '{}'", label)))?
            .set_dense(v)
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        validate_depolarization(amount)?;
        for e in self.effects.values_mut() {
            e.depolarize(amount)?;
        }
        Ok(())
    }
}

/// Effects that always sum to the identity.
///
/// All effects but the last are fully parameterized; the last is the
/// complement `I - Σ others` and carries no parameters of its own.
#[derive(Debug, Clone)]
pub struct TpPovm {
    identity: Array1<f64>,
    explicit: IndexMap<String, FullVec>,
    complement_label: String,
}

impl TpPovm {
    /// Fails with `InvalidOperation` if the effects do not sum to the identity.
    pub fn new(effects: Vec<(String, Array1<f64>)>) -> Result<Self> {
        check_labels(effects.iter().map(|(l, _)| l))?;
        if effects.len() < 2 {
            return Err(Error::InvalidOperation(
                "TP POVM needs at least two effects".into(),
            ));
        }
        let dim = effects[0].1.len();
        let identity = Basis::for_dim(dim)?.identity_vector();
        let mut total = Array1::<f64>::zeros(dim);
        for (label, e) in &effects {
            if e.len() != dim {
                return Err(Error::dimension(format!("effect '{}'", label), dim, e.len()));
            }
            total = total + e;
        }
        let residual = (&total - &identity)
            .iter()
            .fold(0.0_f64, |acc, x| acc.max(x.abs()));
        if residual > FIXED_VALUE_TOL.sqrt() {
            return Err(Error::InvalidOperation(format!(
                "TP POVM effects must sum to the identity (deviation {:.3e})",
                residual
            )));
        }

        let mut effects = effects;
        let (complement_label, _) = effects
            .pop()
            .ok_or_else(|| Error::InvalidOperation("TP POVM needs at least two effects".into()))?;
        let explicit = effects
            .into_iter()
            .map(|(l, v)| FullVec::new(v).map(|e| (l, e)))
            .collect::<Result<IndexMap<_, _>>>()?;
        Ok(Self {
            identity,
            explicit,
            complement_label,
        })
    }

    /// Computational-basis measurement of `num_qubits` qubits.
    pub fn computational(num_qubits: usize) -> Result<Self> {
        Self::new(computational_effects(num_qubits)?)
    }

    /// Label of the dependent effect.
    pub fn complement_label(&self) -> &str {
        &self.complement_label
    }

    fn complement(&self) -> Result<Array1<f64>> {
        let mut c = self.identity.clone();
        for e in self.explicit.values() {
            c = c - e.to_dense()?;
        }
        Ok(c)
    }
}

impl Povm for TpPovm {
    fn dim(&self) -> usize {
        self.identity.len()
    }

    fn kind(&self) -> &'static str {
        "tp"
    }

    fn labels(&self) -> Vec<String> {
        self.explicit
            .keys()
            .cloned()
            .chain(std::iter::once(self.complement_label.clone()))
            .collect()
    }

    fn num_params(&self) -> usize {
        self.explicit.len() * self.dim()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.explicit.values().flat_map(|e| e.to_vector()).collect()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("TpPovm::from_vector", self.num_params(), v)?;
        let dim = self.dim();
        for (k, e) in self.explicit.values_mut().enumerate() {
            e.from_vector(&v[k * dim..(k + 1) * dim])?;
        }
        Ok(())
    }

    fn effect_dense(&self, label: &str) -> Result<Array1<f64>> {
        if label == self.complement_label {
            return self.complement();
        }
        self.explicit
            .get(label)
            .ok_or_else(|| Error::UnknownLabel(format!("effect '{}'", label)))?
            .to_dense()
    }

    fn set_effect_dense(&mut self, label: &str, v: &Array1<f64>) -> Result<()> {
        if label == self.complement_label {
            return Err(Error::InvalidOperation(format!(
                "effect '{}' is the complement of the others and cannot be set",
                label
            )));
        }
        self.explicit
            .get_mut(label)
            .ok_or_else(|| Error::UnknownLabel(format!("effect '{}'", label)))?
            .set_dense(v)
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        validate_depolarization(amount)?;
        for e in self.explicit.values_mut() {
            e.depolarize(amount)?;
        }
        Ok(())
    }
}
