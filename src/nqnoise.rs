// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Low-weight, geometrically local n-qubit noise models.
//!
//! Every gate is the composition `target -> idle -> local noise`. The idle
//! is one composed operator shared by all gates, so its parameters are
//! allocated once. Local noise is a composition of embedded single-term
//! Lindblad operators on qubits near the targets. A weight-w term carries
//! Hamiltonian and CPTP diagonal stochastic coefficients for each of the
//! 3^w non-identity Pauli products, so it has 2·3^w parameters.

use std::collections::{BTreeSet, VecDeque};
use std::f64::consts::FRAC_PI_2;

use indexmap::IndexMap;
use ndarray::Array2;
use num_complex::Complex64;
use tracing::{debug, info};

use crate::basis::{pauli_product, Basis, BasisDict, CMatrix};
use crate::config::{Geometry, NqNoiseConfig};
use crate::error::{Error, Result};
use crate::lindblad::{LindbladErrorgen, NonHamMode, ParamMode};
use crate::model::Model;
use crate::operators::{op_ref, ComposedOp, EmbeddedOp, LindbladOp, OpRef, StaticOp};
use crate::spam::{TpPovm, TpVec};
use crate::statespace::StateSpace;

/// Undirected nearest-neighbour graph over qubits `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QubitGraph {
    num_qubits: usize,
    /// Sorted, each edge stored once as (low, high).
    edges: Vec<(usize, usize)>,
}

impl QubitGraph {
    pub fn new(num_qubits: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut normalized = BTreeSet::new();
        for &(a, b) in edges {
            if a >= num_qubits || b >= num_qubits || a == b {
                return Err(Error::InvalidOperation(format!(
                    "edge ({}, {}) is not valid for {} qubits",
                    a, b, num_qubits
                )));
            }
            normalized.insert((a.min(b), a.max(b)));
        }
        Ok(Self {
            num_qubits,
            edges: normalized.into_iter().collect(),
        })
    }

    /// 0 - 1 - ... - (n-1)
    pub fn line(num_qubits: usize) -> Result<Self> {
        let edges: Vec<_> = (1..num_qubits).map(|i| (i - 1, i)).collect();
        Self::new(num_qubits, &edges)
    }

    /// A line closed into a loop; identical to the line below three qubits.
    pub fn ring(num_qubits: usize) -> Result<Self> {
        let mut edges: Vec<_> = (1..num_qubits).map(|i| (i - 1, i)).collect();
        if num_qubits > 2 {
            edges.push((0, num_qubits - 1));
        }
        Self::new(num_qubits, &edges)
    }

    pub fn common(num_qubits: usize, geometry: Geometry) -> Result<Self> {
        match geometry {
            Geometry::Line => Self::line(num_qubits),
            Geometry::Ring => Self::ring(num_qubits),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn is_directly_connected(&self, a: usize, b: usize) -> bool {
        self.edges.binary_search(&(a.min(b), a.max(b))).is_ok()
    }

    fn neighbors(&self, q: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges.iter().filter_map(move |&(a, b)| match (a == q, b == q) {
            (true, _) => Some(b),
            (_, true) => Some(a),
            _ => None,
        })
    }

    /// Qubits at most `hops` edges from any of `targets`, ascending.
    pub fn radius(&self, targets: &[usize], hops: usize) -> Vec<usize> {
        let mut dist = vec![usize::MAX; self.num_qubits];
        let mut queue = VecDeque::new();
        for &t in targets.iter().filter(|&&t| t < self.num_qubits) {
            dist[t] = 0;
            queue.push_back(t);
        }
        while let Some(q) = queue.pop_front() {
            if dist[q] == hops {
                continue;
            }
            for n in self.neighbors(q) {
                if dist[n] == usize::MAX {
                    dist[n] = dist[q] + 1;
                    queue.push_back(n);
                }
            }
        }
        (0..self.num_qubits).filter(|&q| dist[q] <= hops).collect()
    }

    /// Whether `qubits` induce a connected subgraph.
    pub fn is_connected(&self, qubits: &[usize]) -> bool {
        let Some(&start) = qubits.first() else {
            return true;
        };
        let mut reached = vec![start];
        let mut k = 0;
        while k < reached.len() {
            let q = reached[k];
            for n in self.neighbors(q) {
                if qubits.contains(&n) && !reached.contains(&n) {
                    reached.push(n);
                }
            }
            k += 1;
        }
        reached.len() == qubits.len()
    }

    /// Number of connected `weight`-subsets of `candidates`.
    pub fn connected_combos(&self, candidates: &[usize], weight: usize) -> usize {
        combinations(candidates, weight)
            .iter()
            .filter(|c| self.is_connected(c))
            .count()
    }
}

/// All `k`-subsets of `items` in lexicographic order.
fn combinations(items: &[usize], k: usize) -> Vec<Vec<usize>> {
    if k > items.len() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| items[i]).collect());
        let Some(pos) = (0..k).rev().find(|&p| idx[p] != p + items.len() - k) else {
            return out;
        };
        idx[pos] += 1;
        for p in pos + 1..k {
            idx[p] = idx[p - 1] + 1;
        }
    }
}

fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

/// Parameters of one weight-`weight` H+S error term.
pub fn term_num_params(weight: usize) -> usize {
    2 * 3usize.pow(weight as u32)
}

/// Pauli products with no identity factor, e.g. `XX`, `XY`, ..., `ZZ`.
fn term_basis(weight: usize) -> Result<BasisDict> {
    let mut labels = vec![String::new()];
    for _ in 0..weight {
        labels = labels
            .iter()
            .flat_map(|prefix| ['X', 'Y', 'Z'].into_iter().map(move |c| format!("{}{}", prefix, c)))
            .collect();
    }
    labels
        .into_iter()
        .map(|l| pauli_product(&l).map(|m| (l, m)))
        .collect()
}

fn qubit_labels(qubits: &[usize]) -> Vec<String> {
    qubits.iter().map(|q| format!("Q{}", q)).collect()
}

/// A zero H+S Lindblad term on `qubits`, embedded into the full space.
fn embedded_term(state_space: &StateSpace, qubits: &[usize]) -> Result<OpRef> {
    let weight = qubits.len();
    let basis = term_basis(weight)?;
    let errgen = LindbladErrorgen::new(
        4usize.pow(weight as u32),
        &basis,
        &basis,
        NonHamMode::Diagonal,
        ParamMode::Cptp,
        true,
    )?;
    let term = op_ref(LindbladOp::from_errgen(errgen));
    Ok(op_ref(EmbeddedOp::new(
        state_space.clone(),
        &qubit_labels(qubits),
        term,
    )?))
}

/// Idle acting on every qubit, with one term per connected set of up to
/// `max_weight` qubits.
pub fn build_global_idle(graph: &QubitGraph, max_weight: usize) -> Result<ComposedOp> {
    let state_space = StateSpace::qubits(graph.num_qubits())?;
    let all: Vec<usize> = (0..graph.num_qubits()).collect();
    let mut terms = Vec::new();
    for weight in 1..=max_weight {
        for qubits in combinations(&all, weight) {
            if graph.is_connected(&qubits) {
                terms.push(embedded_term(&state_space, &qubits)?);
            }
        }
    }
    debug!(terms = terms.len(), max_weight, "built global idle");
    ComposedOp::new(state_space.dim(), terms)
}

/// `target` on `targets`, then `idle` (if any), then local noise.
///
/// For each `(weight, hops)` pair, every `weight`-subset of the qubits
/// within `hops` of the targets gets its own error term.
pub fn build_composed_gate(
    target: &Array2<f64>,
    targets: &[usize],
    graph: &QubitGraph,
    weight_maxhops: &[(usize, usize)],
    idle: Option<&OpRef>,
) -> Result<ComposedOp> {
    let state_space = StateSpace::qubits(graph.num_qubits())?;
    let dim = state_space.dim();
    let full_target = op_ref(EmbeddedOp::new(
        state_space.clone(),
        &qubit_labels(targets),
        op_ref(StaticOp::new(target.clone())?),
    )?);

    let mut local = Vec::new();
    for &(weight, hops) in weight_maxhops {
        let candidates = graph.radius(targets, hops);
        for qubits in combinations(&candidates, weight) {
            local.push(embedded_term(&state_space, &qubits)?);
        }
    }
    debug!(?targets, terms = local.len(), "built local noise");

    let mut factors = vec![full_target];
    factors.extend(idle.cloned());
    factors.push(op_ref(ComposedOp::new(dim, local)?));
    ComposedOp::new(dim, factors)
}

fn cnot_unitary() -> CMatrix {
    let mut u = CMatrix::zeros((4, 4));
    for (r, c) in [(0, 0), (1, 1), (2, 3), (3, 2)] {
        u[[r, c]] = Complex64::new(1.0, 0.0);
    }
    u
}

/// Build the noise model described by `config`.
///
/// Labels are `Gi`, `Gx:i`, `Gy:i` and `Gcnot:i:j` (control `i < j`), with
/// a TP prep `rho0` and a TP computational POVM `Mdefault`. All gate
/// parameters start at zero, so every gate equals its target.
pub fn build_nqnoise_model(config: &NqNoiseConfig) -> Result<Model> {
    config.validate()?;
    let n = config.num_qubits;
    let graph = QubitGraph::common(n, config.geometry)?;
    let mut model = Model::qubits(n)?;

    let basis = model.basis().clone();
    model.add_prep("rho0", TpVec::new(basis.ket_vector(&"0".repeat(n))?)?)?;
    model.add_povm("Mdefault", TpPovm::computational(n)?)?;

    let idle = if config.max_idle_weight > 0 {
        let idle = op_ref(build_global_idle(&graph, config.max_idle_weight)?);
        model.add_operation_ref("Gi", idle.clone())?;
        Some(idle)
    } else {
        None
    };

    let one_qubit = Basis::pauli_product(1)?;
    let gx = one_qubit.rotation_superop("X", FRAC_PI_2)?;
    let gy = one_qubit.rotation_superop("Y", FRAC_PI_2)?;
    let weights = config.one_qubit_weights();
    for i in 0..n {
        let x = build_composed_gate(&gx, &[i], &graph, &weights, idle.as_ref())?;
        model.add_operation(&format!("Gx:{}", i), x)?;
        let y = build_composed_gate(&gy, &[i], &graph, &weights, idle.as_ref())?;
        model.add_operation(&format!("Gy:{}", i), y)?;
    }

    let cnot = Basis::pauli_product(2)?.unitary_superop(&cnot_unitary())?;
    let weights = config.two_qubit_weights();
    for &(i, j) in graph.edges() {
        let g = build_composed_gate(&cnot, &[i, j], &graph, &weights, idle.as_ref())?;
        model.add_operation(&format!("Gcnot:{}:{}", i, j), g)?;
    }

    info!(
        qubits = n,
        geometry = ?config.geometry,
        operations = model.operation_labels().len(),
        "built n-qubit noise model"
    );
    Ok(model)
}

/// Parameter counts of the model [`build_nqnoise_model`] would build, from
/// the geometry alone.
///
/// Gate entries exclude the shared idle, so the total is the sum of the
/// entries.
pub fn nqnoise_param_counts(config: &NqNoiseConfig) -> Result<(IndexMap<String, usize>, usize)> {
    config.validate()?;
    let n = config.num_qubits;
    let graph = QubitGraph::common(n, config.geometry)?;
    let all: Vec<usize> = (0..n).collect();

    let gate_count = |targets: &[usize], weights: &[(usize, usize)]| -> usize {
        weights
            .iter()
            .map(|&(weight, hops)| {
                binomial(graph.radius(targets, hops).len(), weight) * term_num_params(weight)
            })
            .sum()
    };

    let mut counts = IndexMap::new();
    let dim = 4usize.pow(n as u32);
    counts.insert("rho0".to_string(), dim - 1);
    counts.insert("Mdefault".to_string(), ((1 << n) - 1) * dim);
    if config.max_idle_weight > 0 {
        let idle = (1..=config.max_idle_weight)
            .map(|w| graph.connected_combos(&all, w) * term_num_params(w))
            .sum();
        counts.insert("Gi".to_string(), idle);
    }
    let weights = config.one_qubit_weights();
    for i in 0..n {
        counts.insert(format!("Gx:{}", i), gate_count(&[i], &weights));
        counts.insert(format!("Gy:{}", i), gate_count(&[i], &weights));
    }
    let weights = config.two_qubit_weights();
    for &(i, j) in graph.edges() {
        counts.insert(format!("Gcnot:{}:{}", i, j), gate_count(&[i, j], &weights));
    }
    let total = counts.values().sum();
    Ok((counts, total))
}
