// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Build a [`Model`] from a [`ModelConfig`].

use ndarray::{Array1, Array2};
use num_complex::Complex64;
use tracing::{debug, info};

use crate::basis::{pauli_error_basis, Basis};
use crate::config::{
    ErrgenConfig, MatrixSpec, ModelConfig, NqNoiseConfig, OperationConfig, PovmConfig, PrepConfig,
    VectorSpec,
};
use crate::error::{Error, Result};
use crate::lindblad::{CollapseOperator, ErrgenCoeffs, ErrorTerm, LindbladErrorgen};
use crate::model::Model;
use crate::nqnoise;
use crate::operators::{
    op_ref, ComposedOp, EmbeddedOp, FullOp, LindbladOp, OpRef, StaticOp, TpOp,
};
use crate::spam::{
    povm_ref, spam_ref, FullVec, LindbladVec, PovmRef, SpamRef, SpamRole, StaticVec, TpPovm,
    TpVec, UnconstrainedPovm,
};
use crate::statespace::StateSpace;

/// Turns a declarative model description into live objects.
pub struct ModelBuilder<'a> {
    config: &'a ModelConfig,
}

fn target_dim(state_space: &StateSpace, targets: &[String]) -> Result<usize> {
    targets
        .iter()
        .map(|t| state_space.factor_dim(t))
        .product::<Result<usize>>()
}

fn vector(basis: &Basis, spec: &VectorSpec, context: &str, default_ket: bool) -> Result<Array1<f64>> {
    match (&spec.ket, &spec.values) {
        (Some(_), Some(_)) => Err(Error::Config(format!(
            "{}: give either 'ket' or 'values', not both",
            context
        ))),
        (Some(ket), None) => basis.ket_vector(ket),
        (None, Some(values)) => {
            if values.len() != basis.dim() {
                return Err(Error::dimension(context, basis.dim(), values.len()));
            }
            Ok(Array1::from(values.clone()))
        }
        (None, None) if default_ket => basis.ket_vector(&"0".repeat(basis.num_qubits())),
        (None, None) => Err(Error::Config(format!(
            "{}: needs 'ket' or 'values'",
            context
        ))),
    }
}

fn matrix(spec: &MatrixSpec, dim: usize, context: &str) -> Result<Array2<f64>> {
    match (&spec.rotation, &spec.matrix) {
        (Some(_), Some(_)) => Err(Error::Config(format!(
            "{}: give either 'rotation' or 'matrix', not both",
            context
        ))),
        (Some(r), None) => Basis::for_dim(dim)?.rotation_superop(&r.pauli, r.angle),
        (None, Some(rows)) => {
            if rows.len() != dim {
                return Err(Error::dimension(format!("{} rows", context), dim, rows.len()));
            }
            if let Some(row) = rows.iter().find(|r| r.len() != dim) {
                return Err(Error::dimension(format!("{} columns", context), dim, row.len()));
            }
            let flat: Vec<f64> = rows.iter().flatten().copied().collect();
            Array2::from_shape_vec((dim, dim), flat)
                .map_err(|e| Error::Config(format!("{}: {}", context, e)))
        }
        (None, None) => Ok(Array2::eye(dim)),
    }
}

fn errgen(cfg: &ErrgenConfig, dim: usize, context: &str) -> Result<LindbladErrorgen> {
    let basis = Basis::for_dim(dim)?;
    let mut coeffs = match &cfg.relaxation {
        Some(r) => {
            if basis.num_qubits() != 1 {
                return Err(Error::Config(format!(
                    "{}: relaxation is only defined for one-qubit generators",
                    context
                )));
            }
            let ops = CollapseOperator::from_t1_t2(r.t1, r.t2, context)?;
            ErrgenCoeffs::from_collapse_operators(&ops, r.duration)?
        }
        None => ErrgenCoeffs::default(),
    };

    let terms = cfg
        .coeffs
        .iter()
        .map(|(k, &v)| k.parse::<ErrorTerm>().map(|t| (t, Complex64::new(v, 0.0))))
        .collect::<Result<Vec<_>>>()?;
    let extra = ErrgenCoeffs::from_pauli_terms(terms)?;
    for (label, m) in extra.basis {
        coeffs.basis.entry(label).or_insert(m);
    }
    for (term, value) in extra.coeffs {
        *coeffs.coeffs.entry(term).or_insert(Complex64::new(0.0, 0.0)) += value;
    }

    if coeffs.coeffs.is_empty() {
        let full = pauli_error_basis(basis.num_qubits())?;
        return LindbladErrorgen::new(dim, &full, &full, cfg.nonham_mode, cfg.param_mode, cfg.truncate);
    }
    let generator =
        LindbladErrorgen::from_coeffs(&coeffs, cfg.nonham_mode, cfg.param_mode, cfg.truncate)?;
    if generator.dim() != dim {
        return Err(Error::dimension(
            format!("{} error terms", context),
            dim,
            generator.dim(),
        ));
    }
    Ok(generator)
}

impl<'a> ModelBuilder<'a> {
    pub fn new(config: &'a ModelConfig) -> Self {
        Self { config }
    }

    /// Build the generated n-qubit noise model instead of a declared one.
    pub fn nqnoise(config: &NqNoiseConfig) -> Result<Model> {
        nqnoise::build_nqnoise_model(config)
    }

    /// Validate the description and construct every object in file order.
    pub fn build(&self) -> Result<Model> {
        self.config.validate()?;
        let mut model = Model::qubits(self.config.num_qubits)?;
        let basis = model.basis().clone();

        for (label, cfg) in &self.config.preps {
            let prep = self.prep(&basis, cfg, label)?;
            model.add_prep_ref(label, prep)?;
            debug!(label = %label, "added prep");
        }
        for (label, cfg) in &self.config.povms {
            let povm = self.povm(&basis, cfg, label)?;
            model.add_povm_ref(label, povm)?;
            debug!(label = %label, "added povm");
        }
        for (label, cfg) in &self.config.operations {
            let op = self.operation(&model, cfg, model.dim(), label)?;
            model.add_operation_ref(label, op)?;
            debug!(label = %label, "added operation");
        }

        info!(
            num_qubits = self.config.num_qubits,
            preps = model.preps().len(),
            povms = model.povms().len(),
            operations = model.operations().len(),
            "model built"
        );
        Ok(model)
    }

    fn prep(&self, basis: &Basis, cfg: &PrepConfig, label: &str) -> Result<SpamRef> {
        let context = format!("prep '{}'", label);
        Ok(match cfg {
            PrepConfig::Static(spec) => {
                spam_ref(StaticVec::new(vector(basis, spec, &context, true)?)?)
            }
            PrepConfig::Full(spec) => spam_ref(FullVec::new(vector(basis, spec, &context, true)?)?),
            PrepConfig::Tp(spec) => spam_ref(TpVec::new(vector(basis, spec, &context, true)?)?),
            PrepConfig::Lindblad { base, errgen: eg } => {
                let v = vector(basis, base, &context, true)?;
                let generator = errgen(eg, basis.dim(), &context)?;
                spam_ref(LindbladVec::new(v, generator, SpamRole::Prep)?)
            }
        })
    }

    fn povm(&self, basis: &Basis, cfg: &PovmConfig, label: &str) -> Result<PovmRef> {
        let (effects, tp) = match cfg {
            PovmConfig::Unconstrained { effects } => (effects, false),
            PovmConfig::Tp { effects } => (effects, true),
        };
        if effects.is_empty() {
            return Ok(if tp {
                povm_ref(TpPovm::computational(basis.num_qubits())?)
            } else {
                povm_ref(UnconstrainedPovm::computational(basis.num_qubits())?)
            });
        }
        let dense = effects
            .iter()
            .map(|(name, spec)| {
                let context = format!("effect '{}' of povm '{}'", name, label);
                vector(basis, spec, &context, false).map(|v| (name.clone(), v))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(if tp {
            povm_ref(TpPovm::new(dense)?)
        } else {
            povm_ref(UnconstrainedPovm::from_dense(dense)?)
        })
    }

    /// Build an operation of dimension `dim` (the model's, or a target subspace's).
    fn operation(&self, model: &Model, cfg: &OperationConfig, dim: usize, label: &str) -> Result<OpRef> {
        let context = format!("operation '{}'", label);
        match cfg {
            OperationConfig::Static(spec) => {
                self.dense(model, spec, dim, &context, |m| Ok(op_ref(StaticOp::new(m)?)))
            }
            OperationConfig::Full(spec) => {
                self.dense(model, spec, dim, &context, |m| Ok(op_ref(FullOp::new(m)?)))
            }
            OperationConfig::Tp(spec) => {
                self.dense(model, spec, dim, &context, |m| Ok(op_ref(TpOp::new(m)?)))
            }
            OperationConfig::Lindblad { base, errgen: eg } => {
                self.dense(model, base, dim, &context, |m| {
                    let generator = errgen(eg, m.nrows(), &context)?;
                    let base = op_ref(StaticOp::new(m)?);
                    Ok(op_ref(LindbladOp::new(base, generator)?))
                })
            }
            OperationConfig::Composed { factors } => {
                let ops = factors
                    .iter()
                    .map(|f| model.operation(f))
                    .collect::<Result<Vec<_>>>()?;
                Ok(op_ref(ComposedOp::new(dim, ops)?))
            }
            OperationConfig::Embedded { targets, op } => {
                let ss = model.state_space();
                let inner = model.operation(op)?;
                let inner_dim = inner.read().dim();
                let expected = target_dim(ss, targets)?;
                if inner_dim != expected {
                    // Top-level operations span the whole model, so only
                    // full-width targets can wrap one directly.
                    return Err(Error::dimension(
                        format!("{} wrapping '{}'", context, op),
                        expected,
                        inner_dim,
                    ));
                }
                Ok(op_ref(EmbeddedOp::new(ss.clone(), targets, inner)?))
            }
        }
    }

    fn dense<F>(&self, model: &Model, spec: &MatrixSpec, dim: usize, context: &str, make: F) -> Result<OpRef>
    where
        F: FnOnce(Array2<f64>) -> Result<OpRef>,
    {
        let Some(targets) = &spec.targets else {
            return make(matrix(spec, dim, context)?);
        };
        let ss = model.state_space();
        let sub = target_dim(ss, targets)?;
        let inner = make(matrix(spec, sub, context)?)?;
        Ok(op_ref(EmbeddedOp::new(ss.clone(), targets, inner)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RelaxationSpec, RotationSpec};
    use crate::lindblad::{NonHamMode, ParamMode};
    use crate::test_utils::{assert_matrix_close, x_pi2_static};
    use approx::assert_relative_eq;
    use indexmap::IndexMap;

    #[test]
    fn test_default_model() {
        let config = ModelConfig::default();
        let mut model = ModelBuilder::new(&config).build().unwrap();
        // TP prep 3 + TP POVM 4 + three TP gates 12 each
        assert_eq!(model.num_params().unwrap(), 3 + 4 + 36);
        let gx = model.operation("Gx").unwrap().read().to_dense().unwrap();
        assert_matrix_close(&gx, &x_pi2_static().read().to_dense().unwrap(), 1e-12);
        let p = model.probabilities("rho0", "Mdefault", &["Gx", "Gx"]).unwrap();
        assert_relative_eq!(p["1"], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_default_model_on_two_qubits() {
        let mut config = ModelConfig::default();
        config.num_qubits = 2;
        let mut model = ModelBuilder::new(&config).build().unwrap();
        assert_eq!(model.dim(), 16);
        // Embedded gates expose the 4x4 TP parameters only
        assert_eq!(model.num_params().unwrap(), 15 + 3 * 16 + 16 * 15 + 12 + 12);
        let p = model.probabilities("rho0", "Mdefault", &["Gx", "Gx"]).unwrap();
        assert_relative_eq!(p["10"], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_composed_shares_factors() {
        let mut config = ModelConfig::default();
        config.operations.insert(
            "Gxy".into(),
            OperationConfig::Composed {
                factors: vec!["Gx".into(), "Gy".into(), "Gx".into()],
            },
        );
        let mut model = ModelBuilder::new(&config).build().unwrap();
        assert_eq!(model.num_params().unwrap(), 3 + 4 + 36);
        assert_eq!(model.operation("Gxy").unwrap().read().num_params(), 24);
        let expected = model.product(&["Gx", "Gy", "Gx"]).unwrap();
        let composed = model.operation("Gxy").unwrap().read().to_dense().unwrap();
        assert_matrix_close(&composed, &expected, 1e-12);
    }

    #[test]
    fn test_lindblad_entries() {
        let mut config = ModelConfig::default();
        let mut coeffs = IndexMap::new();
        coeffs.insert("H(X)".to_string(), 0.01);
        coeffs.insert("S(X)".to_string(), 0.002);
        config.operations.insert(
            "Gx_noisy".into(),
            OperationConfig::Lindblad {
                base: MatrixSpec {
                    rotation: Some(RotationSpec {
                        pauli: "X".into(),
                        angle: std::f64::consts::FRAC_PI_2,
                    }),
                    matrix: None,
                    targets: None,
                },
                errgen: ErrgenConfig {
                    nonham_mode: NonHamMode::Diagonal,
                    param_mode: ParamMode::Cptp,
                    coeffs,
                    ..Default::default()
                },
            },
        );
        config.operations.insert(
            "Gidle".into(),
            OperationConfig::Lindblad {
                base: MatrixSpec::default(),
                errgen: ErrgenConfig {
                    relaxation: Some(RelaxationSpec {
                        t1: 50.0,
                        t2: 30.0,
                        duration: 0.1,
                    }),
                    ..Default::default()
                },
            },
        );
        config.operations.insert(
            "Gfree".into(),
            OperationConfig::Lindblad {
                base: MatrixSpec::default(),
                errgen: ErrgenConfig::default(),
            },
        );
        let model = ModelBuilder::new(&config).build().unwrap();

        let noisy = model.operation("Gx_noisy").unwrap();
        assert_eq!(noisy.read().num_params(), 2);
        let dense = noisy.read().to_dense().unwrap();
        assert_relative_eq!(dense[[0, 0]], 1.0, epsilon = 1e-12);
        let ideal = x_pi2_static().read().to_dense().unwrap();
        assert!(crate::linalg::max_abs_diff(&dense, &ideal) > 1e-3);

        // T1/T2 relaxation keeps the trace and shrinks the X component
        let idle = model.operation("Gidle").unwrap().read().to_dense().unwrap();
        assert_relative_eq!(idle[[0, 0]], 1.0, epsilon = 1e-12);
        assert!(idle[[1, 1]] < 1.0 && idle[[1, 1]] > 0.99);

        // Zero generator over the full basis: 3 + 9 parameters
        assert_eq!(model.operation("Gfree").unwrap().read().num_params(), 12);
    }

    #[test]
    fn test_lindblad_prep_and_explicit_povm() {
        let mut config = ModelConfig::default();
        config.preps.insert(
            "rho_noisy".into(),
            PrepConfig::Lindblad {
                base: VectorSpec::default(),
                errgen: ErrgenConfig {
                    nonham_mode: NonHamMode::Diagonal,
                    param_mode: ParamMode::Depol,
                    ..Default::default()
                },
            },
        );
        let mut effects = IndexMap::new();
        effects.insert(
            "up".to_string(),
            VectorSpec {
                ket: Some("0".into()),
                values: None,
            },
        );
        effects.insert(
            "down".to_string(),
            VectorSpec {
                ket: Some("1".into()),
                values: None,
            },
        );
        config
            .povms
            .insert("Mud".into(), PovmConfig::Unconstrained { effects });
        let mut model = ModelBuilder::new(&config).build().unwrap();
        assert_eq!(model.prep("rho_noisy").unwrap().read().num_params(), 4);
        assert_eq!(model.povm("Mud").unwrap().read().num_params(), 8);
        let p = model.probabilities("rho_noisy", "Mud", &[] as &[&str]).unwrap();
        assert_relative_eq!(p["up"], 1.0, epsilon = 1e-12);
        assert_eq!(model.num_params().unwrap(), 3 + 4 + 4 + 8 + 36);
    }

    #[test]
    fn test_literal_matrix_and_bad_shapes() {
        let mut config = ModelConfig::default();
        let gate_mx = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 0.0, -1.0],
            vec![0.0, 0.0, 1.0, 0.0],
        ];
        config.operations.insert(
            "Gm".into(),
            OperationConfig::Static(MatrixSpec {
                rotation: None,
                matrix: Some(gate_mx.clone()),
                targets: None,
            }),
        );
        let model = ModelBuilder::new(&config).build().unwrap();
        let dense = model.operation("Gm").unwrap().read().to_dense().unwrap();
        assert_eq!(dense[[2, 3]], -1.0);
        assert_eq!(model.operation("Gm").unwrap().read().num_params(), 0);

        let mut bad = config.clone();
        bad.operations.insert(
            "Gbad".into(),
            OperationConfig::Full(MatrixSpec {
                rotation: None,
                matrix: Some(gate_mx[..3].to_vec()),
                targets: None,
            }),
        );
        assert!(matches!(
            ModelBuilder::new(&bad).build(),
            Err(Error::DimensionMismatch { .. })
        ));

        let mut bad = config;
        bad.preps.insert(
            "rho_bad".into(),
            PrepConfig::Full(VectorSpec {
                ket: Some("0".into()),
                values: Some(vec![1.0; 4]),
            }),
        );
        assert!(matches!(ModelBuilder::new(&bad).build(), Err(Error::Config(_))));
    }

    #[test]
    fn test_embedded_entry_needs_matching_width() {
        let mut config = ModelConfig::default();
        config.operations.insert(
            "Gx_all".into(),
            OperationConfig::Embedded {
                targets: vec!["Q0".into()],
                op: "Gx".into(),
            },
        );
        let mut model = ModelBuilder::new(&config).build().unwrap();
        assert_eq!(model.num_params().unwrap(), 3 + 4 + 36);

        let mut two = config.clone();
        two.num_qubits = 2;
        assert!(matches!(
            ModelBuilder::new(&two).build(),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
