// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults (a one-qubit model with `Gi`, `Gx`, `Gy`)
//! 2. model.yaml file
//! 3. Environment variables (QUBITOS_*)
//! 4. CLI arguments

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};
use crate::lindblad::{NonHamMode, ParamMode};
use crate::validation::MAX_QUBITS;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Model declaration
    #[serde(default)]
    pub model: ModelConfig,

    /// Generated n-qubit noise model, used instead of `model` on request
    #[serde(default)]
    pub nqnoise: NqNoiseConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &["model.yaml", "model.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("QUBITOS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("QUBITOS_LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("QUBITOS_MODEL_QUBITS") {
            if let Ok(n) = val.parse() {
                self.model.num_qubits = n;
            }
        }
        if let Ok(val) = env::var("QUBITOS_NQNOISE_QUBITS") {
            if let Ok(n) = val.parse() {
                self.nqnoise.num_qubits = n;
            }
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(Error::Config(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(Error::Config(format!(
                "log format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            )));
        }
        self.model.validate()?;
        self.nqnoise.validate()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Declarative description of a model.
///
/// Maps keep file order, which is also the parameter allocation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of qubits (labels `Q0`, `Q1`, ...)
    #[serde(default = "default_num_qubits")]
    pub num_qubits: usize,

    #[serde(default)]
    pub preps: IndexMap<String, PrepConfig>,

    #[serde(default)]
    pub povms: IndexMap<String, PovmConfig>,

    /// Operations; `composed` and `embedded` entries may only reference
    /// labels declared above them.
    #[serde(default)]
    pub operations: IndexMap<String, OperationConfig>,
}

fn default_num_qubits() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        let rotation = |pauli: &str| OperationConfig::Tp(MatrixSpec {
            rotation: Some(RotationSpec {
                pauli: pauli.into(),
                angle: std::f64::consts::FRAC_PI_2,
            }),
            matrix: None,
            targets: Some(vec!["Q0".into()]),
        });
        let mut preps = IndexMap::new();
        preps.insert("rho0".to_string(), PrepConfig::Tp(VectorSpec::default()));
        let mut povms = IndexMap::new();
        povms.insert(
            "Mdefault".to_string(),
            PovmConfig::Tp {
                effects: IndexMap::new(),
            },
        );
        let mut operations = IndexMap::new();
        operations.insert("Gi".to_string(), OperationConfig::Tp(MatrixSpec::default()));
        operations.insert("Gx".to_string(), rotation("X"));
        operations.insert("Gy".to_string(), rotation("Y"));
        Self {
            num_qubits: default_num_qubits(),
            preps,
            povms,
            operations,
        }
    }
}

impl ModelConfig {
    /// Structural checks that need no numerics.
    pub fn validate(&self) -> Result<()> {
        if self.num_qubits == 0 || self.num_qubits > MAX_QUBITS {
            return Err(Error::Config(format!(
                "num_qubits must be in 1..={}, got {}",
                MAX_QUBITS, self.num_qubits
            )));
        }
        for (label, op) in &self.operations {
            let refs: Vec<&String> = match op {
                OperationConfig::Composed { factors } => factors.iter().collect(),
                OperationConfig::Embedded { op, .. } => vec![op],
                _ => continue,
            };
            for r in refs {
                let declared_before = self
                    .operations
                    .get_index_of(r)
                    .zip(self.operations.get_index_of(label))
                    .is_some_and(|(i, j)| i < j);
                if !declared_before {
                    return Err(Error::Config(format!(
                        "operation '{}' references '{}', which is not declared before it",
                        label, r
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Qubit connectivity of a generated noise model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    #[default]
    Line,
    Ring,
}

/// Settings for the n-qubit noise model: a shared global idle plus
/// X(π/2), Y(π/2) on every qubit and CNOT on every edge, each followed by
/// low-weight Lindblad noise near its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NqNoiseConfig {
    pub num_qubits: usize,

    pub geometry: Geometry,

    /// Maximum weight of errors on the global idle (0 disables the idle)
    pub max_idle_weight: usize,

    /// Gate errors may act on qubits at most this many hops from a target
    pub maxhops: usize,

    /// Additional hops allowed for weight-1 gate errors
    pub extra_weight1_hops: usize,

    /// Error weight allowed beyond the number of target qubits
    pub extra_gate_weight: usize,
}

impl Default for NqNoiseConfig {
    fn default() -> Self {
        Self {
            num_qubits: 2,
            geometry: Geometry::Line,
            max_idle_weight: 1,
            maxhops: 0,
            extra_weight1_hops: 0,
            extra_gate_weight: 0,
        }
    }
}

impl NqNoiseConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_qubits == 0 || self.num_qubits > MAX_QUBITS {
            return Err(Error::Config(format!(
                "nqnoise.num_qubits must be in 1..={}, got {}",
                MAX_QUBITS, self.num_qubits
            )));
        }
        if self.max_idle_weight > self.num_qubits {
            return Err(Error::Config(format!(
                "nqnoise.max_idle_weight {} exceeds the {} qubits",
                self.max_idle_weight, self.num_qubits
            )));
        }
        Ok(())
    }

    /// (weight, hops) pairs for the local noise of a one-qubit gate.
    pub fn one_qubit_weights(&self) -> Vec<(usize, usize)> {
        let mut weights = vec![(1, self.maxhops + self.extra_weight1_hops)];
        weights.extend((1..=self.extra_gate_weight).map(|x| (1 + x, self.maxhops)));
        weights
    }

    /// (weight, hops) pairs for the local noise of a two-qubit gate.
    pub fn two_qubit_weights(&self) -> Vec<(usize, usize)> {
        let mut weights = vec![(1, self.maxhops + self.extra_weight1_hops), (2, self.maxhops)];
        weights.extend((1..=self.extra_gate_weight).map(|x| (2 + x, self.maxhops)));
        weights
    }
}

/// A Liouville vector given as a computational ket or as literal values.
///
/// With neither set, preps default to the all-zeros ket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ket: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
}

/// Rotation exp(-i·angle·P/2) about a Pauli product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationSpec {
    pub pauli: String,
    pub angle: f64,
}

/// A superoperator given as a rotation or as literal rows.
///
/// With neither set the matrix is the identity. `targets` restricts the
/// matrix to those state-space labels and embeds it into the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Vec<f64>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
}

/// T1/T2 relaxation accumulated over `duration`, for one-qubit generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaxationSpec {
    pub t1: f64,
    pub t2: f64,
    pub duration: f64,
}

/// Lindblad generator settings.
///
/// `coeffs` keys are error terms such as `"H(X)"`, `"S(X,Y)"`, `"A(Z)"`.
/// With neither `coeffs` nor `relaxation`, the generator is zero over the
/// full Pauli error basis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrgenConfig {
    #[serde(default)]
    pub nonham_mode: NonHamMode,

    #[serde(default)]
    pub param_mode: ParamMode,

    #[serde(default)]
    pub truncate: bool,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub coeffs: IndexMap<String, f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relaxation: Option<RelaxationSpec>,
}

/// A state preparation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrepConfig {
    Static(VectorSpec),
    Full(VectorSpec),
    Tp(VectorSpec),
    Lindblad {
        #[serde(default)]
        base: VectorSpec,
        #[serde(default)]
        errgen: ErrgenConfig,
    },
}

/// A measurement. Empty `effects` means the computational basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PovmConfig {
    Unconstrained {
        #[serde(default)]
        effects: IndexMap<String, VectorSpec>,
    },
    Tp {
        #[serde(default)]
        effects: IndexMap<String, VectorSpec>,
    },
}

/// A gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationConfig {
    Static(MatrixSpec),
    Full(MatrixSpec),
    Tp(MatrixSpec),
    Lindblad {
        #[serde(default)]
        base: MatrixSpec,
        #[serde(default)]
        errgen: ErrgenConfig,
    },
    /// Product of previously declared operations, first applied first.
    Composed { factors: Vec<String> },
    /// A previously declared operation acting on `targets` only.
    Embedded { targets: Vec<String>, op: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.model.num_qubits, 1);
        assert_eq!(
            config.model.operations.keys().collect::<Vec<_>>(),
            vec!["Gi", "Gx", "Gy"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = Config::default();
        bad.model.num_qubits = 0;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.model.num_qubits = MAX_QUBITS + 1;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.logging.format = "xml".into();
        let msg = bad.validate().unwrap_err().to_string();
        assert!(msg.contains("log format"));
    }

    #[test]
    fn test_nqnoise_section() {
        let config = Config::default();
        assert_eq!(config.nqnoise.num_qubits, 2);
        assert_eq!(config.nqnoise.one_qubit_weights(), vec![(1, 0)]);

        let yaml = "nqnoise:\n  num_qubits: 4\n  geometry: ring\n  maxhops: 1\n  extra_weight1_hops: 1\n  extra_gate_weight: 1\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.nqnoise.geometry, Geometry::Ring);
        assert_eq!(config.nqnoise.max_idle_weight, 1);
        assert_eq!(config.nqnoise.one_qubit_weights(), vec![(1, 2), (2, 1)]);
        assert_eq!(config.nqnoise.two_qubit_weights(), vec![(1, 2), (2, 1), (3, 1)]);
        assert!(config.validate().is_ok());

        let mut bad = Config::default();
        bad.nqnoise.max_idle_weight = 3;
        assert!(matches!(bad.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let mut config = ModelConfig::default();
        config.operations.insert(
            "Gc".into(),
            OperationConfig::Composed {
                factors: vec!["Gx".into(), "Gz".into()],
            },
        );
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("'Gz'"));
    }

    #[test]
    fn test_config_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
logging:
  level: debug
model:
  num_qubits: 2
  preps:
    rho0: {{ type: full, ket: "00" }}
  povms:
    Mz: {{ type: unconstrained }}
  operations:
    Gx:
      type: lindblad
      base: {{ rotation: {{ pauli: X, angle: 1.5707963267948966 }}, targets: [Q1] }}
      errgen:
        nonham_mode: diagonal
        coeffs: {{ "H(X)": 0.01, "S(X)": 0.002 }}
    Gcx:
      type: composed
      factors: [Gx, Gx]
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.model.num_qubits, 2);
        assert_eq!(
            config.model.preps["rho0"],
            PrepConfig::Full(VectorSpec {
                ket: Some("00".into()),
                values: None
            })
        );
        match &config.model.operations["Gx"] {
            OperationConfig::Lindblad { base, errgen } => {
                assert_eq!(base.targets.as_deref(), Some(&["Q1".to_string()][..]));
                assert_eq!(errgen.nonham_mode, NonHamMode::Diagonal);
                assert_eq!(errgen.param_mode, ParamMode::Cptp);
                assert_eq!(errgen.coeffs["S(X)"], 0.002);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        // When a path is provided but doesn't exist, load returns defaults
        let path = std::path::Path::new("/tmp/does_not_exist_qubitos_model_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.model.operations, ModelConfig::default().operations);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();

        let result = Config::load(Some(f.path()));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_parameterization_rejected() {
        let yaml = "type: cubic\n";
        let parsed: std::result::Result<OperationConfig, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        std::env::set_var("QUBITOS_LOG_LEVEL", "debug");
        std::env::set_var("QUBITOS_LOG_FORMAT", "json");
        std::env::set_var("QUBITOS_MODEL_QUBITS", "3");
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.model.num_qubits, 3);
        std::env::remove_var("QUBITOS_LOG_LEVEL");
        std::env::remove_var("QUBITOS_LOG_FORMAT");
        std::env::remove_var("QUBITOS_MODEL_QUBITS");

        // Unparseable values are ignored
        std::env::set_var("QUBITOS_MODEL_QUBITS", "many");
        config.apply_env_overrides();
        assert_eq!(config.model.num_qubits, 3);
        std::env::remove_var("QUBITOS_MODEL_QUBITS");
    }
}
