// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Text reader for models.

use indexmap::IndexMap;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::Model;
use crate::operators::{FullOp, TpOp};
use crate::spam::{FullVec, TpPovm, TpVec, UnconstrainedPovm};
use crate::statespace::StateSpace;

/// How dense blocks read from text are parameterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameterization {
    #[default]
    Full,
    Tp,
}

/// Sections of a model file before any object is built.
#[derive(Debug, Default)]
struct Sections {
    preps: IndexMap<String, Array1<f64>>,
    povms: IndexMap<String, Vec<(String, Array1<f64>)>>,
    gates: IndexMap<String, Array2<f64>>,
    basis_dim: Option<usize>,
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
        }
    }

    /// Next line that is neither blank nor a comment, with its 1-based number.
    fn next_content(&mut self) -> Option<(usize, &'a str)> {
        for (i, line) in self.inner.by_ref() {
            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                return Some((i + 1, line));
            }
        }
        None
    }

    fn require(&mut self, what: &str) -> Result<(usize, &'a str)> {
        self.next_content()
            .ok_or_else(|| Error::Serialization(format!("unexpected end of file, expected {}", what)))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        let (n, line) = self.require(keyword)?;
        if line != keyword {
            return Err(parse_error(n, format!("expected '{}', got '{}'", keyword, line)));
        }
        Ok(())
    }
}

fn parse_error(line: usize, msg: impl Into<String>) -> Error {
    Error::Serialization(format!("line {}: {}", line, msg.into()))
}

fn duplicate_label(line: usize, keyword: &str, label: &str) -> Error {
    parse_error(line, format!("duplicate {} label '{}'", keyword, label))
}

fn parse_numbers(line_no: usize, line: &str) -> Result<Vec<f64>> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| parse_error(line_no, format!("'{}' is not a number", tok)))
        })
        .collect()
}

fn read_vector(lines: &mut Lines<'_>) -> Result<Array1<f64>> {
    lines.expect_keyword("LiouvilleVec")?;
    let (n, line) = lines.require("vector values")?;
    Ok(Array1::from(parse_numbers(n, line)?))
}

fn read_matrix(lines: &mut Lines<'_>) -> Result<Array2<f64>> {
    lines.expect_keyword("LiouvilleMx")?;
    let (n, first) = lines.require("matrix rows")?;
    let first = parse_numbers(n, first)?;
    let dim = first.len();
    let mut flat = first;
    for _ in 1..dim {
        let (n, line) = lines.require("matrix rows")?;
        let row = parse_numbers(n, line)?;
        if row.len() != dim {
            return Err(parse_error(n, format!("row has {} entries, expected {}", row.len(), dim)));
        }
        flat.extend(row);
    }
    Array2::from_shape_vec((dim, dim), flat).map_err(|e| Error::Serialization(e.to_string()))
}

fn header<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.strip_prefix(keyword)
        .and_then(|rest| rest.strip_prefix(':'))
        .map(str::trim)
}

fn parse_sections(text: &str) -> Result<Sections> {
    let mut lines = Lines::new(text);
    let mut sections = Sections::default();

    while let Some((n, line)) = lines.next_content() {
        if let Some(label) = header(line, "PREP") {
            if sections.preps.contains_key(label) {
                return Err(duplicate_label(n, "PREP", label));
            }
            sections.preps.insert(label.to_string(), read_vector(&mut lines)?);
        } else if let Some(label) = header(line, "POVM") {
            if sections.povms.contains_key(label) {
                return Err(duplicate_label(n, "POVM", label));
            }
            let mut effects = Vec::new();
            loop {
                let (m, inner) = lines.require("EFFECT or END POVM")?;
                if inner == "END POVM" {
                    break;
                }
                let effect = header(inner, "EFFECT")
                    .ok_or_else(|| parse_error(m, format!("expected EFFECT, got '{}'", inner)))?;
                effects.push((effect.to_string(), read_vector(&mut lines)?));
            }
            sections.povms.insert(label.to_string(), effects);
        } else if let Some(label) = header(line, "GATE") {
            if sections.gates.contains_key(label) {
                return Err(duplicate_label(n, "GATE", label));
            }
            sections.gates.insert(label.to_string(), read_matrix(&mut lines)?);
        } else if let Some(spec) = header(line, "BASIS") {
            let mut parts = spec.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some("pp"), Some(dim)) => {
                    let dim = dim
                        .parse()
                        .map_err(|_| parse_error(n, format!("bad basis dimension '{}'", dim)))?;
                    sections.basis_dim = Some(dim);
                }
                _ => return Err(parse_error(n, format!("unsupported basis '{}'", spec))),
            }
        } else {
            return Err(parse_error(n, format!("unexpected line '{}'", line)));
        }
    }
    Ok(sections)
}

/// Build a model from its text form, parameterizing every block as `param`.
pub fn read_model(text: &str, param: Parameterization) -> Result<Model> {
    let sections = parse_sections(text)?;
    let dim = sections
        .basis_dim
        .or_else(|| sections.preps.values().next().map(|v| v.len()))
        .or_else(|| sections.gates.values().next().map(|m| m.nrows()))
        .ok_or_else(|| Error::Serialization("model file declares no basis and no objects".into()))?;
    let num_qubits = (dim as f64).log(4.0).round() as usize;
    let state_space = StateSpace::qubits(num_qubits)?;
    if state_space.dim() != dim {
        return Err(Error::Serialization(format!(
            "dimension {} is not a multi-qubit Liouville dimension",
            dim
        )));
    }
    let mut model = Model::new(state_space)?;

    for (label, v) in sections.preps {
        match param {
            Parameterization::Full => model.add_prep(&label, FullVec::new(v)?)?,
            Parameterization::Tp => model.add_prep(&label, TpVec::new(v)?)?,
        };
    }
    for (label, effects) in sections.povms {
        match param {
            Parameterization::Full => {
                model.add_povm(&label, UnconstrainedPovm::from_dense(effects)?)?
            }
            Parameterization::Tp => model.add_povm(&label, TpPovm::new(effects)?)?,
        };
    }
    for (label, m) in sections.gates {
        match param {
            Parameterization::Full => model.add_operation(&label, FullOp::new(m)?)?,
            Parameterization::Tp => model.add_operation(&label, TpOp::new(m)?)?,
        };
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::write_model;
    use crate::operators::op_ref;
    use crate::test_utils::{assert_matrix_close, one_qubit_model, x_pi2_static};

    const GATE_MX: &str = "
# test model
PREP: rho0
LiouvilleVec
0.7071067811865476 0 0 0.7071067811865476

POVM: Mdefault

EFFECT: 0
LiouvilleVec
0.7071067811865476 0 0 0.7071067811865476

EFFECT: 1
LiouvilleVec
0.7071067811865476 0 0 -0.7071067811865476

END POVM

GATE: Gx
LiouvilleMx
1 0 0 0
0 1 0 0
0 0 0 -1
0 0 1 0

BASIS: pp 4
";

    #[test]
    fn test_read_full_and_tp() {
        let mut full = read_model(GATE_MX, Parameterization::Full).unwrap();
        // 4 + 2 * 4 + 16
        assert_eq!(full.num_params().unwrap(), 28);
        let gx = full.operation("Gx").unwrap().read().to_dense().unwrap();
        assert_eq!(gx[[2, 3]], -1.0);
        assert_eq!(gx[[3, 2]], 1.0);

        let mut tp = read_model(GATE_MX, Parameterization::Tp).unwrap();
        // 3 + 4 + 12
        assert_eq!(tp.num_params().unwrap(), 19);
        assert_eq!(tp.povm("Mdefault").unwrap().read().labels(), vec!["0", "1"]);
    }

    #[test]
    fn test_written_model_reads_back() {
        let mut model = one_qubit_model();
        model.add_operation_ref("Gx", x_pi2_static()).unwrap();
        model
            .add_operation_ref("Gi", op_ref(FullOp::identity(4)))
            .unwrap();
        let text = write_model(&model, Some("round trip")).unwrap();
        let back = read_model(&text, Parameterization::Tp).unwrap();
        assert_eq!(back.operation_labels(), vec!["Gx", "Gi"]);
        for label in ["Gx", "Gi"] {
            assert_matrix_close(
                &back.operation(label).unwrap().read().to_dense().unwrap(),
                &model.operation(label).unwrap().read().to_dense().unwrap(),
                1e-15,
            );
        }
        let p = back.probabilities("rho0", "Mdefault", &["Gx"]).unwrap();
        approx::assert_relative_eq!(p["0"], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_malformed_input() {
        let missing_keyword = "PREP: rho0\n0.7 0 0 0.7\n";
        let err = read_model(missing_keyword, Parameterization::Full).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let bad_number = "PREP: rho0\nLiouvilleVec\n0.7 x 0 0.7\n";
        assert!(matches!(
            read_model(bad_number, Parameterization::Full),
            Err(Error::Serialization(_))
        ));

        let ragged = "GATE: G\nLiouvilleMx\n1 0 0 0\n0 1 0\n0 0 1 0\n0 0 0 1\n";
        assert!(read_model(ragged, Parameterization::Full).is_err());

        let unterminated = "POVM: M\nEFFECT: 0\nLiouvilleVec\n1 0 0 0\n";
        assert!(read_model(unterminated, Parameterization::Full).is_err());

        let unknown = "FOO: bar\n";
        assert!(read_model(unknown, Parameterization::Full).is_err());

        assert!(read_model("# only a comment\n", Parameterization::Full).is_err());
    }

    #[test]
    fn test_repeated_label_rejected() {
        let gates = "GATE: G\nLiouvilleMx\n1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n\
                     GATE: G\nLiouvilleMx\n1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n";
        match read_model(gates, Parameterization::Full) {
            Err(Error::Serialization(msg)) => {
                assert!(msg.contains("line 7"), "{}", msg);
                assert!(msg.contains("duplicate GATE label 'G'"), "{}", msg);
            }
            other => panic!("expected a serialization error, got {:?}", other.map(|_| ())),
        }

        let preps = "PREP: rho0\nLiouvilleVec\n1 0 0 0\nPREP: rho0\nLiouvilleVec\n0 0 0 1\n";
        let err = read_model(preps, Parameterization::Full).unwrap_err();
        assert!(err.to_string().contains("line 4"));

        let povms = "POVM: M\nEFFECT: 0\nLiouvilleVec\n1 0 0 0\nEND POVM\n\
                     POVM: M\nEFFECT: 0\nLiouvilleVec\n1 0 0 0\nEND POVM\n";
        let err = read_model(povms, Parameterization::Full).unwrap_err();
        assert!(err.to_string().contains("duplicate POVM label 'M'"));

        // Same label in different sections is fine
        let mixed = "PREP: X\nLiouvilleVec\n1 0 0 0\n\
                     GATE: X\nLiouvilleMx\n1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n";
        assert!(read_model(mixed, Parameterization::Full).is_ok());
    }

    #[test]
    fn test_wrong_dimension_rejected() {
        let text = "PREP: rho0\nLiouvilleVec\n1 0 0\n";
        assert!(read_model(text, Parameterization::Full).is_err());
    }
}
