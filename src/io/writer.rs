// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Text writer for models.

use std::fmt::Write as _;

use ndarray::{Array1, Array2};

use crate::error::{Error, Result};
use crate::model::Model;

fn fmt_err(e: std::fmt::Error) -> Error {
    Error::Serialization(e.to_string())
}

fn write_row<'a>(out: &mut String, values: impl Iterator<Item = &'a f64>) -> Result<()> {
    let row: Vec<String> = values.map(|v| format!("{}", v)).collect();
    writeln!(out, "{}", row.join(" ")).map_err(fmt_err)
}

fn write_vector(out: &mut String, v: &Array1<f64>) -> Result<()> {
    writeln!(out, "LiouvilleVec").map_err(fmt_err)?;
    write_row(out, v.iter())?;
    writeln!(out).map_err(fmt_err)
}

fn write_matrix(out: &mut String, m: &Array2<f64>) -> Result<()> {
    writeln!(out, "LiouvilleMx").map_err(fmt_err)?;
    for row in m.rows() {
        write_row(out, row.iter())?;
    }
    writeln!(out).map_err(fmt_err)
}

/// Render every object of `model` as dense Liouville blocks.
///
/// Values are written in shortest round-trip form, so reading the text
/// back reproduces the dense matrices exactly.
pub fn write_model(model: &Model, title: Option<&str>) -> Result<String> {
    let mut out = String::new();
    if let Some(title) = title {
        writeln!(out, "# {}", title).map_err(fmt_err)?;
    }
    writeln!(out).map_err(fmt_err)?;

    for (label, prep) in model.preps() {
        writeln!(out, "PREP: {}", label).map_err(fmt_err)?;
        write_vector(&mut out, &prep.read().to_dense()?)?;
    }

    for (label, povm) in model.povms() {
        writeln!(out, "POVM: {}", label).map_err(fmt_err)?;
        writeln!(out).map_err(fmt_err)?;
        for (effect, v) in povm.read().effects_dense()? {
            writeln!(out, "EFFECT: {}", effect).map_err(fmt_err)?;
            write_vector(&mut out, &v)?;
        }
        writeln!(out, "END POVM").map_err(fmt_err)?;
        writeln!(out).map_err(fmt_err)?;
    }

    for (label, op) in model.operations() {
        writeln!(out, "GATE: {}", label).map_err(fmt_err)?;
        write_matrix(&mut out, &op.read().to_dense()?)?;
    }

    writeln!(out, "BASIS: {} {}", model.basis().name(), model.dim()).map_err(fmt_err)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{one_qubit_model, x_pi2_static};

    #[test]
    fn test_sections_in_order() {
        let mut model = one_qubit_model();
        model.add_operation_ref("Gx", x_pi2_static()).unwrap();
        let text = write_model(&model, Some("one qubit")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# one qubit");
        assert_eq!(lines[2], "PREP: rho0");
        assert_eq!(lines[3], "LiouvilleVec");
        assert!(text.contains("POVM: Mdefault\n\nEFFECT: 0\nLiouvilleVec\n"));
        assert!(text.contains("EFFECT: 1\n"));
        assert!(text.contains("END POVM\n"));
        assert!(text.contains("GATE: Gx\nLiouvilleMx\n"));
        assert_eq!(*lines.last().unwrap(), "BASIS: pp 4");
    }

    #[test]
    fn test_untitled_starts_blank() {
        let model = one_qubit_model();
        let text = write_model(&model, None).unwrap();
        assert!(text.starts_with("\nPREP: rho0\n"));
    }
}
