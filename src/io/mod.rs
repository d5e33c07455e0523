// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Line-oriented text format for models.
//!
//! ```text
//! # title
//! PREP: rho0
//! LiouvilleVec
//! 0.7071067811865476 0 0 0.7071067811865476
//!
//! POVM: Mdefault
//!
//! EFFECT: 0
//! LiouvilleVec
//! ...
//! END POVM
//!
//! GATE: Gx
//! LiouvilleMx
//! ...
//!
//! BASIS: pp 4
//! ```
//!
//! Objects are written densely, so parameterizations are not preserved;
//! the reader rebuilds full or TP objects as requested. The `BASIS` line
//! gives the Liouville dimension.

pub mod reader;
pub mod writer;

pub use reader::{read_model, Parameterization};
pub use writer::write_model;

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::model::Model;

/// Write `model` to `path`.
pub fn save_model(model: &Model, path: &Path, title: Option<&str>) -> Result<()> {
    let text = write_model(model, title)?;
    std::fs::write(path, text)?;
    info!(path = %path.display(), "model written");
    Ok(())
}

/// Read a model from `path`.
pub fn load_model(path: &Path, param: Parameterization) -> Result<Model> {
    let text = std::fs::read_to_string(path)?;
    read_model(&text, param)
}
