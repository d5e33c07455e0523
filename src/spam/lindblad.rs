// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! SPAM vectors perturbed by an exponentiated error generator.

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::SpamVector;
use crate::error::{Error, Result};
use crate::lindblad::{ErrgenCoeffs, LindbladErrorgen};
use crate::linalg::matrix_exp;
use crate::validation::validate_finite;

/// Whether a vector is prepared or measured.
///
/// Preparations are followed by the noise, exp(L)·v; effects are preceded
/// by it, which in the Liouville picture is exp(L)ᵀ·v.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpamRole {
    Prep,
    Effect,
}

impl fmt::Display for SpamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prep => write!(f, "prep"),
            Self::Effect => write!(f, "effect"),
        }
    }
}

/// A fixed ideal vector with Lindblad noise; only the generator is parameterized.
#[derive(Debug, Clone)]
pub struct LindbladVec {
    base: Array1<f64>,
    errgen: LindbladErrorgen,
    role: SpamRole,
}

impl LindbladVec {
    pub fn new(base: Array1<f64>, errgen: LindbladErrorgen, role: SpamRole) -> Result<Self> {
        if base.len() != errgen.dim() {
            return Err(Error::dimension("LindbladVec base", errgen.dim(), base.len()));
        }
        validate_finite("LindbladVec base", &base.to_vec())?;
        Ok(Self { base, errgen, role })
    }

    pub fn role(&self) -> SpamRole {
        self.role
    }

    pub fn base(&self) -> &Array1<f64> {
        &self.base
    }

    pub fn errgen(&self) -> &LindbladErrorgen {
        &self.errgen
    }

    pub fn get_errgen_coeffs(&self) -> ErrgenCoeffs {
        self.errgen.get_coeffs()
    }
}

impl SpamVector for LindbladVec {
    fn dim(&self) -> usize {
        self.base.len()
    }

    fn kind(&self) -> &'static str {
        "lindblad"
    }

    fn num_params(&self) -> usize {
        self.errgen.num_params()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.errgen.to_vector()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        self.errgen.from_vector(v)
    }

    fn to_dense(&self) -> Result<Array1<f64>> {
        let exp_l = matrix_exp(&self.errgen.to_dense())?;
        Ok(match self.role {
            SpamRole::Prep => exp_l.dot(&self.base),
            SpamRole::Effect => exp_l.t().dot(&self.base),
        })
    }
}
