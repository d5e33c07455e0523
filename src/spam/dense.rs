// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense SPAM vectors: static, fully parameterized, and trace-preserving.

use ndarray::{s, Array1};

use super::SpamVector;
use crate::error::{Error, Result};
use crate::validation::{
    validate_depolarization, validate_finite, validate_param_length, validate_tp_vector,
};

/// First Liouville component of every unit-trace state of dimension `dim`.
pub fn tp_normalization(dim: usize) -> f64 {
    1.0 / (dim as f64).sqrt().sqrt()
}

fn checked_vector(context: &str, v: Array1<f64>) -> Result<Array1<f64>> {
    if v.is_empty() {
        return Err(Error::dimension(context, 1, 0));
    }
    validate_finite(context, &v.to_vec())?;
    Ok(v)
}

fn depolarize_tail(v: &mut Array1<f64>, amount: f64) -> Result<()> {
    validate_depolarization(amount)?;
    v.slice_mut(s![1..]).mapv_inplace(|x| x * (1.0 - amount));
    Ok(())
}

/// Fixed vector with no parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticVec {
    values: Array1<f64>,
}

impl StaticVec {
    pub fn new(values: Array1<f64>) -> Result<Self> {
        Ok(Self {
            values: checked_vector("StaticVec", values)?,
        })
    }
}

impl SpamVector for StaticVec {
    fn dim(&self) -> usize {
        self.values.len()
    }

    fn kind(&self) -> &'static str {
        "static"
    }

    fn num_params(&self) -> usize {
        0
    }

    fn to_vector(&self) -> Vec<f64> {
        Vec::new()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        if v.is_empty() {
            return Ok(());
        }
        Err(Error::InvalidOperation(format!(
            "static vector has no parameters, got {}",
            v.len()
        )))
    }

    fn to_dense(&self) -> Result<Array1<f64>> {
        Ok(self.values.clone())
    }
}

/// Every element is a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct FullVec {
    values: Array1<f64>,
}

impl FullVec {
    pub fn new(values: Array1<f64>) -> Result<Self> {
        Ok(Self {
            values: checked_vector("FullVec", values)?,
        })
    }
}

impl SpamVector for FullVec {
    fn dim(&self) -> usize {
        self.values.len()
    }

    fn kind(&self) -> &'static str {
        "full"
    }

    fn num_params(&self) -> usize {
        self.values.len()
    }

    fn to_vector(&self) -> Vec<f64> {
        self.values.to_vec()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("FullVec::from_vector", self.values.len(), v)?;
        self.values.assign(&Array1::from(v.to_vec()));
        Ok(())
    }

    fn to_dense(&self) -> Result<Array1<f64>> {
        Ok(self.values.clone())
    }

    fn set_dense(&mut self, v: &Array1<f64>) -> Result<()> {
        if v.len() != self.dim() {
            return Err(Error::dimension("FullVec::set_dense", self.dim(), v.len()));
        }
        self.values = checked_vector("FullVec::set_dense", v.clone())?;
        Ok(())
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        depolarize_tail(&mut self.values, amount)
    }
}

/// First element fixed to [`tp_normalization`]; the rest are parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TpVec {
    values: Array1<f64>,
}

impl TpVec {
    /// Fails with `InvalidOperation` unless `values[0]` is the unit-trace value.
    pub fn new(values: Array1<f64>) -> Result<Self> {
        let mut values = checked_vector("TpVec", values)?;
        let fixed = tp_normalization(values.len());
        validate_tp_vector("TpVec", &values, fixed)?;
        values[0] = fixed;
        Ok(Self { values })
    }
}

impl SpamVector for TpVec {
    fn dim(&self) -> usize {
        self.values.len()
    }

    fn kind(&self) -> &'static str {
        "tp"
    }

    fn num_params(&self) -> usize {
        self.values.len() - 1
    }

    fn to_vector(&self) -> Vec<f64> {
        self.values.slice(s![1..]).to_vec()
    }

    fn from_vector(&mut self, v: &[f64]) -> Result<()> {
        validate_param_length("TpVec::from_vector", self.num_params(), v)?;
        self.values
            .slice_mut(s![1..])
            .assign(&Array1::from(v.to_vec()));
        Ok(())
    }

    fn to_dense(&self) -> Result<Array1<f64>> {
        Ok(self.values.clone())
    }

    fn set_dense(&mut self, v: &Array1<f64>) -> Result<()> {
        if v.len() != self.dim() {
            return Err(Error::dimension("TpVec::set_dense", self.dim(), v.len()));
        }
        *self = TpVec::new(v.clone())?;
        Ok(())
    }

    fn depolarize(&mut self, amount: f64) -> Result<()> {
        depolarize_tail(&mut self.values, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::Basis;
    use approx::assert_relative_eq;

    fn rho0() -> Array1<f64> {
        Basis::pauli_product(1).unwrap().ket_vector("0").unwrap()
    }

    #[test]
    fn test_tp_normalization_matches_basis() {
        for n in 1..=3 {
            let basis = Basis::pauli_product(n).unwrap();
            assert_relative_eq!(
                tp_normalization(basis.dim()),
                basis.trace_normalization(),
                epsilon = 1e-15
            );
        }
    }

    #[test]
    fn test_param_counts() {
        assert_eq!(StaticVec::new(rho0()).unwrap().num_params(), 0);
        assert_eq!(FullVec::new(rho0()).unwrap().num_params(), 4);
        assert_eq!(TpVec::new(rho0()).unwrap().num_params(), 3);
    }

    #[test]
    fn test_round_trips() {
        let mut vecs: Vec<Box<dyn SpamVector>> = vec![
            Box::new(StaticVec::new(rho0()).unwrap()),
            Box::new(FullVec::new(rho0()).unwrap()),
            Box::new(TpVec::new(rho0()).unwrap()),
        ];
        for v in vecs.iter_mut() {
            let before = v.to_dense().unwrap();
            let p = v.to_vector();
            v.from_vector(&p).unwrap();
            assert_eq!(v.to_dense().unwrap(), before);
        }
    }

    #[test]
    fn test_tp_rejects_wrong_trace() {
        let mut bad = rho0();
        bad[0] = 0.5;
        assert!(matches!(TpVec::new(bad), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_tp_from_vector_keeps_trace() {
        let mut v = TpVec::new(rho0()).unwrap();
        v.from_vector(&[0.1, 0.2, 0.3]).unwrap();
        let dense = v.to_dense().unwrap();
        assert_relative_eq!(dense[0], tp_normalization(4), epsilon = 1e-15);
        assert_eq!(dense[3], 0.3);
        assert!(v.from_vector(&[0.1; 4]).is_err());
        assert_eq!(v.to_dense().unwrap(), dense);
    }

    #[test]
    fn test_static_rejects_parameters() {
        let mut v = StaticVec::new(rho0()).unwrap();
        assert!(v.from_vector(&[1.0]).is_err());
        assert!(v.set_dense(&rho0()).is_err());
    }

    #[test]
    fn test_depolarize_shrinks_bloch_vector() {
        let mut v = FullVec::new(rho0()).unwrap();
        v.depolarize(0.5).unwrap();
        let dense = v.to_dense().unwrap();
        assert_relative_eq!(dense[0], rho0()[0], epsilon = 1e-15);
        assert_relative_eq!(dense[3], rho0()[3] * 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_empty_vector_rejected() {
        assert!(FullVec::new(Array1::zeros(0)).is_err());
    }
}
