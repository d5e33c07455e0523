// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad error-generator types.
//!
//! Ref: Lindblad (1976), Commun. Math. Phys. 48, 119.
//! Ref: Gorini, Kossakowski, Sudarshan (1976), J. Math. Phys. 17, 821.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::basis::{pauli_labels, pauli_product, trace_product, BasisDict};
use crate::error::{Error, Result};

/// One term of an error generator, keyed by basis-element labels.
///
/// - `Hamiltonian`: ρ ↦ -i[P, ρ]
/// - `Stochastic`: ρ ↦ P_i ρ P_j† − ½{P_j† P_i, ρ}
/// - `Affine`: ρ ↦ Tr(ρ) P / d
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorTerm {
    Hamiltonian { basis_index: String },
    Stochastic { basis_i: String, basis_j: String },
    Affine { basis_index: String },
}

impl ErrorTerm {
    pub fn hamiltonian(label: impl Into<String>) -> Self {
        ErrorTerm::Hamiltonian {
            basis_index: label.into(),
        }
    }

    pub fn stochastic(i: impl Into<String>, j: impl Into<String>) -> Self {
        ErrorTerm::Stochastic {
            basis_i: i.into(),
            basis_j: j.into(),
        }
    }

    /// Diagonal stochastic term `S(P,P)`.
    pub fn pauli_stochastic(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::stochastic(label.clone(), label)
    }

    pub fn affine(label: impl Into<String>) -> Self {
        ErrorTerm::Affine {
            basis_index: label.into(),
        }
    }

    /// Basis labels referenced by this term.
    pub fn basis_labels(&self) -> Vec<&str> {
        match self {
            ErrorTerm::Hamiltonian { basis_index } | ErrorTerm::Affine { basis_index } => {
                vec![basis_index.as_str()]
            }
            ErrorTerm::Stochastic { basis_i, basis_j } => vec![basis_i.as_str(), basis_j.as_str()],
        }
    }
}

impl fmt::Display for ErrorTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTerm::Hamiltonian { basis_index } => write!(f, "H({})", basis_index),
            ErrorTerm::Stochastic { basis_i, basis_j } => write!(f, "S({},{})", basis_i, basis_j),
            ErrorTerm::Affine { basis_index } => write!(f, "A({})", basis_index),
        }
    }
}

impl FromStr for ErrorTerm {
    type Err = Error;

    /// Parse `H(X)`, `S(X)`, `S(X,Y)` or `A(Z)`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let bad = || Error::InvalidOperation(format!("malformed error term '{}'", s));
        let open = s.find('(').ok_or_else(bad)?;
        if !s.ends_with(')') {
            return Err(bad());
        }
        let tag = &s[..open];
        let args: Vec<&str> = s[open + 1..s.len() - 1]
            .split(',')
            .map(str::trim)
            .collect();
        if args.iter().any(|a| a.is_empty()) {
            return Err(bad());
        }
        match (tag, args.as_slice()) {
            ("H", [p]) => Ok(Self::hamiltonian(*p)),
            ("S", [p]) => Ok(Self::pauli_stochastic(*p)),
            ("S", [p, q]) => Ok(Self::stochastic(*p, *q)),
            ("A", [p]) => Ok(Self::affine(*p)),
            _ => Err(bad()),
        }
    }
}

/// Which non-Hamiltonian terms a generator carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NonHamMode {
    /// Full Hermitian η.
    #[default]
    All,
    /// Diagonal η only.
    Diagonal,
    /// Diagonal η plus affine coefficients.
    DiagAffine,
}

impl NonHamMode {
    pub fn is_diagonal(self) -> bool {
        !matches!(self, NonHamMode::All)
    }

    pub fn has_affine(self) -> bool {
        matches!(self, NonHamMode::DiagAffine)
    }
}

impl fmt::Display for NonHamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonHamMode::All => write!(f, "all"),
            NonHamMode::Diagonal => write!(f, "diagonal"),
            NonHamMode::DiagAffine => write!(f, "diag_affine"),
        }
    }
}

/// How the non-Hamiltonian coefficients map to parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParamMode {
    /// η = L L† from a Cholesky-like factor, always positive semi-definite.
    #[default]
    Cptp,
    /// One shared rate p with η_ii = p² (diagonal modes only).
    Depol,
    /// Raw real/imaginary parts of η.
    Unconstrained,
}

impl fmt::Display for ParamMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamMode::Cptp => write!(f, "cptp"),
            ParamMode::Depol => write!(f, "depol"),
            ParamMode::Unconstrained => write!(f, "unconstrained"),
        }
    }
}

/// Check that a mode combination is representable.
pub fn validate_modes(nonham_mode: NonHamMode, param_mode: ParamMode) -> Result<()> {
    if param_mode == ParamMode::Depol && !nonham_mode.is_diagonal() {
        return Err(Error::InvalidOperation(format!(
            "param_mode 'depol' requires a diagonal nonham_mode, got '{}'",
            nonham_mode
        )));
    }
    Ok(())
}

/// Coefficients of an error generator keyed by term, in insertion order.
pub type CoeffDict = IndexMap<ErrorTerm, Complex64>;

/// Error-generator coefficients together with the basis they refer to.
#[derive(Debug, Clone, Default)]
pub struct ErrgenCoeffs {
    pub coeffs: CoeffDict,
    pub basis: BasisDict,
}

impl ErrgenCoeffs {
    /// Coefficients over unnormalised Pauli products, resolving each label.
    pub fn from_pauli_terms<I>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = (ErrorTerm, Complex64)>,
    {
        let mut out = Self::default();
        for (term, value) in terms {
            for label in term.basis_labels() {
                if !out.basis.contains_key(label) {
                    out.basis.insert(label.to_string(), pauli_product(label)?);
                }
            }
            out.coeffs.insert(term, value);
        }
        Ok(out)
    }

    /// Stochastic coefficients of the dissipator Σ γ_k D[L_k] applied for `duration`.
    ///
    /// Each L_k is expanded as Σ c_i P_i over Pauli products, giving
    /// η_ij = γ_k · duration · c_i c_j*. Identity components of L_k are
    /// ignored, so operators should be traceless.
    pub fn from_collapse_operators(ops: &[CollapseOperator], duration: f64) -> Result<Self> {
        let mut out = Self::default();
        for op in ops {
            let d = op.matrix.nrows();
            if !d.is_power_of_two() || d < 2 || op.matrix.ncols() != d {
                return Err(Error::InvalidOperation(format!(
                    "collapse operator '{}' is not a square multi-qubit matrix",
                    op.label
                )));
            }
            let n = d.trailing_zeros() as usize;
            let mut components = Vec::new();
            for label in pauli_labels(n).into_iter().skip(1) {
                let p = pauli_product(&label)?;
                let c = trace_product(&p, &op.matrix) / d as f64;
                if c.norm() > 1e-14 {
                    components.push((label, p, c));
                }
            }
            let weight = op.rate * duration;
            for (li, pi, ci) in &components {
                out.basis.entry(li.clone()).or_insert_with(|| pi.clone());
                for (lj, _, cj) in &components {
                    let term = ErrorTerm::stochastic(li.clone(), lj.clone());
                    *out.coeffs.entry(term).or_insert(Complex64::new(0.0, 0.0)) +=
                        ci * cj.conj() * weight;
                }
            }
        }
        Ok(out)
    }
}

/// A Lindblad collapse (jump) operator with its rate.
///
/// Represents a single dissipation channel:
///   D[L](ρ) = γ (L ρ L† − ½{L†L, ρ})
///
/// Common operators for superconducting qubits:
///   - Amplitude damping (T1): L = σ⁻, γ = 1/T1
///   - Pure dephasing (T_φ):   L = σz/2, γ = 1/T_φ
///     where 1/T_φ = 1/T2 − 1/(2T1)
///
/// Rates are in inverse units of whatever time unit T1/T2 are given in.
#[derive(Debug, Clone)]
pub struct CollapseOperator {
    /// Operator matrix (d × d).
    pub matrix: Array2<Complex64>,
    /// Decay rate (= 1/T).
    pub rate: f64,
    /// Human-readable label (e.g., "T1_q0", "Tphi_q1").
    pub label: String,
}

impl CollapseOperator {
    /// T1 (amplitude damping) channel: L = σ⁻ = |0⟩⟨1|, γ = 1/T1.
    pub fn amplitude_damping(t1: f64, qubit_label: &str) -> Result<Self> {
        if !(t1 > 0.0) {
            return Err(Error::InvalidOperation(format!(
                "T1 must be positive, got {}",
                t1
            )));
        }
        let mut sigma_minus = Array2::zeros((2, 2));
        sigma_minus[[0, 1]] = Complex64::new(1.0, 0.0);

        Ok(Self {
            matrix: sigma_minus,
            rate: 1.0 / t1,
            label: format!("T1_{}", qubit_label),
        })
    }

    /// Pure dephasing channel: L = σz/2, γ = 1/T2 − 1/(2·T1).
    pub fn pure_dephasing(t1: f64, t2: f64, qubit_label: &str) -> Result<Self> {
        if !(t1 > 0.0) {
            return Err(Error::InvalidOperation(format!(
                "T1 must be positive, got {}",
                t1
            )));
        }
        if !(t2 > 0.0) {
            return Err(Error::InvalidOperation(format!(
                "T2 must be positive, got {}",
                t2
            )));
        }
        if t2 > 2.0 * t1 {
            return Err(Error::InvalidOperation(format!(
                "T2 ({}) must be ≤ 2*T1 ({})",
                t2,
                2.0 * t1
            )));
        }

        let gamma_phi = (1.0 / t2 - 1.0 / (2.0 * t1)).max(0.0);

        let mut sigma_z_half = Array2::zeros((2, 2));
        sigma_z_half[[0, 0]] = Complex64::new(0.5, 0.0);
        sigma_z_half[[1, 1]] = Complex64::new(-0.5, 0.0);

        Ok(Self {
            matrix: sigma_z_half,
            rate: gamma_phi,
            label: format!("Tphi_{}", qubit_label),
        })
    }

    /// Both T1 and T_φ channels for a single qubit.
    pub fn from_t1_t2(t1: f64, t2: f64, qubit_label: &str) -> Result<Vec<Self>> {
        let t1_op = Self::amplitude_damping(t1, qubit_label)?;
        let tphi_op = Self::pure_dephasing(t1, t2, qubit_label)?;
        Ok(vec![t1_op, tphi_op])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_error_term_display_and_parse() {
        for (text, term) in [
            ("H(X)", ErrorTerm::hamiltonian("X")),
            ("S(X,Y)", ErrorTerm::stochastic("X", "Y")),
            ("A(ZZ)", ErrorTerm::affine("ZZ")),
        ] {
            assert_eq!(term.to_string(), text);
            assert_eq!(text.parse::<ErrorTerm>().unwrap(), term);
        }
        assert_eq!(
            "S(Z)".parse::<ErrorTerm>().unwrap(),
            ErrorTerm::pauli_stochastic("Z")
        );
        assert_eq!(
            " S( X , Y ) ".parse::<ErrorTerm>().unwrap(),
            ErrorTerm::stochastic("X", "Y")
        );
    }

    #[test]
    fn test_error_term_parse_rejects_garbage() {
        for bad in ["H", "H()", "Q(X)", "H(X,Y)", "S(X,Y,Z)", "A(X", "S(,X)"] {
            assert!(bad.parse::<ErrorTerm>().is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn test_depol_requires_diagonal() {
        assert!(validate_modes(NonHamMode::All, ParamMode::Depol).is_err());
        assert!(validate_modes(NonHamMode::Diagonal, ParamMode::Depol).is_ok());
        assert!(validate_modes(NonHamMode::DiagAffine, ParamMode::Depol).is_ok());
        assert!(validate_modes(NonHamMode::All, ParamMode::Cptp).is_ok());
    }

    #[test]
    fn test_mode_serde_names() {
        let m: NonHamMode = serde_yaml::from_str("diag_affine").unwrap();
        assert_eq!(m, NonHamMode::DiagAffine);
        let p: ParamMode = serde_yaml::from_str("unconstrained").unwrap();
        assert_eq!(p, ParamMode::Unconstrained);
    }

    #[test]
    fn test_amplitude_damping_creates_sigma_minus() {
        let op = CollapseOperator::amplitude_damping(50.0, "q0").unwrap();
        // σ⁻ = |0⟩⟨1|: only [0,1] element is nonzero
        assert_eq!(op.matrix[[0, 1]], Complex64::new(1.0, 0.0));
        assert_eq!(op.matrix[[0, 0]], Complex64::new(0.0, 0.0));
        assert_eq!(op.matrix[[1, 0]], Complex64::new(0.0, 0.0));
        assert_eq!(op.matrix[[1, 1]], Complex64::new(0.0, 0.0));
        assert_relative_eq!(op.rate, 0.02, epsilon = 1e-15);
        assert_eq!(op.label, "T1_q0");
    }

    #[test]
    fn test_pure_dephasing_rate() {
        // T1=50, T2=30 → 1/T_φ = 1/30 - 1/100
        let op = CollapseOperator::pure_dephasing(50.0, 30.0, "q0").unwrap();
        assert_relative_eq!(op.rate, 1.0 / 30.0 - 1.0 / 100.0, epsilon = 1e-15);
        assert_eq!(op.label, "Tphi_q0");
    }

    #[test]
    fn test_t2_exceeds_2t1_rejected() {
        let result = CollapseOperator::pure_dephasing(50.0, 110.0, "q0");
        assert!(result.unwrap_err().to_string().contains("must be ≤ 2*T1"));
    }

    #[test]
    fn test_negative_t1_rejected() {
        assert!(CollapseOperator::amplitude_damping(-10.0, "q0").is_err());
        assert!(CollapseOperator::amplitude_damping(f64::NAN, "q0").is_err());
    }

    #[test]
    fn test_t2_equals_2t1_zero_dephasing() {
        let op = CollapseOperator::pure_dephasing(50.0, 100.0, "q0").unwrap();
        assert_relative_eq!(op.rate, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_amplitude_damping_coefficients() {
        // σ⁻ = (X + iY)/2 → η_XX = η_YY = γt/4, η_XY = -iγt/4
        let op = CollapseOperator::amplitude_damping(10.0, "q0").unwrap();
        let coeffs = ErrgenCoeffs::from_collapse_operators(&[op], 2.0).unwrap();
        let gt = 0.2;
        let xx = coeffs.coeffs[&ErrorTerm::pauli_stochastic("X")];
        let yy = coeffs.coeffs[&ErrorTerm::pauli_stochastic("Y")];
        let xy = coeffs.coeffs[&ErrorTerm::stochastic("X", "Y")];
        let yx = coeffs.coeffs[&ErrorTerm::stochastic("Y", "X")];
        assert_relative_eq!(xx.re, gt / 4.0, epsilon = 1e-15);
        assert_relative_eq!(yy.re, gt / 4.0, epsilon = 1e-15);
        assert_relative_eq!(xy.im, -gt / 4.0, epsilon = 1e-15);
        assert_relative_eq!(yx.im, gt / 4.0, epsilon = 1e-15);
        assert_eq!(coeffs.coeffs.len(), 4);
        assert!(coeffs.basis.contains_key("X") && coeffs.basis.contains_key("Y"));
    }

    #[test]
    fn test_dephasing_coefficients() {
        let ops = CollapseOperator::from_t1_t2(50.0, 30.0, "q0").unwrap();
        let coeffs = ErrgenCoeffs::from_collapse_operators(&ops[1..], 1.0).unwrap();
        assert_eq!(coeffs.coeffs.len(), 1);
        let zz = coeffs.coeffs[&ErrorTerm::pauli_stochastic("Z")];
        assert_relative_eq!(zz.re, ops[1].rate / 4.0, epsilon = 1e-15);
    }

    #[test]
    fn test_from_pauli_terms_resolves_labels() {
        let c = ErrgenCoeffs::from_pauli_terms([
            (ErrorTerm::hamiltonian("XZ"), Complex64::new(0.1, 0.0)),
            (ErrorTerm::stochastic("XZ", "YY"), Complex64::new(0.0, 0.1)),
        ])
        .unwrap();
        assert_eq!(c.basis.len(), 2);
        assert_eq!(c.basis["YY"].nrows(), 4);
        assert!(ErrgenCoeffs::from_pauli_terms([(
            ErrorTerm::hamiltonian("Q"),
            Complex64::new(0.1, 0.0)
        )])
        .is_err());
    }
}
