//! Native Predicate Semantics
//!
//! Reference evaluation of the three credit predicates over plain integers.
//! The circuits prove exactly these functions; provers evaluate them first to
//! reject malformed requests and to obtain the `valid` public signal.
//!
//! # Cross-multiplication
//! Percentages are never divided out:
//! - `rate >= min%`  is checked as `repaid * 100 >= total * min`
//! - `rate <= max%`  is checked as `defaulted * 100 <= total * max`

use ff::PrimeField;
use halo2_proofs::plonk::Circuit;
use pasta_curves::Fp;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{validation, CircuitError, CircuitResult};

/// Width of every private fact and public threshold
pub const FACT_BITS: usize = 32;

/// Width of cross-multiplied products (32-bit x 32-bit)
pub const PRODUCT_BITS: usize = 64;

/// Percentages are expressed in whole points (80 = 80%)
pub const PERCENT_SCALE: u64 = 100;

/// Instance rows shared by all predicate circuits
pub const THRESHOLD_ROW: usize = 0;
pub const SUBJECT_ROW: usize = 1;
pub const VALID_ROW: usize = 2;

/// The three credit predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    WalletAge,
    Repayment,
    DefaultRatio,
}

impl PredicateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateKind::WalletAge => "wallet_age",
            PredicateKind::Repayment => "repayment",
            PredicateKind::DefaultRatio => "default_ratio",
        }
    }

    /// Stable one-byte discriminant used for domain separation
    pub fn tag(&self) -> u8 {
        match self {
            PredicateKind::WalletAge => 1,
            PredicateKind::Repayment => 2,
            PredicateKind::DefaultRatio => 3,
        }
    }

    /// Name of the public threshold this predicate is proved against
    pub fn threshold_name(&self) -> &'static str {
        match self {
            PredicateKind::WalletAge => "threshold",
            PredicateKind::Repayment => "min_repayment_rate",
            PredicateKind::DefaultRatio => "max_default_rate",
        }
    }

    /// Whether the predicate is computed over a loan history
    pub fn uses_loan_history(&self) -> bool {
        !matches!(self, PredicateKind::WalletAge)
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Private witness data for one proof
///
/// `Debug` is redacted: these values must never reach logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PrivateFact {
    WalletAge { wallet_age_days: u32 },
    Repayment { total_loans: u32, repaid_loans: u32 },
    DefaultRatio { total_loans: u32, defaulted_loans: u32 },
}

impl PrivateFact {
    pub fn kind(&self) -> PredicateKind {
        match self {
            PrivateFact::WalletAge { .. } => PredicateKind::WalletAge,
            PrivateFact::Repayment { .. } => PredicateKind::Repayment,
            PrivateFact::DefaultRatio { .. } => PredicateKind::DefaultRatio,
        }
    }
}

impl fmt::Debug for PrivateFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateFact::{}(<redacted>)", self.kind())
    }
}

/// Exact unsigned comparison over values of a fixed bit width
pub struct Comparator<const BITS: usize>;

impl<const BITS: usize> Comparator<BITS> {
    /// Largest representable value
    pub const MAX: u128 = if BITS >= 128 {
        u128::MAX
    } else {
        (1u128 << BITS) - 1
    };

    fn check_width(value: u128, field: &str) -> CircuitResult<u128> {
        if value > Self::MAX {
            return Err(CircuitError::ValueOutOfRange {
                value,
                max: Self::MAX,
                field: field.to_string(),
            });
        }
        Ok(value)
    }

    /// a >= b
    pub fn gte(a: u128, b: u128) -> CircuitResult<bool> {
        Ok(Self::check_width(a, "lhs")? >= Self::check_width(b, "rhs")?)
    }

    /// a <= b
    pub fn lte(a: u128, b: u128) -> CircuitResult<bool> {
        Ok(Self::check_width(a, "lhs")? <= Self::check_width(b, "rhs")?)
    }
}

/// Evaluate a predicate natively
///
/// Returns the value the circuit exposes as its `valid` public signal.
pub fn evaluate(fact: &PrivateFact, threshold: u32) -> CircuitResult<bool> {
    validation::validate_fact(fact, threshold)?;

    match *fact {
        PrivateFact::WalletAge { wallet_age_days } => {
            Comparator::<FACT_BITS>::gte(wallet_age_days as u128, threshold as u128)
        }
        PrivateFact::Repayment {
            total_loans,
            repaid_loans,
        } => {
            let (repaid_scaled, total_scaled) = scale(repaid_loans, total_loans, threshold);
            Comparator::<PRODUCT_BITS>::gte(repaid_scaled, total_scaled)
        }
        PrivateFact::DefaultRatio {
            total_loans,
            defaulted_loans,
        } => {
            let (defaulted_scaled, total_scaled) = scale(defaulted_loans, total_loans, threshold);
            Comparator::<PRODUCT_BITS>::lte(defaulted_scaled, total_scaled)
        }
    }
}

/// (count * 100, total * rate); both fit in 64 bits for 32-bit inputs
fn scale(count: u32, total: u32, rate: u32) -> (u128, u128) {
    (
        count as u128 * PERCENT_SCALE as u128,
        total as u128 * rate as u128,
    )
}

/// Instance column layout shared by every predicate circuit
///
/// `[threshold_or_rate, subject, valid]`
pub fn instance<F: PrimeField>(threshold: u32, subject: F, valid: bool) -> Vec<F> {
    vec![
        F::from(threshold as u64),
        subject,
        if valid { F::ONE } else { F::ZERO },
    ]
}

/// A halo2 circuit proving one predicate over [`instance`]
pub trait PredicateCircuit: Circuit<Fp> + Sized {
    const KIND: PredicateKind;

    /// Circuit with unknown witnesses, used for key generation
    fn blank() -> Self;

    /// Witness-carrying circuit for `fact`
    fn from_fact(fact: &PrivateFact, threshold: u32, subject: Fp) -> CircuitResult<Self>;

    /// Validate, evaluate natively, and build the circuit with its public inputs
    fn prepare(fact: &PrivateFact, threshold: u32, subject: Fp) -> CircuitResult<(Self, Vec<Fp>)> {
        if fact.kind() != Self::KIND {
            return Err(CircuitError::InvalidConfiguration {
                message: format!("{} fact given to {} circuit", fact.kind(), Self::KIND),
            });
        }
        let valid = evaluate(fact, threshold)?;
        let circuit = Self::from_fact(fact, threshold, subject)?;
        Ok((circuit, instance(threshold, subject, valid)))
    }
}

/// Decode a little-endian canonical field representation
pub fn field_from_le_bytes<F: PrimeField>(bytes: &[u8; 32]) -> Option<F> {
    let mut repr = F::Repr::default();
    let target = repr.as_mut();
    if target.len() != bytes.len() {
        return None;
    }
    target.copy_from_slice(bytes);
    Option::from(F::from_repr(repr))
}
