//! Private Credit Attestation Circuits
//!
//! Halo2 (PSE fork) circuits that prove facts about a borrower's history
//! without revealing it. Every circuit exposes the same public inputs:
//! `[threshold_or_rate, subject, valid]`.
//!
//! # Circuits
//! - `WalletAgeCircuit`: wallet_age_days >= threshold
//! - `RepaymentCircuit`: repaid * 100 >= total * min_repayment_rate
//! - `DefaultRatioCircuit`: defaulted * 100 <= total * max_default_rate
//!
//! `valid` is an output, not an assertion: a proof can attest that a
//! predicate is false. Consumers must check it.
//!
//! # Features
//! - 16-bit lookup table with running-sum decomposition (32-bit facts, 64-bit products)
//! - Constrained boolean comparator
//! - Native reference semantics in [`predicate`] for pre-validation
//!
//! # Example
//! ```ignore
//! use zk_credit_circuits::{PredicateCircuit, PrivateFact, RepaymentCircuit, Fp};
//!
//! let fact = PrivateFact::Repayment { total_loans: 10, repaid_loans: 8 };
//! let (circuit, public_inputs) = RepaymentCircuit::prepare(&fact, 80, Fp::from(42u64))?;
//! ```

pub mod default_ratio;
pub mod error;
pub mod gadgets;
pub mod predicate;
pub mod repayment;
pub mod wallet_age;


/// Rows needed for the 2^16 lookup table plus blinding
pub const CIRCUIT_K: u32 = 17;

// Circuit exports
pub use default_ratio::DefaultRatioCircuit;
pub use repayment::RepaymentCircuit;
pub use wallet_age::WalletAgeCircuit;

// Native semantics
pub use predicate::{
    evaluate, field_from_le_bytes, instance, Comparator, PredicateCircuit, PredicateKind,
    PrivateFact, FACT_BITS, PERCENT_SCALE, PRODUCT_BITS,
};

// Error handling
pub use error::validation;
pub use error::{CircuitError, CircuitResult};

// Gadget exports
pub use gadgets::{
    ComparisonChip, ComparisonConfig, PredicateConfig, RangeCheckChip, RangeCheckConfig,
};

// Re-export commonly used types from halo2
pub use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    plonk::{Circuit, ConstraintSystem, Error},
};

// Re-export Pasta curves
pub use pasta_curves::{EqAffine, Fp};
