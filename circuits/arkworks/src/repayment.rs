//! Repayment Circuit - arkworks R1CS Implementation
//!
//! Proves whether `repaid_loans / total_loans >= min_repayment_rate`,
//! rearranged to `repaid_loans * 100 >= total_loans * min_repayment_rate`.
//!
//! # Public Inputs (in allocation order)
//! 1. `min_repayment_rate`
//! 2. `subject`
//! 3. `valid` (boolean)
//!
//! # Circuit Constraints
//! 1. Range check: total, repaid, rate in [0, 2^32)
//! 2. Loan bound: repaid <= total (hard)
//! 3. Comparison: valid == (repaid * 100 >= total * rate), 64-bit products

use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::gadgets::{enforce_bit_width, is_geq};
use crate::{FACT_BITS, PERCENT_SCALE, PRODUCT_BITS};

#[derive(Clone)]
pub struct RepaymentCircuit<F: PrimeField> {
    /// Private: loans taken
    pub total_loans: Option<F>,
    /// Private: loans repaid
    pub repaid_loans: Option<F>,
    /// Public: minimum repayment percentage
    pub min_repayment_rate: Option<F>,
    /// Public: subject tag
    pub subject: Option<F>,
    /// Public: predicate outcome
    pub valid: Option<bool>,
}

impl<F: PrimeField> RepaymentCircuit<F> {
    pub fn new(total_loans: u32, repaid_loans: u32, min_repayment_rate: u32, subject: F) -> Self {
        let valid =
            repaid_loans as u64 * PERCENT_SCALE >= total_loans as u64 * min_repayment_rate as u64;

        Self {
            total_loans: Some(F::from(total_loans as u64)),
            repaid_loans: Some(F::from(repaid_loans as u64)),
            min_repayment_rate: Some(F::from(min_repayment_rate as u64)),
            subject: Some(subject),
            valid: Some(valid),
        }
    }

    /// Create empty circuit for setup
    pub fn empty() -> Self {
        Self {
            total_loans: None,
            repaid_loans: None,
            min_repayment_rate: None,
            subject: None,
            valid: None,
        }
    }

    /// `[min_repayment_rate, subject, valid]`
    pub fn public_inputs(&self) -> Option<Vec<F>> {
        Some(vec![
            self.min_repayment_rate?,
            self.subject?,
            F::from(self.valid? as u64),
        ])
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for RepaymentCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        // ======== Allocate Private Inputs ========

        let total = FpVar::new_witness(cs.clone(), || {
            self.total_loans.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let repaid = FpVar::new_witness(cs.clone(), || {
            self.repaid_loans.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ======== Allocate Public Inputs ========

        let rate = FpVar::new_input(cs.clone(), || {
            self.min_repayment_rate.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let _subject = FpVar::new_input(cs.clone(), || {
            self.subject.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let valid = Boolean::new_input(cs.clone(), || {
            self.valid.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // ======== Range Checks ========

        for v in [&total, &repaid, &rate] {
            enforce_bit_width(v, FACT_BITS)?;
        }

        // ======== Loan Bound ========

        is_geq(&total, &repaid, FACT_BITS)?.enforce_equal(&Boolean::constant(true))?;

        // ======== Repayment Check ========

        let hundred = FpVar::constant(F::from(PERCENT_SCALE));
        let repaid_scaled = &repaid * &hundred;
        let total_scaled = &total * &rate;

        is_geq(&repaid_scaled, &total_scaled, PRODUCT_BITS)?.enforce_equal(&valid)
    }
}
