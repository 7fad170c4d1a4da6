//! DefaultRatio Circuit - arkworks R1CS Implementation
//!
//! Proves whether `defaulted_loans * 100 <= total_loans * max_default_rate`.
//!
//! # Public Inputs (in allocation order)
//! 1. `max_default_rate`
//! 2. `subject`
//! 3. `valid` (boolean)

use ark_ff::PrimeField;
use ark_r1cs_std::{
    alloc::AllocVar,
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::gadgets::{enforce_bit_width, is_geq, is_leq};
use crate::{FACT_BITS, PERCENT_SCALE, PRODUCT_BITS};

#[derive(Clone)]
pub struct DefaultRatioCircuit<F: PrimeField> {
    pub total_loans: Option<F>,
    pub defaulted_loans: Option<F>,
    pub max_default_rate: Option<F>,
    pub subject: Option<F>,
    pub valid: Option<bool>,
}

impl<F: PrimeField> DefaultRatioCircuit<F> {
    pub fn new(total_loans: u32, defaulted_loans: u32, max_default_rate: u32, subject: F) -> Self {
        let valid =
            defaulted_loans as u64 * PERCENT_SCALE <= total_loans as u64 * max_default_rate as u64;

        Self {
            total_loans: Some(F::from(total_loans as u64)),
            defaulted_loans: Some(F::from(defaulted_loans as u64)),
            max_default_rate: Some(F::from(max_default_rate as u64)),
            subject: Some(subject),
            valid: Some(valid),
        }
    }

    pub fn empty() -> Self {
        Self {
            total_loans: None,
            defaulted_loans: None,
            max_default_rate: None,
            subject: None,
            valid: None,
        }
    }

    /// `[max_default_rate, subject, valid]`
    pub fn public_inputs(&self) -> Option<Vec<F>> {
        Some(vec![
            self.max_default_rate?,
            self.subject?,
            F::from(self.valid? as u64),
        ])
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for DefaultRatioCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let total = FpVar::new_witness(cs.clone(), || {
            self.total_loans.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let defaulted = FpVar::new_witness(cs.clone(), || {
            self.defaulted_loans.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let rate = FpVar::new_input(cs.clone(), || {
            self.max_default_rate.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let _subject = FpVar::new_input(cs.clone(), || {
            self.subject.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let valid = Boolean::new_input(cs.clone(), || {
            self.valid.ok_or(SynthesisError::AssignmentMissing)
        })?;

        for v in [&total, &defaulted, &rate] {
            enforce_bit_width(v, FACT_BITS)?;
        }

        is_geq(&total, &defaulted, FACT_BITS)?.enforce_equal(&Boolean::constant(true))?;

        let hundred = FpVar::constant(F::from(PERCENT_SCALE));
        let defaulted_scaled = &defaulted * &hundred;
        let total_scaled = &total * &rate;

        is_leq(&defaulted_scaled, &total_scaled, PRODUCT_BITS)?.enforce_equal(&valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    fn satisfied(circuit: DefaultRatioCircuit<Fr>) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_default_ratio_outcomes() {
        // 300 <= 400
        let under = DefaultRatioCircuit::new(20, 3, 20, Fr::from(1u64));
        assert_eq!(under.valid, Some(true));
        assert!(satisfied(under));

        // 500 > 400
        let over = DefaultRatioCircuit::new(20, 5, 20, Fr::from(1u64));
        assert_eq!(over.valid, Some(false));
        assert!(satisfied(over));
    }

    #[test]
    fn test_default_ratio_forged_valid() {
        let mut circuit = DefaultRatioCircuit::new(20, 5, 20, Fr::from(1u64));
        circuit.valid = Some(true);
        assert!(!satisfied(circuit));
    }

    #[test]
    fn test_defaulted_exceeds_total() {
        assert!(!satisfied(DefaultRatioCircuit::new(2, 3, 20, Fr::from(1u64))));
    }
}
