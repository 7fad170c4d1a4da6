//! WalletAge Circuit - arkworks R1CS Implementation
//!
//! Proves whether `wallet_age_days >= threshold` without revealing the age.
//!
//! # Public Inputs (in allocation order)
//! 1. `threshold`
//! 2. `subject`
//! 3. `valid` (boolean)
//!
//! # Circuit Constraints
//! 1. Range check: wallet_age_days, threshold in [0, 2^32)
//! 2. Comparison: valid == (wallet_age_days >= threshold)

use ark_ff::PrimeField;
use ark_r1cs_std::{alloc::AllocVar, boolean::Boolean, eq::EqGadget, fields::fp::FpVar};
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::gadgets::{enforce_bit_width, is_geq};
use crate::FACT_BITS;

#[derive(Clone)]
pub struct WalletAgeCircuit<F: PrimeField> {
    /// Private: days since first activity
    pub wallet_age_days: Option<F>,
    /// Public: minimum age in days
    pub threshold: Option<F>,
    /// Public: subject tag
    pub subject: Option<F>,
    /// Public: predicate outcome
    pub valid: Option<bool>,
}

impl<F: PrimeField> WalletAgeCircuit<F> {
    pub fn new(wallet_age_days: u32, threshold: u32, subject: F) -> Self {
        Self {
            wallet_age_days: Some(F::from(wallet_age_days as u64)),
            threshold: Some(F::from(threshold as u64)),
            subject: Some(subject),
            valid: Some(wallet_age_days >= threshold),
        }
    }

    /// Create empty circuit for setup
    pub fn empty() -> Self {
        Self {
            wallet_age_days: None,
            threshold: None,
            subject: None,
            valid: None,
        }
    }

    /// `[threshold, subject, valid]`
    pub fn public_inputs(&self) -> Option<Vec<F>> {
        Some(vec![self.threshold?, self.subject?, F::from(self.valid? as u64)])
    }
}

impl<F: PrimeField> ConstraintSynthesizer<F> for WalletAgeCircuit<F> {
    fn generate_constraints(self, cs: ConstraintSystemRef<F>) -> Result<(), SynthesisError> {
        let age = FpVar::new_witness(cs.clone(), || {
            self.wallet_age_days.ok_or(SynthesisError::AssignmentMissing)
        })?;

        let threshold = FpVar::new_input(cs.clone(), || {
            self.threshold.ok_or(SynthesisError::AssignmentMissing)
        })?;
        // Groth16 binds every public input; the subject needs no further constraint
        let _subject = FpVar::new_input(cs.clone(), || {
            self.subject.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let valid = Boolean::new_input(cs.clone(), || {
            self.valid.ok_or(SynthesisError::AssignmentMissing)
        })?;

        enforce_bit_width(&age, FACT_BITS)?;
        enforce_bit_width(&threshold, FACT_BITS)?;

        is_geq(&age, &threshold, FACT_BITS)?.enforce_equal(&valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_relations::r1cs::ConstraintSystem;

    fn satisfied(circuit: WalletAgeCircuit<Fr>) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        circuit.generate_constraints(cs.clone()).unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_wallet_age_outcomes() {
        let at = WalletAgeCircuit::new(90, 90, Fr::from(1u64));
        assert_eq!(at.valid, Some(true));
        assert!(satisfied(at));

        let below = WalletAgeCircuit::new(89, 90, Fr::from(1u64));
        assert_eq!(below.valid, Some(false));
        assert!(satisfied(below));
    }

    #[test]
    fn test_wallet_age_forged_valid() {
        let mut circuit = WalletAgeCircuit::new(89, 90, Fr::from(1u64));
        circuit.valid = Some(true);
        assert!(!satisfied(circuit));
    }

    #[test]
    fn test_public_inputs_layout() {
        let circuit = WalletAgeCircuit::new(400, 365, Fr::from(9u64));
        assert_eq!(
            circuit.public_inputs(),
            Some(vec![Fr::from(365u64), Fr::from(9u64), Fr::from(1u64)])
        );
        assert_eq!(WalletAgeCircuit::<Fr>::empty().public_inputs(), None);
    }

    #[test]
    fn test_field_agnostic() {
        // Same constraints over a different scalar field
        use ark_bls12_381::Fr as BlsFr;

        let cs = ConstraintSystem::<BlsFr>::new_ref();
        WalletAgeCircuit::new(u32::MAX, 0, BlsFr::from(3u64))
            .generate_constraints(cs.clone())
            .unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}
