//! R1CS comparison gadgets
//!
//! Bit decomposition replaces the Halo2 lookup table: a value is in range
//! when every bit of its canonical decomposition above `bits` is zero.

use ark_ff::PrimeField;
use ark_r1cs_std::{
    boolean::Boolean,
    eq::EqGadget,
    fields::{fp::FpVar, FieldVar},
    ToBitsGadget,
};
use ark_relations::r1cs::SynthesisError;

/// Enforce v in [0, 2^bits)
pub fn enforce_bit_width<F: PrimeField>(v: &FpVar<F>, bits: usize) -> Result<(), SynthesisError> {
    let v_bits = v.to_bits_le()?;
    for bit in v_bits.iter().skip(bits) {
        bit.enforce_equal(&Boolean::constant(false))?;
    }
    Ok(())
}

/// Boolean (a >= b) for a, b already in [0, 2^bits)
///
/// `a - b + 2^bits` lies in [1, 2^(bits+1)); its bit at position `bits`
/// is set exactly when a >= b.
pub fn is_geq<F: PrimeField>(
    a: &FpVar<F>,
    b: &FpVar<F>,
    bits: usize,
) -> Result<Boolean<F>, SynthesisError> {
    if bits + 1 >= F::MODULUS_BIT_SIZE as usize || bits >= 127 {
        return Err(SynthesisError::Unsatisfiable);
    }

    let offset = FpVar::constant(F::from(1u128 << bits));
    let shifted = a - b + offset;

    let shifted_bits = shifted.to_bits_le()?;
    for bit in shifted_bits.iter().skip(bits + 1) {
        bit.enforce_equal(&Boolean::constant(false))?;
    }

    Ok(shifted_bits[bits].clone())
}

/// Boolean (a <= b) for a, b already in [0, 2^bits)
pub fn is_leq<F: PrimeField>(
    a: &FpVar<F>,
    b: &FpVar<F>,
    bits: usize,
) -> Result<Boolean<F>, SynthesisError> {
    is_geq(b, a, bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fr;
    use ark_r1cs_std::{alloc::AllocVar, R1CSVar};
    use ark_relations::r1cs::ConstraintSystem;

    fn compare(a: u64, b: u64) -> (bool, bool) {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let a = FpVar::new_witness(cs.clone(), || Ok(Fr::from(a))).unwrap();
        let b = FpVar::new_witness(cs.clone(), || Ok(Fr::from(b))).unwrap();

        let geq = is_geq(&a, &b, 64).unwrap().value().unwrap();
        let leq = is_leq(&a, &b, 64).unwrap().value().unwrap();
        assert!(cs.is_satisfied().unwrap());
        (geq, leq)
    }

    #[test]
    fn test_is_geq() {
        assert_eq!(compare(10, 3), (true, false));
        assert_eq!(compare(3, 3), (true, true));
        assert_eq!(compare(3, 10), (false, true));
        assert_eq!(compare(u64::MAX, 0), (true, false));
        assert_eq!(compare(0, u64::MAX), (false, true));
    }

    #[test]
    fn test_enforce_bit_width() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let v = FpVar::new_witness(cs.clone(), || Ok(Fr::from(u32::MAX as u64))).unwrap();
        enforce_bit_width(&v, 32).unwrap();
        assert!(cs.is_satisfied().unwrap());

        let cs = ConstraintSystem::<Fr>::new_ref();
        let v = FpVar::new_witness(cs.clone(), || Ok(Fr::from(1u64 << 32))).unwrap();
        enforce_bit_width(&v, 32).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }
}
