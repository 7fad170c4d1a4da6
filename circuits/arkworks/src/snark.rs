//! Groth16 over BN254
//!
//! Setup, proving and verification for the predicate circuits, plus the
//! EVM encoding of a proof (`uint256[2] a, uint256[2][2] b, uint256[2] c`).
//! BN254 is the curve with pairing precompiles on Ethereum.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, ProvingKey};
use ark_relations::r1cs::{ConstraintSynthesizer, SynthesisError};
use ark_snark::SNARK;
use ark_std::rand::{CryptoRng, RngCore};

/// Circuit-specific keys
pub struct Keys {
    pub pk: ProvingKey<Bn254>,
    pub pvk: PreparedVerifyingKey<Bn254>,
}

/// Run the per-circuit trusted setup over an empty circuit
pub fn setup<C, R>(blank: C, rng: &mut R) -> Result<Keys, SynthesisError>
where
    C: ConstraintSynthesizer<Fr>,
    R: RngCore + CryptoRng,
{
    let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(blank, rng)?;
    let pvk = Groth16::<Bn254>::process_vk(&vk)?;
    Ok(Keys { pk, pvk })
}

pub fn prove<C, R>(keys: &Keys, circuit: C, rng: &mut R) -> Result<Proof<Bn254>, SynthesisError>
where
    C: ConstraintSynthesizer<Fr>,
    R: RngCore + CryptoRng,
{
    Groth16::<Bn254>::prove(&keys.pk, circuit, rng)
}

pub fn verify(
    keys: &Keys,
    public_inputs: &[Fr],
    proof: &Proof<Bn254>,
) -> Result<bool, SynthesisError> {
    Groth16::<Bn254>::verify_with_processed_vk(&keys.pvk, public_inputs, proof)
}

/// Proof as big-endian 32-byte words, Solidity verifier order
///
/// G2 coordinates are written `[c1, c0]`, as the bn256 pairing precompile expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmProof {
    pub a: [[u8; 32]; 2],
    pub b: [[[u8; 32]; 2]; 2],
    pub c: [[u8; 32]; 2],
}

fn fq_to_be(f: &Fq) -> [u8; 32] {
    let mut out = [0u8; 32];
    let bytes = f.into_bigint().to_bytes_be();
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Canonical field element only; anything at or above the modulus is rejected
fn fq_from_be(bytes: &[u8; 32]) -> Option<Fq> {
    let f = Fq::from_be_bytes_mod_order(bytes);
    (fq_to_be(&f) == *bytes).then_some(f)
}

fn g1_from_evm(xy: &[[u8; 32]; 2]) -> Option<G1Affine> {
    let (x, y) = (fq_from_be(&xy[0])?, fq_from_be(&xy[1])?);
    if x == Fq::from(0u64) && y == Fq::from(0u64) {
        return Some(G1Affine::zero());
    }
    let p = G1Affine::new_unchecked(x, y);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

fn g2_from_evm(xy: &[[[u8; 32]; 2]; 2]) -> Option<G2Affine> {
    let x = Fq2::new(fq_from_be(&xy[0][1])?, fq_from_be(&xy[0][0])?);
    let y = Fq2::new(fq_from_be(&xy[1][1])?, fq_from_be(&xy[1][0])?);
    if x == Fq2::from(0u64) && y == Fq2::from(0u64) {
        return Some(G2Affine::zero());
    }
    let p = G2Affine::new_unchecked(x, y);
    (p.is_on_curve() && p.is_in_correct_subgroup_assuming_on_curve()).then_some(p)
}

impl EvmProof {
    pub fn from_proof(proof: &Proof<Bn254>) -> Self {
        Self {
            a: [fq_to_be(&proof.a.x), fq_to_be(&proof.a.y)],
            b: [
                [fq_to_be(&proof.b.x.c1), fq_to_be(&proof.b.x.c0)],
                [fq_to_be(&proof.b.y.c1), fq_to_be(&proof.b.y.c0)],
            ],
            c: [fq_to_be(&proof.c.x), fq_to_be(&proof.c.y)],
        }
    }

    /// Rebuild the proof; `None` if any point is malformed
    pub fn to_proof(&self) -> Option<Proof<Bn254>> {
        Some(Proof {
            a: g1_from_evm(&self.a)?,
            b: g2_from_evm(&self.b)?,
            c: g1_from_evm(&self.c)?,
        })
    }
}

/// Decode a 32-byte big-endian public signal; `None` if not canonical
pub fn fr_from_be(bytes: &[u8; 32]) -> Option<Fr> {
    let f = Fr::from_be_bytes_mod_order(bytes);
    let encoded = f.into_bigint().to_bytes_be();
    (encoded.as_slice() == bytes.as_slice()).then_some(f)
}
