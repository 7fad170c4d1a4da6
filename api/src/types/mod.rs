//! Common Types Module
//!
//! Identity types shared across routes, services and storage.

pub mod envelope;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

pub use envelope::{
    Nullifier, ProofEnvelope, ProofResult, ProofSystem, PublicSignals, SignalError, WireProof,
    SIGNALS_VERSION,
};

pub(crate) fn keccak256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Strict `0x`-prefixed hex of an exact byte length
pub(crate) fn decode_hex_exact<const N: usize>(value: &str) -> Option<[u8; N]> {
    let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
    if digits.len() != N * 2 {
        return None;
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(digits, &mut out).ok()?;
    Some(out)
}

/// Ethereum address of a credit subject (lowercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(addr: &str) -> Result<Self, String> {
        let addr = addr.to_lowercase();
        match decode_hex_exact::<20>(&addr) {
            Some(_) => Ok(Self(addr)),
            None => Err("Invalid Ethereum address format".to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        // Validated at construction
        decode_hex_exact::<20>(&self.0).unwrap_or([0u8; 20])
    }

    /// Field-sized tag binding proofs to this subject
    pub fn tag(&self) -> SubjectTag {
        SubjectTag::for_subject(self)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash of the off-chain identity a subject is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityHash(pub [u8; 32]);

impl IdentityHash {
    pub fn from_hex(value: &str) -> Option<Self> {
        decode_hex_exact::<32>(value).map(Self)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// First 31 bytes of keccak256(address), big-endian with a zero high byte
///
/// 248 bits fit both the BN254 and the Pasta scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubjectTag(pub [u8; 32]);

impl SubjectTag {
    pub fn for_subject(subject: &SubjectId) -> Self {
        let digest = keccak256(&[&subject.to_bytes()]);
        let mut tag = [0u8; 32];
        tag[1..].copy_from_slice(&digest[..31]);
        Self(tag)
    }

    /// Accepts only words with a zero high byte
    pub fn from_word(word: [u8; 32]) -> Option<Self> {
        (word[0] == 0).then_some(Self(word))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn to_pasta(&self) -> Option<pasta_curves::Fp> {
        let mut le = self.0;
        le.reverse();
        zk_credit_circuits::field_from_le_bytes(&le)
    }

    pub fn to_bn254(&self) -> Option<ark_bn254::Fr> {
        zk_credit_arkworks::snark::fr_from_be(&self.0)
    }
}
