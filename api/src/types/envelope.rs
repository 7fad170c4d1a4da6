//! Proof Envelope
//!
//! A proof travels as `{predicate, proof, public_signals[3]}`. Inside the
//! service the positional signals become the named [`PublicSignals`]; the
//! positional form exists only at the serialization boundary.
//!
//! Every malformed value fails closed: a signal that is not a canonical
//! 32-byte word, a `valid` flag other than 0/1, a threshold above 32 bits,
//! or a proof point off the curve is rejected before any verifier runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use zk_credit_arkworks::EvmProof;
use zk_credit_circuits::PredicateKind;

use super::{decode_hex_exact, keccak256, SubjectId, SubjectTag};

/// Layout version of the positional signals `[threshold_or_rate, subject_tag, valid]`
pub const SIGNALS_VERSION: u8 = 1;

/// Upper bound on an encoded Halo2 transcript
pub const MAX_TRANSCRIPT_BYTES: usize = 64 * 1024;

const NULLIFIER_DOMAIN: &[u8] = b"zk-credit/v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("expected 3 public signals, got {0}")]
    WrongArity(usize),

    #[error("public signal {0} is not a 0x-prefixed 32-byte word")]
    MalformedWord(usize),

    #[error("threshold does not fit 32 bits")]
    ThresholdOutOfRange,

    #[error("valid flag must be 0 or 1")]
    InvalidValidFlag,

    #[error("subject tag exceeds 248 bits")]
    SubjectTagOutOfRange,

    #[error("malformed proof: {0}")]
    MalformedProof(String),
}

/// Proving system that produced an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofSystem {
    Groth16,
    Halo2,
}

impl ProofSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofSystem::Groth16 => "groth16",
            ProofSystem::Halo2 => "halo2",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            ProofSystem::Groth16 => 1,
            ProofSystem::Halo2 => 2,
        }
    }
}

impl fmt::Display for ProofSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProofSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "groth16" => Ok(ProofSystem::Groth16),
            "halo2" => Ok(ProofSystem::Halo2),
            other => Err(format!("unknown proof system: {}", other)),
        }
    }
}

/// Named public signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicSignals {
    pub version: u8,
    pub threshold: u32,
    pub subject_tag: SubjectTag,
    pub valid: bool,
}

fn word_hex(word: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(word))
}

impl PublicSignals {
    pub fn new(threshold: u32, subject_tag: SubjectTag, valid: bool) -> Self {
        Self {
            version: SIGNALS_VERSION,
            threshold,
            subject_tag,
            valid,
        }
    }

    /// Big-endian 32-byte words in positional order
    pub fn words(&self) -> [[u8; 32]; 3] {
        let mut threshold = [0u8; 32];
        threshold[28..].copy_from_slice(&self.threshold.to_be_bytes());
        let mut valid = [0u8; 32];
        valid[31] = self.valid as u8;
        [threshold, self.subject_tag.0, valid]
    }

    pub fn to_positional(&self) -> [String; 3] {
        let [threshold, subject, valid] = self.words();
        [word_hex(&threshold), word_hex(&subject), word_hex(&valid)]
    }

    pub fn from_positional(values: &[String]) -> Result<Self, SignalError> {
        if values.len() != 3 {
            return Err(SignalError::WrongArity(values.len()));
        }

        let mut words = [[0u8; 32]; 3];
        for (i, value) in values.iter().enumerate() {
            words[i] = decode_hex_exact::<32>(value).ok_or(SignalError::MalformedWord(i))?;
        }
        let [threshold, subject, valid] = words;

        if threshold[..28].iter().any(|b| *b != 0) {
            return Err(SignalError::ThresholdOutOfRange);
        }
        let mut low = [0u8; 4];
        low.copy_from_slice(&threshold[28..]);

        let valid = match (valid[..31].iter().all(|b| *b == 0), valid[31]) {
            (true, 0) => false,
            (true, 1) => true,
            _ => return Err(SignalError::InvalidValidFlag),
        };

        Ok(Self {
            version: SIGNALS_VERSION,
            threshold: u32::from_be_bytes(low),
            subject_tag: SubjectTag::from_word(subject).ok_or(SignalError::SubjectTagOutOfRange)?,
            valid,
        })
    }

    /// Instance column for the Halo2 circuits
    pub fn to_pasta(&self) -> Option<Vec<pasta_curves::Fp>> {
        Some(zk_credit_circuits::instance(
            self.threshold,
            self.subject_tag.to_pasta()?,
            self.valid,
        ))
    }

    /// Public inputs for the Groth16 circuits
    pub fn to_bn254(&self) -> Option<Vec<ark_bn254::Fr>> {
        Some(vec![
            ark_bn254::Fr::from(self.threshold as u64),
            self.subject_tag.to_bn254()?,
            ark_bn254::Fr::from(self.valid as u64),
        ])
    }
}

impl TryFrom<Vec<String>> for PublicSignals {
    type Error = SignalError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_positional(&values)
    }
}

impl From<PublicSignals> for [String; 3] {
    fn from(signals: PublicSignals) -> Self {
        signals.to_positional()
    }
}

impl Serialize for PublicSignals {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_positional().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicSignals {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<String>::deserialize(deserializer)?;
        Self::from_positional(&values).map_err(serde::de::Error::custom)
    }
}

/// Proof bytes as they travel over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "lowercase")]
pub enum WireProof {
    /// EVM verifier layout; `b` is `[[x.c1, x.c0], [y.c1, y.c0]]`
    Groth16 {
        a: [String; 2],
        b: [[String; 2]; 2],
        c: [String; 2],
    },
    Halo2 { transcript: String },
}

impl WireProof {
    pub fn system(&self) -> ProofSystem {
        match self {
            WireProof::Groth16 { .. } => ProofSystem::Groth16,
            WireProof::Halo2 { .. } => ProofSystem::Halo2,
        }
    }

    pub fn from_evm(proof: &EvmProof) -> Self {
        WireProof::Groth16 {
            a: [word_hex(&proof.a[0]), word_hex(&proof.a[1])],
            b: [
                [word_hex(&proof.b[0][0]), word_hex(&proof.b[0][1])],
                [word_hex(&proof.b[1][0]), word_hex(&proof.b[1][1])],
            ],
            c: [word_hex(&proof.c[0]), word_hex(&proof.c[1])],
        }
    }

    pub fn from_transcript(transcript: &[u8]) -> Self {
        WireProof::Halo2 {
            transcript: format!("0x{}", hex::encode(transcript)),
        }
    }

    /// Decode the Groth16 words; points are validated later by the backend
    pub fn to_evm(&self) -> Result<EvmProof, SignalError> {
        let WireProof::Groth16 { a, b, c } = self else {
            return Err(SignalError::MalformedProof("not a groth16 proof".to_string()));
        };
        let word = |value: &String| {
            decode_hex_exact::<32>(value)
                .ok_or_else(|| SignalError::MalformedProof("bad groth16 coordinate".to_string()))
        };

        Ok(EvmProof {
            a: [word(&a[0])?, word(&a[1])?],
            b: [
                [word(&b[0][0])?, word(&b[0][1])?],
                [word(&b[1][0])?, word(&b[1][1])?],
            ],
            c: [word(&c[0])?, word(&c[1])?],
        })
    }

    pub fn transcript(&self) -> Result<Vec<u8>, SignalError> {
        let WireProof::Halo2 { transcript } = self else {
            return Err(SignalError::MalformedProof("not a halo2 proof".to_string()));
        };
        let digits = transcript
            .strip_prefix("0x")
            .ok_or_else(|| SignalError::MalformedProof("transcript must be 0x hex".to_string()))?;
        if digits.is_empty() || digits.len() > MAX_TRANSCRIPT_BYTES * 2 {
            return Err(SignalError::MalformedProof("transcript length".to_string()));
        }
        hex::decode(digits).map_err(|e| SignalError::MalformedProof(e.to_string()))
    }

    /// Case-insensitive canonical bytes
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, SignalError> {
        match self {
            WireProof::Groth16 { .. } => {
                let evm = self.to_evm()?;
                let mut bytes = Vec::with_capacity(8 * 32);
                bytes.extend(evm.a.iter().flatten());
                bytes.extend(evm.b.iter().flatten().flatten());
                bytes.extend(evm.c.iter().flatten());
                Ok(bytes)
            }
            WireProof::Halo2 { .. } => self.transcript(),
        }
    }
}

/// Replay identifier of a proof
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A proof with its predicate and public signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEnvelope {
    pub predicate: PredicateKind,
    pub proof: WireProof,
    pub public_signals: PublicSignals,
}

impl ProofEnvelope {
    pub fn system(&self) -> ProofSystem {
        self.proof.system()
    }

    /// keccak256(domain ‖ system ‖ predicate ‖ len ‖ proof ‖ signals)
    pub fn nullifier(&self) -> Result<Nullifier, SignalError> {
        let proof = self.proof.canonical_bytes()?;
        let header = [self.system().tag(), self.predicate.tag()];
        let len = (proof.len() as u64).to_be_bytes();
        let words = self.public_signals.words();

        Ok(Nullifier(keccak256(&[
            NULLIFIER_DOMAIN,
            &header,
            &len,
            &proof,
            &words[0],
            &words[1],
            &words[2],
        ])))
    }
}

/// Outcome of verifying an envelope on behalf of a subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofResult {
    pub kind: PredicateKind,
    /// The backend accepted the proof
    pub verified: bool,
    /// `verified` and the attested predicate holds
    pub valid: bool,
    pub signals: PublicSignals,
    pub subject: SubjectId,
    pub nullifier: Nullifier,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectId {
        SubjectId::new("0x1234567890123456789012345678901234567890").unwrap()
    }

    fn signals(valid: bool) -> PublicSignals {
        PublicSignals::new(80, subject().tag(), valid)
    }

    #[test]
    fn test_positional_layout() {
        let positional = signals(true).to_positional();
        assert_eq!(positional[0], format!("0x{:064x}", 80));
        assert_eq!(positional[1], subject().tag().to_hex());
        assert_eq!(positional[2], format!("0x{:064x}", 1));

        let parsed = PublicSignals::from_positional(&positional).unwrap();
        assert_eq!(parsed, signals(true));
        assert_eq!(parsed.version, SIGNALS_VERSION);
    }

    #[test]
    fn test_positional_fails_closed() {
        let good = signals(false).to_positional().to_vec();

        assert_eq!(
            PublicSignals::from_positional(&good[..2]),
            Err(SignalError::WrongArity(2))
        );

        let mut short = good.clone();
        short[0] = "0x50".to_string();
        assert_eq!(PublicSignals::from_positional(&short), Err(SignalError::MalformedWord(0)));

        let mut flag = good.clone();
        flag[2] = format!("0x{:064x}", 2);
        assert_eq!(PublicSignals::from_positional(&flag), Err(SignalError::InvalidValidFlag));

        let mut wide = good.clone();
        wide[0] = format!("0x{:064x}", 1u64 << 32);
        assert_eq!(PublicSignals::from_positional(&wide), Err(SignalError::ThresholdOutOfRange));

        let mut tag = good;
        tag[1] = format!("0x{}", "ff".repeat(32));
        assert_eq!(PublicSignals::from_positional(&tag), Err(SignalError::SubjectTagOutOfRange));
    }

    #[test]
    fn test_envelope_json_shape() {
        let envelope = ProofEnvelope {
            predicate: PredicateKind::Repayment,
            proof: WireProof::from_transcript(&[1, 2, 3]),
            public_signals: signals(true),
        };

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["predicate"], "repayment");
        assert_eq!(json["proof"]["system"], "halo2");
        assert_eq!(json["proof"]["transcript"], "0x010203");
        assert_eq!(json["public_signals"].as_array().unwrap().len(), 3);

        let back: ProofEnvelope = serde_json::from_value(json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn test_nullifier_binds_every_field() {
        let base = ProofEnvelope {
            predicate: PredicateKind::WalletAge,
            proof: WireProof::from_transcript(&[9; 64]),
            public_signals: signals(true),
        };
        let n = base.nullifier().unwrap();

        // Hex case does not matter
        let mut upper = base.clone();
        upper.proof = WireProof::Halo2 {
            transcript: format!("0x{}", "09".repeat(64)).to_uppercase().replacen("0X", "0x", 1),
        };
        assert_eq!(upper.nullifier().unwrap(), n);

        let mut other_kind = base.clone();
        other_kind.predicate = PredicateKind::DefaultRatio;
        assert_ne!(other_kind.nullifier().unwrap(), n);

        let mut other_signals = base.clone();
        other_signals.public_signals.threshold = 81;
        assert_ne!(other_signals.nullifier().unwrap(), n);

        let mut other_proof = base;
        other_proof.proof = WireProof::from_transcript(&[8; 64]);
        assert_ne!(other_proof.nullifier().unwrap(), n);
    }

    #[test]
    fn test_malformed_groth16_words() {
        let bad = WireProof::Groth16 {
            a: ["0x01".to_string(), "0x02".to_string()],
            b: [
                ["0x03".to_string(), "0x04".to_string()],
                ["0x05".to_string(), "0x06".to_string()],
            ],
            c: ["0x07".to_string(), "0x08".to_string()],
        };
        assert!(matches!(bad.to_evm(), Err(SignalError::MalformedProof(_))));
        assert!(bad.canonical_bytes().is_err());
    }
}
