//! Groth16 backend: arkworks over BN254
//!
//! Proofs use the EVM encoding, so the same envelope can be checked by a
//! pairing-precompile verifier contract. Each predicate circuit runs its own
//! setup on first use; keys are kept for the lifetime of the process.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use ark_bn254::Fr;
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use zk_credit_arkworks::{snark, DefaultRatioCircuit, Keys, RepaymentCircuit, WalletAgeCircuit};
use zk_credit_circuits::{evaluate, PredicateKind, PrivateFact};

use super::zk_prover::{ProofBackend, ProofRequest, ProverError};
use crate::types::{ProofEnvelope, ProofSystem, PublicSignals, SignalError, WireProof};

#[derive(Default)]
pub struct Groth16Backend {
    keys: RwLock<HashMap<PredicateKind, Arc<Keys>>>,
}

fn setup_keys(kind: PredicateKind) -> anyhow::Result<Keys> {
    let mut rng = OsRng;
    let keys = match kind {
        PredicateKind::WalletAge => snark::setup(WalletAgeCircuit::<Fr>::empty(), &mut rng),
        PredicateKind::Repayment => snark::setup(RepaymentCircuit::<Fr>::empty(), &mut rng),
        PredicateKind::DefaultRatio => snark::setup(DefaultRatioCircuit::<Fr>::empty(), &mut rng),
    };
    keys.map_err(|e| anyhow!("Groth16 setup failed for {}: {}", kind, e))
}

fn prove_fact(keys: &Keys, fact: PrivateFact, threshold: u32, subject: Fr) -> anyhow::Result<WireProof> {
    let mut rng = OsRng;
    let proof = match fact {
        PrivateFact::WalletAge { wallet_age_days } => snark::prove(
            keys,
            WalletAgeCircuit::new(wallet_age_days, threshold, subject),
            &mut rng,
        ),
        PrivateFact::Repayment {
            total_loans,
            repaid_loans,
        } => snark::prove(
            keys,
            RepaymentCircuit::new(total_loans, repaid_loans, threshold, subject),
            &mut rng,
        ),
        PrivateFact::DefaultRatio {
            total_loans,
            defaulted_loans,
        } => snark::prove(
            keys,
            DefaultRatioCircuit::new(total_loans, defaulted_loans, threshold, subject),
            &mut rng,
        ),
    }
    .map_err(|e| anyhow!("Failed to create proof: {}", e))?;

    Ok(WireProof::from_evm(&zk_credit_arkworks::EvmProof::from_proof(&proof)))
}

impl Groth16Backend {
    pub fn new() -> Self {
        Self::default()
    }

    async fn keys(&self, kind: PredicateKind) -> Result<Arc<Keys>, ProverError> {
        if let Some(keys) = self.keys.read().await.get(&kind) {
            return Ok(keys.clone());
        }

        let mut cache = self.keys.write().await;
        if let Some(keys) = cache.get(&kind) {
            return Ok(keys.clone());
        }

        tracing::info!(%kind, "Running Groth16 setup...");
        let keys = tokio::task::spawn_blocking(move || setup_keys(kind))
            .await
            .context("Setup task failed")??;

        let keys = Arc::new(keys);
        cache.insert(kind, keys.clone());
        tracing::info!(%kind, "Groth16 keys ready");
        Ok(keys)
    }
}

#[async_trait]
impl ProofBackend for Groth16Backend {
    fn system(&self) -> ProofSystem {
        ProofSystem::Groth16
    }

    async fn prove(&self, request: &ProofRequest) -> Result<ProofEnvelope, ProverError> {
        // Native pre-validation; also yields the outcome the circuit will expose
        let valid = evaluate(&request.fact, request.threshold)?;

        let kind = request.fact.kind();
        let tag = request.subject.tag();
        let subject = tag.to_bn254().ok_or(SignalError::SubjectTagOutOfRange)?;
        let keys = self.keys(kind).await?;

        let fact = request.fact;
        let threshold = request.threshold;
        let proof = tokio::task::spawn_blocking(move || prove_fact(&keys, fact, threshold, subject))
            .await
            .context("Proving task failed")??;

        Ok(ProofEnvelope {
            predicate: kind,
            proof,
            public_signals: PublicSignals::new(threshold, tag, valid),
        })
    }

    async fn verify(&self, envelope: &ProofEnvelope) -> Result<bool, ProverError> {
        let proof = envelope
            .proof
            .to_evm()?
            .to_proof()
            .ok_or_else(|| SignalError::MalformedProof("point not on curve".to_string()))?;
        let inputs = envelope
            .public_signals
            .to_bn254()
            .ok_or(SignalError::SubjectTagOutOfRange)?;
        let keys = self.keys(envelope.predicate).await?;

        let verified = tokio::task::spawn_blocking(move || snark::verify(&keys, &inputs, &proof))
            .await
            .context("Verification task failed")?
            .map_err(|e| anyhow!("Groth16 verification error: {}", e))?;

        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectId;

    fn subject() -> SubjectId {
        SubjectId::new("0x1234567890123456789012345678901234567890").unwrap()
    }

    #[tokio::test]
    async fn test_groth16_prove_verify() {
        let backend = Groth16Backend::new();
        let envelope = backend
            .prove(&ProofRequest {
                fact: PrivateFact::DefaultRatio {
                    total_loans: 10,
                    defaulted_loans: 1,
                },
                threshold: 20,
                subject: subject(),
            })
            .await
            .unwrap();

        assert_eq!(envelope.system(), ProofSystem::Groth16);
        assert!(envelope.public_signals.valid);
        assert_eq!(envelope.public_signals.subject_tag, subject().tag());
        assert!(backend.verify(&envelope).await.unwrap());

        let mut forged = envelope.clone();
        forged.public_signals.valid = false;
        assert!(!backend.verify(&forged).await.unwrap());

        let mut weaker = envelope.clone();
        weaker.public_signals.threshold = 50;
        assert!(!backend.verify(&weaker).await.unwrap());

        // Proof for one predicate does not verify as another
        let mut relabeled = envelope;
        relabeled.predicate = PredicateKind::Repayment;
        assert!(!backend.verify(&relabeled).await.unwrap());
    }

    #[tokio::test]
    async fn test_groth16_rejects_garbage_points() {
        let backend = Groth16Backend::new();
        let one = format!("0x{:064x}", 1);
        let envelope = ProofEnvelope {
            predicate: PredicateKind::WalletAge,
            proof: WireProof::Groth16 {
                a: [one.clone(), one.clone()],
                b: [[one.clone(), one.clone()], [one.clone(), one.clone()]],
                c: [one.clone(), one],
            },
            public_signals: PublicSignals::new(90, subject().tag(), true),
        };

        assert!(matches!(
            backend.verify(&envelope).await,
            Err(ProverError::Malformed(SignalError::MalformedProof(_)))
        ));
    }

    #[tokio::test]
    async fn test_keys_are_cached() {
        let backend = Groth16Backend::new();
        let first = backend.keys(PredicateKind::WalletAge).await.unwrap();
        let second = backend.keys(PredicateKind::WalletAge).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
