//! ZK Prover Service
//!
//! Proof generation and verification behind a [`ProofBackend`] trait, with
//! one implementation per proving system:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        ZKProver                          │
//! │                                                          │
//! │   ┌────────────────────┐      ┌────────────────────┐     │
//! │   │  Groth16Backend    │      │   Halo2Backend     │     │
//! │   │  arkworks / BN254  │      │   PSE / IPA Pasta  │     │
//! │   └─────────┬──────────┘      └─────────┬──────────┘     │
//! │             └──────────┬────────────────┘                │
//! │                        v                                 │
//! │        cached keys per predicate (lazy, RwLock)          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Proving and verification are CPU bound and run in `spawn_blocking`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use zk_credit_circuits::{CircuitError, PrivateFact};

use crate::types::{ProofEnvelope, ProofResult, ProofSystem, SignalError, SubjectId};

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("malformed proof envelope: {0}")]
    Malformed(#[from] SignalError),

    #[error("proof system {0} is not enabled")]
    UnsupportedSystem(ProofSystem),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Everything needed to prove one predicate about one subject
///
/// The private fact lives only for the duration of the request.
pub struct ProofRequest {
    pub fact: PrivateFact,
    pub threshold: u32,
    pub subject: SubjectId,
}

#[async_trait]
pub trait ProofBackend: Send + Sync {
    fn system(&self) -> ProofSystem;

    async fn prove(&self, request: &ProofRequest) -> Result<ProofEnvelope, ProverError>;

    /// `Ok(false)` for a well-formed proof that does not verify
    async fn verify(&self, envelope: &ProofEnvelope) -> Result<bool, ProverError>;
}

/// A freshly generated proof
pub struct GeneratedProof {
    pub proof_id: Uuid,
    pub envelope: ProofEnvelope,
    pub generation_time_ms: u64,
}

pub struct ZKProver {
    backends: HashMap<ProofSystem, Arc<dyn ProofBackend>>,
    default_system: ProofSystem,
}

impl ZKProver {
    /// Prover whose default backend is `backend`
    pub fn new(backend: Arc<dyn ProofBackend>) -> Self {
        let default_system = backend.system();
        let mut backends = HashMap::new();
        backends.insert(default_system, backend);
        Self {
            backends,
            default_system,
        }
    }

    /// Also accept proofs from `backend`
    pub fn with_backend(mut self, backend: Arc<dyn ProofBackend>) -> Self {
        self.backends.entry(backend.system()).or_insert(backend);
        self
    }

    pub fn default_system(&self) -> ProofSystem {
        self.default_system
    }

    pub fn systems(&self) -> Vec<ProofSystem> {
        let mut systems: Vec<_> = self.backends.keys().copied().collect();
        systems.sort_by_key(|s| s.as_str());
        systems
    }

    fn backend(&self, system: ProofSystem) -> Result<&Arc<dyn ProofBackend>, ProverError> {
        self.backends
            .get(&system)
            .ok_or(ProverError::UnsupportedSystem(system))
    }

    pub async fn generate(
        &self,
        request: ProofRequest,
        system: Option<ProofSystem>,
    ) -> Result<GeneratedProof, ProverError> {
        let system = system.unwrap_or(self.default_system);
        let backend = self.backend(system)?;
        let kind = request.fact.kind();
        let start = Instant::now();

        let envelope = backend.prove(&request).await?;
        let generation_time_ms = start.elapsed().as_millis() as u64;

        let proof_id = Uuid::new_v4();
        tracing::info!(
            %proof_id,
            %kind,
            %system,
            subject = %request.subject,
            valid = envelope.public_signals.valid,
            generation_time_ms,
            "Proof generated"
        );

        Ok(GeneratedProof {
            proof_id,
            envelope,
            generation_time_ms,
        })
    }

    /// Verify an envelope and bind the outcome to `subject`
    ///
    /// Malformed envelopes are errors. A proof that does not verify yields
    /// `verified = false`; the caller decides what that means.
    pub async fn verify_for_subject(
        &self,
        envelope: &ProofEnvelope,
        subject: SubjectId,
    ) -> Result<ProofResult, ProverError> {
        let nullifier = envelope.nullifier()?;
        let backend = self.backend(envelope.system())?;

        let start = Instant::now();
        let verified = backend.verify(envelope).await?;

        tracing::info!(
            kind = %envelope.predicate,
            system = %envelope.system(),
            %subject,
            verified,
            verification_time_ms = start.elapsed().as_millis() as u64,
            "Proof verified"
        );

        Ok(ProofResult {
            kind: envelope.predicate,
            verified,
            valid: verified && envelope.public_signals.valid,
            signals: envelope.public_signals,
            subject,
            nullifier,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockBackend;
    use super::*;
    use crate::types::WireProof;

    fn subject() -> SubjectId {
        SubjectId::new("0x1234567890123456789012345678901234567890").unwrap()
    }

    fn prover() -> ZKProver {
        ZKProver::new(Arc::new(MockBackend))
    }

    #[tokio::test]
    async fn test_generate_and_verify() {
        let prover = prover();
        let request = ProofRequest {
            fact: PrivateFact::Repayment {
                total_loans: 10,
                repaid_loans: 8,
            },
            threshold: 80,
            subject: subject(),
        };

        let generated = prover.generate(request, None).await.unwrap();
        assert!(generated.envelope.public_signals.valid);

        let result = prover
            .verify_for_subject(&generated.envelope, subject())
            .await
            .unwrap();
        assert!(result.verified);
        assert!(result.valid);
        assert_eq!(result.nullifier, generated.envelope.nullifier().unwrap());
    }

    #[tokio::test]
    async fn test_false_predicate_is_not_valid() {
        let prover = prover();
        let request = ProofRequest {
            fact: PrivateFact::WalletAge { wallet_age_days: 30 },
            threshold: 90,
            subject: subject(),
        };

        let generated = prover.generate(request, None).await.unwrap();
        let result = prover
            .verify_for_subject(&generated.envelope, subject())
            .await
            .unwrap();
        assert!(result.verified);
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_rejected_proof_is_not_valid() {
        let prover = prover();
        let mut envelope = prover
            .generate(
                ProofRequest {
                    fact: PrivateFact::WalletAge { wallet_age_days: 120 },
                    threshold: 90,
                    subject: subject(),
                },
                None,
            )
            .await
            .unwrap()
            .envelope;
        envelope.proof = WireProof::from_transcript(&[0x00]);

        let result = prover.verify_for_subject(&envelope, subject()).await.unwrap();
        assert!(!result.verified);
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn test_unsupported_system() {
        let prover = prover();
        let result = prover
            .generate(
                ProofRequest {
                    fact: PrivateFact::WalletAge { wallet_age_days: 1 },
                    threshold: 1,
                    subject: subject(),
                },
                Some(ProofSystem::Groth16),
            )
            .await;
        assert!(matches!(
            result,
            Err(ProverError::UnsupportedSystem(ProofSystem::Groth16))
        ));
    }

    #[tokio::test]
    async fn test_invalid_fact_is_rejected_before_proving() {
        let prover = prover();
        let result = prover
            .generate(
                ProofRequest {
                    fact: PrivateFact::Repayment {
                        total_loans: 2,
                        repaid_loans: 3,
                    },
                    threshold: 80,
                    subject: subject(),
                },
                None,
            )
            .await;
        assert!(matches!(
            result,
            Err(ProverError::Circuit(CircuitError::LoanBoundExceeded { .. }))
        ));
    }
}
