//! Halo2 backend: PSE Halo2 with IPA commitments over the Pasta cycle
//!
//! No trusted setup; the IPA parameters are generated at startup and the
//! proving key of each predicate circuit is derived on first use.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use halo2_proofs::{
    plonk::{create_proof, keygen_pk, keygen_vk, verify_proof, ProvingKey},
    poly::{
        commitment::ParamsProver,
        ipa::{
            commitment::{IPACommitmentScheme, ParamsIPA},
            multiopen::{ProverIPA, VerifierIPA},
            strategy::SingleStrategy,
        },
        VerificationStrategy,
    },
    transcript::{
        Blake2bRead, Blake2bWrite, Challenge255, TranscriptReadBuffer, TranscriptWriterBuffer,
    },
};
use pasta_curves::EqAffine;
use rand::rngs::OsRng;

use zk_credit_circuits::{
    evaluate, DefaultRatioCircuit, PredicateCircuit, PredicateKind, RepaymentCircuit,
    WalletAgeCircuit,
};

use super::zk_prover::{ProofBackend, ProofRequest, ProverError};
use crate::types::{ProofEnvelope, ProofSystem, PublicSignals, SignalError, WireProof};

type ProofTranscript<'a, 'b> = Blake2bRead<&'a mut &'b [u8], EqAffine, Challenge255<EqAffine>>;

/// Run `verify` over `bytes` and require that it read every byte
///
/// The verifier stops reading once it has what it needs, so without this a
/// proof with bytes appended would verify under a different nullifier.
fn verify_exact(bytes: &[u8], verify: impl FnOnce(&mut &[u8]) -> bool) -> bool {
    let mut remaining = bytes;
    verify(&mut remaining) && remaining.is_empty()
}

pub struct Halo2Backend {
    params: Arc<ParamsIPA<EqAffine>>,
    /// Proving keys per predicate, generated lazily
    keys: RwLock<HashMap<PredicateKind, Arc<ProvingKey<EqAffine>>>>,
    k: u32,
}

impl Halo2Backend {
    /// # Arguments
    ///
    /// * `k` - Circuit size parameter (2^k rows). The 16-bit lookup table
    ///         needs at least `CIRCUIT_K`.
    pub fn new(k: u32) -> anyhow::Result<Self> {
        if k < zk_credit_circuits::CIRCUIT_K {
            return Err(anyhow!(
                "HALO2_K must be at least {}, got {}",
                zk_credit_circuits::CIRCUIT_K,
                k
            ));
        }

        tracing::info!("Initializing Halo2 backend with k={}...", k);
        let params = ParamsIPA::<EqAffine>::new(k);
        tracing::info!("IPA parameters generated");

        Ok(Self {
            params: Arc::new(params),
            keys: RwLock::new(HashMap::new()),
            k,
        })
    }

    async fn proving_key<C>(&self) -> Result<Arc<ProvingKey<EqAffine>>, ProverError>
    where
        C: PredicateCircuit + Send + 'static,
    {
        if let Some(pk) = self.keys.read().await.get(&C::KIND) {
            return Ok(pk.clone());
        }

        let mut keys = self.keys.write().await;

        // Double-check after acquiring write lock
        if let Some(pk) = keys.get(&C::KIND) {
            return Ok(pk.clone());
        }

        tracing::info!(kind = %C::KIND, k = self.k, "Generating Halo2 keys...");

        let params = self.params.clone();
        let pk = tokio::task::spawn_blocking(move || -> anyhow::Result<ProvingKey<EqAffine>> {
            let blank = C::blank();
            let vk = keygen_vk(&*params, &blank).context("Failed to generate verification key")?;
            keygen_pk(&*params, vk, &blank).context("Failed to generate proving key")
        })
        .await
        .context("Key generation task failed")??;

        let pk = Arc::new(pk);
        keys.insert(C::KIND, pk.clone());

        tracing::info!(kind = %C::KIND, "Halo2 keys generated successfully");
        Ok(pk)
    }

    async fn prove_with<C>(&self, request: &ProofRequest) -> Result<ProofEnvelope, ProverError>
    where
        C: PredicateCircuit + Send + 'static,
    {
        let tag = request.subject.tag();
        let subject = tag
            .to_pasta()
            .ok_or(SignalError::SubjectTagOutOfRange)?;

        let (circuit, public_inputs) = C::prepare(&request.fact, request.threshold, subject)?;
        let valid = evaluate(&request.fact, request.threshold)?;
        let pk = self.proving_key::<C>().await?;
        let params = self.params.clone();

        let transcript = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
            let mut transcript =
                Blake2bWrite::<Vec<u8>, EqAffine, Challenge255<EqAffine>>::init(vec![]);

            create_proof::<IPACommitmentScheme<EqAffine>, ProverIPA<'_, EqAffine>, _, _, _, _>(
                &*params,
                &*pk,
                &[circuit],
                &[&[public_inputs.as_slice()]],
                OsRng,
                &mut transcript,
            )
            .context("Failed to create proof")?;

            Ok(transcript.finalize())
        })
        .await
        .context("Proving task failed")??;

        Ok(ProofEnvelope {
            predicate: C::KIND,
            proof: WireProof::from_transcript(&transcript),
            public_signals: PublicSignals::new(request.threshold, tag, valid),
        })
    }
}

#[async_trait]
impl ProofBackend for Halo2Backend {
    fn system(&self) -> ProofSystem {
        ProofSystem::Halo2
    }

    async fn prove(&self, request: &ProofRequest) -> Result<ProofEnvelope, ProverError> {
        match request.fact.kind() {
            PredicateKind::WalletAge => self.prove_with::<WalletAgeCircuit>(request).await,
            PredicateKind::Repayment => self.prove_with::<RepaymentCircuit>(request).await,
            PredicateKind::DefaultRatio => self.prove_with::<DefaultRatioCircuit>(request).await,
        }
    }

    async fn verify(&self, envelope: &ProofEnvelope) -> Result<bool, ProverError> {
        let transcript = envelope.proof.transcript()?;
        let instance = envelope
            .public_signals
            .to_pasta()
            .ok_or(SignalError::SubjectTagOutOfRange)?;

        let pk = match envelope.predicate {
            PredicateKind::WalletAge => self.proving_key::<WalletAgeCircuit>().await?,
            PredicateKind::Repayment => self.proving_key::<RepaymentCircuit>().await?,
            PredicateKind::DefaultRatio => self.proving_key::<DefaultRatioCircuit>().await?,
        };
        let params = self.params.clone();

        let verified = tokio::task::spawn_blocking(move || {
            verify_exact(&transcript, |reader| {
                let mut transcript = ProofTranscript::init(reader);
                let strategy = SingleStrategy::new(&*params);

                verify_proof::<
                    IPACommitmentScheme<EqAffine>,
                    VerifierIPA<'_, EqAffine>,
                    Challenge255<EqAffine>,
                    ProofTranscript<'_, '_>,
                    SingleStrategy<'_, EqAffine>,
                >(
                    &*params,
                    pk.get_vk(),
                    strategy,
                    &[&[instance.as_slice()]],
                    &mut transcript,
                )
                .is_ok()
            })
        })
        .await
        .context("Verification task failed")?;

        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubjectId;
    use zk_credit_circuits::{PrivateFact, CIRCUIT_K};

    #[test]
    fn test_rejects_small_k() {
        assert!(Halo2Backend::new(CIRCUIT_K - 1).is_err());
    }

    #[test]
    fn test_trailing_transcript_bytes_rejected() {
        let read_four = |reader: &mut &[u8]| {
            let mut buf = [0u8; 4];
            std::io::Read::read_exact(reader, &mut buf).is_ok()
        };

        assert!(verify_exact(&[1, 2, 3, 4], read_four));
        assert!(!verify_exact(&[1, 2, 3, 4, 0], read_four));
        assert!(!verify_exact(&[1, 2, 3], read_four));
    }

    #[tokio::test]
    #[ignore = "full IPA keygen and proving at k=17"]
    async fn test_halo2_prove_verify() {
        let backend = Halo2Backend::new(CIRCUIT_K).unwrap();
        let subject = SubjectId::new("0x1234567890123456789012345678901234567890").unwrap();

        let envelope = backend
            .prove(&ProofRequest {
                fact: PrivateFact::Repayment {
                    total_loans: 10,
                    repaid_loans: 9,
                },
                threshold: 80,
                subject: subject.clone(),
            })
            .await
            .unwrap();
        assert!(envelope.public_signals.valid);
        assert!(backend.verify(&envelope).await.unwrap());

        // Claiming the opposite outcome must fail
        let mut forged = envelope.clone();
        forged.public_signals.valid = false;
        assert!(!backend.verify(&forged).await.unwrap());

        // Padding the transcript would otherwise mint a fresh nullifier
        let mut transcript = envelope.proof.transcript().unwrap();
        transcript.push(0);
        let mut padded = envelope.clone();
        padded.proof = WireProof::from_transcript(&transcript);
        assert!(!backend.verify(&padded).await.unwrap());

        // So must crediting another subject
        let mut rebound = envelope;
        rebound.public_signals.subject_tag =
            SubjectId::new("0x0000000000000000000000000000000000000001")
                .unwrap()
                .tag();
        assert!(!backend.verify(&rebound).await.unwrap());
    }
}
