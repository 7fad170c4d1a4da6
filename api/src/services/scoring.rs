//! Scoring Engine
//!
//! Owns every mutation of a [`CreditProfile`]. A subject moves through
//! `Unbound -> Bound -> score updates`: an admin binds it to a verified
//! identity, then verified proofs raise its score.
//!
//! # Update check order
//!
//! ```text
//! capability -> bound -> verified/valid -> subject tag -> threshold policy
//!            -> not consumed -> degenerate-input guard -> atomic commit
//! ```
//!
//! Mutations of one subject are serialized by a per-subject lock; the store
//! additionally compare-and-sets on the profile nonce, so a lost race
//! surfaces as `Conflict` instead of a lost update. Lock entries exist only
//! for bound subjects with an update in flight.
//!
//! The degenerate-input guard reads the loan count recorded on the ledger,
//! not the private total inside the proof. Once the ledger shows
//! `min_loans_for_credit` loans, a loan-history proof is credited even if
//! it was made over a private total of zero.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use zk_credit_circuits::{validation, CircuitError, PredicateKind};

use super::policy::{CollateralRequirement, ScorePolicy, TIER_COLLATERAL_BPS};
use crate::db::{CommitOutcome, CreditProfile, LedgerStore};
use crate::types::{keccak256, IdentityHash, ProofResult, SubjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidProofReason {
    #[error("the attested predicate does not hold")]
    PredicateFalse,

    #[error("proof verification failed")]
    VerificationFailed,

    #[error("proof is bound to a different subject")]
    SubjectMismatch,

    #[error("proof threshold is weaker than policy")]
    ThresholdBelowPolicy,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("admin capability required")]
    Unauthorized,

    #[error("subject {0} is already bound")]
    AlreadyBound(SubjectId),

    #[error("subject {0} is not bound")]
    NotBound(SubjectId),

    #[error("invalid proof: {0}")]
    InvalidProof(InvalidProofReason),

    #[error("proof has already been consumed")]
    ReplayedProof,

    #[error("unknown tier {0}")]
    UnknownTier(u8),

    #[error("inconsistent loan history: {0}")]
    InconsistentLoanHistory(String),

    #[error("concurrent update of {0}, retry")]
    Conflict(SubjectId),

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Storage(format!("{:#}", err))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Proof of admin authority, presented on every mutation
///
/// Only the keccak256 digest of the token is kept.
#[derive(Clone)]
pub struct AdminCapability {
    digest: [u8; 32],
}

impl AdminCapability {
    pub fn from_token(token: &str) -> Self {
        Self {
            digest: keccak256(&[b"zk-credit/admin", token.as_bytes()]),
        }
    }

    /// Constant-time digest comparison
    fn matches(&self, presented: &AdminCapability) -> bool {
        self.digest
            .iter()
            .zip(presented.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for AdminCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminCapability(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanEvent {
    Opened,
    Repaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreWarning {
    /// Loan-history proof over too few recorded loans; nothing changed
    DegenerateInput,
}

/// Outcome of a score update
#[derive(Debug, Clone)]
pub struct ScoreUpdate {
    pub profile: CreditProfile,
    pub previous_score: u32,
    pub warning: Option<ScoreWarning>,
}

pub struct ScoringEngine {
    store: Arc<dyn LedgerStore>,
    policy: ScorePolicy,
    admin: AdminCapability,
    locks: Mutex<HashMap<SubjectId, Arc<Mutex<()>>>>,
}

impl ScoringEngine {
    pub fn new(store: Arc<dyn LedgerStore>, policy: ScorePolicy, admin: AdminCapability) -> Self {
        Self {
            store,
            policy,
            admin,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Check the capability alone, before any costly work on its behalf
    pub fn authorize(&self, cap: &AdminCapability) -> EngineResult<()> {
        if self.admin.matches(cap) {
            Ok(())
        } else {
            tracing::warn!("Rejected mutation without a valid admin capability");
            Err(EngineError::Unauthorized)
        }
    }

    async fn subject_lock(&self, subject: &SubjectId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(subject.clone())
            .or_default()
            .clone()
    }

    /// Drop the subject's lock entry once no other task holds it
    async fn release_lock(&self, subject: &SubjectId, lock: Arc<Mutex<()>>) {
        drop(lock);
        let mut locks = self.locks.lock().await;
        if locks.get(subject).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(subject);
        }
    }

    #[cfg(test)]
    async fn lock_entries(&self) -> usize {
        self.locks.lock().await.len()
    }

    async fn load_bound(&self, subject: &SubjectId) -> EngineResult<CreditProfile> {
        self.store
            .load_profile(subject)
            .await?
            .ok_or_else(|| EngineError::NotBound(subject.clone()))
    }

    /// Bind `subject` to a verified identity; one-time
    pub async fn bind_identity(
        &self,
        cap: &AdminCapability,
        subject: &SubjectId,
        identity_hash: IdentityHash,
    ) -> EngineResult<CreditProfile> {
        self.authorize(cap)?;

        let score = self.policy.initial_score;
        let tier = self.policy.tier_of(score);
        let profile = CreditProfile {
            subject: subject.clone(),
            identity_hash,
            score,
            tier,
            collateral_ratio_bps: TIER_COLLATERAL_BPS[tier as usize],
            total_loans: 0,
            repaid_loans: 0,
            last_updated: Utc::now(),
            nonce: 0,
        };

        if !self.store.insert_profile(&profile).await? {
            return Err(EngineError::AlreadyBound(subject.clone()));
        }

        tracing::info!(%subject, score, tier, "Identity bound");
        Ok(profile)
    }

    /// Credit a verified proof to its subject
    pub async fn verify_and_update_score(
        &self,
        cap: &AdminCapability,
        result: &ProofResult,
    ) -> EngineResult<ScoreUpdate> {
        self.authorize(cap)?;

        let subject = &result.subject;
        // Unbound subjects never get a lock entry
        self.load_bound(subject).await?;

        let lock = self.subject_lock(subject).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.update_score_locked(result).await
        };
        self.release_lock(subject, lock).await;
        outcome
    }

    async fn update_score_locked(&self, result: &ProofResult) -> EngineResult<ScoreUpdate> {
        let subject = &result.subject;
        let profile = self.load_bound(subject).await?;

        if !result.verified {
            return Err(EngineError::InvalidProof(InvalidProofReason::VerificationFailed));
        }
        if !result.valid {
            return Err(EngineError::InvalidProof(InvalidProofReason::PredicateFalse));
        }
        if result.signals.subject_tag != subject.tag() {
            return Err(EngineError::InvalidProof(InvalidProofReason::SubjectMismatch));
        }

        let threshold = result.signals.threshold;
        if result.kind.uses_loan_history() {
            validation::validate_percentage(threshold, result.kind.threshold_name())?;
        }
        if !self.policy.meets_threshold(result.kind, threshold) {
            return Err(EngineError::InvalidProof(InvalidProofReason::ThresholdBelowPolicy));
        }

        if self.store.is_consumed(&result.nullifier).await? {
            return Err(EngineError::ReplayedProof);
        }

        // A rate over zero loans holds vacuously
        if result.kind.uses_loan_history() && profile.total_loans < self.policy.min_loans_for_credit
        {
            tracing::warn!(
                %subject,
                kind = %result.kind,
                total_loans = profile.total_loans,
                "Degenerate loan-history proof ignored"
            );
            return Ok(ScoreUpdate {
                previous_score: profile.score,
                profile,
                warning: Some(ScoreWarning::DegenerateInput),
            });
        }

        let previous_score = profile.score;
        let score = self.policy.apply(previous_score, result.kind);
        let tier = self.policy.tier_of(score);
        let next = CreditProfile {
            score,
            tier,
            collateral_ratio_bps: TIER_COLLATERAL_BPS[tier as usize],
            last_updated: Utc::now(),
            nonce: profile.nonce + 1,
            ..profile.clone()
        };

        match self
            .store
            .commit_score_update(&next, profile.nonce, &result.nullifier, result.kind)
            .await?
        {
            CommitOutcome::Committed => {
                tracing::info!(
                    %subject,
                    kind = %result.kind,
                    previous_score,
                    score,
                    tier,
                    "Score updated"
                );
                Ok(ScoreUpdate {
                    profile: next,
                    previous_score,
                    warning: None,
                })
            }
            CommitOutcome::Replayed => Err(EngineError::ReplayedProof),
            CommitOutcome::Conflict => Err(EngineError::Conflict(subject.clone())),
        }
    }

    /// Record a loan opened or repaid; the score is not touched
    pub async fn record_loan_event(
        &self,
        cap: &AdminCapability,
        subject: &SubjectId,
        event: LoanEvent,
    ) -> EngineResult<CreditProfile> {
        self.authorize(cap)?;
        self.load_bound(subject).await?;

        let lock = self.subject_lock(subject).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.record_loan_locked(subject, event).await
        };
        self.release_lock(subject, lock).await;
        outcome
    }

    async fn record_loan_locked(
        &self,
        subject: &SubjectId,
        event: LoanEvent,
    ) -> EngineResult<CreditProfile> {
        let profile = self.load_bound(subject).await?;
        let (total_loans, repaid_loans) = match event {
            LoanEvent::Opened => (
                profile.total_loans.checked_add(1).ok_or_else(|| {
                    EngineError::InconsistentLoanHistory("total_loans overflow".to_string())
                })?,
                profile.repaid_loans,
            ),
            LoanEvent::Repaid => {
                let repaid = profile.repaid_loans.saturating_add(1);
                if repaid > profile.total_loans {
                    return Err(EngineError::InconsistentLoanHistory(format!(
                        "repaid_loans {} would exceed total_loans {}",
                        repaid, profile.total_loans
                    )));
                }
                (profile.total_loans, repaid)
            }
        };

        let next = CreditProfile {
            total_loans,
            repaid_loans,
            last_updated: Utc::now(),
            nonce: profile.nonce + 1,
            ..profile.clone()
        };

        if !self.store.save_profile(&next, profile.nonce).await? {
            return Err(EngineError::Conflict(subject.clone()));
        }

        tracing::info!(%subject, ?event, total_loans, repaid_loans, "Loan event recorded");
        Ok(next)
    }

    pub async fn get_profile(&self, subject: &SubjectId) -> EngineResult<CreditProfile> {
        self.load_bound(subject).await
    }

    pub async fn is_verified(&self, subject: &SubjectId) -> EngineResult<bool> {
        Ok(self.store.load_profile(subject).await?.is_some())
    }

    pub fn collateral_for_amount(&self, tier: u8, amount: u64) -> EngineResult<CollateralRequirement> {
        CollateralRequirement::for_amount(tier, amount).ok_or(EngineError::UnknownTier(tier))
    }
}
