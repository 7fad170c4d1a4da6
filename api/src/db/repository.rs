//! Ledger Repository
//!
//! [`LedgerStore`] abstracts the credit ledger so the scoring engine runs
//! unchanged against Postgres ([`super::Database`]) or the in-process
//! [`MemoryStore`].
//!
//! Writes are compare-and-set on the profile `nonce`. The score commit
//! consumes the nullifier and updates the profile in one step: either both
//! happen or neither does.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use zk_credit_circuits::PredicateKind;

use super::models::{CommitOutcome, CreditProfile};
use crate::types::{Nullifier, SubjectId};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new profile; `false` if the subject already has one
    async fn insert_profile(&self, profile: &CreditProfile) -> Result<bool>;

    async fn load_profile(&self, subject: &SubjectId) -> Result<Option<CreditProfile>>;

    /// Replace the profile if its stored nonce is still `expected_nonce`
    async fn save_profile(&self, profile: &CreditProfile, expected_nonce: u64) -> Result<bool>;

    /// Consume `nullifier` and save `profile` atomically
    async fn commit_score_update(
        &self,
        profile: &CreditProfile,
        expected_nonce: u64,
        nullifier: &Nullifier,
        kind: PredicateKind,
    ) -> Result<CommitOutcome>;

    async fn is_consumed(&self, nullifier: &Nullifier) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Default)]
struct Ledger {
    profiles: HashMap<SubjectId, CreditProfile>,
    consumed: HashSet<Nullifier>,
}

impl Ledger {
    fn nonce_matches(&self, subject: &SubjectId, expected_nonce: u64) -> bool {
        self.profiles
            .get(subject)
            .is_some_and(|stored| stored.nonce == expected_nonce)
    }
}

/// In-process ledger; contents are lost on restart
#[derive(Default)]
pub struct MemoryStore {
    ledger: RwLock<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_profile(&self, profile: &CreditProfile) -> Result<bool> {
        let mut ledger = self.ledger.write().await;
        if ledger.profiles.contains_key(&profile.subject) {
            return Ok(false);
        }
        ledger
            .profiles
            .insert(profile.subject.clone(), profile.clone());
        Ok(true)
    }

    async fn load_profile(&self, subject: &SubjectId) -> Result<Option<CreditProfile>> {
        Ok(self.ledger.read().await.profiles.get(subject).cloned())
    }

    async fn save_profile(&self, profile: &CreditProfile, expected_nonce: u64) -> Result<bool> {
        let mut ledger = self.ledger.write().await;
        if !ledger.nonce_matches(&profile.subject, expected_nonce) {
            return Ok(false);
        }
        ledger
            .profiles
            .insert(profile.subject.clone(), profile.clone());
        Ok(true)
    }

    async fn commit_score_update(
        &self,
        profile: &CreditProfile,
        expected_nonce: u64,
        nullifier: &Nullifier,
        _kind: PredicateKind,
    ) -> Result<CommitOutcome> {
        let mut ledger = self.ledger.write().await;
        if ledger.consumed.contains(nullifier) {
            return Ok(CommitOutcome::Replayed);
        }
        if !ledger.nonce_matches(&profile.subject, expected_nonce) {
            return Ok(CommitOutcome::Conflict);
        }
        ledger.consumed.insert(*nullifier);
        ledger
            .profiles
            .insert(profile.subject.clone(), profile.clone());
        Ok(CommitOutcome::Committed)
    }

    async fn is_consumed(&self, nullifier: &Nullifier) -> Result<bool> {
        Ok(self.ledger.read().await.consumed.contains(nullifier))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
