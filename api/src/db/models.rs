//! Database Models
//!
//! The credit ledger stores one profile per bound subject and the set of
//! consumed proof nullifiers. Private facts are never stored.

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{IdentityHash, SubjectId};

/// Credit profile of a bound subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditProfile {
    pub subject: SubjectId,

    /// Hash of the verified off-chain identity
    pub identity_hash: IdentityHash,

    /// In [0, 1000]
    pub score: u32,

    /// Derived from `score`
    pub tier: u8,

    /// Collateral requirement of `tier`, in basis points
    pub collateral_ratio_bps: u32,

    pub total_loans: u32,
    pub repaid_loans: u32,

    pub last_updated: DateTime<Utc>,

    /// Version for compare-and-set; bumped on every write
    pub nonce: u64,
}

/// Public view returned by `GET /profile/:subject`
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub subject: String,
    pub score: u32,
    pub tier: u8,
    pub collateral_ratio_bps: u32,
    pub total_loans: u32,
    pub repaid_loans: u32,
    pub last_updated: DateTime<Utc>,
}

impl From<&CreditProfile> for ProfileView {
    fn from(profile: &CreditProfile) -> Self {
        Self {
            subject: profile.subject.to_string(),
            score: profile.score,
            tier: profile.tier,
            collateral_ratio_bps: profile.collateral_ratio_bps,
            total_loans: profile.total_loans,
            repaid_loans: profile.repaid_loans,
            last_updated: profile.last_updated,
        }
    }
}

/// Row of `credit_profiles`
#[derive(Debug, Clone, FromRow)]
pub(crate) struct ProfileRow {
    pub subject: String,
    pub identity_hash: Vec<u8>,
    pub score: i32,
    pub tier: i16,
    pub collateral_ratio_bps: i32,
    pub total_loans: i64,
    pub repaid_loans: i64,
    pub last_updated: DateTime<Utc>,
    pub nonce: i64,
}

impl TryFrom<ProfileRow> for CreditProfile {
    type Error = anyhow::Error;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let identity_hash: [u8; 32] = row
            .identity_hash
            .as_slice()
            .try_into()
            .context("identity_hash must be 32 bytes")?;

        Ok(Self {
            subject: SubjectId::new(&row.subject).map_err(|e| anyhow!(e))?,
            identity_hash: IdentityHash(identity_hash),
            score: u32::try_from(row.score).context("score out of range")?,
            tier: u8::try_from(row.tier).context("tier out of range")?,
            collateral_ratio_bps: u32::try_from(row.collateral_ratio_bps)
                .context("collateral_ratio_bps out of range")?,
            total_loans: u32::try_from(row.total_loans).context("total_loans out of range")?,
            repaid_loans: u32::try_from(row.repaid_loans).context("repaid_loans out of range")?,
            last_updated: row.last_updated,
            nonce: u64::try_from(row.nonce).context("nonce out of range")?,
        })
    }
}

/// Result of the atomic score commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Nullifier already consumed; nothing written
    Replayed,
    /// Profile changed since it was read; nothing written
    Conflict,
}
