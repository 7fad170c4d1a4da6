//! Database Module
//!
//! Postgres implementation of the credit ledger ([`Database`]), plus the
//! [`LedgerStore`] trait and the in-memory store used when no
//! `DATABASE_URL` is configured.
//!
//! # Tables
//! - `credit_profiles`: one row per bound subject, versioned by `nonce`
//! - `consumed_proofs`: nullifiers of proofs already credited

mod models;
mod repository;

pub use models::{CommitOutcome, CreditProfile, ProfileView};
pub use repository::{LedgerStore, MemoryStore};

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use models::ProfileRow;
use zk_credit_circuits::PredicateKind;

use crate::types::{Nullifier, SubjectId};

/// Postgres-backed ledger
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10
    /// - min_connections: 1
    /// - acquire_timeout: 3s
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for Database {
    async fn insert_profile(&self, profile: &CreditProfile) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO credit_profiles (
                subject, identity_hash, score, tier, collateral_ratio_bps,
                total_loans, repaid_loans, last_updated, nonce
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (subject) DO NOTHING
            "#,
        )
        .bind(profile.subject.as_str())
        .bind(&profile.identity_hash.0[..])
        .bind(profile.score as i32)
        .bind(profile.tier as i16)
        .bind(profile.collateral_ratio_bps as i32)
        .bind(profile.total_loans as i64)
        .bind(profile.repaid_loans as i64)
        .bind(profile.last_updated)
        .bind(profile.nonce as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn load_profile(&self, subject: &SubjectId) -> Result<Option<CreditProfile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                subject,
                identity_hash,
                score,
                tier,
                collateral_ratio_bps,
                total_loans,
                repaid_loans,
                last_updated,
                nonce
            FROM credit_profiles
            WHERE subject = $1
            "#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CreditProfile::try_from).transpose()
    }

    async fn save_profile(&self, profile: &CreditProfile, expected_nonce: u64) -> Result<bool> {
        let result = update_profile(profile, expected_nonce)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit_score_update(
        &self,
        profile: &CreditProfile,
        expected_nonce: u64,
        nullifier: &Nullifier,
        kind: PredicateKind,
    ) -> Result<CommitOutcome> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            r#"
            INSERT INTO consumed_proofs (nullifier, subject, predicate, consumed_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (nullifier) DO NOTHING
            "#,
        )
        .bind(&nullifier.0[..])
        .bind(profile.subject.as_str())
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::Replayed);
        }

        let updated = update_profile(profile, expected_nonce)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CommitOutcome::Conflict);
        }

        tx.commit().await?;
        Ok(CommitOutcome::Committed)
    }

    async fn is_consumed(&self, nullifier: &Nullifier) -> Result<bool> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM consumed_proofs WHERE nullifier = $1")
                .bind(&nullifier.0[..])
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn update_profile(
    profile: &CreditProfile,
    expected_nonce: u64,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        UPDATE credit_profiles SET
            score = $2,
            tier = $3,
            collateral_ratio_bps = $4,
            total_loans = $5,
            repaid_loans = $6,
            last_updated = $7,
            nonce = $8
        WHERE subject = $1 AND nonce = $9
        "#,
    )
    .bind(profile.subject.as_str())
    .bind(profile.score as i32)
    .bind(profile.tier as i16)
    .bind(profile.collateral_ratio_bps as i32)
    .bind(profile.total_loans as i64)
    .bind(profile.repaid_loans as i64)
    .bind(profile.last_updated)
    .bind(profile.nonce as i64)
    .bind(expected_nonce as i64)
}
