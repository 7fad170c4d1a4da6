//! Score Update Endpoints
//!
//! `POST /score/verify` takes a proof envelope plus the subject to credit.
//! The proof is verified first; only a verified, valid proof reaches the
//! scoring engine.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{admin_capability, parse_subject};
use crate::error::ApiError;
use crate::services::{ScorePolicy, ScoreWarning};
use crate::types::ProofEnvelope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyScoreRequest {
    #[serde(flatten)]
    pub envelope: ProofEnvelope,
    pub subject: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyScoreResponse {
    pub subject: String,
    pub predicate: String,
    pub nullifier: String,
    pub previous_score: u32,
    pub score: u32,
    pub tier: u8,
    pub collateral_ratio_bps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ScoreWarning>,
}

/// POST /score/verify (admin)
pub async fn verify_and_update_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerifyScoreRequest>, JsonRejection>,
) -> Result<Json<VerifyScoreResponse>, ApiError> {
    let cap = admin_capability(&headers)?;
    // Reject bad tokens before any verification work
    state.engine.authorize(&cap)?;
    let Json(req) = payload?;
    let subject = parse_subject(&req.subject)?;

    let result = state
        .zk_prover
        .verify_for_subject(&req.envelope, subject)
        .await?;
    let update = state.engine.verify_and_update_score(&cap, &result).await?;

    Ok(Json(VerifyScoreResponse {
        subject: update.profile.subject.to_string(),
        predicate: result.kind.to_string(),
        nullifier: result.nullifier.to_hex(),
        previous_score: update.previous_score,
        score: update.profile.score,
        tier: update.profile.tier,
        collateral_ratio_bps: update.profile.collateral_ratio_bps,
        warning: update.warning,
    }))
}

/// GET /score/policy
///
/// Thresholds a proof must meet, so provers know what to prove against.
pub async fn get_policy(State(state): State<AppState>) -> Json<ScorePolicy> {
    Json(state.engine.policy().clone())
}
