//! ZK Proof Generation Endpoint
//!
//! `POST /proof/:kind` proves one predicate about the caller's private
//! loan history and returns the envelope to submit to `/score/verify`.
//! The private facts are used for this request only; they are neither
//! logged nor stored.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zk_credit_circuits::{validation, PredicateKind, PrivateFact};

use super::parse_subject;
use crate::error::ApiError;
use crate::services::ProofRequest;
use crate::types::{ProofEnvelope, ProofSystem};
use crate::AppState;

// ============ Request/Response Types ============

/// Fields required depend on the predicate:
/// - `wallet_age`: `wallet_age_days`
/// - `repayment`: `total_loans`, `repaid_loans`
/// - `default_ratio`: `total_loans`, `defaulted_loans`
#[derive(Deserialize)]
pub struct ProofGenerationRequest {
    pub subject: String,
    /// Days, or a percentage for the loan-history predicates
    pub threshold: u64,
    #[serde(default)]
    pub system: Option<ProofSystem>,
    pub wallet_age_days: Option<u64>,
    pub total_loans: Option<u64>,
    pub repaid_loans: Option<u64>,
    pub defaulted_loans: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ProofResponse {
    pub proof_id: Uuid,
    #[serde(flatten)]
    pub envelope: ProofEnvelope,
    /// Wall-clock proving time
    pub generation_time_ms: u64,
}

// ============ Handlers ============

/// POST /proof/:kind
pub async fn generate_proof(
    State(state): State<AppState>,
    Path(kind): Path<PredicateKind>,
    payload: Result<Json<ProofGenerationRequest>, JsonRejection>,
) -> Result<Json<ProofResponse>, ApiError> {
    let Json(req) = payload?;
    let subject = parse_subject(&req.subject)?;
    let threshold = validation::validate_range(req.threshold, kind.threshold_name())
        .map_err(|e| ApiError::ValidationError(e.to_string()))?;
    let fact = private_fact(kind, &req)?;

    tracing::info!(%kind, %subject, "Generating proof");

    let generated = state
        .zk_prover
        .generate(
            ProofRequest {
                fact,
                threshold,
                subject,
            },
            req.system,
        )
        .await?;

    Ok(Json(ProofResponse {
        proof_id: generated.proof_id,
        envelope: generated.envelope,
        generation_time_ms: generated.generation_time_ms,
    }))
}

// ============ Helpers ============

fn fact_field(value: Option<u64>, name: &str) -> Result<u32, ApiError> {
    let value = value.ok_or_else(|| ApiError::ValidationError(format!("{} is required", name)))?;
    validation::validate_range(value, name).map_err(|e| ApiError::ValidationError(e.to_string()))
}

fn private_fact(kind: PredicateKind, req: &ProofGenerationRequest) -> Result<PrivateFact, ApiError> {
    Ok(match kind {
        PredicateKind::WalletAge => PrivateFact::WalletAge {
            wallet_age_days: fact_field(req.wallet_age_days, "wallet_age_days")?,
        },
        PredicateKind::Repayment => PrivateFact::Repayment {
            total_loans: fact_field(req.total_loans, "total_loans")?,
            repaid_loans: fact_field(req.repaid_loans, "repaid_loans")?,
        },
        PredicateKind::DefaultRatio => PrivateFact::DefaultRatio {
            total_loans: fact_field(req.total_loans, "total_loans")?,
            defaulted_loans: fact_field(req.defaulted_loans, "defaulted_loans")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> ProofGenerationRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_private_fact_per_kind() {
        let req = request(serde_json::json!({
            "subject": "0x1234567890123456789012345678901234567890",
            "threshold": 80,
            "total_loans": 10,
            "repaid_loans": 8
        }));
        assert_eq!(
            private_fact(PredicateKind::Repayment, &req).unwrap(),
            PrivateFact::Repayment {
                total_loans: 10,
                repaid_loans: 8
            }
        );
        assert!(matches!(
            private_fact(PredicateKind::WalletAge, &req),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_fact_width_enforced() {
        let req = request(serde_json::json!({
            "subject": "0x1234567890123456789012345678901234567890",
            "threshold": 90,
            "wallet_age_days": 1u64 << 32
        }));
        assert!(matches!(
            private_fact(PredicateKind::WalletAge, &req),
            Err(ApiError::ValidationError(_))
        ));
    }
}
