//! Identity Binding Endpoints
//!
//! The identity binder (an admin) attaches a verified off-chain identity to
//! a subject address. Binding is one-time and creates the credit profile.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use super::{admin_capability, parse_subject};
use crate::db::ProfileView;
use crate::error::ApiError;
use crate::types::IdentityHash;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BindIdentityRequest {
    pub subject: String,
    /// 0x-prefixed 32-byte hash of the verified identity
    pub identity_hash: String,
}

#[derive(Debug, Serialize)]
pub struct VerifiedResponse {
    pub subject: String,
    pub verified: bool,
}

/// POST /identity/bind (admin)
pub async fn bind_identity(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BindIdentityRequest>, JsonRejection>,
) -> Result<Json<ProfileView>, ApiError> {
    let cap = admin_capability(&headers)?;
    let Json(req) = payload?;
    let subject = parse_subject(&req.subject)?;
    let identity_hash = IdentityHash::from_hex(&req.identity_hash).ok_or_else(|| {
        ApiError::ValidationError("identity_hash must be a 0x-prefixed 32-byte hex string".into())
    })?;

    let profile = state
        .engine
        .bind_identity(&cap, &subject, identity_hash)
        .await?;

    Ok(Json(ProfileView::from(&profile)))
}

/// GET /identity/:subject/verified
pub async fn is_verified(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<VerifiedResponse>, ApiError> {
    let subject = parse_subject(&subject)?;
    let verified = state.engine.is_verified(&subject).await?;

    Ok(Json(VerifiedResponse {
        subject: subject.to_string(),
        verified,
    }))
}
