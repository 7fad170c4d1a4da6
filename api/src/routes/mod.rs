//! API Routes Module
//!
//! # Routes
//! - `/health` - health check
//! - `/proof/:kind` - proof generation
//! - `/identity/*` - identity binding
//! - `/profile/*` - credit profiles and loan history
//! - `/score/*` - proof-backed score updates
//! - `/collateral/*` - collateral requirements per tier

pub mod collateral;
pub mod health;
pub mod identity;
pub mod profile;
pub mod proof;
pub mod score;

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::services::AdminCapability;
use crate::types::SubjectId;

/// Header carrying the admin token on mutating requests
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Capability presented by the caller; checked by the engine
pub(crate) fn admin_capability(headers: &HeaderMap) -> Result<AdminCapability, ApiError> {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|token| !token.is_empty())
        .map(AdminCapability::from_token)
        .ok_or(ApiError::Unauthorized)
}

pub(crate) fn parse_subject(raw: &str) -> Result<SubjectId, ApiError> {
    SubjectId::new(raw).map_err(ApiError::BadRequest)
}
