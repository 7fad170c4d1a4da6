//! Credit Profile Endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use super::{admin_capability, parse_subject};
use crate::db::ProfileView;
use crate::error::ApiError;
use crate::services::LoanEvent;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoanEventRequest {
    pub event: LoanEvent,
}

/// GET /profile/:subject
pub async fn get_profile(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> Result<Json<ProfileView>, ApiError> {
    let subject = parse_subject(&subject)?;
    let profile = state.engine.get_profile(&subject).await?;
    Ok(Json(ProfileView::from(&profile)))
}

/// POST /profile/:subject/loans (admin)
///
/// Records a loan opened or repaid. Loan-history proofs only count once
/// the profile carries enough recorded loans.
pub async fn record_loan_event(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<LoanEventRequest>, JsonRejection>,
) -> Result<Json<ProfileView>, ApiError> {
    let cap = admin_capability(&headers)?;
    let Json(req) = payload?;
    let subject = parse_subject(&subject)?;

    let profile = state
        .engine
        .record_loan_event(&cap, &subject, req.event)
        .await?;

    Ok(Json(ProfileView::from(&profile)))
}
