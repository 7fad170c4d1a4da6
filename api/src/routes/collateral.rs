//! Collateral Requirement Endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CollateralResponse {
    pub tier: u8,
    pub amount: String,
    pub collateral_ratio_bps: u32,
    /// Exact requirement, e.g. "13.5"
    pub collateral: String,
    /// Requirement rounded up to a whole unit
    pub collateral_ceil: String,
}

/// GET /collateral/:tier/:amount
pub async fn get_collateral(
    State(state): State<AppState>,
    Path((tier, amount)): Path<(u8, u64)>,
) -> Result<Json<CollateralResponse>, ApiError> {
    let req = state.engine.collateral_for_amount(tier, amount)?;

    Ok(Json(CollateralResponse {
        tier: req.tier,
        amount: req.amount.to_string(),
        collateral_ratio_bps: req.ratio_bps,
        collateral: req.to_decimal_string(),
        collateral_ceil: req.ceil().to_string(),
    }))
}
