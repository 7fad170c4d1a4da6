//! Health Check Endpoint
//!
//! Deep health check: reports the ledger backend and whether it answers,
//! plus the proof systems this instance accepts.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::types::ProofSystem;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ledger: LedgerStatus,
    pub proof_systems: Vec<ProofSystem>,
    pub default_proof_system: ProofSystem,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct LedgerStatus {
    pub backend: &'static str,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = state.engine.store();
    let start = std::time::Instant::now();
    let ledger = match store.health_check().await {
        Ok(()) => LedgerStatus {
            backend: store.backend_name(),
            connected: true,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!("Ledger health check failed: {:#}", e);
            LedgerStatus {
                backend: store.backend_name(),
                connected: false,
                latency_ms: None,
            }
        }
    };

    Json(HealthResponse {
        status: if ledger.connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ledger,
        proof_systems: state.zk_prover.systems(),
        default_proof_system: state.zk_prover.default_system(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
