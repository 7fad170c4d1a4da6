//! ZK Credit Attestation API Library
//!
//! # Overview
//!
//! Borrowers prove facts about their history (wallet age, repayment rate,
//! default rate) in zero knowledge; an admin-gated scoring engine turns
//! verified proofs into a credit score, a tier and a collateral ratio.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                          API                             │
//! │                                                          │
//! │  ┌─────────┐  ┌──────────────┐  ┌─────────┐  ┌───────┐   │
//! │  │ Routes  │->│   Services   │->│   DB    │  │ Types │   │
//! │  └─────────┘  │ ZKProver     │  │ Ledger  │  └───────┘   │
//! │               │ ScoringEngine│  │ Store   │              │
//! │               └──────┬───────┘  └─────────┘              │
//! └──────────────────────┼───────────────────────────────────┘
//!                        v
//!        zk-credit-circuits (Halo2) / zk-credit-arkworks (Groth16)
//! ```
//!
//! ## Modules
//!
//! - `config`: environment configuration and score policy
//! - `error`: API errors and their HTTP mapping
//! - `routes`: HTTP handlers
//! - `services`: proof backends and the scoring engine
//! - `db`: credit ledger (Postgres or in-memory)
//! - `types`: subjects, tags and the proof envelope
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zk_credit_api::{create_router, AppState, Config};
//!
//! let config = Config::from_env()?;
//! let state = AppState::new(config, store, prover);
//! axum::serve(listener, create_router(state)).await?;
//! ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use db::{Database, LedgerStore, MemoryStore};
pub use error::ApiError;
pub use services::{AdminCapability, Groth16Backend, Halo2Backend, ScoringEngine, ZKProver};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
    pub zk_prover: Arc<ZKProver>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn LedgerStore>, zk_prover: ZKProver) -> Self {
        let engine = ScoringEngine::new(
            store,
            config.policy.clone(),
            AdminCapability::from_token(&config.admin_token),
        );

        Self {
            engine: Arc::new(engine),
            zk_prover: Arc::new(zk_prover),
            config: Arc::new(config),
        }
    }
}

/// # Route Structure
///
/// ```text
/// GET  /health                      - server and ledger status
///
/// POST /proof/:kind                 - generate a proof (wallet_age | repayment | default_ratio)
///
/// POST /identity/bind               - bind a subject to an identity (admin)
/// GET  /identity/:subject/verified  - whether a subject is bound
///
/// GET  /profile/:subject            - credit profile
/// POST /profile/:subject/loans      - record a loan event (admin)
///
/// POST /score/verify                - verify a proof and credit the score (admin)
/// GET  /score/policy                - thresholds and deltas in force
///
/// GET  /collateral/:tier/:amount    - collateral required at a tier
/// ```
pub fn create_router(state: AppState) -> Router {
    let cors = if state.config.is_production() {
        let origins: Vec<HeaderValue> = state
            .config
            .allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(routes::ADMIN_TOKEN_HEADER),
            ])
    } else {
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:5173"), // Vite dev server
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Proof generation
        .route("/proof/:kind", post(routes::proof::generate_proof))
        // Identity
        .route("/identity/bind", post(routes::identity::bind_identity))
        .route(
            "/identity/:subject/verified",
            get(routes::identity::is_verified),
        )
        // Profiles
        .route("/profile/:subject", get(routes::profile::get_profile))
        .route(
            "/profile/:subject/loans",
            post(routes::profile::record_loan_event),
        )
        // Scoring
        .route(
            "/score/verify",
            post(routes::score::verify_and_update_score),
        )
        .route("/score/policy", get(routes::score::get_policy))
        // Collateral
        .route(
            "/collateral/:tier/:amount",
            get(routes::collateral::get_collateral),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
