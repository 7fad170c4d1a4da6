//! ZK Credit Attestation API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Client / Identity binder / Lender           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                        │
//! │  Routes:   /proof  /identity  /profile  /score  /collateral │
//! │  Services: ZKProver (Groth16 + Halo2)   ScoringEngine       │
//! │  Ledger:   PostgreSQL or in-memory                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zk_credit_api::{
    create_router, services::ProofBackend, types::ProofSystem, AppState, Config, Database,
    Groth16Backend, Halo2Backend, LedgerStore, MemoryStore, ZKProver,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // RUST_LOG=debug,sqlx=warn style filtering
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zk_credit_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ZK Credit Attestation API Server");

    let config = Config::from_env()?;
    tracing::info!(environment = ?config.environment, "Configuration loaded");

    let store: Arc<dyn LedgerStore> = match &config.database_url {
        Some(url) => {
            let db = Database::connect(url).await?;
            db.run_migrations().await?;
            tracing::info!("Postgres ledger connected, migrations completed");
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory ledger");
            Arc::new(MemoryStore::new())
        }
    };

    // Both systems verify; the configured one also proves by default
    let groth16: Arc<dyn ProofBackend> = Arc::new(Groth16Backend::new());
    let halo2: Arc<dyn ProofBackend> = Arc::new(Halo2Backend::new(config.halo2_k)?);
    let zk_prover = match config.proof_backend {
        ProofSystem::Groth16 => ZKProver::new(groth16).with_backend(halo2),
        ProofSystem::Halo2 => ZKProver::new(halo2).with_backend(groth16),
    };
    tracing::info!(default = %zk_prover.default_system(), "ZK Prover initialized");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, store, zk_prover);
    let app = create_router(state);

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
