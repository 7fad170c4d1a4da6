//! Services Module
//!
//! # Services
//! - `ZKProver`: proof generation and verification over pluggable backends
//! - `Groth16Backend` / `Halo2Backend`: the two proving systems
//! - `ScoringEngine`: the only writer of credit profiles

mod groth16_backend;
mod halo2_backend;
pub mod policy;
pub mod scoring;
mod zk_prover;

pub use groth16_backend::Groth16Backend;
pub use halo2_backend::Halo2Backend;
pub use policy::{CollateralRequirement, PolicyError, ScorePolicy, TIER_COLLATERAL_BPS};
pub use scoring::{
    AdminCapability, EngineError, EngineResult, InvalidProofReason, LoanEvent, ScoreUpdate,
    ScoreWarning, ScoringEngine,
};
pub use zk_prover::{GeneratedProof, ProofBackend, ProofRequest, ProverError, ZKProver};

#[cfg(test)]
pub(crate) use zk_prover::mock;
