//! arkworks R1CS Implementation
//!
//! The credit predicates as R1CS circuits proved with Groth16 over BN254,
//! the EVM-verifiable counterpart of the Halo2 circuits.
//!
//! # Key Differences from Halo2
//! - R1CS: Rank-1 Constraint System (a·b = c gates only)
//! - Range check: Bit decomposition instead of a lookup table
//! - Proving system: Groth16 (per-circuit trusted setup)
//!
//! # Available Circuits
//!
//! | Circuit | Predicate |
//! |---------|-----------|
//! | WalletAgeCircuit | age >= threshold |
//! | RepaymentCircuit | repaid * 100 >= total * min_rate |
//! | DefaultRatioCircuit | defaulted * 100 <= total * max_rate |
//!
//! All three take public inputs `[threshold_or_rate, subject, valid]`.

pub mod default_ratio;
pub mod gadgets;
pub mod repayment;
pub mod snark;
pub mod wallet_age;

pub use default_ratio::DefaultRatioCircuit;
pub use repayment::RepaymentCircuit;
pub use snark::{EvmProof, Keys};
pub use wallet_age::WalletAgeCircuit;

/// Width of every private fact and public threshold
pub const FACT_BITS: usize = 32;

/// Width of cross-multiplied products
pub const PRODUCT_BITS: usize = 64;

/// Percentages are expressed in whole points
pub const PERCENT_SCALE: u64 = 100;
