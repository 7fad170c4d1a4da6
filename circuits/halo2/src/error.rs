//! Error types for the credit attestation circuits
//!
//! Provides structured error handling for native pre-validation and circuit operations.

use std::fmt;

/// Error types for circuit operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// Value does not fit the fixed bit width of the circuits (RangeError)
    ValueOutOfRange {
        value: u128,
        max: u128,
        field: String,
    },

    /// A loan sub-count exceeds the total it is drawn from
    LoanBoundExceeded {
        field: String,
        value: u32,
        total: u32,
    },

    /// Invalid circuit configuration
    InvalidConfiguration {
        message: String,
    },
}

impl fmt::Display for CircuitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitError::ValueOutOfRange { value, max, field } => {
                write!(f, "{} value {} exceeds maximum {}", field, value, max)
            }
            CircuitError::LoanBoundExceeded { field, value, total } => {
                write!(
                    f,
                    "{} ({}) exceeds total loans ({})",
                    field, value, total
                )
            }
            CircuitError::InvalidConfiguration { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for CircuitError {}

/// Result type for circuit operations
pub type CircuitResult<T> = Result<T, CircuitError>;

/// Input validation utilities
///
/// Everything here runs before witness assignment. A request rejected here
/// would only have produced an unsatisfiable circuit.
pub mod validation {
    use super::*;
    use crate::predicate::{PrivateFact, PERCENT_SCALE};

    /// Maximum value of a private fact or public threshold (32-bit circuits)
    pub const MAX_FACT: u64 = u32::MAX as u64;

    /// Validate that a value fits the 32-bit fact width
    pub fn validate_range(value: u64, field: &str) -> CircuitResult<u32> {
        u32::try_from(value).map_err(|_| CircuitError::ValueOutOfRange {
            value: value as u128,
            max: MAX_FACT as u128,
            field: field.to_string(),
        })
    }

    /// Validate a percentage threshold (0-100)
    pub fn validate_percentage(rate: u32, field: &str) -> CircuitResult<()> {
        if rate as u64 > PERCENT_SCALE {
            return Err(CircuitError::ValueOutOfRange {
                value: rate as u128,
                max: PERCENT_SCALE as u128,
                field: field.to_string(),
            });
        }
        Ok(())
    }

    /// Validate that a loan sub-count does not exceed the total
    pub fn validate_loan_bound(value: u32, total: u32, field: &str) -> CircuitResult<()> {
        if value > total {
            return Err(CircuitError::LoanBoundExceeded {
                field: field.to_string(),
                value,
                total,
            });
        }
        Ok(())
    }

    /// Validate a private fact together with the public threshold it is proved against
    pub fn validate_fact(fact: &PrivateFact, threshold: u32) -> CircuitResult<()> {
        match *fact {
            PrivateFact::WalletAge { .. } => Ok(()),
            PrivateFact::Repayment {
                total_loans,
                repaid_loans,
            } => {
                validate_percentage(threshold, "min_repayment_rate")?;
                validate_loan_bound(repaid_loans, total_loans, "repaid_loans")
            }
            PrivateFact::DefaultRatio {
                total_loans,
                defaulted_loans,
            } => {
                validate_percentage(threshold, "max_default_rate")?;
                validate_loan_bound(defaulted_loans, total_loans, "defaulted_loans")
            }
        }
    }
}
