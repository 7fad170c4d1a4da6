//! Scoring policy
//!
//! Score deltas, tier breakpoints and the thresholds a proof must have been
//! generated against to count. Everything here is configuration; the engine
//! in [`super::scoring`] applies it.

use serde::Serialize;
use thiserror::Error;

use zk_credit_circuits::PredicateKind;

pub const MAX_SCORE: u32 = 1000;

/// Collateral ratio per tier, in basis points; never increases with the tier
pub const TIER_COLLATERAL_BPS: [u32; 4] = [15000, 13500, 12500, 11000];

pub const BPS_DENOMINATOR: u32 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("tier breakpoints must be strictly ascending")]
    BreakpointsNotAscending,

    #[error("tier breakpoint {0} exceeds the maximum score")]
    BreakpointOutOfRange(u32),

    #[error("{name} must be a percentage, got {value}")]
    RateOutOfRange { name: &'static str, value: u32 },

    #[error("initial score {0} exceeds the maximum score")]
    InitialScoreOutOfRange(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScorePolicy {
    pub wallet_age_delta: i32,
    pub repayment_delta: i32,
    pub default_ratio_delta: i32,
    pub initial_score: u32,
    /// Lowest score of tiers 1, 2 and 3
    pub tier_breakpoints: [u32; 3],
    /// Loan-history proofs are ignored below this many recorded loans
    pub min_loans_for_credit: u32,
    pub min_wallet_age_days: u32,
    pub min_repayment_rate: u32,
    pub max_default_rate: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            wallet_age_delta: 25,
            repayment_delta: 50,
            default_ratio_delta: 25,
            initial_score: 0,
            tier_breakpoints: [250, 500, 750],
            min_loans_for_credit: 1,
            min_wallet_age_days: 90,
            min_repayment_rate: 80,
            max_default_rate: 20,
        }
    }
}

impl ScorePolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.initial_score > MAX_SCORE {
            return Err(PolicyError::InitialScoreOutOfRange(self.initial_score));
        }
        if self.tier_breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PolicyError::BreakpointsNotAscending);
        }
        if let Some(&b) = self.tier_breakpoints.iter().find(|&&b| b > MAX_SCORE) {
            return Err(PolicyError::BreakpointOutOfRange(b));
        }
        for (name, value) in [
            ("min_repayment_rate", self.min_repayment_rate),
            ("max_default_rate", self.max_default_rate),
        ] {
            if value > 100 {
                return Err(PolicyError::RateOutOfRange { name, value });
            }
        }
        Ok(())
    }

    pub fn delta(&self, kind: PredicateKind) -> i32 {
        match kind {
            PredicateKind::WalletAge => self.wallet_age_delta,
            PredicateKind::Repayment => self.repayment_delta,
            PredicateKind::DefaultRatio => self.default_ratio_delta,
        }
    }

    /// Step function over the breakpoints
    pub fn tier_of(&self, score: u32) -> u8 {
        self.tier_breakpoints.iter().filter(|&&b| score >= b).count() as u8
    }

    /// A proof counts only if it was generated against a threshold at
    /// least as strict as the policy's
    pub fn meets_threshold(&self, kind: PredicateKind, threshold: u32) -> bool {
        match kind {
            PredicateKind::WalletAge => threshold >= self.min_wallet_age_days,
            PredicateKind::Repayment => threshold >= self.min_repayment_rate,
            PredicateKind::DefaultRatio => threshold <= self.max_default_rate,
        }
    }

    /// `score + delta`, clamped to [0, MAX_SCORE]
    pub fn apply(&self, score: u32, kind: PredicateKind) -> u32 {
        (score as i64 + self.delta(kind) as i64).clamp(0, MAX_SCORE as i64) as u32
    }
}

/// Collateral needed to borrow `amount` at a given tier
///
/// Kept as the exact product `amount * ratio_bps`; render it with
/// [`to_decimal_string`](Self::to_decimal_string) or round up with
/// [`ceil`](Self::ceil).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollateralRequirement {
    pub tier: u8,
    pub amount: u64,
    pub ratio_bps: u32,
    /// `amount * ratio_bps`, in units of 1/10000
    pub scaled: u128,
}

impl CollateralRequirement {
    pub fn for_amount(tier: u8, amount: u64) -> Option<Self> {
        let ratio_bps = *TIER_COLLATERAL_BPS.get(tier as usize)?;
        Some(Self {
            tier,
            amount,
            ratio_bps,
            scaled: amount as u128 * ratio_bps as u128,
        })
    }

    /// Exact decimal with at least one fractional digit ("15.0", "13.5")
    pub fn to_decimal_string(&self) -> String {
        let denominator = BPS_DENOMINATOR as u128;
        let whole = self.scaled / denominator;
        let frac = format!("{:04}", self.scaled % denominator);
        let frac = frac.trim_end_matches('0');
        format!("{}.{}", whole, if frac.is_empty() { "0" } else { frac })
    }

    /// Smallest whole amount that covers the requirement
    pub fn ceil(&self) -> u128 {
        self.scaled.div_ceil(BPS_DENOMINATOR as u128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_valid() {
        assert_eq!(ScorePolicy::default().validate(), Ok(()));
    }

    #[test]
    fn test_tier_boundaries() {
        let policy = ScorePolicy::default();
        assert_eq!(policy.tier_of(0), 0);
        assert_eq!(policy.tier_of(249), 0);
        assert_eq!(policy.tier_of(250), 1);
        assert_eq!(policy.tier_of(499), 1);
        assert_eq!(policy.tier_of(500), 2);
        assert_eq!(policy.tier_of(749), 2);
        assert_eq!(policy.tier_of(750), 3);
        assert_eq!(policy.tier_of(MAX_SCORE), 3);
    }

    #[test]
    fn test_tier_table_is_monotonic() {
        assert!(TIER_COLLATERAL_BPS.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_apply_clamps() {
        let mut policy = ScorePolicy::default();
        assert_eq!(policy.apply(990, PredicateKind::Repayment), MAX_SCORE);

        policy.default_ratio_delta = -40;
        assert_eq!(policy.apply(10, PredicateKind::DefaultRatio), 0);
    }

    #[test]
    fn test_threshold_policy_direction() {
        let policy = ScorePolicy::default();
        assert!(policy.meets_threshold(PredicateKind::WalletAge, 90));
        assert!(policy.meets_threshold(PredicateKind::WalletAge, 365));
        assert!(!policy.meets_threshold(PredicateKind::WalletAge, 89));

        assert!(policy.meets_threshold(PredicateKind::Repayment, 95));
        assert!(!policy.meets_threshold(PredicateKind::Repayment, 79));

        // A lower maximum default rate is stricter
        assert!(policy.meets_threshold(PredicateKind::DefaultRatio, 5));
        assert!(!policy.meets_threshold(PredicateKind::DefaultRatio, 21));
    }

    #[test]
    fn test_invalid_policies() {
        let mut policy = ScorePolicy::default();
        policy.tier_breakpoints = [500, 250, 750];
        assert_eq!(policy.validate(), Err(PolicyError::BreakpointsNotAscending));

        let mut policy = ScorePolicy::default();
        policy.tier_breakpoints = [250, 500, 1001];
        assert_eq!(policy.validate(), Err(PolicyError::BreakpointOutOfRange(1001)));

        let mut policy = ScorePolicy::default();
        policy.max_default_rate = 101;
        assert!(matches!(
            policy.validate(),
            Err(PolicyError::RateOutOfRange { name: "max_default_rate", .. })
        ));

        let mut policy = ScorePolicy::default();
        policy.initial_score = 2000;
        assert_eq!(policy.validate(), Err(PolicyError::InitialScoreOutOfRange(2000)));
    }

    #[test]
    fn test_collateral_exact_decimals() {
        let rendered: Vec<String> = (0..4)
            .map(|tier| {
                CollateralRequirement::for_amount(tier, 10)
                    .unwrap()
                    .to_decimal_string()
            })
            .collect();
        assert_eq!(rendered, ["15.0", "13.5", "12.5", "11.0"]);
    }

    #[test]
    fn test_collateral_rounds_up() {
        let req = CollateralRequirement::for_amount(1, 3).unwrap();
        assert_eq!(req.to_decimal_string(), "4.05");
        assert_eq!(req.ceil(), 5);

        let exact = CollateralRequirement::for_amount(0, 100).unwrap();
        assert_eq!(exact.ceil(), 150);

        let huge = CollateralRequirement::for_amount(0, u64::MAX).unwrap();
        assert_eq!(huge.scaled, u64::MAX as u128 * 15000);
    }

    #[test]
    fn test_unknown_tier() {
        assert!(CollateralRequirement::for_amount(4, 10).is_none());
    }
}
