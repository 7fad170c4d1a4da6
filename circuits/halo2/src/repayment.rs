//! Repayment Circuit
//!
//! Proves whether the repayment rate meets a minimum:
//! `(repaid_loans / total_loans) >= min_repayment_rate`
//!
//! Rearranged for integer arithmetic (avoids division in finite fields):
//! `repaid_loans * 100 >= total_loans * min_repayment_rate`
//!
//! # Public Inputs
//! - `min_repayment_rate`: Percentage in [0, 100]
//! - `subject`: Tag of the address the proof is bound to
//! - `valid`: 1 if the predicate holds, 0 otherwise
//!
//! # Private Inputs
//! - `total_loans`, `repaid_loans` with `repaid_loans <= total_loans`
//!
//! A history violating the loan bound cannot be proved at all, true or false.
//! With `total_loans = 0` the predicate is trivially true; the scoring engine
//! treats that case as degenerate.

use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    plonk::{Circuit, ConstraintSystem, Error},
};
use pasta_curves::Fp;

use crate::error::{CircuitError, CircuitResult};
use crate::gadgets::{ComparisonInstruction, PredicateConfig};
use crate::predicate::{PredicateCircuit, PredicateKind, PrivateFact};

/// Repayment Proof Circuit
#[derive(Clone, Debug)]
pub struct RepaymentCircuit {
    pub total_loans: Value<Fp>,
    pub repaid_loans: Value<Fp>,
    pub min_repayment_rate: Value<Fp>,
    pub subject: Value<Fp>,
}

impl Default for RepaymentCircuit {
    fn default() -> Self {
        Self {
            total_loans: Value::unknown(),
            repaid_loans: Value::unknown(),
            min_repayment_rate: Value::unknown(),
            subject: Value::unknown(),
        }
    }
}

impl RepaymentCircuit {
    pub fn new(total_loans: u32, repaid_loans: u32, min_repayment_rate: u32, subject: Fp) -> Self {
        Self {
            total_loans: Value::known(Fp::from(total_loans as u64)),
            repaid_loans: Value::known(Fp::from(repaid_loans as u64)),
            min_repayment_rate: Value::known(Fp::from(min_repayment_rate as u64)),
            subject: Value::known(subject),
        }
    }
}

impl Circuit<Fp> for RepaymentCircuit {
    type Config = PredicateConfig<Fp>;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::default()
    }

    fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
        PredicateConfig::configure(meta)
    }

    fn synthesize(&self, config: Self::Config, mut layouter: impl Layouter<Fp>) -> Result<(), Error> {
        config.load(layouter.namespace(|| "load table"))?;
        let comparison = config.comparison_chip();

        let rate = config.assign_public(
            layouter.namespace(|| "public inputs"),
            self.min_repayment_rate,
            self.subject,
        )?;
        let [total, repaid] = config.assign_facts(
            layouter.namespace(|| "private facts"),
            [("total_loans", self.total_loans), ("repaid_loans", self.repaid_loans)],
        )?;

        // repaid_loans <= total_loans
        comparison.enforce_gte(
            layouter.namespace(|| "loan bound"),
            total.clone(),
            repaid.clone(),
        )?;

        let (repaid_scaled, total_scaled) =
            config.scale_loans(layouter.namespace(|| "scaling"), &total, &repaid, &rate)?;

        let valid = comparison.gte(
            layouter.namespace(|| "repaid * 100 >= total * rate"),
            repaid_scaled,
            total_scaled,
        )?;

        config.expose_valid(layouter.namespace(|| "valid"), valid)
    }
}

impl PredicateCircuit for RepaymentCircuit {
    const KIND: PredicateKind = PredicateKind::Repayment;

    fn blank() -> Self {
        Self::default()
    }

    fn from_fact(fact: &PrivateFact, threshold: u32, subject: Fp) -> CircuitResult<Self> {
        match *fact {
            PrivateFact::Repayment {
                total_loans,
                repaid_loans,
            } => Ok(Self::new(total_loans, repaid_loans, threshold, subject)),
            _ => Err(CircuitError::InvalidConfiguration {
                message: format!("expected repayment fact, got {}", fact.kind()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::instance;
    use crate::CIRCUIT_K;
    use halo2_proofs::dev::MockProver;

    const SUBJECT: u64 = 0x5eed;

    fn verify(total: u32, repaid: u32, rate: u32, claimed: bool) -> bool {
        let subject = Fp::from(SUBJECT);
        let circuit = RepaymentCircuit::new(total, repaid, rate, subject);
        let prover =
            MockProver::run(CIRCUIT_K, &circuit, vec![instance(rate, subject, claimed)]).unwrap();
        prover.verify().is_ok()
    }

    #[test]
    fn test_repayment_at_minimum() {
        // 8 * 100 = 800 >= 10 * 80 = 800
        assert!(verify(10, 8, 80, true));
        assert!(!verify(10, 8, 80, false));
    }

    #[test]
    fn test_repayment_below_minimum() {
        // 700 < 800
        assert!(verify(10, 7, 80, false));
        assert!(!verify(10, 7, 80, true));
    }

    #[test]
    fn test_repayment_full_history() {
        assert!(verify(25, 25, 100, true));
        assert!(verify(25, 24, 100, false));
    }

    #[test]
    fn test_repayment_zero_loans() {
        // 0 >= 0: trivially true
        assert!(verify(0, 0, 80, true));
    }

    #[test]
    fn test_repayment_exceeds_total_unprovable() {
        // No claimed value satisfies the loan bound
        assert!(!verify(5, 6, 80, true));
        assert!(!verify(5, 6, 80, false));
    }

    #[test]
    fn test_repayment_large_history() {
        // Products exceed 32 bits
        assert!(verify(u32::MAX, u32::MAX, 100, true));
        assert!(verify(u32::MAX, u32::MAX - 1, 100, false));
    }

    #[test]
    fn test_repayment_prepare_rejects_bound_violation() {
        let fact = PrivateFact::Repayment {
            total_loans: 3,
            repaid_loans: 4,
        };
        assert!(matches!(
            RepaymentCircuit::prepare(&fact, 80, Fp::from(SUBJECT)),
            Err(CircuitError::LoanBoundExceeded { .. })
        ));
    }
}
