//! DefaultRatio Circuit
//!
//! Proves whether the default rate stays under a maximum:
//! `(defaulted_loans / total_loans) <= max_default_rate`
//!
//! Rearranged for integer arithmetic:
//! `defaulted_loans * 100 <= total_loans * max_default_rate`
//!
//! # Public Inputs
//! - `max_default_rate`: Percentage in [0, 100]
//! - `subject`: Tag of the address the proof is bound to
//! - `valid`: 1 if the predicate holds, 0 otherwise
//!
//! # Private Inputs
//! - `total_loans`, `defaulted_loans` with `defaulted_loans <= total_loans`

use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    plonk::{Circuit, ConstraintSystem, Error},
};
use pasta_curves::Fp;

use crate::error::{CircuitError, CircuitResult};
use crate::gadgets::{ComparisonInstruction, PredicateConfig};
use crate::predicate::{PredicateCircuit, PredicateKind, PrivateFact};

/// DefaultRatio Proof Circuit
#[derive(Clone, Debug)]
pub struct DefaultRatioCircuit {
    pub total_loans: Value<Fp>,
    pub defaulted_loans: Value<Fp>,
    pub max_default_rate: Value<Fp>,
    pub subject: Value<Fp>,
}

impl Default for DefaultRatioCircuit {
    fn default() -> Self {
        Self {
            total_loans: Value::unknown(),
            defaulted_loans: Value::unknown(),
            max_default_rate: Value::unknown(),
            subject: Value::unknown(),
        }
    }
}

impl DefaultRatioCircuit {
    pub fn new(total_loans: u32, defaulted_loans: u32, max_default_rate: u32, subject: Fp) -> Self {
        Self {
            total_loans: Value::known(Fp::from(total_loans as u64)),
            defaulted_loans: Value::known(Fp::from(defaulted_loans as u64)),
            max_default_rate: Value::known(Fp::from(max_default_rate as u64)),
            subject: Value::known(subject),
        }
    }
}

impl Circuit<Fp> for DefaultRatioCircuit {
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
            self.max_default_rate,
            self.subject,
        )?;
        let [total, defaulted] = config.assign_facts(
            layouter.namespace(|| "private facts"),
            [
                ("total_loans", self.total_loans),
                ("defaulted_loans", self.defaulted_loans),
            ],
        )?;

        comparison.enforce_gte(
            layouter.namespace(|| "loan bound"),
            total.clone(),
            defaulted.clone(),
        )?;

        let (defaulted_scaled, total_scaled) =
            config.scale_loans(layouter.namespace(|| "scaling"), &total, &defaulted, &rate)?;

        let valid = comparison.lte(
            layouter.namespace(|| "defaulted * 100 <= total * rate"),
            defaulted_scaled,
            total_scaled,
        )?;

        config.expose_valid(layouter.namespace(|| "valid"), valid)
    }
}

impl PredicateCircuit for DefaultRatioCircuit {
    const KIND: PredicateKind = PredicateKind::DefaultRatio;

    fn blank() -> Self {
        Self::default()
    }

    fn from_fact(fact: &PrivateFact, threshold: u32, subject: Fp) -> CircuitResult<Self> {
        match *fact {
            PrivateFact::DefaultRatio {
                total_loans,
                defaulted_loans,
            } => Ok(Self::new(total_loans, defaulted_loans, threshold, subject)),
            _ => Err(CircuitError::InvalidConfiguration {
                message: format!("expected default_ratio fact, got {}", fact.kind()),
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

    fn verify(total: u32, defaulted: u32, rate: u32, claimed: bool) -> bool {
        let subject = Fp::from(77u64);
        let circuit = DefaultRatioCircuit::new(total, defaulted, rate, subject);
        let prover =
            MockProver::run(CIRCUIT_K, &circuit, vec![instance(rate, subject, claimed)]).unwrap();
        prover.verify().is_ok()
    }

    #[test]
    fn test_default_ratio_under_max() {
        // 300 <= 400
        assert!(verify(20, 3, 20, true));
        assert!(!verify(20, 3, 20, false));
    }

    #[test]
    fn test_default_ratio_over_max() {
        // 500 > 400
        assert!(verify(20, 5, 20, false));
        assert!(!verify(20, 5, 20, true));
    }

    #[test]
    fn test_default_ratio_at_max() {
        // 400 <= 400
        assert!(verify(20, 4, 20, true));
    }

    #[test]
    fn test_default_ratio_zero_tolerance() {
        assert!(verify(10, 0, 0, true));
        assert!(verify(10, 1, 0, false));
    }

    #[test]
    fn test_default_ratio_exceeds_total_unprovable() {
        assert!(!verify(2, 3, 20, true));
        assert!(!verify(2, 3, 20, false));
    }
}
