//! WalletAge Circuit
//!
//! Proves whether a wallet is at least `threshold` days old:
//! `wallet_age_days >= threshold`
//!
//! # Public Inputs
//! - `threshold`: Minimum age in days
//! - `subject`: Tag of the address the proof is bound to
//! - `valid`: 1 if the predicate holds, 0 otherwise
//!
//! # Private Inputs
//! - `wallet_age_days`: Days since the wallet's first activity
//!
//! # Example
//! - wallet_age_days: 90, threshold: 90 → valid = 1
//! - wallet_age_days: 89, threshold: 90 → valid = 0

use halo2_proofs::{
    circuit::{Layouter, SimpleFloorPlanner, Value},
    plonk::{Circuit, ConstraintSystem, Error},
};
use pasta_curves::Fp;

use crate::error::CircuitResult;
use crate::gadgets::{ComparisonInstruction, PredicateConfig};
use crate::predicate::{PredicateCircuit, PredicateKind, PrivateFact};

/// WalletAge Proof Circuit
#[derive(Clone, Debug)]
pub struct WalletAgeCircuit {
    pub wallet_age_days: Value<Fp>,
    pub threshold: Value<Fp>,
    pub subject: Value<Fp>,
}

impl Default for WalletAgeCircuit {
    fn default() -> Self {
        Self {
            wallet_age_days: Value::unknown(),
            threshold: Value::unknown(),
            subject: Value::unknown(),
        }
    }
}

impl WalletAgeCircuit {
    pub fn new(wallet_age_days: u32, threshold: u32, subject: Fp) -> Self {
        Self {
            wallet_age_days: Value::known(Fp::from(wallet_age_days as u64)),
            threshold: Value::known(Fp::from(threshold as u64)),
            subject: Value::known(subject),
        }
    }
}

impl Circuit<Fp> for WalletAgeCircuit {
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

        let threshold = config.assign_public(
            layouter.namespace(|| "public inputs"),
            self.threshold,
            self.subject,
        )?;
        let [age] = config.assign_facts(
            layouter.namespace(|| "private facts"),
            [("wallet_age_days", self.wallet_age_days)],
        )?;

        let valid = config
            .comparison_chip()
            .gte(layouter.namespace(|| "age >= threshold"), age, threshold)?;

        config.expose_valid(layouter.namespace(|| "valid"), valid)
    }
}

impl PredicateCircuit for WalletAgeCircuit {
    const KIND: PredicateKind = PredicateKind::WalletAge;

    fn blank() -> Self {
        Self::default()
    }

    fn from_fact(fact: &PrivateFact, threshold: u32, subject: Fp) -> CircuitResult<Self> {
        match *fact {
            PrivateFact::WalletAge { wallet_age_days } => {
                Ok(Self::new(wallet_age_days, threshold, subject))
            }
            _ => Err(crate::CircuitError::InvalidConfiguration {
                message: format!("expected wallet_age fact, got {}", fact.kind()),
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

    fn verify(age: u32, threshold: u32, claimed: bool) -> bool {
        let subject = Fp::from(0xabcdu64);
        let circuit = WalletAgeCircuit::new(age, threshold, subject);
        let prover = MockProver::run(CIRCUIT_K, &circuit, vec![instance(threshold, subject, claimed)])
            .unwrap();
        prover.verify().is_ok()
    }

    #[test]
    fn test_wallet_age_at_threshold() {
        assert!(verify(90, 90, true), "90 days should satisfy 90");
        assert!(!verify(90, 90, false), "Cannot claim false for a true predicate");
    }

    #[test]
    fn test_wallet_age_below_threshold() {
        assert!(verify(89, 90, false), "89 days is a valid proof of false");
        assert!(!verify(89, 90, true), "89 days cannot claim 90");
    }

    #[test]
    fn test_wallet_age_extremes() {
        assert!(verify(u32::MAX, 0, true));
        assert!(verify(0, u32::MAX, false));
        assert!(verify(0, 0, true));
    }

    #[test]
    fn test_wallet_age_subject_binding() {
        let circuit = WalletAgeCircuit::new(400, 365, Fp::from(1u64));
        let wrong_subject = instance(365, Fp::from(2u64), true);
        let prover = MockProver::run(CIRCUIT_K, &circuit, vec![wrong_subject]).unwrap();
        assert!(prover.verify().is_err(), "Instance subject must match the witness");
    }

    #[test]
    fn test_wallet_age_prepare() {
        let fact = PrivateFact::WalletAge { wallet_age_days: 120 };
        let (circuit, public_inputs) =
            WalletAgeCircuit::prepare(&fact, 90, Fp::from(5u64)).unwrap();
        assert_eq!(public_inputs, instance(90, Fp::from(5u64), true));

        let prover = MockProver::run(CIRCUIT_K, &circuit, vec![public_inputs]).unwrap();
        assert_eq!(prover.verify(), Ok(()));

        let wrong = PrivateFact::Repayment {
            total_loans: 1,
            repaid_loans: 1,
        };
        assert!(WalletAgeCircuit::prepare(&wrong, 90, Fp::from(5u64)).is_err());
    }
}
