//! Comparison Gadget with a Boolean Output
//!
//! Computes `out = (a >= b)` as a constrained bit, so a predicate can be
//! proved true *or* false without revealing the witnesses.
//!
//! # Strategy
//! ```text
//! out * (1 - out) = 0
//! diff = out * (a - b) + (1 - out) * (b - a - 1)
//! diff in [0, 2^BITS)
//! ```
//! - `out = 1` forces `a - b` to be small, i.e. `a >= b`
//! - `out = 0` forces `b - a - 1` to be small, i.e. `a < b`
//!
//! A wrong `out` makes `diff` wrap to roughly `p - 2^BITS`, which fails
//! the range check.
//!
//! # Important Constraint
//! Both a and b MUST already be in range [0, 2^BITS). Callers range-check
//! the operands (or derive them from range-checked values) first.
//!
//! # Example
//! ```ignore
//! let valid = comparison_chip.gte(layouter, repaid_scaled, total_scaled)?;
//! ```

use ff::PrimeField;
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Value},
    plonk::{Advice, Column, ConstraintSystem, Error, Expression, Selector},
    poly::Rotation,
};
use std::marker::PhantomData;

use super::range_check::{RangeCheckChip, RangeCheckConfig, RangeCheckInstruction};
use super::to_u128;

/// Configuration for comparison chip
#[derive(Debug, Clone)]
pub struct ComparisonConfig<F: PrimeField, const BITS: usize, const LIMB_BITS: usize> {
    /// Advice column for operand a
    pub a: Column<Advice>,
    /// Advice column for operand b
    pub b: Column<Advice>,
    /// Advice column for the boolean result
    pub out: Column<Advice>,
    /// Advice column for the witnessed difference
    pub diff: Column<Advice>,
    /// Selector for the comparison gate
    pub q_cmp: Selector,
    /// Range check config for validating difference
    pub range_check: RangeCheckConfig<F, LIMB_BITS>,
    _marker: PhantomData<F>,
}

/// Instructions for comparison operations
pub trait ComparisonInstruction<F: PrimeField> {
    /// Returns a constrained bit equal to (a >= b)
    fn gte(
        &self,
        layouter: impl Layouter<F>,
        a: AssignedCell<F, F>,
        b: AssignedCell<F, F>,
    ) -> Result<AssignedCell<F, F>, Error>;

    /// Returns a constrained bit equal to (a <= b)
    fn lte(
        &self,
        layouter: impl Layouter<F>,
        a: AssignedCell<F, F>,
        b: AssignedCell<F, F>,
    ) -> Result<AssignedCell<F, F>, Error> {
        self.gte(layouter, b, a)
    }

    /// Hard constraint a >= b; the circuit is unsatisfiable otherwise
    fn enforce_gte(
        &self,
        layouter: impl Layouter<F>,
        a: AssignedCell<F, F>,
        b: AssignedCell<F, F>,
    ) -> Result<(), Error>;
}

/// Comparison chip producing boolean results
#[derive(Debug, Clone)]
pub struct ComparisonChip<F: PrimeField, const BITS: usize, const LIMB_BITS: usize> {
    config: ComparisonConfig<F, BITS, LIMB_BITS>,
}

impl<F: PrimeField, const BITS: usize, const LIMB_BITS: usize> ComparisonChip<F, BITS, LIMB_BITS> {
    /// Create a new comparison chip
    pub fn construct(config: ComparisonConfig<F, BITS, LIMB_BITS>) -> Self {
        Self { config }
    }

    /// Configure the comparison chip
    ///
    /// `out` must accept constants (equality enabled) for `enforce_gte`.
    pub fn configure(
        meta: &mut ConstraintSystem<F>,
        a: Column<Advice>,
        b: Column<Advice>,
        out: Column<Advice>,
        diff: Column<Advice>,
        range_check: RangeCheckConfig<F, LIMB_BITS>,
    ) -> ComparisonConfig<F, BITS, LIMB_BITS> {
        let q_cmp = meta.selector();

        for column in [a, b, out, diff] {
            meta.enable_equality(column);
        }

        meta.create_gate("comparison", |meta| {
            let q = meta.query_selector(q_cmp);
            let a = meta.query_advice(a, Rotation::cur());
            let b = meta.query_advice(b, Rotation::cur());
            let out = meta.query_advice(out, Rotation::cur());
            let diff = meta.query_advice(diff, Rotation::cur());
            let one = Expression::Constant(F::ONE);

            let boolean = out.clone() * (one.clone() - out.clone());
            let expected = out.clone() * (a.clone() - b.clone())
                + (one.clone() - out) * (b - a - one);

            vec![q.clone() * boolean, q * (diff - expected)]
        });

        ComparisonConfig {
            a,
            b,
            out,
            diff,
            q_cmp,
            range_check,
            _marker: PhantomData,
        }
    }

    /// Load the range check lookup table
    pub fn load_table(&self, layouter: impl Layouter<F>) -> Result<(), Error> {
        let range_chip = RangeCheckChip::<F, LIMB_BITS>::construct(self.config.range_check.clone());
        range_chip.load_table(layouter)
    }

    /// Shared region for all comparison forms
    ///
    /// With `forced` set, `out` is a fixed constant 1 instead of a witness.
    fn compare(
        &self,
        mut layouter: impl Layouter<F>,
        a: AssignedCell<F, F>,
        b: AssignedCell<F, F>,
        forced: bool,
    ) -> Result<AssignedCell<F, F>, Error> {
        let (out_cell, diff_cell) = layouter.assign_region(
            || "comparison: a >= b",
            |mut region| {
                self.config.q_cmp.enable(&mut region, 0)?;

                a.copy_advice(|| "a", &mut region, self.config.a, 0)?;
                b.copy_advice(|| "b", &mut region, self.config.b, 0)?;

                let witness = a.value().zip(b.value()).map(|(a, b)| {
                    let ge = forced
                        || match (to_u128(a), to_u128(b)) {
                            (Some(a), Some(b)) => a >= b,
                            // Out-of-range operands fail the diff check either way
                            _ => true,
                        };
                    let diff = if ge { *a - *b } else { *b - *a - F::ONE };
                    (ge, diff)
                });

                let out = if forced {
                    region.assign_advice_from_constant(|| "out", self.config.out, 0, F::ONE)?
                } else {
                    let bit: Value<F> = witness.map(|(ge, _)| if ge { F::ONE } else { F::ZERO });
                    region.assign_advice(|| "out", self.config.out, 0, || bit)?
                };

                let diff = region.assign_advice(
                    || "diff",
                    self.config.diff,
                    0,
                    || witness.map(|(_, diff)| diff),
                )?;

                Ok((out, diff))
            },
        )?;

        let range_chip = RangeCheckChip::<F, LIMB_BITS>::construct(self.config.range_check.clone());
        range_chip.check(layouter.namespace(|| "range check diff"), diff_cell, BITS)?;

        Ok(out_cell)
    }
}

impl<F: PrimeField, const BITS: usize, const LIMB_BITS: usize> ComparisonInstruction<F>
    for ComparisonChip<F, BITS, LIMB_BITS>
{
    fn gte(
        &self,
        layouter: impl Layouter<F>,
        a: AssignedCell<F, F>,
        b: AssignedCell<F, F>,
    ) -> Result<AssignedCell<F, F>, Error> {
        self.compare(layouter, a, b, false)
    }

    fn enforce_gte(
        &self,
        layouter: impl Layouter<F>,
        a: AssignedCell<F, F>,
        b: AssignedCell<F, F>,
    ) -> Result<(), Error> {
        self.compare(layouter, a, b, true).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gadgets::range_check::RangeCheckChip;
    use halo2_proofs::{
        circuit::SimpleFloorPlanner,
        dev::MockProver,
        plonk::{Circuit, Instance},
    };
    use pasta_curves::Fp;

    const BITS: usize = 16;
    const LIMB: usize = 8;

    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Gte,
        Lte,
        Enforce,
    }

    #[derive(Clone, Debug)]
    struct TestConfig {
        cmp: ComparisonConfig<Fp, BITS, LIMB>,
        instance: Column<Instance>,
    }

    #[derive(Clone)]
    struct ComparisonTestCircuit {
        a: Value<Fp>,
        b: Value<Fp>,
        mode: Mode,
    }

    impl Circuit<Fp> for ComparisonTestCircuit {
        type Config = TestConfig;
        type FloorPlanner = SimpleFloorPlanner;

        fn without_witnesses(&self) -> Self {
            Self {
                a: Value::unknown(),
                b: Value::unknown(),
                mode: self.mode,
            }
        }

        fn configure(meta: &mut ConstraintSystem<Fp>) -> Self::Config {
            let a = meta.advice_column();
            let b = meta.advice_column();
            let out = meta.advice_column();
            let diff = meta.advice_column();
            let running_sum = meta.advice_column();
            let constants = meta.fixed_column();
            let instance = meta.instance_column();
            meta.enable_equality(instance);

            let range_check = RangeCheckChip::<Fp, LIMB>::configure(meta, running_sum, constants);
            let cmp = ComparisonChip::<Fp, BITS, LIMB>::configure(meta, a, b, out, diff, range_check);

            TestConfig { cmp, instance }
        }

        fn synthesize(
            &self,
            config: Self::Config,
            mut layouter: impl Layouter<Fp>,
        ) -> Result<(), Error> {
            let chip = ComparisonChip::<Fp, BITS, LIMB>::construct(config.cmp.clone());
            chip.load_table(layouter.namespace(|| "load table"))?;

            let (a_cell, b_cell) = layouter.assign_region(
                || "assign inputs",
                |mut region| {
                    let a = region.assign_advice(|| "a", config.cmp.a, 0, || self.a)?;
                    let b = region.assign_advice(|| "b", config.cmp.b, 0, || self.b)?;
                    Ok((a, b))
                },
            )?;

            match self.mode {
                Mode::Gte | Mode::Lte => {
                    let out = if self.mode == Mode::Gte {
                        chip.gte(layouter.namespace(|| "a >= b"), a_cell, b_cell)?
                    } else {
                        chip.lte(layouter.namespace(|| "a <= b"), a_cell, b_cell)?
                    };
                    layouter.constrain_instance(out.cell(), config.instance, 0)
                }
                Mode::Enforce => chip.enforce_gte(layouter.namespace(|| "a >= b"), a_cell, b_cell),
            }
        }
    }

    fn run(a: u64, b: u64, mode: Mode, expected: Option<bool>) -> bool {
        let circuit = ComparisonTestCircuit {
            a: Value::known(Fp::from(a)),
            b: Value::known(Fp::from(b)),
            mode,
        };
        let instance = match expected {
            Some(bit) => vec![vec![Fp::from(bit as u64)]],
            None => vec![vec![]],
        };
        MockProver::run(10, &circuit, instance)
            .unwrap()
            .verify()
            .is_ok()
    }

    #[test]
    fn test_gte_outputs_bit() {
        let cases = [
            (100u64, 50u64, true),
            (100, 100, true),
            (65535, 0, true),
            (50, 100, false),
            (0, 65535, false),
            (1, 2, false),
        ];

        for (a, b, expected) in cases {
            assert!(run(a, b, Mode::Gte, Some(expected)), "gte({}, {})", a, b);
            assert!(!run(a, b, Mode::Gte, Some(!expected)), "gte({}, {}) negated", a, b);
        }
    }

    #[test]
    fn test_lte_outputs_bit() {
        assert!(run(3, 4, Mode::Lte, Some(true)));
        assert!(run(4, 4, Mode::Lte, Some(true)));
        assert!(run(5, 4, Mode::Lte, Some(false)));
        assert!(!run(5, 4, Mode::Lte, Some(true)));
    }

    #[test]
    fn test_enforce_gte() {
        assert!(run(10, 8, Mode::Enforce, None));
        assert!(run(8, 8, Mode::Enforce, None));
        assert!(!run(8, 10, Mode::Enforce, None));
    }
}
