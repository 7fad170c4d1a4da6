//! Reusable gadgets for the predicate circuits
//!
//! - `RangeCheckChip`: running-sum range checks over a 16-bit lookup table
//! - `ComparisonChip`: `>=` / `<=` with a constrained boolean output
//! - `PredicateConfig`: the column layout and regions shared by all three predicates

pub mod comparison;
pub mod range_check;

pub use comparison::{ComparisonChip, ComparisonConfig, ComparisonInstruction};
pub use range_check::{RangeCheckChip, RangeCheckConfig, RangeCheckInstruction, LOOKUP_BITS};

use ff::PrimeField;
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Value},
    plonk::{Advice, Column, ConstraintSystem, Error, Expression, Instance, Selector},
    poly::Rotation,
};

use crate::predicate::{FACT_BITS, PERCENT_SCALE, PRODUCT_BITS, SUBJECT_ROW, THRESHOLD_ROW, VALID_ROW};

/// Integer value of a field element, if it fits in 128 bits
///
/// Assumes a little-endian canonical representation (true for the pasta fields).
pub(crate) fn to_u128<F: PrimeField>(value: &F) -> Option<u128> {
    let repr = value.to_repr();
    let bytes = repr.as_ref();
    if bytes.len() < 16 || bytes[16..].iter().any(|b| *b != 0) {
        return None;
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&bytes[..16]);
    Some(u128::from_le_bytes(low))
}

/// Column layout shared by every predicate circuit
///
/// Three witness columns carry the private facts, the public threshold and
/// the scaled products; the comparison and range-check chips get their own.
#[derive(Debug, Clone)]
pub struct PredicateConfig<F: PrimeField> {
    /// Witness columns (facts, thresholds, products)
    pub advice: [Column<Advice>; 3],
    /// Public inputs `[threshold, subject, valid]`
    pub instance: Column<Instance>,
    /// count_scaled = count * 100, total_scaled = total * rate
    pub q_scale: Selector,
    pub range_check: RangeCheckConfig<F, LOOKUP_BITS>,
    pub comparison: ComparisonConfig<F, PRODUCT_BITS, LOOKUP_BITS>,
}

impl<F: PrimeField> PredicateConfig<F> {
    pub fn configure(meta: &mut ConstraintSystem<F>) -> Self {
        let advice = [meta.advice_column(), meta.advice_column(), meta.advice_column()];
        let instance = meta.instance_column();
        let constants = meta.fixed_column();

        for column in advice {
            meta.enable_equality(column);
        }
        meta.enable_equality(instance);

        let q_scale = meta.selector();

        // Row layout:   [total,        count,        rate]
        //               [total_scaled, count_scaled, -   ]
        meta.create_gate("loan scaling", |meta| {
            let q = meta.query_selector(q_scale);
            let total = meta.query_advice(advice[0], Rotation::cur());
            let count = meta.query_advice(advice[1], Rotation::cur());
            let rate = meta.query_advice(advice[2], Rotation::cur());
            let total_scaled = meta.query_advice(advice[0], Rotation::next());
            let count_scaled = meta.query_advice(advice[1], Rotation::next());
            let percent = Expression::Constant(F::from(PERCENT_SCALE));

            vec![
                q.clone() * (total_scaled - total * rate),
                q * (count_scaled - count * percent),
            ]
        });

        let running_sum = meta.advice_column();
        let range_check = RangeCheckChip::<F, LOOKUP_BITS>::configure(meta, running_sum, constants);

        let (a, b, out, diff) = (
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
        );
        let comparison = ComparisonChip::<F, PRODUCT_BITS, LOOKUP_BITS>::configure(
            meta,
            a,
            b,
            out,
            diff,
            range_check.clone(),
        );

        Self {
            advice,
            instance,
            q_scale,
            range_check,
            comparison,
        }
    }

    pub fn range_chip(&self) -> RangeCheckChip<F, LOOKUP_BITS> {
        RangeCheckChip::construct(self.range_check.clone())
    }

    pub fn comparison_chip(&self) -> ComparisonChip<F, PRODUCT_BITS, LOOKUP_BITS> {
        ComparisonChip::construct(self.comparison.clone())
    }

    /// Load the shared lookup table
    pub fn load(&self, layouter: impl Layouter<F>) -> Result<(), Error> {
        self.range_chip().load_table(layouter)
    }

    /// Assign the public threshold and subject and bind them to the instance column
    ///
    /// Returns the threshold cell, range-checked to the fact width.
    pub fn assign_public(
        &self,
        mut layouter: impl Layouter<F>,
        threshold: Value<F>,
        subject: Value<F>,
    ) -> Result<AssignedCell<F, F>, Error> {
        let (threshold_cell, subject_cell) = layouter.assign_region(
            || "public inputs",
            |mut region| {
                let threshold =
                    region.assign_advice(|| "threshold", self.advice[0], 0, || threshold)?;
                let subject = region.assign_advice(|| "subject", self.advice[1], 0, || subject)?;
                Ok((threshold, subject))
            },
        )?;

        layouter.constrain_instance(threshold_cell.cell(), self.instance, THRESHOLD_ROW)?;
        layouter.constrain_instance(subject_cell.cell(), self.instance, SUBJECT_ROW)?;

        self.range_chip().check(
            layouter.namespace(|| "threshold width"),
            threshold_cell.clone(),
            FACT_BITS,
        )?;

        Ok(threshold_cell)
    }

    /// Assign private facts, each range-checked to the fact width
    pub fn assign_facts<const N: usize>(
        &self,
        mut layouter: impl Layouter<F>,
        facts: [(&'static str, Value<F>); N],
    ) -> Result<[AssignedCell<F, F>; N], Error> {
        let mut cells = Vec::with_capacity(N);
        for (name, value) in facts {
            let cell = layouter.assign_region(
                || name,
                |mut region| region.assign_advice(|| name, self.advice[0], 0, || value),
            )?;
            self.range_chip()
                .check(layouter.namespace(|| format!("{} width", name)), cell.clone(), FACT_BITS)?;
            cells.push(cell);
        }
        cells.try_into().map_err(|_| Error::Synthesis)
    }

    /// Cross-multiply a loan count against a percentage
    ///
    /// Returns `(count * 100, total * rate)`.
    pub fn scale_loans(
        &self,
        mut layouter: impl Layouter<F>,
        total: &AssignedCell<F, F>,
        count: &AssignedCell<F, F>,
        rate: &AssignedCell<F, F>,
    ) -> Result<(AssignedCell<F, F>, AssignedCell<F, F>), Error> {
        layouter.assign_region(
            || "loan scaling",
            |mut region| {
                self.q_scale.enable(&mut region, 0)?;

                total.copy_advice(|| "total", &mut region, self.advice[0], 0)?;
                count.copy_advice(|| "count", &mut region, self.advice[1], 0)?;
                rate.copy_advice(|| "rate", &mut region, self.advice[2], 0)?;

                let total_scaled = total.value().zip(rate.value()).map(|(t, r)| *t * *r);
                let count_scaled = count.value().map(|c| *c * F::from(PERCENT_SCALE));

                let total_scaled =
                    region.assign_advice(|| "total_scaled", self.advice[0], 1, || total_scaled)?;
                let count_scaled =
                    region.assign_advice(|| "count_scaled", self.advice[1], 1, || count_scaled)?;

                Ok((count_scaled, total_scaled))
            },
        )
    }

    /// Bind the comparison result to the `valid` public input
    pub fn expose_valid(
        &self,
        mut layouter: impl Layouter<F>,
        valid: AssignedCell<F, F>,
    ) -> Result<(), Error> {
        layouter.constrain_instance(valid.cell(), self.instance, VALID_ROW)
    }
}
