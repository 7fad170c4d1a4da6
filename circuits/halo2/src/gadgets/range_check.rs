//! Range Check Gadget using Lookup Tables
//!
//! Proves a value lies in [0, 2^bits) by decomposing it into LIMB_BITS-wide
//! limbs with a running sum, looking every limb up in a table of
//! [0, 2^LIMB_BITS), and pinning the final running sum to zero.
//!
//! # Running sum
//! ```text
//! z_0     = value
//! z_{i+1} = (z_i - limb_i) / 2^LIMB_BITS
//! z_n     = 0
//! ```
//! Each row constrains `z_i - z_{i+1} * 2^LIMB_BITS` to be a table entry.
//! A single 2^16 table therefore covers the 32-bit facts and the 64-bit
//! cross-multiplied products.
//!
//! # Example
//! ```ignore
//! // Check that value is in range [0, 2^32)
//! range_check_chip.check(layouter, value, 32)?;
//! ```

use ff::PrimeField;
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, Value},
    plonk::{Advice, Column, ConstraintSystem, Error, Expression, Fixed, Selector, TableColumn},
    poly::Rotation,
};
use std::marker::PhantomData;

use super::to_u128;

/// Limb width of the shared lookup table
pub const LOOKUP_BITS: usize = 16;

/// Configuration for the range check chip
#[derive(Debug, Clone)]
pub struct RangeCheckConfig<F: PrimeField, const LIMB_BITS: usize> {
    /// Advice column holding the running sum z_i
    pub running_sum: Column<Advice>,
    /// Selector to enable the limb lookup
    pub q_lookup: Selector,
    /// Table column containing [0, 2^LIMB_BITS)
    pub table: TableColumn,
    _marker: PhantomData<F>,
}

/// Instructions for the range check chip
pub trait RangeCheckInstruction<F: PrimeField> {
    /// Check that value is within [0, 2^bits)
    fn check(
        &self,
        layouter: impl Layouter<F>,
        value: AssignedCell<F, F>,
        bits: usize,
    ) -> Result<(), Error>;
}

/// Range check chip using lookup tables
#[derive(Debug, Clone)]
pub struct RangeCheckChip<F: PrimeField, const LIMB_BITS: usize> {
    config: RangeCheckConfig<F, LIMB_BITS>,
}

impl<F: PrimeField, const LIMB_BITS: usize> RangeCheckChip<F, LIMB_BITS> {
    /// Create a new range check chip
    pub fn construct(config: RangeCheckConfig<F, LIMB_BITS>) -> Self {
        Self { config }
    }

    /// Configure the range check chip
    ///
    /// This sets up:
    /// 1. A lookup table with values [0, 2^LIMB_BITS)
    /// 2. A lookup argument over consecutive running-sum rows
    /// 3. A constant column used to pin the final running sum to zero
    pub fn configure(
        meta: &mut ConstraintSystem<F>,
        running_sum: Column<Advice>,
        constants: Column<Fixed>,
    ) -> RangeCheckConfig<F, LIMB_BITS> {
        let q_lookup = meta.complex_selector();
        let table = meta.lookup_table_column();

        meta.enable_equality(running_sum);
        meta.enable_constant(constants);

        meta.lookup("range check limb", |meta| {
            let q = meta.query_selector(q_lookup);
            let z_cur = meta.query_advice(running_sum, Rotation::cur());
            let z_next = meta.query_advice(running_sum, Rotation::next());
            let shift = Expression::Constant(F::from(1u64 << LIMB_BITS));

            // limb_i = z_i - z_{i+1} * 2^LIMB_BITS
            vec![(q * (z_cur - z_next * shift), table)]
        });

        RangeCheckConfig {
            running_sum,
            q_lookup,
            table,
            _marker: PhantomData,
        }
    }

    /// Load the lookup table with values [0, 2^LIMB_BITS)
    pub fn load_table(&self, mut layouter: impl Layouter<F>) -> Result<(), Error> {
        let table_size = 1usize << LIMB_BITS;

        layouter.assign_table(
            || "range check table",
            |mut table| {
                for i in 0..table_size {
                    table.assign_cell(
                        || format!("table[{}]", i),
                        self.config.table,
                        i,
                        || Value::known(F::from(i as u64)),
                    )?;
                }
                Ok(())
            },
        )
    }
}

impl<F: PrimeField, const LIMB_BITS: usize> RangeCheckInstruction<F>
    for RangeCheckChip<F, LIMB_BITS>
{
    fn check(
        &self,
        mut layouter: impl Layouter<F>,
        value: AssignedCell<F, F>,
        bits: usize,
    ) -> Result<(), Error> {
        if bits == 0 || bits % LIMB_BITS != 0 || bits > 128 {
            return Err(Error::Synthesis);
        }
        let limbs = bits / LIMB_BITS;

        layouter.assign_region(
            || format!("range check {} bits", bits),
            |mut region| {
                let mut z = value.copy_advice(|| "z_0", &mut region, self.config.running_sum, 0)?;

                for i in 0..limbs {
                    self.config.q_lookup.enable(&mut region, i)?;

                    // A value that does not fit 128 bits cannot pass; any witness works
                    let next = z.value().map(|z| match to_u128(z) {
                        Some(z) => F::from_u128(z >> LIMB_BITS),
                        None => F::ZERO,
                    });
                    z = region.assign_advice(
                        || format!("z_{}", i + 1),
                        self.config.running_sum,
                        i + 1,
                        || next,
                    )?;
                }

                region.constrain_constant(z.cell(), F::ZERO)
            },
        )
    }
}
