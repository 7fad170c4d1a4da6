//! Benchmarks for the predicate circuits
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use halo2_proofs::dev::MockProver;
use zk_credit_circuits::{
    DefaultRatioCircuit, Fp, PredicateCircuit, PrivateFact, RepaymentCircuit, WalletAgeCircuit,
    CIRCUIT_K,
};

fn bench_predicate<C: PredicateCircuit + Clone>(c: &mut Criterion, name: &str, fact: PrivateFact, threshold: u32) {
    let (circuit, public_inputs) =
        C::prepare(&fact, threshold, Fp::from(0xbeefu64)).expect("valid benchmark input");

    c.bench_function(name, |b| {
        b.iter(|| {
            let prover =
                MockProver::run(CIRCUIT_K, &circuit.clone(), vec![public_inputs.clone()]).unwrap();
            prover.verify().unwrap();
        });
    });
}

fn bench_wallet_age(c: &mut Criterion) {
    bench_predicate::<WalletAgeCircuit>(
        c,
        "WalletAge MockProver",
        PrivateFact::WalletAge { wallet_age_days: 400 },
        90,
    );
}

fn bench_repayment(c: &mut Criterion) {
    bench_predicate::<RepaymentCircuit>(
        c,
        "Repayment MockProver",
        PrivateFact::Repayment {
            total_loans: 10,
            repaid_loans: 8,
        },
        80,
    );
}

fn bench_default_ratio(c: &mut Criterion) {
    bench_predicate::<DefaultRatioCircuit>(
        c,
        "DefaultRatio MockProver",
        PrivateFact::DefaultRatio {
            total_loans: 20,
            defaulted_loans: 3,
        },
        20,
    );
}

criterion_group!(benches, bench_wallet_age, bench_repayment, bench_default_ratio);
criterion_main!(benches);
