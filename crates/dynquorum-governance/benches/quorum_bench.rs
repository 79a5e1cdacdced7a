use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dynquorum_governance::{dynamic_quorum_votes, DynamicQuorumParams, ProposalVoteSnapshot};
use dynquorum_types::U256;

fn bench_dynamic_quorum(c: &mut Criterion) {
    let wei = 1_000_000_000_000_000_000u128;
    let supply = U256::from(10_000_000 * wei);
    let against = U256::from(1_234_567 * wei);
    let coefficient = U256::from(1_600_000u64);

    c.bench_function("dynamic_quorum_votes", |bencher| {
        bencher.iter(|| {
            dynamic_quorum_votes(black_box(against), black_box(supply), 1000, 6000, coefficient)
        })
    });

    let params = DynamicQuorumParams::from_raw(1000, 6000, coefficient).unwrap();
    let snapshot = ProposalVoteSnapshot::new(against, supply);
    c.bench_function("quorum_bps", |bencher| {
        bencher.iter(|| params.quorum_bps(black_box(&snapshot)))
    });
}

criterion_group!(benches, bench_dynamic_quorum);
criterion_main!(benches);
