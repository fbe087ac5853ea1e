//! Benchmarks for state enumeration, value iteration and TD(0).

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use card_game_rl::games::card_game::{enumerate_states, CardGameEnv};
use card_game_rl::rl::{TdConfig, TdLearner, ValueIteration, ValueIterationConfig};

fn enumeration_benchmark(c: &mut Criterion) {
    c.bench_function("enumerate_deck_8", |b| {
        b.iter(|| enumerate_states(black_box(8)).map(|space| space.len()))
    });
}

fn value_iteration_benchmark(c: &mut Criterion) {
    let space = enumerate_states(6).expect("deck of 6 enumerates");
    let env = CardGameEnv::with_seed(6, 42).expect("deck of 6 is valid");

    let mut group = c.benchmark_group("value_iteration_deck_6");
    for parallel in [false, true] {
        let config = ValueIterationConfig::default().with_gamma(1.0).with_parallel(parallel);
        let engine = ValueIteration::new(env.clone(), config).expect("valid config");
        let name = if parallel { "parallel" } else { "serial" };
        group.bench_function(name, |b| b.iter(|| engine.solve(black_box(&space)).map(|r| r.stats.sweeps)));
    }
    group.finish();
}

fn td_benchmark(c: &mut Criterion) {
    c.bench_function("td_1000_episodes_deck_8", |b| {
        b.iter(|| {
            let env = CardGameEnv::with_seed(8, 42).expect("deck of 8 is valid");
            let config = TdConfig::default().with_episodes(black_box(1000)).with_seed(42);
            TdLearner::new(env, config)
                .and_then(|mut learner| learner.learn())
                .map(|result| result.values.len())
        })
    });
}

criterion_group!(benches, enumeration_benchmark, value_iteration_benchmark, td_benchmark);
criterion_main!(benches);
