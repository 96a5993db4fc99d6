//! Benchmarks for environment cloning and beam expansion.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use jobshop_rl::core::JobShopInstance;
use jobshop_rl::env::Environment;
use jobshop_rl::nn::NetworkOracle;
use jobshop_rl::rollout::{BeamRollout, RolloutConfig};

/// 10x10 instance with a cyclic machine order per job.
fn instance() -> JobShopInstance {
    let n = 10;
    let precedence = (0..n)
        .map(|job| (0..n).map(|op| (job + op) % n).collect())
        .collect();
    let durations = (0..n)
        .map(|job| (0..n).map(|op| ((job * 7 + op * 3) % 9 + 1) as f64).collect())
        .collect();
    JobShopInstance::with_machines(precedence, durations, n).unwrap()
}

fn half_scheduled() -> Environment {
    let mut env = Environment::from_instance(instance());
    env.reset().unwrap();
    for step in 0..50 {
        env.step(step % 10).unwrap();
    }
    env
}

fn bench_clone(c: &mut Criterion) {
    let env = half_scheduled();
    c.bench_function("environment_clone", |b| b.iter(|| black_box(env.clone())));
}

fn bench_clone_and_step(c: &mut Criterion) {
    let env = half_scheduled();
    c.bench_function("environment_clone_step", |b| {
        b.iter(|| {
            let mut clone = env.clone();
            black_box(clone.step(3).unwrap())
        })
    });
}

fn bench_beam(c: &mut Criterion) {
    let env = half_scheduled();
    let oracle = NetworkOracle::uniform(*env.config());
    let rollout = BeamRollout::new(RolloutConfig::default().with_beam_width(8));
    c.bench_function("beam_width_8_from_midpoint", |b| {
        b.iter(|| black_box(rollout.play(&env, &oracle).unwrap()))
    });
}

criterion_group!(benches, bench_clone, bench_clone_and_step, bench_beam);
criterion_main!(benches);
