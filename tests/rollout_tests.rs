//! Integration tests for sampling and beam rollouts.

use std::cell::Cell;

use jobshop_rl::core::{JobShopInstance, ScheduleState};
use jobshop_rl::env::{BatchDriver, Environment, JobMask, Observation};
use jobshop_rl::error::{Error, OracleError};
use jobshop_rl::nn::{JobShopEncoder, NetworkOracle, Policy, PolicyOracle, UniformPolicyZeroValue};
use jobshop_rl::rollout::{infer_next_job, BeamRollout, RolloutConfig, SamplingRollout, Trajectory};

fn two_by_two() -> JobShopInstance {
    JobShopInstance::new(
        vec![vec![0, 1], vec![1, 0]],
        vec![vec![3.0, 2.0], vec![4.0, 1.0]],
    )
    .unwrap()
}

fn three_by_three() -> JobShopInstance {
    JobShopInstance::parse("3 3\n0 3 1 2 2 2\n0 2 2 1 1 4\n1 4 2 3 0 1\n").unwrap()
}

fn seed_env(instance: JobShopInstance) -> Environment {
    let mut env = Environment::from_instance(instance);
    env.reset().unwrap();
    env
}

/// Oracle returning a fixed row for every observation, unmasked.
struct FixedOracle(Vec<f64>);

impl PolicyOracle for FixedOracle {
    type Embedding = ();

    fn embed(&self, _: &[Observation]) -> Result<(), OracleError> {
        Ok(())
    }

    fn act(&self, observations: &[Observation], _: &(), _: &[JobMask]) -> Result<Policy, OracleError> {
        Ok(Policy::from_probabilities(vec![self.0.clone(); observations.len()]))
    }

    fn value(&self, observations: &[Observation], _: &()) -> Result<Vec<f64>, OracleError> {
        Ok(vec![0.0; observations.len()])
    }
}

type UniformOracle = NetworkOracle<UniformPolicyZeroValue, JobShopEncoder>;

/// Uniform oracle that counts how it is queried.
struct CountingOracle {
    inner: UniformOracle,
    acts: Cell<usize>,
    values: Cell<usize>,
    evaluations: Cell<usize>,
}

impl CountingOracle {
    fn new(inner: UniformOracle) -> Self {
        Self {
            inner,
            acts: Cell::new(0),
            values: Cell::new(0),
            evaluations: Cell::new(0),
        }
    }
}

impl PolicyOracle for CountingOracle {
    type Embedding = ();

    fn embed(&self, _: &[Observation]) -> Result<(), OracleError> {
        Ok(())
    }

    fn act(&self, observations: &[Observation], _: &(), masks: &[JobMask]) -> Result<Policy, OracleError> {
        self.acts.set(self.acts.get() + 1);
        self.inner.act(observations, &Vec::new(), masks)
    }

    fn value(&self, observations: &[Observation], _: &()) -> Result<Vec<f64>, OracleError> {
        self.values.set(self.values.get() + 1);
        self.inner.value(observations, &Vec::new())
    }

    fn evaluate(
        &self,
        observations: &[Observation],
        _: &(),
        masks: &[JobMask],
    ) -> Result<(Policy, Vec<f64>), OracleError> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.inner.evaluate(observations, &Vec::new(), masks)
    }
}

// =============================================================================
// Sampling
// =============================================================================

#[test]
fn test_sampling_completes_every_slot() {
    let mut driver =
        BatchDriver::from_instances(vec![three_by_three(), three_by_three(), three_by_three()])
            .unwrap();
    driver.reset_all().unwrap();
    let oracle = NetworkOracle::uniform(*driver.config());

    let trajectory = SamplingRollout::new(RolloutConfig::default().with_seed(3))
        .play(&mut driver, &oracle)
        .unwrap();

    assert!(driver.all_done());
    assert_eq!(trajectory.iterations(), 9);
    for row in 0..3 {
        let actions = trajectory.actions_for(row);
        assert_eq!(actions.len(), 9);
        for job in 0..3 {
            assert_eq!(actions.iter().filter(|&&a| a == job).count(), 3);
        }
        assert!((trajectory.total_rewards[row] + trajectory.final_makespans[row]).abs() < 1e-9);
    }
    assert!(trajectory.mean_entropy() > 0.0);
}

#[test]
fn test_sampling_is_deterministic_per_seed() {
    let play = |seed| {
        let mut driver = BatchDriver::from_instances(vec![three_by_three(), three_by_three()]).unwrap();
        driver.reset_all().unwrap();
        let oracle = NetworkOracle::uniform(*driver.config());
        SamplingRollout::new(RolloutConfig::default().with_seed(seed))
            .play(&mut driver, &oracle)
            .unwrap()
    };

    assert_eq!(play(17), play(17));
}

#[test]
fn test_sampling_logs_finished_slots_as_none() {
    let mut driver = BatchDriver::from_instances(vec![two_by_two(), two_by_two()]).unwrap();
    driver.reset_all().unwrap();
    // Slot 1 gets a head start of two operations.
    driver.step(&[1, 1], &[0, 0]).unwrap();
    let oracle = NetworkOracle::uniform(*driver.config());

    let trajectory = SamplingRollout::new(RolloutConfig::default())
        .play(&mut driver, &oracle)
        .unwrap();

    assert_eq!(trajectory.iterations(), 4);
    assert_eq!(trajectory.actions_for(1), vec![1, 1]);
    for step in &trajectory.steps[2..] {
        assert_eq!(step.actions[1], None);
        assert_eq!(step.rewards[1], None);
        assert_eq!(step.active_count(), 1);
    }
}

#[test]
fn test_sampling_rejects_unnormalized_policy() {
    let mut driver = BatchDriver::from_instances(vec![two_by_two()]).unwrap();
    driver.reset_all().unwrap();

    let result = SamplingRollout::new(RolloutConfig::default())
        .play(&mut driver, &FixedOracle(vec![0.3, 0.3]));

    assert!(matches!(
        result,
        Err(Error::Oracle(OracleError::NotNormalized { slot: 0, .. }))
    ));
}

#[test]
fn test_sampling_rejects_mass_on_finished_jobs() {
    let mut driver = BatchDriver::from_instances(vec![two_by_two()]).unwrap();
    driver.reset_all().unwrap();

    // All mass on job 0; once it finishes there is nothing valid to pick.
    let result = SamplingRollout::new(RolloutConfig::default())
        .play(&mut driver, &FixedOracle(vec![1.0, 0.0]));

    assert!(matches!(
        result,
        Err(Error::Oracle(OracleError::NoValidMass { slot: 0 }))
    ));
}

#[test]
fn test_rollouts_query_the_oracle_once_per_iteration() {
    let mut driver = BatchDriver::from_instances(vec![three_by_three(), three_by_three()]).unwrap();
    driver.reset_all().unwrap();
    let oracle = CountingOracle::new(NetworkOracle::uniform(*driver.config()));

    let trajectory = SamplingRollout::new(RolloutConfig::default())
        .play(&mut driver, &oracle)
        .unwrap();

    assert_eq!(oracle.evaluations.get(), trajectory.iterations());
    assert_eq!(oracle.acts.get(), 0);
    assert_eq!(oracle.values.get(), 0);

    let seed = seed_env(three_by_three());
    let oracle = CountingOracle::new(NetworkOracle::uniform(*seed.config()));
    let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(3))
        .play(&seed, &oracle)
        .unwrap();

    assert_eq!(oracle.evaluations.get(), beam.iterations());
    assert_eq!(oracle.acts.get() + oracle.values.get(), 0);
}

#[test]
fn test_trajectory_bincode_roundtrip() {
    let mut driver = BatchDriver::from_instances(vec![two_by_two()]).unwrap();
    driver.reset_all().unwrap();
    let oracle = NetworkOracle::uniform(*driver.config());
    let trajectory = SamplingRollout::new(RolloutConfig::default())
        .play(&mut driver, &oracle)
        .unwrap();

    let bytes = trajectory.to_bytes().unwrap();
    assert_eq!(Trajectory::from_bytes(&bytes).unwrap(), trajectory);
}

// =============================================================================
// Beam
// =============================================================================

#[test]
fn test_beam_weights_and_size() {
    let seed = seed_env(three_by_three());
    let oracle = NetworkOracle::uniform(*seed.config());
    let width = 4;

    let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(width))
        .play(&seed, &oracle)
        .unwrap();

    assert_eq!(beam.iterations(), 9);
    for step in &beam.steps {
        let pairs: usize = step
            .observations
            .iter()
            .map(|o| (0..o.n_jobs()).filter(|&j| o.is_valid_action(j)).count())
            .sum();
        assert_eq!(step.weights.len(), width.min(pairs));
        assert!((step.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
    for candidate in &beam.candidates {
        assert_eq!(candidate.actions.len(), 9);
        assert!((candidate.total_reward + candidate.makespan).abs() < 1e-9);
    }
}

#[test]
fn test_beam_is_reproducible() {
    let seed = seed_env(three_by_three());
    let oracle = NetworkOracle::uniform(*seed.config());
    let rollout = BeamRollout::new(RolloutConfig::default().with_beam_width(5));

    let first = rollout.play(&seed, &oracle).unwrap();
    let second = rollout.play(&seed, &oracle).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_beam_tie_break_prefers_lowest_candidate_then_job() {
    let seed = seed_env(two_by_two());
    let oracle = NetworkOracle::uniform(*seed.config());

    let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(2))
        .play(&seed, &oracle)
        .unwrap();

    // Both candidates of the first expansion come from the seed.
    assert_eq!(beam.steps[0].sources, vec![0, 0]);
    assert_eq!(beam.steps[0].actions, vec![0, 1]);
    // Four equal pairs in the second expansion; candidate 0 wins both slots.
    assert_eq!(beam.steps[1].sources, vec![0, 0]);
    assert_eq!(beam.steps[1].actions, vec![0, 1]);
}

#[test]
fn test_wide_beam_finds_optimal_schedule() {
    let seed = seed_env(two_by_two());
    let oracle = NetworkOracle::uniform(*seed.config());

    let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(16))
        .play(&seed, &oracle)
        .unwrap();

    // Every interleaving of two 2-operation jobs survives.
    assert_eq!(beam.candidates.len(), 6);
    assert_eq!(beam.best_by_makespan().unwrap().makespan, 6.0);
}

#[test]
fn test_beam_candidates_are_independent() {
    let seed = seed_env(two_by_two());
    let oracle = NetworkOracle::uniform(*seed.config());

    let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(16))
        .play(&seed, &oracle)
        .unwrap();

    for candidate in &beam.candidates {
        let mut replay = seed.clone();
        for &job in &candidate.actions {
            replay.step(job).unwrap();
        }
        assert_eq!(replay.state().makespan(), candidate.makespan);
        assert_eq!(replay.state().placement_log(), candidate.placement.as_slice());
    }
    assert_eq!(seed.state().remaining_jobs(), 2);
}

#[test]
fn test_beam_step_limit() {
    let seed = seed_env(two_by_two());
    let oracle = NetworkOracle::uniform(*seed.config());

    let result = BeamRollout::new(RolloutConfig::default().with_max_steps(1)).play(&seed, &oracle);
    assert!(matches!(result, Err(Error::StepLimitExceeded { limit: 1 })));
}

// =============================================================================
// Inference
// =============================================================================

#[test]
fn test_infer_matches_first_greedy_beam_move() {
    let oracle = FixedOracle(vec![0.2, 0.3, 0.5]);
    let seed = seed_env(three_by_three());

    let job = infer_next_job(&oracle, 3, 3, &three_by_three(), seed.state()).unwrap();
    let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(1))
        .play(&seed, &oracle)
        .unwrap();

    assert_eq!(job, 2);
    assert_eq!(job, beam.steps[0].actions[0]);
}

#[test]
fn test_infer_matches_greedy_beam_mid_episode() {
    let oracle = NetworkOracle::uniform(*seed_env(three_by_three()).config());

    let prefixes: [&[usize]; 4] = [&[], &[0, 0, 0], &[1, 0], &[2, 2, 1, 0]];
    for prefix in prefixes {
        let mut seed = seed_env(three_by_three());
        for &job in prefix {
            seed.step(job).unwrap();
        }

        let job = infer_next_job(&oracle, 3, 3, &three_by_three(), seed.state()).unwrap();
        let beam = BeamRollout::new(RolloutConfig::default().with_beam_width(1))
            .play(&seed, &oracle)
            .unwrap();

        assert_eq!(job, beam.steps[0].actions[0], "prefix {:?}", prefix);
    }
}

#[test]
fn test_infer_from_reported_timelines() {
    let instance = three_by_three();
    let mut env = seed_env(instance.clone());
    for job in [0, 0, 0, 1] {
        env.step(job).unwrap();
    }
    let replayed = env.state();

    // An external solver reports only the timelines and job progress.
    let rebuilt = ScheduleState::from_parts(
        &instance.env_config(),
        replayed.job_operation_index().to_vec(),
        replayed.machine_available_at().to_vec(),
        replayed.job_ready_at().to_vec(),
    )
    .unwrap();
    let oracle = FixedOracle(vec![0.6, 0.3, 0.1]);

    assert_eq!(
        infer_next_job(&oracle, 3, 3, &instance, &rebuilt).unwrap(),
        infer_next_job(&oracle, 3, 3, &instance, replayed).unwrap(),
    );
    assert_eq!(infer_next_job(&oracle, 3, 3, &instance, &rebuilt).unwrap(), 1);
}
