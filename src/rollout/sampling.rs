//! Stochastic sampling rollout over a batch of environments.

use crate::core::RolloutRng;
use crate::env::{BatchDriver, JobMask, Observation, SlotOutcome};
use crate::error::{Error, OracleError, Result};
use crate::nn::{validate_policy, PolicyOracle};
use crate::{log_slots, log_steps};

use super::config::RolloutConfig;
use super::trajectory::{Trajectory, TrajectoryStep};

/// Drives a [`BatchDriver`] to completion by sampling one job per active
/// slot from the oracle's distribution each iteration.
#[derive(Clone, Debug)]
pub struct SamplingRollout {
    config: RolloutConfig,
    rng: RolloutRng,
}

impl SamplingRollout {
    pub fn new(config: RolloutConfig) -> Self {
        let rng = RolloutRng::new(config.seed);
        Self { config, rng }
    }

    #[must_use]
    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    /// Run the slots tracked by the driver's last reset until all finish.
    ///
    /// The oracle is queried once per iteration with every tracked slot;
    /// only unfinished slots are validated, sampled and stepped. Each call
    /// draws from a fresh fork of the rollout's RNG.
    pub fn play<O: PolicyOracle>(
        &mut self,
        driver: &mut BatchDriver,
        oracle: &O,
    ) -> Result<Trajectory> {
        let mut rng = self.rng.fork();
        let slots = driver.tracked().to_vec();
        let mut trajectory = Trajectory::new(rng.seed(), slots.clone());

        let mut observations = driver.observe()?;
        let mut embedding = oracle.embed(&observations)?;

        while !driver.all_done() {
            let iteration = trajectory.iterations();
            if let Some(limit) = self.config.max_steps {
                if iteration >= limit {
                    return Err(Error::StepLimitExceeded { limit });
                }
            }
            if !self.config.cache_embedding && iteration > 0 {
                embedding = oracle.embed(&observations)?;
            }

            let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();
            let rows: Vec<usize> = (0..slots.len())
                .filter(|&row| !driver.is_completed(slots[row]))
                .collect();

            let (policy, values) = oracle.evaluate(&observations, &embedding, &masks)?;
            validate_policy(&policy, &masks, &rows, self.config.probability_tolerance)?;
            if values.len() != slots.len() {
                return Err(OracleError::BatchSize {
                    expected: slots.len(),
                    actual: values.len(),
                }
                .into());
            }

            let mut step = TrajectoryStep::new(observations.clone(), values);
            let mut indices = Vec::with_capacity(rows.len());
            let mut actions = Vec::with_capacity(rows.len());

            for &row in &rows {
                let weights: Vec<f64> = policy.probabilities[row]
                    .iter()
                    .zip(&masks[row])
                    .map(|(&p, &masked)| if masked { 0.0 } else { p })
                    .collect();
                let action = rng
                    .choose_weighted(&weights)
                    .ok_or(OracleError::NoValidMass { slot: row })?;

                step.actions[row] = Some(action);
                step.probabilities[row] = Some(policy.probabilities[row][action]);
                step.log_probabilities[row] = Some(policy.log_probabilities[row][action]);
                step.entropies[row] = Some(policy.entropy(row));
                indices.push(slots[row]);
                actions.push(action);
            }

            let outcomes = driver.step(&indices, &actions)?;
            for ((&row, &action), outcome) in rows.iter().zip(&actions).zip(outcomes) {
                if let SlotOutcome::Active(result) = outcome {
                    log_slots!(
                        self.config.verbosity,
                        "[sampling] iter {} slot {}: job {} reward {}",
                        iteration,
                        slots[row],
                        action,
                        result.reward
                    );
                    step.rewards[row] = Some(result.reward);
                    trajectory.total_rewards[row] += result.reward;
                    observations[row] = result.observation;
                }
            }

            log_steps!(
                self.config.verbosity,
                "[sampling] iter {}: {} active, {} remaining",
                iteration,
                rows.len(),
                driver.active_indices().len()
            );
            trajectory.push(step);
        }

        trajectory.final_makespans = observations.iter().map(|o| o.makespan).collect();
        Ok(trajectory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobShopInstance;
    use crate::nn::NetworkOracle;

    fn driver() -> BatchDriver {
        let instances = vec![
            JobShopInstance::new(
                vec![vec![0, 1], vec![1, 0]],
                vec![vec![3.0, 2.0], vec![4.0, 1.0]],
            )
            .unwrap(),
            JobShopInstance::new(
                vec![vec![1, 0], vec![0, 1]],
                vec![vec![1.0, 1.0], vec![2.0, 2.0]],
            )
            .unwrap(),
        ];
        let mut driver = BatchDriver::from_instances(instances).unwrap();
        driver.reset_all().unwrap();
        driver
    }

    #[test]
    fn test_play_runs_to_completion() {
        let mut driver = driver();
        let oracle = NetworkOracle::uniform(*driver.config());
        let mut rollout = SamplingRollout::new(RolloutConfig::default().with_seed(5));

        let trajectory = rollout.play(&mut driver, &oracle).unwrap();

        assert!(driver.all_done());
        assert_eq!(trajectory.iterations(), 4);
        for row in 0..2 {
            assert_eq!(trajectory.actions_for(row).len(), 4);
            assert!((trajectory.total_rewards[row] + trajectory.final_makespans[row]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_step_limit() {
        let mut driver = driver();
        let oracle = NetworkOracle::uniform(*driver.config());
        let mut rollout = SamplingRollout::new(RolloutConfig::default().with_max_steps(2));

        assert!(matches!(
            rollout.play(&mut driver, &oracle),
            Err(Error::StepLimitExceeded { limit: 2 })
        ));
    }

    #[test]
    fn test_uncached_embedding_matches_cached() {
        let oracle = NetworkOracle::uniform(*driver().config());

        let mut cached = SamplingRollout::new(RolloutConfig::default().with_seed(11));
        let mut uncached =
            SamplingRollout::new(RolloutConfig::default().with_seed(11).with_cache_embedding(false));

        let a = cached.play(&mut driver(), &oracle).unwrap();
        let b = uncached.play(&mut driver(), &oracle).unwrap();
        assert_eq!(a, b);
    }
}
