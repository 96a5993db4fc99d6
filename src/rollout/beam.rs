//! Probability-ranked beam rollout.
//!
//! ## Algorithm
//!
//! The beam starts as a single candidate: the seed environment with
//! weight 1. Each iteration:
//!
//! 1. Query the oracle once for the whole beam.
//! 2. Score every (candidate, unfinished job) pair as
//!    `candidate.weight * p(job)`.
//! 3. Sort pairs by score descending, then candidate ascending, then job
//!    ascending, and keep the first `K`.
//! 4. Clone each kept pair's source environment, step the clone with the
//!    pair's job, and renormalize the kept scores to sum to 1.
//!
//! Clones are full copies; stepping one never touches its source or a
//! sibling. The rollout ends when every candidate is finished.

use im::Vector;

use crate::env::{BatchDriver, Environment, JobMask, Observation, SlotOutcome};
use crate::error::{Error, OracleError, Result};
use crate::nn::{validate_policy, PolicyOracle};
use crate::{log_debug, log_steps};

use super::config::RolloutConfig;
use super::trajectory::{BeamCandidate, BeamStep, BeamTrajectory};

/// Bookkeeping that travels with each candidate's environment.
#[derive(Clone, Debug)]
struct Lineage {
    weight: f64,
    actions: Vector<usize>,
    total_reward: f64,
}

/// A ranked (candidate, job) pair.
#[derive(Clone, Copy, Debug)]
struct Expansion {
    source: usize,
    action: usize,
    score: f64,
}

/// Beam search over a single seed environment.
#[derive(Clone, Debug)]
pub struct BeamRollout {
    config: RolloutConfig,
}

impl BeamRollout {
    pub fn new(config: RolloutConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    /// Beam width in use; a configured width of 0 runs as 1.
    #[must_use]
    pub fn width(&self) -> usize {
        self.config.beam_width.max(1)
    }

    /// Expand `seed` into a beam and run it until every candidate finishes.
    ///
    /// `seed` is cloned, never stepped. Search starts from its current
    /// state, which need not be freshly reset.
    pub fn play<O: PolicyOracle>(&self, seed: &Environment, oracle: &O) -> Result<BeamTrajectory> {
        seed.observe()?;

        let mut driver = BatchDriver::new(0, *seed.config());
        driver.replace_environments(vec![seed.clone()]);
        let mut lineages = vec![Lineage {
            weight: 1.0,
            actions: Vector::new(),
            total_reward: 0.0,
        }];
        let mut steps: Vec<BeamStep> = Vec::new();

        while !driver.all_done() {
            let iteration = steps.len();
            if let Some(limit) = self.config.max_steps {
                if iteration >= limit {
                    return Err(Error::StepLimitExceeded { limit });
                }
            }

            let observations = driver.observe()?;
            let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();
            let rows = driver.active_indices();

            let embedding = oracle.embed(&observations)?;
            let (policy, values) = oracle.evaluate(&observations, &embedding, &masks)?;
            validate_policy(&policy, &masks, &rows, self.config.probability_tolerance)?;
            if values.len() != observations.len() {
                return Err(OracleError::BatchSize {
                    expected: observations.len(),
                    actual: values.len(),
                }
                .into());
            }

            let selected = self.rank(&lineages, &rows, &policy.probabilities, &masks);
            let total: f64 = selected.iter().map(|e| e.score).sum();
            if !total.is_finite() || total <= 0.0 {
                return Err(OracleError::DegenerateBeam.into());
            }
            log_debug!(
                self.config.verbosity,
                "[beam] iter {}: kept {:?}",
                iteration,
                selected
                    .iter()
                    .map(|e| (e.source, e.action, e.score))
                    .collect::<Vec<_>>()
            );

            let envs: Vec<Environment> = selected
                .iter()
                .map(|e| driver.envs()[e.source].clone())
                .collect();
            driver.replace_environments(envs);

            let indices: Vec<usize> = (0..selected.len()).collect();
            let actions: Vec<usize> = selected.iter().map(|e| e.action).collect();
            let outcomes = driver.step(&indices, &actions)?;

            let mut step = BeamStep {
                entropies: (0..observations.len()).map(|r| policy.entropy(r)).collect(),
                observations,
                values,
                sources: selected.iter().map(|e| e.source).collect(),
                actions,
                probabilities: Vec::with_capacity(selected.len()),
                log_probabilities: Vec::with_capacity(selected.len()),
                rewards: Vec::with_capacity(selected.len()),
                weights: Vec::with_capacity(selected.len()),
            };
            let mut next = Vec::with_capacity(selected.len());

            for (expansion, outcome) in selected.iter().zip(outcomes) {
                let reward = match outcome {
                    SlotOutcome::Active(result) => result.reward,
                    SlotOutcome::AlreadyDone => 0.0,
                };
                let parent = &lineages[expansion.source];
                let weight = expansion.score / total;
                let mut actions = parent.actions.clone();
                actions.push_back(expansion.action);

                step.probabilities
                    .push(policy.probabilities[expansion.source][expansion.action]);
                step.log_probabilities
                    .push(policy.log_probabilities[expansion.source][expansion.action]);
                step.rewards.push(reward);
                step.weights.push(weight);
                next.push(Lineage {
                    weight,
                    actions,
                    total_reward: parent.total_reward + reward,
                });
            }

            log_steps!(
                self.config.verbosity,
                "[beam] iter {}: {} candidates, top weight {:.4}",
                iteration,
                next.len(),
                step.weights.first().copied().unwrap_or(0.0)
            );
            lineages = next;
            steps.push(step);
        }

        let candidates = driver
            .envs()
            .iter()
            .zip(lineages)
            .map(|(env, lineage)| BeamCandidate {
                weight: lineage.weight,
                actions: lineage.actions,
                total_reward: lineage.total_reward,
                makespan: env.state().makespan(),
                placement: env.state().placement_log().to_vec(),
            })
            .collect();

        Ok(BeamTrajectory { steps, candidates })
    }

    /// Top `K` (candidate, unfinished job) pairs in beam order.
    fn rank(
        &self,
        lineages: &[Lineage],
        rows: &[usize],
        probabilities: &[Vec<f64>],
        masks: &[JobMask],
    ) -> Vec<Expansion> {
        let mut pairs: Vec<Expansion> = rows
            .iter()
            .flat_map(move |&source| {
                let weight = lineages[source].weight;
                probabilities[source]
                    .iter()
                    .zip(&masks[source])
                    .enumerate()
                    .filter(|&(_, (_, &masked))| !masked)
                    .map(move |(action, (&p, _))| Expansion {
                        source,
                        action,
                        score: weight * p,
                    })
            })
            .collect();

        pairs.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.source.cmp(&b.source))
                .then(a.action.cmp(&b.action))
        });
        pairs.truncate(self.width());
        pairs
    }
}
