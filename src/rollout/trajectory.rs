//! Rollout logs.
//!
//! A [`Trajectory`] records one sampling rollout over a batch: at each
//! iteration the observations the oracle saw, and per slot the chosen
//! action, its probability, the value estimate and the reward. Slots that
//! had already finished are logged as `None`.
//!
//! A [`BeamTrajectory`] records a beam rollout: per iteration the parent
//! of every new candidate and the action it took, and at the end every
//! surviving candidate with its action history and schedule.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::Placement;
use crate::env::Observation;

/// One iteration of a sampling rollout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// Observations passed to the oracle, one per tracked slot.
    pub observations: Vec<Observation>,

    /// Sampled job per slot.
    pub actions: Vec<Option<usize>>,

    /// Probability of the sampled job.
    pub probabilities: Vec<Option<f64>>,

    /// Log-probability of the sampled job.
    pub log_probabilities: Vec<Option<f64>>,

    /// Oracle value estimate per slot, finished slots included.
    pub values: Vec<f64>,

    /// Reward returned by the environment.
    pub rewards: Vec<Option<f64>>,

    /// Entropy of each acting slot's distribution.
    pub entropies: Vec<Option<f64>>,
}

impl TrajectoryStep {
    /// Empty record for a batch; every slot starts out finished.
    pub fn new(observations: Vec<Observation>, values: Vec<f64>) -> Self {
        let n = observations.len();
        Self {
            observations,
            actions: vec![None; n],
            probabilities: vec![None; n],
            log_probabilities: vec![None; n],
            values,
            rewards: vec![None; n],
            entropies: vec![None; n],
        }
    }

    /// Number of slots that acted this iteration.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_some()).count()
    }
}

/// A complete sampling rollout over one batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Seed of the RNG stream the actions were drawn from.
    pub seed: u64,

    /// Batch indices of the tracked slots, in row order.
    pub slots: Vec<usize>,

    pub steps: Vec<TrajectoryStep>,

    /// Sum of rewards per slot.
    pub total_rewards: Vec<f64>,

    /// Makespan per slot when the rollout ended.
    pub final_makespans: Vec<f64>,
}

impl Trajectory {
    pub fn new(seed: u64, slots: Vec<usize>) -> Self {
        let n = slots.len();
        Self {
            seed,
            slots,
            steps: Vec::new(),
            total_rewards: vec![0.0; n],
            final_makespans: vec![0.0; n],
        }
    }

    pub fn push(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    /// Number of iterations the rollout ran.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Job sequence chosen for one row.
    #[must_use]
    pub fn actions_for(&self, row: usize) -> Vec<usize> {
        self.steps.iter().filter_map(|s| s.actions[row]).collect()
    }

    /// Mean entropy over every acting slot of every iteration.
    #[must_use]
    pub fn mean_entropy(&self) -> f64 {
        let (sum, count) = self
            .steps
            .iter()
            .flat_map(|s| s.entropies.iter().flatten())
            .fold((0.0, 0usize), |(sum, count), e| (sum + e, count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Encode with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode from bincode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// One expansion of the beam.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamStep {
    /// Observations of the candidates before the expansion.
    pub observations: Vec<Observation>,

    /// Oracle value estimate per pre-expansion candidate.
    pub values: Vec<f64>,

    /// Entropy per pre-expansion candidate.
    pub entropies: Vec<f64>,

    /// Parent candidate of each new candidate.
    pub sources: Vec<usize>,

    /// Job chosen by each new candidate.
    pub actions: Vec<usize>,

    /// Probability of that job under the parent's distribution.
    pub probabilities: Vec<f64>,

    pub log_probabilities: Vec<f64>,

    /// Reward each new candidate received.
    pub rewards: Vec<f64>,

    /// Renormalized joint weight of each new candidate.
    pub weights: Vec<f64>,
}

/// A surviving beam candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamCandidate {
    /// Normalized joint probability.
    pub weight: f64,

    /// Jobs in the order they were scheduled.
    pub actions: Vector<usize>,

    pub total_reward: f64,
    pub makespan: f64,

    /// Final per-machine placement order.
    pub placement: Vec<Vector<Placement>>,
}

/// A complete beam rollout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamTrajectory {
    pub steps: Vec<BeamStep>,
    pub candidates: Vec<BeamCandidate>,
}

impl BeamTrajectory {
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.steps.len()
    }

    /// Candidate with the highest final weight; ties go to the lowest slot.
    #[must_use]
    pub fn best(&self) -> Option<&BeamCandidate> {
        self.candidates.iter().reduce(|best, c| {
            if c.weight > best.weight {
                c
            } else {
                best
            }
        })
    }

    /// Candidate with the smallest makespan; ties go to the lowest slot.
    #[must_use]
    pub fn best_by_makespan(&self) -> Option<&BeamCandidate> {
        self.candidates.iter().reduce(|best, c| {
            if c.makespan < best.makespan {
                c
            } else {
                best
            }
        })
    }

    /// Mean entropy over every expanded candidate.
    #[must_use]
    pub fn mean_entropy(&self) -> f64 {
        let entropies: Vec<f64> = self
            .steps
            .iter()
            .flat_map(|s| s.entropies.iter().copied())
            .collect();
        if entropies.is_empty() {
            0.0
        } else {
            entropies.iter().sum::<f64>() / entropies.len() as f64
        }
    }
}
