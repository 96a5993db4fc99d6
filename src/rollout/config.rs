//! Rollout configuration.

use serde::{Deserialize, Serialize};

use crate::logging::VERBOSITY_SILENT;

/// Configuration shared by sampling and beam rollouts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Seed for action sampling. Each `play` call forks its own stream.
    pub seed: u64,

    /// Beam width `K`.
    pub beam_width: usize,

    /// Compute the oracle embedding once per rollout instead of every step.
    /// Sampling only; the beam re-embeds because its batch changes size.
    pub cache_embedding: bool,

    /// Allowed deviation of a probability row's sum from 1.
    pub probability_tolerance: f64,

    /// Abort with `StepLimitExceeded` after this many iterations.
    pub max_steps: Option<usize>,

    /// Logging level, see [`crate::logging`].
    pub verbosity: u8,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            beam_width: 1,
            cache_embedding: true,
            probability_tolerance: 1e-4,
            max_steps: None,
            verbosity: VERBOSITY_SILENT,
        }
    }
}

impl RolloutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_cache_embedding(mut self, cache: bool) -> Self {
        self.cache_embedding = cache;
        self
    }

    pub fn with_probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}
