//! Observation encoding for network input.

use crate::core::EnvConfig;
use crate::env::Observation;
use crate::nn::traits::EncodedState;

/// Encodes observations into tensors for network input.
pub trait StateEncoder: Send + Sync {
    /// Whether `observation` has the shape this encoder was built for.
    ///
    /// `encode` may only be called on observations that fit.
    fn fits(&self, observation: &Observation) -> bool;

    fn encode(&self, observation: &Observation) -> EncodedState;

    /// Shape of every encoded tensor.
    fn output_shape(&self) -> Vec<usize>;

    /// Length of the policy vector (the job count).
    fn action_space_size(&self) -> usize;
}

/// Flat job-shop encoder.
///
/// Layout, in order:
/// - machine utilization (`n_machines`), divided by `time_scale`
/// - job ready times (`max_jobs`), divided by `time_scale`
/// - durations (`max_jobs * max_job_length`), divided by `time_scale`
/// - precedence (`max_jobs * max_job_length`), divided by `n_machines`
/// - job progress (`max_jobs`), divided by `max_job_length`
#[derive(Clone, Debug)]
pub struct JobShopEncoder {
    config: EnvConfig,
    time_scale: f32,
}

impl JobShopEncoder {
    /// Encoder for one environment shape, with a time scale of 100.
    pub fn new(config: EnvConfig) -> Self {
        Self {
            config,
            time_scale: 100.0,
        }
    }

    /// Set the divisor applied to every time quantity.
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    #[must_use]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    fn feature_count(&self) -> usize {
        let c = &self.config;
        c.n_machines + 2 * c.max_jobs + 2 * c.total_operations()
    }
}

impl StateEncoder for JobShopEncoder {
    fn fits(&self, observation: &Observation) -> bool {
        let c = &self.config;
        observation.n_jobs() == c.max_jobs
            && observation.machine_utilization.len() == c.n_machines
            && observation.job_early_start_time.len() == c.max_jobs
            && observation.job_times().len() == c.max_jobs
            && observation.job_times().iter().all(|row| row.len() == c.max_job_length)
            && observation.precedence().len() == c.max_jobs
            && observation.precedence().iter().all(|row| row.len() == c.max_job_length)
    }

    fn encode(&self, observation: &Observation) -> EncodedState {
        let mut tensor = Vec::with_capacity(self.feature_count());
        let time = |t: f64| t as f32 / self.time_scale;
        let machines = self.config.n_machines.max(1) as f32;
        let length = self.config.max_job_length.max(1) as f32;

        tensor.extend(observation.machine_utilization.iter().map(|&t| time(t)));
        tensor.extend(observation.job_early_start_time.iter().map(|&t| time(t)));
        for row in observation.job_times() {
            tensor.extend(row.iter().map(|&t| time(t)));
        }
        for row in observation.precedence() {
            tensor.extend(row.iter().map(|&m| m as f32 / machines));
        }
        tensor.extend(observation.job_state.iter().map(|&op| op as f32 / length));

        EncodedState::new(tensor, self.output_shape())
    }

    fn output_shape(&self) -> Vec<usize> {
        vec![self.feature_count()]
    }

    fn action_space_size(&self) -> usize {
        self.config.max_jobs
    }
}
