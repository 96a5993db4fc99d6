//! A single job-shop environment with a reset/step lifecycle.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::observation::Observation;
use crate::core::{EnvConfig, JobShopInstance, ScheduleState};
use crate::error::{Error, Result};

/// Outcome of stepping one environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
}

/// One job-shop instance and its scheduling state.
///
/// `Clone` produces a fully independent copy: the state is deep-copied
/// and only the immutable instance is shared.
#[derive(Clone, Debug)]
pub struct Environment {
    config: EnvConfig,
    instance: Option<Arc<JobShopInstance>>,
    state: ScheduleState,
}

impl Environment {
    /// Create an environment with no instance loaded.
    #[must_use]
    pub fn new(config: EnvConfig) -> Self {
        Self {
            config,
            instance: None,
            state: ScheduleState::new(&config),
        }
    }

    /// Create an environment shaped to fit `instance` exactly.
    #[must_use]
    pub fn from_instance(instance: JobShopInstance) -> Self {
        let config = instance.env_config();
        Self {
            config,
            instance: Some(Arc::new(instance)),
            state: ScheduleState::new(&config),
        }
    }

    /// Load an instance from its precedence and duration matrices.
    ///
    /// Fails if the matrices are malformed or do not fit this
    /// environment's shape. The state is reset on success.
    pub fn set_game(
        &mut self,
        precedence: Vec<Vec<usize>>,
        durations: Vec<Vec<f64>>,
    ) -> Result<()> {
        let instance =
            JobShopInstance::with_machines(precedence, durations, self.config.n_machines)?;
        self.load(instance)
    }

    /// Load an already-built instance.
    pub fn load(&mut self, instance: JobShopInstance) -> Result<()> {
        instance.check_config(&self.config)?;
        self.instance = Some(Arc::new(instance));
        self.state.reset();
        Ok(())
    }

    /// Reinitialize the schedule for the loaded instance.
    pub fn reset(&mut self) -> Result<Observation> {
        let instance = self.instance.as_ref().ok_or(Error::NoInstanceLoaded)?;
        self.state.reset();
        Ok(Observation::capture(instance, &self.state))
    }

    /// Schedule the next operation of job `action`.
    ///
    /// Naming a finished job is legal: it earns a `-1` reward and leaves
    /// the state untouched.
    pub fn step(&mut self, action: usize) -> Result<StepResult> {
        let instance = self.instance.as_ref().ok_or(Error::NoInstanceLoaded)?;
        if action >= self.config.max_jobs {
            return Err(Error::ActionOutOfRange {
                action,
                max_jobs: self.config.max_jobs,
            });
        }

        let transition = self.state.apply_action(instance, action);

        Ok(StepResult {
            observation: Observation::capture(instance, &self.state),
            reward: transition.reward,
            done: transition.done,
        })
    }

    /// Snapshot the current state without stepping.
    pub fn observe(&self) -> Result<Observation> {
        let instance = self.instance.as_ref().ok_or(Error::NoInstanceLoaded)?;
        Ok(Observation::capture(instance, &self.state))
    }

    /// Whether every job is finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    /// The environment shape.
    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// The scheduling state.
    #[must_use]
    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// The loaded instance, if any.
    #[must_use]
    pub fn instance(&self) -> Option<&JobShopInstance> {
        self.instance.as_deref()
    }
}
