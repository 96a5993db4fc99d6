//! Fixed-size batch of environments with per-slot completion tracking.
//!
//! The driver steps only slots that are still running. A slot that has
//! already finished produces [`SlotOutcome::AlreadyDone`] instead of being
//! stepped again, so callers can keep issuing full-batch steps while
//! instances terminate at different times.

use rustc_hash::FxHashSet;

use super::environment::{Environment, StepResult};
use super::observation::Observation;
use crate::core::{EnvConfig, JobShopInstance};
use crate::error::{Error, Result};

/// Result for one slot of a batched step.
#[derive(Clone, Debug, PartialEq)]
pub enum SlotOutcome {
    /// The environment was stepped.
    Active(StepResult),
    /// The slot had already finished; nothing was stepped.
    AlreadyDone,
}

impl SlotOutcome {
    /// Reward, or `None` for a finished slot.
    #[must_use]
    pub fn reward(&self) -> Option<f64> {
        match self {
            SlotOutcome::Active(result) => Some(result.reward),
            SlotOutcome::AlreadyDone => None,
        }
    }

    /// Whether the slot is finished after this step.
    #[must_use]
    pub fn is_done(&self) -> bool {
        match self {
            SlotOutcome::Active(result) => result.done,
            SlotOutcome::AlreadyDone => true,
        }
    }

    /// Observation after the step, or `None` for a finished slot.
    #[must_use]
    pub fn observation(&self) -> Option<&Observation> {
        match self {
            SlotOutcome::Active(result) => Some(&result.observation),
            SlotOutcome::AlreadyDone => None,
        }
    }

    /// Split into `(observation, reward, done)`; a finished slot gives
    /// `(None, None, true)`.
    #[must_use]
    pub fn into_parts(self) -> (Option<Observation>, Option<f64>, bool) {
        match self {
            SlotOutcome::Active(result) => (Some(result.observation), Some(result.reward), result.done),
            SlotOutcome::AlreadyDone => (None, None, true),
        }
    }
}

/// A batch of environments sharing one shape.
#[derive(Clone, Debug)]
pub struct BatchDriver {
    config: EnvConfig,
    envs: Vec<Environment>,
    /// Slots named by the last reset.
    tracked: Vec<usize>,
    /// Slots that finished since the last reset.
    completed: FxHashSet<usize>,
}

impl BatchDriver {
    /// Create `size` empty environments.
    #[must_use]
    pub fn new(size: usize, config: EnvConfig) -> Self {
        Self {
            config,
            envs: (0..size).map(|_| Environment::new(config)).collect(),
            tracked: (0..size).collect(),
            completed: FxHashSet::default(),
        }
    }

    /// Create a batch holding one environment per instance.
    ///
    /// The first instance fixes the shape; the rest must match it.
    pub fn from_instances(instances: Vec<JobShopInstance>) -> Result<Self> {
        let config = instances
            .first()
            .map(JobShopInstance::env_config)
            .ok_or(Error::InstanceCount {
                expected: 1,
                actual: 0,
            })?;
        let mut driver = Self::new(instances.len(), config);
        driver.load(instances)?;
        Ok(driver)
    }

    /// Load one instance per slot from raw matrices.
    ///
    /// Every instance is validated before any slot is replaced.
    pub fn set_game(
        &mut self,
        precedences: Vec<Vec<Vec<usize>>>,
        durations: Vec<Vec<Vec<f64>>>,
    ) -> Result<()> {
        if precedences.len() != durations.len() {
            return Err(Error::InstanceCount {
                expected: precedences.len(),
                actual: durations.len(),
            });
        }
        let instances = precedences
            .into_iter()
            .zip(durations)
            .map(|(p, d)| JobShopInstance::with_machines(p, d, self.config.n_machines))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.load(instances)
    }

    /// Load one built instance per slot.
    pub fn load(&mut self, instances: Vec<JobShopInstance>) -> Result<()> {
        if instances.len() != self.envs.len() {
            return Err(Error::InstanceCount {
                expected: self.envs.len(),
                actual: instances.len(),
            });
        }
        for instance in &instances {
            instance.check_config(&self.config)?;
        }
        for (env, instance) in self.envs.iter_mut().zip(instances) {
            env.load(instance)?;
        }
        self.completed.clear();
        Ok(())
    }

    /// Start a new episode for the named slots.
    ///
    /// Clears the completion record; `all_done` afterwards refers to
    /// exactly these slots.
    pub fn reset(&mut self, indices: &[usize]) -> Result<Vec<Observation>> {
        self.check_indices(indices)?;
        self.completed.clear();
        self.tracked = indices.to_vec();
        indices.iter().map(|&i| self.envs[i].reset()).collect()
    }

    /// Start a new episode for every slot.
    pub fn reset_all(&mut self) -> Result<Vec<Observation>> {
        let indices: Vec<usize> = (0..self.envs.len()).collect();
        self.reset(&indices)
    }

    /// Step the named slots, one action per slot.
    ///
    /// Finished slots yield [`SlotOutcome::AlreadyDone`] and their action is
    /// ignored. All arguments are validated before any slot is stepped.
    pub fn step(&mut self, indices: &[usize], actions: &[usize]) -> Result<Vec<SlotOutcome>> {
        if indices.len() != actions.len() {
            return Err(Error::LengthMismatch {
                indices: indices.len(),
                actions: actions.len(),
            });
        }
        self.check_indices(indices)?;
        for (&index, &action) in indices.iter().zip(actions) {
            if self.completed.contains(&index) {
                continue;
            }
            if self.envs[index].instance().is_none() {
                return Err(Error::NoInstanceLoaded);
            }
            if action >= self.config.max_jobs {
                return Err(Error::ActionOutOfRange {
                    action,
                    max_jobs: self.config.max_jobs,
                });
            }
        }

        let mut outcomes = Vec::with_capacity(indices.len());
        for (&index, &action) in indices.iter().zip(actions) {
            if self.completed.contains(&index) {
                outcomes.push(SlotOutcome::AlreadyDone);
                continue;
            }
            let result = self.envs[index].step(action)?;
            if result.done {
                self.completed.insert(index);
            }
            outcomes.push(SlotOutcome::Active(result));
        }
        Ok(outcomes)
    }

    /// Whether every slot named by the last reset has finished.
    #[must_use]
    pub fn all_done(&self) -> bool {
        self.tracked.iter().all(|i| self.completed.contains(i))
    }

    /// Whether a slot has finished since the last reset.
    #[must_use]
    pub fn is_completed(&self, index: usize) -> bool {
        self.completed.contains(&index)
    }

    /// Slots named by the last reset, in order.
    #[must_use]
    pub fn tracked(&self) -> &[usize] {
        &self.tracked
    }

    /// Tracked slots that are still running, in order.
    #[must_use]
    pub fn active_indices(&self) -> Vec<usize> {
        self.tracked
            .iter()
            .copied()
            .filter(|i| !self.completed.contains(i))
            .collect()
    }

    /// Snapshot every tracked slot, finished or not.
    pub fn observe(&self) -> Result<Vec<Observation>> {
        self.tracked.iter().map(|&i| self.envs[i].observe()).collect()
    }

    /// Swap in a new set of environments and track all of them.
    ///
    /// Environments that are already finished start out completed. Used by
    /// beam search, which rebuilds the batch from clones every step.
    pub fn replace_environments(&mut self, envs: Vec<Environment>) {
        self.completed = envs
            .iter()
            .enumerate()
            .filter(|(_, env)| env.is_done())
            .map(|(i, _)| i)
            .collect();
        self.tracked = (0..envs.len()).collect();
        self.envs = envs;
    }

    /// The environment in a slot.
    #[must_use]
    pub fn env(&self, index: usize) -> Option<&Environment> {
        self.envs.get(index)
    }

    /// All environments, in slot order.
    #[must_use]
    pub fn envs(&self) -> &[Environment] {
        &self.envs
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.envs.len()
    }

    /// Whether the batch has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    /// Shape shared by every slot.
    #[must_use]
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        match indices.iter().find(|&&i| i >= self.envs.len()) {
            Some(&index) => Err(Error::IndexOutOfRange {
                index,
                size: self.envs.len(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_op_driver(size: usize) -> BatchDriver {
        let instances = (0..size)
            .map(|i| {
                JobShopInstance::new(vec![vec![0], vec![0]], vec![vec![1.0 + i as f64], vec![2.0]])
                    .unwrap()
            })
            .collect();
        BatchDriver::from_instances(instances).unwrap()
    }

    #[test]
    fn test_from_instances() {
        let driver = single_op_driver(3);
        assert_eq!(driver.len(), 3);
        assert_eq!(driver.config(), &EnvConfig::new(2, 1, 1));
        assert!(BatchDriver::from_instances(vec![]).is_err());
    }

    #[test]
    fn test_load_rejects_count_mismatch() {
        let mut driver = BatchDriver::new(2, EnvConfig::new(1, 1, 1));
        let err = driver
            .set_game(vec![vec![vec![0]]], vec![vec![vec![1.0]]])
            .unwrap_err();
        assert!(matches!(err, Error::InstanceCount { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_step_validates_before_mutating() {
        let mut driver = single_op_driver(2);
        driver.reset_all().unwrap();

        let err = driver.step(&[0, 1], &[0, 9]).unwrap_err();
        assert!(matches!(err, Error::ActionOutOfRange { action: 9, .. }));
        assert_eq!(driver.env(0).unwrap().state().job_operation_index(), &[0, 0]);

        assert!(matches!(
            driver.step(&[0, 5], &[0, 0]),
            Err(Error::IndexOutOfRange { index: 5, size: 2 })
        ));
        assert!(matches!(
            driver.step(&[0], &[0, 0]),
            Err(Error::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_completed_slot_returns_sentinel() {
        let mut driver = single_op_driver(2);
        driver.reset_all().unwrap();

        driver.step(&[0], &[0]).unwrap();
        let outcomes = driver.step(&[0], &[1]).unwrap();
        assert!(outcomes[0].is_done());
        assert!(driver.is_completed(0));

        let before = driver.env(0).unwrap().state().clone();
        let outcomes = driver.step(&[0, 1], &[1, 0]).unwrap();

        assert_eq!(outcomes[0], SlotOutcome::AlreadyDone);
        assert_eq!(outcomes[0].reward(), None);
        assert!(outcomes[0].observation().is_none());
        assert_eq!(driver.env(0).unwrap().state(), &before);
        assert_eq!(outcomes[1].reward(), Some(-1.0));
        assert!(!driver.all_done());
        assert_eq!(driver.active_indices(), vec![1]);
    }

    #[test]
    fn test_reset_subset_scopes_all_done() {
        let mut driver = single_op_driver(3);
        driver.reset(&[2]).unwrap();
        assert_eq!(driver.tracked(), &[2]);

        driver.step(&[2, 2], &[0, 1]).unwrap();
        assert!(driver.all_done());
        assert_eq!(driver.observe().unwrap().len(), 1);

        driver.reset_all().unwrap();
        assert!(!driver.all_done());
        assert!(!driver.is_completed(2));
    }

    #[test]
    fn test_replace_environments() {
        let mut driver = single_op_driver(1);
        driver.reset_all().unwrap();

        let mut finished = driver.env(0).unwrap().clone();
        finished.step(0).unwrap();
        finished.step(1).unwrap();
        let fresh = driver.env(0).unwrap().clone();

        driver.replace_environments(vec![fresh, finished]);

        assert_eq!(driver.len(), 2);
        assert_eq!(driver.tracked(), &[0, 1]);
        assert!(!driver.is_completed(0));
        assert!(driver.is_completed(1));
        assert_eq!(driver.active_indices(), vec![0]);
    }
}
