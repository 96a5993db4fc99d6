//! Per-instance scheduling state and its transition function.
//!
//! ## ScheduleState
//!
//! The mutable half of a job-shop episode. The immutable half (durations
//! and machine order) lives in [`JobShopInstance`] and is passed to
//! [`ScheduleState::apply_action`] explicitly, so a state is a flat value
//! aggregate that clones independently for beam search.
//!
//! ## Invariants
//!
//! - `job_operation_index[j]` never decreases and is frozen at
//!   `max_job_length` once job `j` finishes
//! - `machine_available_at`, `job_ready_at` and `current_makespan` never
//!   decrease
//! - `current_makespan == max(machine_available_at)`
//! - `remaining_jobs == count(job_operation_index[j] < max_job_length)`
//!
//! Placement logs use `im::Vector` so cloning a state shares structure
//! with its source while remaining semantically independent.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::config::EnvConfig;
use super::instance::JobShopInstance;
use crate::error::InstanceError;

/// Reward for naming a job that has already finished.
pub const FINISHED_JOB_PENALTY: f64 = -1.0;

/// One operation placed on a machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub job: usize,
    pub operation: usize,
}

/// Result of a single transition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// `previous_makespan - current_makespan`, or `-1` for a finished job.
    pub reward: f64,

    /// Whether every job is finished.
    pub done: bool,
}

/// Mutable scheduling state for one instance.
///
/// Deserialization rebuilds the derived fields through
/// [`ScheduleState::from_parts`], so a decoded state always satisfies the
/// invariants above.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawState")]
pub struct ScheduleState {
    max_job_length: usize,

    /// Next unscheduled operation per job.
    job_operation_index: Vec<usize>,

    /// Earliest time each machine can start its next operation.
    machine_available_at: Vec<f64>,

    /// Earliest time each job's next operation can start.
    job_ready_at: Vec<f64>,

    /// Finished flag per job.
    job_done: Vec<bool>,

    current_makespan: f64,
    remaining_jobs: usize,

    /// Operations assigned to each machine, in assignment order.
    placement_log: Vec<Vector<Placement>>,
}

impl ScheduleState {
    /// Create the zero state for an environment shape.
    #[must_use]
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            max_job_length: config.max_job_length,
            job_operation_index: vec![0; config.max_jobs],
            machine_available_at: vec![0.0; config.n_machines],
            job_ready_at: vec![0.0; config.max_jobs],
            job_done: vec![false; config.max_jobs],
            current_makespan: 0.0,
            remaining_jobs: config.max_jobs,
            placement_log: vec![Vector::new(); config.n_machines],
        }
    }

    /// Rebuild a state from the timelines an external solver reports.
    ///
    /// `job_operation_index` has one entry per job, `machine_available_at`
    /// one per machine and `job_ready_at` one per job. Finished flags,
    /// remaining jobs and the makespan are derived. The placement log
    /// starts empty because the timelines do not record it.
    pub fn from_parts(
        config: &EnvConfig,
        job_operation_index: Vec<usize>,
        machine_available_at: Vec<f64>,
        job_ready_at: Vec<f64>,
    ) -> Result<Self, InstanceError> {
        for (field, expected, actual) in [
            ("job_operation_index", config.max_jobs, job_operation_index.len()),
            ("machine_available_at", config.n_machines, machine_available_at.len()),
            ("job_ready_at", config.max_jobs, job_ready_at.len()),
        ] {
            if actual != expected {
                return Err(InstanceError::StateLength {
                    field,
                    expected,
                    actual,
                });
            }
        }
        if let Some((job, &operation)) = job_operation_index
            .iter()
            .enumerate()
            .find(|&(_, &op)| op > config.max_job_length)
        {
            return Err(InstanceError::OperationIndex {
                job,
                operation,
                max_job_length: config.max_job_length,
            });
        }
        for (field, times) in [
            ("machine_available_at", &machine_available_at),
            ("job_ready_at", &job_ready_at),
        ] {
            if let Some((index, &value)) = times
                .iter()
                .enumerate()
                .find(|(_, t)| !t.is_finite() || **t < 0.0)
            {
                return Err(InstanceError::InvalidTime { field, index, value });
            }
        }

        let job_done: Vec<bool> = job_operation_index
            .iter()
            .map(|&op| op == config.max_job_length)
            .collect();
        let remaining_jobs = job_done.iter().filter(|&&done| !done).count();
        let current_makespan = machine_available_at.iter().copied().fold(0.0, f64::max);

        Ok(Self {
            max_job_length: config.max_job_length,
            job_operation_index,
            machine_available_at,
            job_ready_at,
            job_done,
            current_makespan,
            remaining_jobs,
            placement_log: vec![Vector::new(); config.n_machines],
        })
    }

    /// Return to the zero state, keeping the shape.
    pub fn reset(&mut self) {
        self.job_operation_index.fill(0);
        self.machine_available_at.fill(0.0);
        self.job_ready_at.fill(0.0);
        self.job_done.fill(false);
        self.current_makespan = 0.0;
        self.remaining_jobs = self.job_operation_index.len();
        self.placement_log.iter_mut().for_each(Vector::clear);
    }

    /// Schedule the next operation of `job`.
    ///
    /// The operation starts once both its job and its machine are free.
    /// Naming a finished job changes nothing and returns
    /// [`FINISHED_JOB_PENALTY`].
    ///
    /// `job` must be below the instance's job count, and `instance` must
    /// match the shape this state was created with.
    pub fn apply_action(&mut self, instance: &JobShopInstance, job: usize) -> Transition {
        let operation = self.job_operation_index[job];
        if operation == self.max_job_length {
            return Transition {
                reward: FINISHED_JOB_PENALTY,
                done: self.is_done(),
            };
        }

        let duration = instance.duration(job, operation);
        let machine = instance.machine(job, operation);

        self.placement_log[machine].push_back(Placement { job, operation });

        let start = self.job_ready_at[job].max(self.machine_available_at[machine]);
        let finish = start + duration;
        self.job_ready_at[job] = finish;
        self.machine_available_at[machine] = finish;

        let previous_makespan = self.current_makespan;
        self.current_makespan = self.current_makespan.max(finish);

        self.job_operation_index[job] += 1;
        if self.job_operation_index[job] == self.max_job_length {
            self.remaining_jobs -= 1;
            self.job_done[job] = true;
        }

        Transition {
            reward: previous_makespan - self.current_makespan,
            done: self.is_done(),
        }
    }

    /// Whether every job is finished.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining_jobs == 0
    }

    /// Whether `job` has no operations left.
    #[must_use]
    pub fn is_job_done(&self, job: usize) -> bool {
        self.job_done[job]
    }

    /// Running makespan of the partial schedule.
    #[must_use]
    pub fn makespan(&self) -> f64 {
        self.current_makespan
    }

    /// Number of jobs with operations left.
    #[must_use]
    pub fn remaining_jobs(&self) -> usize {
        self.remaining_jobs
    }

    /// Next unscheduled operation per job.
    #[must_use]
    pub fn job_operation_index(&self) -> &[usize] {
        &self.job_operation_index
    }

    /// Earliest start time per machine.
    #[must_use]
    pub fn machine_available_at(&self) -> &[f64] {
        &self.machine_available_at
    }

    /// Earliest start time per job.
    #[must_use]
    pub fn job_ready_at(&self) -> &[f64] {
        &self.job_ready_at
    }

    /// Finished flag per job; `true` entries are masked actions.
    #[must_use]
    pub fn finished_jobs(&self) -> &[bool] {
        &self.job_done
    }

    /// Operations assigned to `machine`, in order.
    #[must_use]
    pub fn placements(&self, machine: usize) -> &Vector<Placement> {
        &self.placement_log[machine]
    }

    /// Operations assigned to every machine.
    #[must_use]
    pub fn placement_log(&self) -> &[Vector<Placement>] {
        &self.placement_log
    }

    /// Operations per job in this state's shape.
    #[must_use]
    pub fn max_job_length(&self) -> usize {
        self.max_job_length
    }
}

/// Wire form of a state; derived fields are recomputed on decode.
#[derive(Deserialize)]
struct RawState {
    max_job_length: usize,
    job_operation_index: Vec<usize>,
    machine_available_at: Vec<f64>,
    job_ready_at: Vec<f64>,
    placement_log: Vec<Vector<Placement>>,
}

impl TryFrom<RawState> for ScheduleState {
    type Error = InstanceError;

    fn try_from(raw: RawState) -> Result<Self, Self::Error> {
        let config = EnvConfig::new(
            raw.job_operation_index.len(),
            raw.max_job_length,
            raw.machine_available_at.len(),
        );
        if raw.placement_log.len() != config.n_machines {
            return Err(InstanceError::StateLength {
                field: "placement_log",
                expected: config.n_machines,
                actual: raw.placement_log.len(),
            });
        }
        let mut state = Self::from_parts(
            &config,
            raw.job_operation_index,
            raw.machine_available_at,
            raw.job_ready_at,
        )?;
        state.placement_log = raw.placement_log;
        Ok(state)
    }
}
