//! Observation snapshots handed to policy oracles.
//!
//! An observation pairs a copy of the dynamic state (machine and job
//! timelines, job progress) with a shared handle to the immutable
//! instance matrices. All magnitudes are raw; scaling them is left to
//! the encoder in [`crate::nn`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{JobShopInstance, ScheduleState};

/// Per-instance "job already finished" flags. `true` means masked.
pub type JobMask = SmallVec<[bool; 16]>;

/// Snapshot of one environment at one decision point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Earliest start time per machine.
    pub machine_utilization: Vec<f64>,

    /// Earliest start time per job.
    pub job_early_start_time: Vec<f64>,

    /// Next unscheduled operation per job.
    pub job_state: Vec<usize>,

    /// Running makespan.
    pub makespan: f64,

    job_done: Vec<bool>,
    instance: Arc<JobShopInstance>,
}

impl Observation {
    /// Capture the current state of an instance.
    #[must_use]
    pub fn capture(instance: &Arc<JobShopInstance>, state: &ScheduleState) -> Self {
        Self {
            machine_utilization: state.machine_available_at().to_vec(),
            job_early_start_time: state.job_ready_at().to_vec(),
            job_state: state.job_operation_index().to_vec(),
            makespan: state.makespan(),
            job_done: state.finished_jobs().to_vec(),
            instance: Arc::clone(instance),
        }
    }

    /// Duration matrix, `[job][operation]`.
    #[must_use]
    pub fn job_times(&self) -> &[Vec<f64>] {
        self.instance.durations()
    }

    /// Machine matrix, `[job][operation]`.
    #[must_use]
    pub fn precedence(&self) -> &[Vec<usize>] {
        self.instance.precedence()
    }

    /// The instance this observation was taken from.
    #[must_use]
    pub fn instance(&self) -> &JobShopInstance {
        &self.instance
    }

    /// Number of jobs (the action space size).
    #[must_use]
    pub fn n_jobs(&self) -> usize {
        self.job_state.len()
    }

    /// Which actions name finished jobs.
    #[must_use]
    pub fn mask(&self) -> JobMask {
        self.job_done.iter().copied().collect()
    }

    /// Whether `job` names an unfinished job.
    #[must_use]
    pub fn is_valid_action(&self, job: usize) -> bool {
        self.job_done.get(job).is_some_and(|done| !done)
    }

    /// Whether every job is finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.job_done.iter().all(|&done| done)
    }
}
