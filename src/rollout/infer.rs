//! One-shot next-job inference.

use std::sync::Arc;

use crate::core::{EnvConfig, JobShopInstance, ScheduleState};
use crate::env::{JobMask, Observation};
use crate::error::{Error, InstanceError, Result};
use crate::nn::{validate_policy, PolicyOracle};

/// Probability tolerance applied to the single inference row.
const INFER_TOLERANCE: f64 = 1e-4;

/// Pick the most probable unfinished job for a `(problem, state)` pair.
///
/// `n_jobs` and `n_operations` must match both the instance and the state.
/// Ties go to the lowest job index. This is the first move of a width-1
/// beam from `state`.
pub fn infer_next_job<O: PolicyOracle>(
    oracle: &O,
    n_jobs: usize,
    n_operations: usize,
    instance: &JobShopInstance,
    state: &ScheduleState,
) -> Result<usize> {
    instance.check_config(&EnvConfig::new(n_jobs, n_operations, instance.n_machines()))?;
    if state.job_operation_index().len() != n_jobs {
        return Err(InstanceError::JobCount {
            expected: n_jobs,
            actual: state.job_operation_index().len(),
        }
        .into());
    }
    if state.max_job_length() != n_operations
        || state.machine_available_at().len() != instance.n_machines()
    {
        return Err(InstanceError::ShapeMismatch { job: 0 }.into());
    }

    let observation = Observation::capture(&Arc::new(instance.clone()), state);
    if observation.is_terminal() {
        return Err(Error::NoValidAction);
    }

    let observations = [observation];
    let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();
    let embedding = oracle.embed(&observations)?;
    let policy = oracle.act(&observations, &embedding, &masks)?;
    validate_policy(&policy, &masks, &[0], INFER_TOLERANCE)?;

    policy.probabilities[0]
        .iter()
        .zip(&masks[0])
        .enumerate()
        .filter(|&(_, (_, &masked))| !masked)
        .fold(None, |best: Option<(usize, f64)>, (job, (&p, _))| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((job, p)),
        })
        .map(|(job, _)| job)
        .ok_or(Error::NoValidAction)
}
