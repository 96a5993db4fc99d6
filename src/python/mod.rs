//! Python bindings for the jobshop-rl scheduling environment.
//!
//! # Quick Start
//!
//! ```python
//! import jobshop_rl as js
//!
//! instance = js.JobShopInstance([[0, 1], [1, 0]], [[3.0, 2.0], [4.0, 1.0]])
//!
//! # Masked-uniform sampling over a batch
//! trajectory = js.sample_rollout([instance, instance], config=js.RolloutConfig(seed=42))
//!
//! # Beam search driven by a Python policy
//! oracle = js.PolicyOracle(lambda observations, masks: model(observations, masks))
//! env = js.Environment.from_instance(instance)
//! env.reset()
//! beam = js.beam_rollout(env, oracle, js.RolloutConfig(beam_width=4))
//! jobs, makespan = beam.best()
//! ```

use pyo3::prelude::*;

use crate::error::Error;

mod py_core;
mod py_env;
mod py_nn;
mod py_rollout;

pub use py_core::*;
pub use py_env::*;
pub use py_nn::*;
pub use py_rollout::*;

/// Convert a crate error into a Python `ValueError`.
pub(crate) fn to_py_err(err: Error) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
}

/// jobshop_rl: job-shop scheduling environments and rollouts.
///
/// This module provides:
/// - Instances, environments, batch drivers and observations
/// - Sampling and beam rollouts over a Python policy oracle
/// - One-shot next-job inference from an environment or reported timelines
#[pymodule]
fn jobshop_rl(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core types
    m.add_class::<PyEnvConfig>()?;
    m.add_class::<PyJobShopInstance>()?;
    m.add_class::<PyRolloutConfig>()?;

    // Environment types
    m.add_class::<PyEnvironment>()?;
    m.add_class::<PyBatchDriver>()?;
    m.add_class::<PyObservation>()?;

    // Oracle
    m.add_class::<PyPolicyOracle>()?;

    // Rollouts
    m.add_class::<PyTrajectory>()?;
    m.add_class::<PyBeamTrajectory>()?;
    m.add_function(wrap_pyfunction!(sample_rollout, m)?)?;
    m.add_function(wrap_pyfunction!(beam_rollout, m)?)?;
    m.add_function(wrap_pyfunction!(infer_next_job, m)?)?;
    m.add_function(wrap_pyfunction!(infer_next_job_from_parts, m)?)?;

    Ok(())
}
