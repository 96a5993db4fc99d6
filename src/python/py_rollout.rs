//! Rollout bindings for Python.

use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::core::ScheduleState;
use crate::env::BatchDriver;
use crate::nn::{NetworkOracle, PolicyOracle};
use crate::rollout::{self, BeamRollout, BeamTrajectory, RolloutConfig, SamplingRollout, Trajectory};

use super::py_core::{PyJobShopInstance, PyRolloutConfig};
use super::py_env::{PyEnvironment, PyObservation};
use super::py_nn::PyPolicyOracle;
use super::to_py_err;

/// Python wrapper for Trajectory.
#[pyclass(name = "Trajectory")]
#[derive(Clone)]
pub struct PyTrajectory(pub Trajectory);

#[pymethods]
impl PyTrajectory {
    #[getter]
    fn seed(&self) -> u64 {
        self.0.seed
    }

    #[getter]
    fn iterations(&self) -> usize {
        self.0.iterations()
    }

    #[getter]
    fn total_rewards(&self) -> Vec<f64> {
        self.0.total_rewards.clone()
    }

    #[getter]
    fn final_makespans(&self) -> Vec<f64> {
        self.0.final_makespans.clone()
    }

    /// Per iteration, the observations the oracle saw.
    fn observations(&self) -> Vec<Vec<PyObservation>> {
        self.0
            .steps
            .iter()
            .map(|s| s.observations.iter().cloned().map(PyObservation).collect())
            .collect()
    }

    /// `[iteration][slot]` chosen jobs; `None` for finished slots.
    fn actions(&self) -> Vec<Vec<Option<usize>>> {
        self.0.steps.iter().map(|s| s.actions.clone()).collect()
    }

    fn log_probabilities(&self) -> Vec<Vec<Option<f64>>> {
        self.0.steps.iter().map(|s| s.log_probabilities.clone()).collect()
    }

    fn probabilities(&self) -> Vec<Vec<Option<f64>>> {
        self.0.steps.iter().map(|s| s.probabilities.clone()).collect()
    }

    fn values(&self) -> Vec<Vec<f64>> {
        self.0.steps.iter().map(|s| s.values.clone()).collect()
    }

    fn rewards(&self) -> Vec<Vec<Option<f64>>> {
        self.0.steps.iter().map(|s| s.rewards.clone()).collect()
    }

    fn mean_entropy(&self) -> f64 {
        self.0.mean_entropy()
    }

    /// Encode with bincode.
    fn to_bytes<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyBytes>> {
        let bytes = self
            .0
            .to_bytes()
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))?;
        Ok(PyBytes::new_bound(py, &bytes))
    }

    #[staticmethod]
    fn from_bytes(bytes: &[u8]) -> PyResult<Self> {
        Trajectory::from_bytes(bytes)
            .map(Self)
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))
    }

    fn __len__(&self) -> usize {
        self.0.iterations()
    }

    fn __repr__(&self) -> String {
        format!(
            "Trajectory(iterations={}, slots={}, seed={})",
            self.0.iterations(),
            self.0.slots.len(),
            self.0.seed
        )
    }
}

/// Python wrapper for BeamTrajectory.
#[pyclass(name = "BeamTrajectory")]
#[derive(Clone)]
pub struct PyBeamTrajectory(pub BeamTrajectory);

#[pymethods]
impl PyBeamTrajectory {
    #[getter]
    fn iterations(&self) -> usize {
        self.0.iterations()
    }

    /// Final weight per candidate.
    fn weights(&self) -> Vec<f64> {
        self.0.candidates.iter().map(|c| c.weight).collect()
    }

    fn makespans(&self) -> Vec<f64> {
        self.0.candidates.iter().map(|c| c.makespan).collect()
    }

    fn total_rewards(&self) -> Vec<f64> {
        self.0.candidates.iter().map(|c| c.total_reward).collect()
    }

    /// Job sequence per candidate.
    fn actions(&self) -> Vec<Vec<usize>> {
        self.0
            .candidates
            .iter()
            .map(|c| c.actions.iter().copied().collect())
            .collect()
    }

    /// `(job sequence, makespan)` of the highest-weight candidate.
    fn best(&self) -> Option<(Vec<usize>, f64)> {
        self.0
            .best()
            .map(|c| (c.actions.iter().copied().collect(), c.makespan))
    }

    /// `(job sequence, makespan)` of the shortest schedule.
    fn best_by_makespan(&self) -> Option<(Vec<usize>, f64)> {
        self.0
            .best_by_makespan()
            .map(|c| (c.actions.iter().copied().collect(), c.makespan))
    }

    fn mean_entropy(&self) -> f64 {
        self.0.mean_entropy()
    }

    fn __len__(&self) -> usize {
        self.0.candidates.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "BeamTrajectory(iterations={}, candidates={})",
            self.0.iterations(),
            self.0.candidates.len()
        )
    }
}

fn config_or_default(config: Option<&PyRolloutConfig>) -> RolloutConfig {
    config.map(|c| c.0.clone()).unwrap_or_default()
}

fn run_sampling<O: PolicyOracle>(
    driver: &mut BatchDriver,
    oracle: &O,
    config: RolloutConfig,
) -> PyResult<PyTrajectory> {
    SamplingRollout::new(config)
        .play(driver, oracle)
        .map(PyTrajectory)
        .map_err(to_py_err)
}

/// Sample one rollout per instance.
///
/// Uses a masked-uniform policy when no oracle is given.
#[pyfunction]
#[pyo3(signature = (instances, oracle = None, config = None))]
pub fn sample_rollout(
    instances: Vec<PyJobShopInstance>,
    oracle: Option<PyRef<'_, PyPolicyOracle>>,
    config: Option<PyRef<'_, PyRolloutConfig>>,
) -> PyResult<PyTrajectory> {
    let config = config_or_default(config.as_deref());
    let mut driver =
        BatchDriver::from_instances(instances.into_iter().map(|i| i.0).collect()).map_err(to_py_err)?;
    driver.reset_all().map_err(to_py_err)?;

    match oracle {
        Some(oracle) => run_sampling(&mut driver, &*oracle, config),
        None => {
            let uniform = NetworkOracle::uniform(*driver.config());
            run_sampling(&mut driver, &uniform, config)
        }
    }
}

/// Beam search from an environment's current state.
#[pyfunction]
#[pyo3(signature = (env, oracle = None, config = None))]
pub fn beam_rollout(
    env: &PyEnvironment,
    oracle: Option<PyRef<'_, PyPolicyOracle>>,
    config: Option<PyRef<'_, PyRolloutConfig>>,
) -> PyResult<PyBeamTrajectory> {
    let rollout = BeamRollout::new(config_or_default(config.as_deref()));
    let result = match oracle {
        Some(oracle) => rollout.play(&env.0, &*oracle),
        None => rollout.play(&env.0, &NetworkOracle::uniform(*env.0.config())),
    };
    result.map(PyBeamTrajectory).map_err(to_py_err)
}

/// Most probable unfinished job for an environment's current state.
#[pyfunction]
#[pyo3(signature = (oracle, n_jobs, n_operations, instance, env))]
pub fn infer_next_job(
    oracle: PyRef<'_, PyPolicyOracle>,
    n_jobs: usize,
    n_operations: usize,
    instance: &PyJobShopInstance,
    env: &PyEnvironment,
) -> PyResult<usize> {
    rollout::infer_next_job(&*oracle, n_jobs, n_operations, &instance.0, env.0.state())
        .map_err(to_py_err)
}

/// Most probable unfinished job for timelines reported by an external solver.
///
/// `job_state` is the next operation per job, `machine_utilization` the
/// earliest start per machine and `job_early_start_time` the earliest
/// start per job, all shaped to fit `instance`.
#[pyfunction]
#[pyo3(signature = (oracle, instance, job_state, machine_utilization, job_early_start_time))]
pub fn infer_next_job_from_parts(
    oracle: PyRef<'_, PyPolicyOracle>,
    instance: &PyJobShopInstance,
    job_state: Vec<usize>,
    machine_utilization: Vec<f64>,
    job_early_start_time: Vec<f64>,
) -> PyResult<usize> {
    let config = instance.0.env_config();
    let state = ScheduleState::from_parts(&config, job_state, machine_utilization, job_early_start_time)
        .map_err(|e| to_py_err(e.into()))?;
    rollout::infer_next_job(&*oracle, config.max_jobs, config.max_job_length, &instance.0, &state)
        .map_err(to_py_err)
}
