//! Environment and observation bindings for Python.

use numpy::{PyArray1, PyArray2};
use pyo3::prelude::*;

use crate::env::{BatchDriver, Environment, Observation, SlotOutcome};

use super::py_core::{PyEnvConfig, PyJobShopInstance};
use super::to_py_err;

/// Python wrapper for Observation.
///
/// Numeric fields are returned as numpy arrays with raw magnitudes.
#[pyclass(name = "Observation")]
#[derive(Clone, Debug)]
pub struct PyObservation(pub Observation);

#[pymethods]
impl PyObservation {
    #[getter]
    fn machine_utilization<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        PyArray1::from_slice_bound(py, &self.0.machine_utilization)
    }

    #[getter]
    fn job_early_start_time<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        PyArray1::from_slice_bound(py, &self.0.job_early_start_time)
    }

    #[getter]
    fn job_state<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<usize>> {
        PyArray1::from_slice_bound(py, &self.0.job_state)
    }

    #[getter]
    fn job_times<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        PyArray2::from_vec2_bound(py, self.0.job_times())
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))
    }

    #[getter]
    fn precedence<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<usize>>> {
        PyArray2::from_vec2_bound(py, self.0.precedence())
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))
    }

    #[getter]
    fn makespan(&self) -> f64 {
        self.0.makespan
    }

    /// Finished-job flags; `True` entries must get zero probability.
    fn mask(&self) -> Vec<bool> {
        self.0.mask().to_vec()
    }

    fn is_terminal(&self) -> bool {
        self.0.is_terminal()
    }

    fn __repr__(&self) -> String {
        format!(
            "Observation(jobs={}, makespan={}, job_state={:?})",
            self.0.n_jobs(),
            self.0.makespan,
            self.0.job_state
        )
    }
}

/// Python wrapper for Environment.
#[pyclass(name = "Environment")]
#[derive(Clone, Debug)]
pub struct PyEnvironment(pub Environment);

#[pymethods]
impl PyEnvironment {
    /// Create an empty environment; load an instance with `set_game`.
    #[new]
    fn new(config: &PyEnvConfig) -> Self {
        Self(Environment::new(config.0))
    }

    /// Create an environment shaped to fit an instance.
    #[staticmethod]
    fn from_instance(instance: &PyJobShopInstance) -> Self {
        Self(Environment::from_instance(instance.0.clone()))
    }

    fn set_game(&mut self, precedence: Vec<Vec<usize>>, durations: Vec<Vec<f64>>) -> PyResult<()> {
        self.0.set_game(precedence, durations).map_err(to_py_err)
    }

    fn reset(&mut self) -> PyResult<PyObservation> {
        self.0.reset().map(PyObservation).map_err(to_py_err)
    }

    /// Schedule the next operation of a job.
    ///
    /// Returns `(observation, reward, done)`.
    fn step(&mut self, action: usize) -> PyResult<(PyObservation, f64, bool)> {
        let result = self.0.step(action).map_err(to_py_err)?;
        Ok((PyObservation(result.observation), result.reward, result.done))
    }

    fn observe(&self) -> PyResult<PyObservation> {
        self.0.observe().map(PyObservation).map_err(to_py_err)
    }

    /// Independent copy of this environment.
    fn copy(&self) -> Self {
        self.clone()
    }

    fn is_done(&self) -> bool {
        self.0.is_done()
    }

    #[getter]
    fn makespan(&self) -> f64 {
        self.0.state().makespan()
    }

    #[getter]
    fn config(&self) -> PyEnvConfig {
        PyEnvConfig(*self.0.config())
    }

    /// Per-machine `(job, operation)` order of the current schedule.
    fn placements(&self) -> Vec<Vec<(usize, usize)>> {
        self.0
            .state()
            .placement_log()
            .iter()
            .map(|machine| machine.iter().map(|p| (p.job, p.operation)).collect())
            .collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "Environment(jobs={}, makespan={}, done={})",
            self.0.config().max_jobs,
            self.0.state().makespan(),
            self.0.is_done()
        )
    }
}

/// Python wrapper for BatchDriver.
///
/// `step` returns one `(observation, reward, done)` triple per index;
/// slots that had already finished come back as `(None, None, True)`.
#[pyclass(name = "BatchDriver")]
#[derive(Clone, Debug)]
pub struct PyBatchDriver(pub BatchDriver);

#[pymethods]
impl PyBatchDriver {
    /// Create `size` empty environments of one shape.
    #[new]
    fn new(size: usize, config: &PyEnvConfig) -> Self {
        Self(BatchDriver::new(size, config.0))
    }

    /// One environment per instance, shaped by the first.
    #[staticmethod]
    fn from_instances(instances: Vec<PyJobShopInstance>) -> PyResult<Self> {
        BatchDriver::from_instances(instances.into_iter().map(|i| i.0).collect())
            .map(Self)
            .map_err(to_py_err)
    }

    /// Load one `(precedence, durations)` pair per slot.
    fn set_game(
        &mut self,
        precedences: Vec<Vec<Vec<usize>>>,
        durations: Vec<Vec<Vec<f64>>>,
    ) -> PyResult<()> {
        self.0.set_game(precedences, durations).map_err(to_py_err)
    }

    fn load(&mut self, instances: Vec<PyJobShopInstance>) -> PyResult<()> {
        self.0
            .load(instances.into_iter().map(|i| i.0).collect())
            .map_err(to_py_err)
    }

    /// Start a new episode for the named slots.
    fn reset(&mut self, indices: Vec<usize>) -> PyResult<Vec<PyObservation>> {
        self.0
            .reset(&indices)
            .map(|obs| obs.into_iter().map(PyObservation).collect())
            .map_err(to_py_err)
    }

    fn reset_all(&mut self) -> PyResult<Vec<PyObservation>> {
        self.0
            .reset_all()
            .map(|obs| obs.into_iter().map(PyObservation).collect())
            .map_err(to_py_err)
    }

    fn step(
        &mut self,
        indices: Vec<usize>,
        actions: Vec<usize>,
    ) -> PyResult<Vec<(Option<PyObservation>, Option<f64>, bool)>> {
        let outcomes = self.0.step(&indices, &actions).map_err(to_py_err)?;
        Ok(outcomes
            .into_iter()
            .map(SlotOutcome::into_parts)
            .map(|(obs, reward, done)| (obs.map(PyObservation), reward, done))
            .collect())
    }

    /// Snapshot every slot named by the last reset.
    fn observe(&self) -> PyResult<Vec<PyObservation>> {
        self.0
            .observe()
            .map(|obs| obs.into_iter().map(PyObservation).collect())
            .map_err(to_py_err)
    }

    fn all_done(&self) -> bool {
        self.0.all_done()
    }

    fn is_completed(&self, index: usize) -> bool {
        self.0.is_completed(index)
    }

    fn active_indices(&self) -> Vec<usize> {
        self.0.active_indices()
    }

    /// Copy of the environment in a slot.
    fn env(&self, index: usize) -> Option<PyEnvironment> {
        self.0.env(index).cloned().map(PyEnvironment)
    }

    #[getter]
    fn config(&self) -> PyEnvConfig {
        PyEnvConfig(*self.0.config())
    }

    fn __len__(&self) -> usize {
        self.0.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "BatchDriver(size={}, active={}, all_done={})",
            self.0.len(),
            self.0.active_indices().len(),
            self.0.all_done()
        )
    }
}
