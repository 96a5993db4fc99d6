//! Configuration and instance bindings for Python.

use numpy::PyArray2;
use pyo3::prelude::*;

use crate::core::{EnvConfig, JobShopInstance};
use crate::rollout::RolloutConfig;

use super::to_py_err;

/// Python wrapper for EnvConfig.
#[pyclass(name = "EnvConfig")]
#[derive(Clone, Debug)]
pub struct PyEnvConfig(pub EnvConfig);

#[pymethods]
impl PyEnvConfig {
    #[new]
    #[pyo3(signature = (max_jobs = 10, max_job_length = 10, n_machines = 10))]
    fn new(max_jobs: usize, max_job_length: usize, n_machines: usize) -> Self {
        Self(EnvConfig::new(max_jobs, max_job_length, n_machines))
    }

    #[getter]
    fn max_jobs(&self) -> usize {
        self.0.max_jobs
    }

    #[getter]
    fn max_job_length(&self) -> usize {
        self.0.max_job_length
    }

    #[getter]
    fn n_machines(&self) -> usize {
        self.0.n_machines
    }

    fn __repr__(&self) -> String {
        format!(
            "EnvConfig(max_jobs={}, max_job_length={}, n_machines={})",
            self.0.max_jobs, self.0.max_job_length, self.0.n_machines
        )
    }

    fn __eq__(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Python wrapper for JobShopInstance.
#[pyclass(name = "JobShopInstance")]
#[derive(Clone, Debug)]
pub struct PyJobShopInstance(pub JobShopInstance);

#[pymethods]
impl PyJobShopInstance {
    /// Build an instance from its machine and duration matrices.
    ///
    /// # Arguments
    /// - precedence: machine id per `[job][operation]`
    /// - durations: processing time per `[job][operation]`
    /// - n_machines: machine count (default: largest machine id + 1)
    #[new]
    #[pyo3(signature = (precedence, durations, n_machines = None))]
    fn new(
        precedence: Vec<Vec<usize>>,
        durations: Vec<Vec<f64>>,
        n_machines: Option<usize>,
    ) -> PyResult<Self> {
        let instance = match n_machines {
            Some(n) => JobShopInstance::with_machines(precedence, durations, n),
            None => JobShopInstance::new(precedence, durations),
        };
        instance.map(Self).map_err(|e| to_py_err(e.into()))
    }

    /// Parse the standard text format.
    #[staticmethod]
    fn parse(text: &str) -> PyResult<Self> {
        JobShopInstance::parse(text)
            .map(Self)
            .map_err(|e| to_py_err(e.into()))
    }

    /// Read and parse an instance file.
    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        JobShopInstance::from_file(path)
            .map(Self)
            .map_err(|e| to_py_err(e.into()))
    }

    #[getter]
    fn n_jobs(&self) -> usize {
        self.0.n_jobs()
    }

    #[getter]
    fn n_operations(&self) -> usize {
        self.0.n_operations()
    }

    #[getter]
    fn n_machines(&self) -> usize {
        self.0.n_machines()
    }

    #[getter]
    fn precedence(&self) -> Vec<Vec<usize>> {
        self.0.precedence().to_vec()
    }

    /// Duration matrix as a `[jobs, operations]` float64 array.
    fn durations_numpy<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f64>>> {
        PyArray2::from_vec2_bound(py, self.0.durations())
            .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e)))
    }

    fn env_config(&self) -> PyEnvConfig {
        PyEnvConfig(self.0.env_config())
    }

    fn is_job_shop_form(&self) -> bool {
        self.0.is_job_shop_form()
    }

    fn total_processing_time(&self) -> f64 {
        self.0.total_processing_time()
    }

    fn __repr__(&self) -> String {
        format!(
            "JobShopInstance(jobs={}, operations={}, machines={})",
            self.0.n_jobs(),
            self.0.n_operations(),
            self.0.n_machines()
        )
    }
}

/// Python wrapper for RolloutConfig.
#[pyclass(name = "RolloutConfig")]
#[derive(Clone, Debug)]
pub struct PyRolloutConfig(pub RolloutConfig);

#[pymethods]
impl PyRolloutConfig {
    /// Create a rollout configuration.
    ///
    /// # Arguments
    /// - seed: sampling seed (default: 0)
    /// - beam_width: beam width K (default: 1)
    /// - cache_embedding: embed once per sampling rollout (default: True)
    /// - probability_tolerance: allowed deviation of a row sum from 1 (default: 1e-4)
    /// - max_steps: abort after this many iterations (default: None)
    /// - verbosity: 0 silent, 1 steps, 2 slots, 3 debug (default: 0)
    #[new]
    #[pyo3(signature = (
        seed = 0,
        beam_width = 1,
        cache_embedding = true,
        probability_tolerance = 1e-4,
        max_steps = None,
        verbosity = 0
    ))]
    fn new(
        seed: u64,
        beam_width: usize,
        cache_embedding: bool,
        probability_tolerance: f64,
        max_steps: Option<usize>,
        verbosity: u8,
    ) -> Self {
        let mut config = RolloutConfig::default()
            .with_seed(seed)
            .with_beam_width(beam_width)
            .with_cache_embedding(cache_embedding)
            .with_probability_tolerance(probability_tolerance)
            .with_verbosity(verbosity);
        config.max_steps = max_steps;
        Self(config)
    }

    #[getter]
    fn seed(&self) -> u64 {
        self.0.seed
    }

    #[getter]
    fn beam_width(&self) -> usize {
        self.0.beam_width
    }

    #[getter]
    fn cache_embedding(&self) -> bool {
        self.0.cache_embedding
    }

    #[getter]
    fn probability_tolerance(&self) -> f64 {
        self.0.probability_tolerance
    }

    #[getter]
    fn max_steps(&self) -> Option<usize> {
        self.0.max_steps
    }

    #[getter]
    fn verbosity(&self) -> u8 {
        self.0.verbosity
    }

    fn __repr__(&self) -> String {
        format!(
            "RolloutConfig(seed={}, beam_width={}, cache_embedding={}, max_steps={:?})",
            self.0.seed, self.0.beam_width, self.0.cache_embedding, self.0.max_steps
        )
    }
}
