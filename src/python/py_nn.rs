//! Policy oracle bindings for Python.

use pyo3::prelude::*;

use crate::env::{JobMask, Observation};
use crate::error::OracleError;
use crate::nn::{Policy, PolicyOracle};

use super::py_env::PyObservation;

/// Python-implemented policy oracle.
///
/// Wraps a callable `(observations, masks) -> (probs, log_probs, values)`
/// where `observations` is a list of `Observation`, `masks` a list of
/// per-job finished flags, `probs` and `log_probs` are `[batch][jobs]`
/// and `values` is `[batch]`. The callable must zero masked jobs itself.
///
/// The rollouts call it once per iteration; `act` and `value` on their own
/// each make a full call.
#[pyclass(name = "PolicyOracle")]
pub struct PyPolicyOracle {
    callback: PyObject,
}

#[pymethods]
impl PyPolicyOracle {
    #[new]
    fn new(callback: PyObject) -> Self {
        Self { callback }
    }

    /// Call the wrapped callable directly.
    fn __call__(
        &self,
        py: Python<'_>,
        observations: Vec<PyObservation>,
        masks: Vec<Vec<bool>>,
    ) -> PyResult<PyObject> {
        self.callback.call1(py, (observations, masks))
    }
}

impl PyPolicyOracle {
    fn call(
        &self,
        observations: &[Observation],
        masks: &[JobMask],
    ) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>, Vec<f64>), OracleError> {
        Python::with_gil(|py| {
            let py_observations: Vec<PyObservation> =
                observations.iter().cloned().map(PyObservation).collect();
            let py_masks: Vec<Vec<bool>> = masks.iter().map(|m| m.to_vec()).collect();
            self.callback
                .call1(py, (py_observations, py_masks))
                .and_then(|result| result.extract(py))
                .map_err(|e| OracleError::Backend(e.to_string()))
        })
    }
}

impl PolicyOracle for PyPolicyOracle {
    type Embedding = ();

    fn embed(&self, _observations: &[Observation]) -> Result<(), OracleError> {
        Ok(())
    }

    fn act(
        &self,
        observations: &[Observation],
        _embedding: &(),
        masks: &[JobMask],
    ) -> Result<Policy, OracleError> {
        let (probabilities, log_probabilities, _) = self.call(observations, masks)?;
        Ok(Policy {
            probabilities,
            log_probabilities,
        })
    }

    fn value(&self, observations: &[Observation], _embedding: &()) -> Result<Vec<f64>, OracleError> {
        let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();
        let (_, _, values) = self.call(observations, &masks)?;
        Ok(values)
    }

    fn evaluate(
        &self,
        observations: &[Observation],
        _embedding: &(),
        masks: &[JobMask],
    ) -> Result<(Policy, Vec<f64>), OracleError> {
        let (probabilities, log_probabilities, values) = self.call(observations, masks)?;
        Ok((
            Policy {
                probabilities,
                log_probabilities,
            },
            values,
        ))
    }
}
