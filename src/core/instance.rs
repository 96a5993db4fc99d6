//! Job-shop problem instances.
//!
//! An instance is a pair of matrices indexed `[job][operation]`:
//! - `precedence`: the machine each operation runs on
//! - `durations`: the processing time of each operation
//!
//! Instances are validated once at construction; a `JobShopInstance` that
//! exists is always rectangular, has finite non-negative durations, and only
//! names machines below `n_machines`.
//!
//! ## Text format
//!
//! ```text
//! 2 2
//! 0 3 1 2
//! 1 4 0 1
//! ```
//!
//! The first line holds `n_jobs n_machines`; each following line lists one
//! job's operations as `machine duration` pairs.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config::EnvConfig;
use crate::error::InstanceError;

/// An immutable job-shop problem.
///
/// Deserialization runs the same checks as [`JobShopInstance::with_machines`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawInstance")]
pub struct JobShopInstance {
    precedence: Vec<Vec<usize>>,
    durations: Vec<Vec<f64>>,
    n_machines: usize,
}

/// Unchecked wire form of an instance.
#[derive(Deserialize)]
struct RawInstance {
    precedence: Vec<Vec<usize>>,
    durations: Vec<Vec<f64>>,
    n_machines: usize,
}

impl TryFrom<RawInstance> for JobShopInstance {
    type Error = InstanceError;

    fn try_from(raw: RawInstance) -> Result<Self, Self::Error> {
        Self::with_machines(raw.precedence, raw.durations, raw.n_machines)
    }
}

impl JobShopInstance {
    /// Build an instance, inferring the machine count from the largest id.
    pub fn new(
        precedence: Vec<Vec<usize>>,
        durations: Vec<Vec<f64>>,
    ) -> Result<Self, InstanceError> {
        let n_machines = precedence
            .iter()
            .flatten()
            .max()
            .map_or(0, |&machine| machine + 1);
        Self::with_machines(precedence, durations, n_machines)
    }

    /// Build an instance with an explicit machine count.
    pub fn with_machines(
        precedence: Vec<Vec<usize>>,
        durations: Vec<Vec<f64>>,
        n_machines: usize,
    ) -> Result<Self, InstanceError> {
        let n_operations = precedence.first().map_or(0, Vec::len);
        if precedence.is_empty() || n_operations == 0 {
            return Err(InstanceError::Empty);
        }
        if durations.len() != precedence.len() {
            return Err(InstanceError::JobCount {
                expected: precedence.len(),
                actual: durations.len(),
            });
        }

        for (job, (machines, times)) in precedence.iter().zip(&durations).enumerate() {
            if machines.len() != n_operations {
                return Err(InstanceError::OperationCount {
                    job,
                    expected: n_operations,
                    actual: machines.len(),
                });
            }
            if times.len() != machines.len() {
                return Err(InstanceError::ShapeMismatch { job });
            }
            for (operation, (&machine, &duration)) in machines.iter().zip(times).enumerate() {
                if machine >= n_machines {
                    return Err(InstanceError::MachineOutOfRange {
                        job,
                        operation,
                        machine,
                        n_machines,
                    });
                }
                if !duration.is_finite() || duration < 0.0 {
                    return Err(InstanceError::InvalidDuration {
                        job,
                        operation,
                        duration,
                    });
                }
            }
        }

        Ok(Self {
            precedence,
            durations,
            n_machines,
        })
    }

    /// Parse an instance from the standard text format.
    pub fn parse(text: &str) -> Result<Self, InstanceError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (header_line, header) = lines.next().ok_or(InstanceError::Empty)?;
        let header: Vec<usize> = header
            .split_whitespace()
            .map(|token| parse_token(token, header_line))
            .collect::<Result<_, _>>()?;
        let [n_jobs, n_machines] = header[..] else {
            return Err(InstanceError::Parse {
                line: header_line,
                message: format!("expected `n_jobs n_machines`, got {} values", header.len()),
            });
        };

        let mut precedence = Vec::new();
        let mut durations = Vec::new();

        for (line_no, line) in lines {
            if precedence.len() == n_jobs {
                return Err(InstanceError::Parse {
                    line: line_no,
                    message: format!("more than {} job lines", n_jobs),
                });
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() % 2 != 0 {
                return Err(InstanceError::Parse {
                    line: line_no,
                    message: "operations must be `machine duration` pairs".to_string(),
                });
            }

            let mut machines = Vec::with_capacity(tokens.len() / 2);
            let mut times = Vec::with_capacity(tokens.len() / 2);
            for pair in tokens.chunks_exact(2) {
                machines.push(parse_token::<usize>(pair[0], line_no)?);
                times.push(parse_token::<f64>(pair[1], line_no)?);
            }
            precedence.push(machines);
            durations.push(times);
        }

        if precedence.len() != n_jobs {
            return Err(InstanceError::JobCount {
                expected: n_jobs,
                actual: precedence.len(),
            });
        }

        Self::with_machines(precedence, durations, n_machines)
    }

    /// Read and parse an instance file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InstanceError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Number of jobs.
    #[must_use]
    pub fn n_jobs(&self) -> usize {
        self.precedence.len()
    }

    /// Operations per job.
    #[must_use]
    pub fn n_operations(&self) -> usize {
        self.precedence.first().map_or(0, Vec::len)
    }

    /// Number of machines.
    #[must_use]
    pub fn n_machines(&self) -> usize {
        self.n_machines
    }

    /// Machine required by `operation` of `job`.
    #[must_use]
    pub fn machine(&self, job: usize, operation: usize) -> usize {
        self.precedence[job][operation]
    }

    /// Processing time of `operation` of `job`.
    #[must_use]
    pub fn duration(&self, job: usize, operation: usize) -> f64 {
        self.durations[job][operation]
    }

    /// The full precedence (machine) matrix.
    #[must_use]
    pub fn precedence(&self) -> &[Vec<usize>] {
        &self.precedence
    }

    /// The full duration matrix.
    #[must_use]
    pub fn durations(&self) -> &[Vec<f64>] {
        &self.durations
    }

    /// Sum of all processing times (an upper bound on any makespan).
    #[must_use]
    pub fn total_processing_time(&self) -> f64 {
        self.durations.iter().flatten().sum()
    }

    /// The environment shape this instance fills exactly.
    #[must_use]
    pub fn env_config(&self) -> EnvConfig {
        EnvConfig::new(self.n_jobs(), self.n_operations(), self.n_machines)
    }

    /// Check that this instance fits an environment of the given shape.
    pub fn check_config(&self, config: &EnvConfig) -> Result<(), InstanceError> {
        if self.n_jobs() != config.max_jobs {
            return Err(InstanceError::JobCount {
                expected: config.max_jobs,
                actual: self.n_jobs(),
            });
        }
        if self.n_operations() != config.max_job_length {
            return Err(InstanceError::OperationCount {
                job: 0,
                expected: config.max_job_length,
                actual: self.n_operations(),
            });
        }
        for (job, machines) in self.precedence.iter().enumerate() {
            if let Some(operation) = machines.iter().position(|&m| m >= config.n_machines) {
                return Err(InstanceError::MachineOutOfRange {
                    job,
                    operation,
                    machine: machines[operation],
                    n_machines: config.n_machines,
                });
            }
        }
        Ok(())
    }

    /// Whether every job visits every machine exactly once.
    ///
    /// Classic job-shop benchmarks have this shape; the simulator does not
    /// require it.
    #[must_use]
    pub fn is_job_shop_form(&self) -> bool {
        if self.n_operations() != self.n_machines {
            return false;
        }
        self.precedence.iter().all(|machines| {
            let mut seen = vec![false; self.n_machines];
            machines
                .iter()
                .all(|&m| !std::mem::replace(&mut seen[m], true))
        })
    }
}

impl FromStr for JobShopInstance {
    type Err = InstanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_token<T: FromStr>(token: &str, line: usize) -> Result<T, InstanceError>
where
    T::Err: std::fmt::Display,
{
    token.parse::<T>().map_err(|e| InstanceError::Parse {
        line,
        message: format!("`{}`: {}", token, e),
    })
}
