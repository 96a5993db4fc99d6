//! Static environment configuration.
//!
//! Every environment in a batch shares one `EnvConfig`; it fixes the
//! observation shape and the size of the action space.

use serde::{Deserialize, Serialize};

/// Shape of a job-shop environment.
///
/// Actions are job indices in `[0, max_jobs)`. A job is finished once its
/// operation index reaches `max_job_length`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Number of jobs (and the size of the action space).
    pub max_jobs: usize,

    /// Operations per job.
    pub max_job_length: usize,

    /// Number of machines.
    pub n_machines: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_jobs: 10,
            max_job_length: 10,
            n_machines: 10,
        }
    }
}

impl EnvConfig {
    /// Create a config with explicit dimensions.
    #[must_use]
    pub const fn new(max_jobs: usize, max_job_length: usize, n_machines: usize) -> Self {
        Self {
            max_jobs,
            max_job_length,
            n_machines,
        }
    }

    /// Set the number of jobs.
    #[must_use]
    pub fn with_max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = max_jobs;
        self
    }

    /// Set the operations per job.
    #[must_use]
    pub fn with_max_job_length(mut self, max_job_length: usize) -> Self {
        self.max_job_length = max_job_length;
        self
    }

    /// Set the number of machines.
    #[must_use]
    pub fn with_machines(mut self, n_machines: usize) -> Self {
        self.n_machines = n_machines;
        self
    }

    /// Size of the action space.
    #[must_use]
    pub const fn action_space_size(&self) -> usize {
        self.max_jobs
    }

    /// Total operations in one episode.
    ///
    /// This is the episode length when every action names an unfinished job.
    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.max_jobs * self.max_job_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EnvConfig::default();
        assert_eq!(config.max_jobs, 10);
        assert_eq!(config.max_job_length, 10);
        assert_eq!(config.n_machines, 10);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EnvConfig::default()
            .with_max_jobs(3)
            .with_max_job_length(4)
            .with_machines(5);

        assert_eq!(config, EnvConfig::new(3, 4, 5));
        assert_eq!(config.action_space_size(), 3);
        assert_eq!(config.total_operations(), 12);
    }

    #[test]
    fn test_serialization() {
        let config = EnvConfig::new(2, 2, 2);
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: EnvConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
