//! Error types for instance loading, oracle contracts, and caller misuse.
//!
//! Simulator no-op paths are deliberately absent here: stepping a finished
//! job yields a `-1` reward and stepping a finished batch slot yields
//! [`SlotOutcome::AlreadyDone`](crate::env::SlotOutcome::AlreadyDone).

use thiserror::Error;

/// A job-shop instance that cannot be simulated.
///
/// Raised at load time, before any environment is stepped.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("instance has no jobs or no operations")]
    Empty,

    #[error("expected {expected} jobs, got {actual}")]
    JobCount { expected: usize, actual: usize },

    #[error("job {job} has {actual} operations, expected {expected}")]
    OperationCount {
        job: usize,
        expected: usize,
        actual: usize,
    },

    #[error("precedence and duration matrices disagree in shape at job {job}")]
    ShapeMismatch { job: usize },

    #[error("job {job} operation {operation} uses machine {machine}, but only {n_machines} machines exist")]
    MachineOutOfRange {
        job: usize,
        operation: usize,
        machine: usize,
        n_machines: usize,
    },

    #[error("job {job} operation {operation} has invalid duration {duration}")]
    InvalidDuration {
        job: usize,
        operation: usize,
        duration: f64,
    },

    #[error("state field {field} has {actual} entries, expected {expected}")]
    StateLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("job {job} is at operation {operation}, past the last operation {max_job_length}")]
    OperationIndex {
        job: usize,
        operation: usize,
        max_job_length: usize,
    },

    #[error("state field {field}[{index}] holds invalid time {value}")]
    InvalidTime {
        field: &'static str,
        index: usize,
        value: f64,
    },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The policy oracle returned something the rollouts cannot use.
///
/// Always fatal at the point of use; the rollouts never renormalize or
/// repair an oracle's output.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle returned {actual} rows for a batch of {expected}")]
    BatchSize { expected: usize, actual: usize },

    #[error("slot {slot}: oracle returned {actual} actions, expected {expected}")]
    ActionCount {
        slot: usize,
        expected: usize,
        actual: usize,
    },

    #[error("slot {slot}: observation does not match the oracle's environment shape")]
    ObservationShape { slot: usize },

    #[error("slot {slot}: probability {value} for action {action} is not a valid probability")]
    InvalidProbability { slot: usize, action: usize, value: f64 },

    #[error("slot {slot}: probabilities sum to {sum}, not 1")]
    NotNormalized { slot: usize, sum: f64 },

    #[error("slot {slot}: no probability mass on any unfinished job")]
    NoValidMass { slot: usize },

    #[error("beam weights collapsed to zero")]
    DegenerateBeam,

    #[error("oracle backend failed: {0}")]
    Backend(String),
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error("no instance loaded; call set_game first")]
    NoInstanceLoaded,

    #[error("action {action} is outside [0, {max_jobs})")]
    ActionOutOfRange { action: usize, max_jobs: usize },

    #[error("batch index {index} is outside [0, {size})")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("{indices} indices but {actions} actions")]
    LengthMismatch { indices: usize, actions: usize },

    #[error("expected {expected} instances, got {actual}")]
    InstanceCount { expected: usize, actual: usize },

    #[error("rollout exceeded the step limit of {limit}")]
    StepLimitExceeded { limit: usize },

    #[error("every job is already finished")]
    NoValidAction,
}

pub type Result<T> = std::result::Result<T, Error>;
