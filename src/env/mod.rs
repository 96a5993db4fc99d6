//! Environments: single-instance lifecycle, batching, observations.

pub mod batch;
pub mod environment;
pub mod observation;

pub use batch::{BatchDriver, SlotOutcome};
pub use environment::{Environment, StepResult};
pub use observation::{JobMask, Observation};
