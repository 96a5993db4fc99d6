//! Core simulator types: configuration, instances, state, RNG.
//!
//! Everything here is single-instance and deterministic. Batching and
//! observation snapshots live in [`crate::env`].

pub mod config;
pub mod instance;
pub mod rng;
pub mod state;

pub use config::EnvConfig;
pub use instance::JobShopInstance;
pub use rng::RolloutRng;
pub use state::{Placement, ScheduleState, Transition, FINISHED_JOB_PENALTY};
