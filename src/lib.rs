//! # jobshop-rl
//!
//! A job-shop scheduling simulator with batched sampling and beam rollouts
//! for training and evaluating RL scheduling policies.
//!
//! ## Design Principles
//!
//! 1. **Deterministic Transitions**: `ScheduleState::apply_action` is a pure
//!    function of the state, the instance and the chosen job.
//!
//! 2. **Clone For Fan-Out**: Beam search copies environments; no two live
//!    candidates ever share mutable state.
//!
//! 3. **Tagged Sentinels**: Finished batch slots report
//!    `SlotOutcome::AlreadyDone` instead of magic rewards.
//!
//! ## Architecture
//!
//! - **Pluggable Oracle**: Rollouts consume any `PolicyOracle`; the crate
//!   ships `NetworkOracle`, which adapts a `PolicyValueNetwork`.
//!
//! - **Persistent Data Structures**: Placement logs and beam histories use
//!   `im-rs` so clones share structure.
//!
//! ## Modules
//!
//! - `core`: Configuration, instances, scheduling state, RNG
//! - `env`: Environments, batching, observations
//! - `nn`: Network traits, encoders, policy oracles
//! - `rollout`: Sampling and beam rollouts, trajectories, inference
//! - `error`: Error types
//! - `logging`: Verbosity-gated log macros
//! - `python`: PyO3 bindings (feature `python`)

pub mod logging;

pub mod core;
pub mod env;
pub mod error;
pub mod nn;
pub mod rollout;

#[cfg(feature = "python")]
pub mod python;

// Re-export commonly used types
pub use crate::core::{
    EnvConfig, JobShopInstance,
    Placement, ScheduleState, Transition, FINISHED_JOB_PENALTY,
    RolloutRng,
};

pub use crate::env::{BatchDriver, Environment, JobMask, Observation, SlotOutcome, StepResult};

pub use crate::error::{Error, InstanceError, OracleError, Result};

pub use crate::nn::{
    EncodedState, PolicyValueNetwork, UniformPolicyZeroValue,
    StateEncoder, JobShopEncoder,
    PolicyOracle, Policy, NetworkOracle,
};

pub use crate::rollout::{
    RolloutConfig,
    SamplingRollout, BeamRollout, infer_next_job,
    Trajectory, TrajectoryStep, BeamTrajectory, BeamStep, BeamCandidate,
};
