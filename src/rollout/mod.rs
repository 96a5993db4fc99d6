//! Trajectory search over environments.
//!
//! - [`SamplingRollout`]: samples one job per active slot of a
//!   [`BatchDriver`](crate::env::BatchDriver) until every slot finishes
//! - [`BeamRollout`]: expands one seed environment into a width-`K` beam
//!   ranked by joint probability
//! - [`infer_next_job`]: greedy one-shot choice for a single state
//!
//! Both rollouts consume a [`PolicyOracle`](crate::nn::PolicyOracle) and
//! fail on the first contract violation.

pub mod beam;
pub mod config;
pub mod infer;
pub mod sampling;
pub mod trajectory;

pub use beam::BeamRollout;
pub use config::RolloutConfig;
pub use infer::infer_next_job;
pub use sampling::SamplingRollout;
pub use trajectory::{BeamCandidate, BeamStep, BeamTrajectory, Trajectory, TrajectoryStep};
