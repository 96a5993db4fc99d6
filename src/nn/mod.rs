//! Policy/value model integration.
//!
//! ## Overview
//!
//! - **Traits**: `PolicyValueNetwork` over flat `EncodedState` tensors
//! - **Encoding**: `StateEncoder` trait and the `JobShopEncoder` implementation
//! - **Oracle**: `PolicyOracle`, the batched contract the rollouts consume,
//!   and `NetworkOracle`, which adapts a network to it
//! - **Baseline**: `UniformPolicyZeroValue` / `NetworkOracle::uniform`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use jobshop_rl::nn::{JobShopEncoder, NetworkOracle, PolicyOracle};
//!
//! let oracle = NetworkOracle::new(network, JobShopEncoder::new(config));
//! let embedding = oracle.embed(&observations)?;
//! let (policy, values) = oracle.evaluate(&observations, &embedding, &masks)?;
//! ```

pub mod encoder;
pub mod oracle;
pub mod traits;

pub use encoder::{JobShopEncoder, StateEncoder};
pub use oracle::{masked_distribution, validate_policy, NetworkOracle, Policy, PolicyOracle};
pub use traits::{EncodedState, PolicyValueNetwork, UniformPolicyZeroValue};
