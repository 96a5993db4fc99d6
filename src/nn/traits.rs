//! Network-facing traits for policy and value prediction.
//!
//! A [`PolicyValueNetwork`] sees only flat tensors. Masking, batching and
//! contract checks happen in [`NetworkOracle`](super::oracle::NetworkOracle).

use serde::{Deserialize, Serialize};

/// Encoded observation as a flat tensor for network input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncodedState {
    /// Flattened tensor data (row-major order).
    pub tensor: Vec<f32>,

    /// Shape of the tensor.
    pub shape: Vec<usize>,
}

impl EncodedState {
    pub fn new(tensor: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(
            tensor.len(),
            shape.iter().product::<usize>(),
            "Tensor length must match shape product"
        );
        Self { tensor, shape }
    }

    /// Zero-filled tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size = shape.iter().product();
        Self {
            tensor: vec![0.0; size],
            shape,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }
}

/// Combined policy-value network.
///
/// `predict` returns one unnormalized-or-normalized weight per job and a
/// scalar value estimate. The oracle adapter masks finished jobs and
/// renormalizes, so the network may put mass anywhere.
pub trait PolicyValueNetwork: Send + Sync {
    fn predict(&self, encoded: &EncodedState) -> (Vec<f32>, f32);

    /// Batch prediction; override when the backend batches natively.
    fn predict_batch(&self, encoded: &[EncodedState]) -> Vec<(Vec<f32>, f32)> {
        encoded.iter().map(|e| self.predict(e)).collect()
    }
}

/// Uniform policy over every job and a zero value.
#[derive(Clone, Debug, Default)]
pub struct UniformPolicyZeroValue {
    action_space_size: usize,
}

impl UniformPolicyZeroValue {
    pub fn new(action_space_size: usize) -> Self {
        Self { action_space_size }
    }
}

impl PolicyValueNetwork for UniformPolicyZeroValue {
    fn predict(&self, _encoded: &EncodedState) -> (Vec<f32>, f32) {
        let policy = if self.action_space_size == 0 {
            vec![]
        } else {
            vec![1.0 / self.action_space_size as f32; self.action_space_size]
        };
        (policy, 0.0)
    }
}
