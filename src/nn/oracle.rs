//! Policy oracles: the seam between the rollouts and a policy/value model.
//!
//! ## Contract
//!
//! An oracle is queried with a batch of observations and one finished-job
//! mask per observation. For every row it must return a probability
//! simplex over the jobs with zero mass on masked jobs, plus the log of
//! each probability. The rollouts check every row they act on with
//! [`validate_policy`] and never repair a bad row.
//!
//! [`NetworkOracle`] adapts any [`PolicyValueNetwork`] to this contract by
//! masking and renormalizing the network's raw output.

use serde::{Deserialize, Serialize};

use super::encoder::{JobShopEncoder, StateEncoder};
use super::traits::{EncodedState, PolicyValueNetwork, UniformPolicyZeroValue};
use crate::core::EnvConfig;
use crate::env::{JobMask, Observation};
use crate::error::OracleError;

/// Per-row action distributions for one batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// `[row][job]` probabilities.
    pub probabilities: Vec<Vec<f64>>,

    /// `[row][job]` natural logs of `probabilities`.
    pub log_probabilities: Vec<Vec<f64>>,
}

impl Policy {
    /// Build a policy from probabilities, deriving the logs.
    pub fn from_probabilities(probabilities: Vec<Vec<f64>>) -> Self {
        let log_probabilities = probabilities
            .iter()
            .map(|row| row.iter().map(|p| p.ln()).collect())
            .collect();
        Self {
            probabilities,
            log_probabilities,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Shannon entropy (nats) of one row.
    #[must_use]
    pub fn entropy(&self, row: usize) -> f64 {
        self.probabilities[row]
            .iter()
            .filter(|&&p| p > 0.0)
            .map(|&p| -p * p.ln())
            .sum()
    }
}

/// A batched policy/value model.
///
/// `embed` may be computed once per rollout and reused across steps when
/// the caller enables embedding caching, so implementations must not
/// depend on the embedding reflecting the current step.
pub trait PolicyOracle {
    /// Opaque per-batch embedding.
    type Embedding;

    fn embed(&self, observations: &[Observation]) -> Result<Self::Embedding, OracleError>;

    fn act(
        &self,
        observations: &[Observation],
        embedding: &Self::Embedding,
        masks: &[JobMask],
    ) -> Result<Policy, OracleError>;

    /// One scalar value estimate per row.
    fn value(
        &self,
        observations: &[Observation],
        embedding: &Self::Embedding,
    ) -> Result<Vec<f64>, OracleError>;

    /// Policy and values for one batch.
    ///
    /// The rollouts call this once per iteration. The default runs `act`
    /// then `value`; backends that produce both from one forward pass
    /// should override it.
    fn evaluate(
        &self,
        observations: &[Observation],
        embedding: &Self::Embedding,
        masks: &[JobMask],
    ) -> Result<(Policy, Vec<f64>), OracleError> {
        let policy = self.act(observations, embedding, masks)?;
        let values = self.value(observations, embedding)?;
        Ok((policy, values))
    }
}

/// Check an oracle's output for the rows listed in `rows`.
///
/// Every row must have one entry per mask slot. Checked rows must hold
/// finite non-negative probabilities summing to 1 within `tolerance`, with
/// positive mass on at least one unmasked job.
pub fn validate_policy(
    policy: &Policy,
    masks: &[JobMask],
    rows: &[usize],
    tolerance: f64,
) -> Result<(), OracleError> {
    if policy.probabilities.len() != masks.len() {
        return Err(OracleError::BatchSize {
            expected: masks.len(),
            actual: policy.probabilities.len(),
        });
    }
    if policy.log_probabilities.len() != masks.len() {
        return Err(OracleError::BatchSize {
            expected: masks.len(),
            actual: policy.log_probabilities.len(),
        });
    }

    for &slot in rows {
        let probs = &policy.probabilities[slot];
        let mask = &masks[slot];
        for actual in [probs.len(), policy.log_probabilities[slot].len()] {
            if actual != mask.len() {
                return Err(OracleError::ActionCount {
                    slot,
                    expected: mask.len(),
                    actual,
                });
            }
        }

        if let Some((action, &value)) = probs
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(OracleError::InvalidProbability {
                slot,
                action,
                value,
            });
        }

        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(OracleError::NotNormalized { slot, sum });
        }

        let valid_mass: f64 = probs
            .iter()
            .zip(mask)
            .filter(|&(_, &masked)| !masked)
            .map(|(p, _)| p)
            .sum();
        if valid_mass <= 0.0 {
            return Err(OracleError::NoValidMass { slot });
        }
    }
    Ok(())
}

/// Mask a raw weight vector and renormalize the unmasked mass.
///
/// Negative and non-finite weights count as zero. A row with no unmasked
/// mass comes back all zeros.
pub fn masked_distribution(weights: &[f32], mask: &[bool]) -> Vec<f64> {
    let mut probs: Vec<f64> = weights
        .iter()
        .zip(mask)
        .map(|(&w, &masked)| {
            let w = f64::from(w);
            if masked || !w.is_finite() || w < 0.0 {
                0.0
            } else {
                w
            }
        })
        .collect();
    let total: f64 = probs.iter().sum();
    if total > 0.0 {
        probs.iter_mut().for_each(|p| *p /= total);
    }
    probs
}

/// [`PolicyOracle`] backed by a [`PolicyValueNetwork`] and a [`StateEncoder`].
///
/// The embedding is the encoded batch; `act` runs the network on fresh
/// encodings so a cached embedding never goes stale. Observations whose
/// shape the encoder does not accept fail with
/// [`OracleError::ObservationShape`].
#[derive(Clone, Debug)]
pub struct NetworkOracle<N, E> {
    network: N,
    encoder: E,
}

impl<N: PolicyValueNetwork, E: StateEncoder> NetworkOracle<N, E> {
    pub fn new(network: N, encoder: E) -> Self {
        Self { network, encoder }
    }

    #[must_use]
    pub fn network(&self) -> &N {
        &self.network
    }

    #[must_use]
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    fn encode_batch(&self, observations: &[Observation]) -> Result<Vec<EncodedState>, OracleError> {
        observations
            .iter()
            .enumerate()
            .map(|(slot, observation)| {
                if self.encoder.fits(observation) {
                    Ok(self.encoder.encode(observation))
                } else {
                    Err(OracleError::ObservationShape { slot })
                }
            })
            .collect()
    }

    fn forward(&self, observations: &[Observation]) -> Result<Vec<(Vec<f32>, f32)>, OracleError> {
        let encoded = self.encode_batch(observations)?;
        let outputs = self.network.predict_batch(&encoded);
        if outputs.len() != observations.len() {
            return Err(OracleError::BatchSize {
                expected: observations.len(),
                actual: outputs.len(),
            });
        }
        Ok(outputs)
    }

    fn masked_policy(
        &self,
        outputs: &[(Vec<f32>, f32)],
        masks: &[JobMask],
    ) -> Result<Policy, OracleError> {
        if masks.len() != outputs.len() {
            return Err(OracleError::BatchSize {
                expected: outputs.len(),
                actual: masks.len(),
            });
        }
        let expected = self.encoder.action_space_size();
        let mut probabilities = Vec::with_capacity(outputs.len());
        for (slot, ((weights, _), mask)) in outputs.iter().zip(masks).enumerate() {
            if weights.len() != expected {
                return Err(OracleError::ActionCount {
                    slot,
                    expected,
                    actual: weights.len(),
                });
            }
            probabilities.push(masked_distribution(weights, mask));
        }
        Ok(Policy::from_probabilities(probabilities))
    }
}

impl NetworkOracle<UniformPolicyZeroValue, JobShopEncoder> {
    /// Uniform over unfinished jobs, zero value.
    pub fn uniform(config: EnvConfig) -> Self {
        Self::new(
            UniformPolicyZeroValue::new(config.max_jobs),
            JobShopEncoder::new(config),
        )
    }
}

impl<N: PolicyValueNetwork, E: StateEncoder> PolicyOracle for NetworkOracle<N, E> {
    type Embedding = Vec<EncodedState>;

    fn embed(&self, observations: &[Observation]) -> Result<Self::Embedding, OracleError> {
        self.encode_batch(observations)
    }

    fn act(
        &self,
        observations: &[Observation],
        _embedding: &Self::Embedding,
        masks: &[JobMask],
    ) -> Result<Policy, OracleError> {
        self.masked_policy(&self.forward(observations)?, masks)
    }

    fn value(
        &self,
        observations: &[Observation],
        _embedding: &Self::Embedding,
    ) -> Result<Vec<f64>, OracleError> {
        Ok(self
            .forward(observations)?
            .into_iter()
            .map(|(_, value)| f64::from(value))
            .collect())
    }

    fn evaluate(
        &self,
        observations: &[Observation],
        _embedding: &Self::Embedding,
        masks: &[JobMask],
    ) -> Result<(Policy, Vec<f64>), OracleError> {
        let outputs = self.forward(observations)?;
        let policy = self.masked_policy(&outputs, masks)?;
        let values = outputs.iter().map(|&(_, value)| f64::from(value)).collect();
        Ok((policy, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobShopInstance;
    use crate::env::Environment;
    use smallvec::smallvec;

    fn observation_after(actions: &[usize]) -> Observation {
        let instance = JobShopInstance::new(
            vec![vec![0, 1], vec![1, 0], vec![0, 1]],
            vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]],
        )
        .unwrap();
        let mut env = Environment::from_instance(instance);
        let mut obs = env.reset().unwrap();
        for &a in actions {
            obs = env.step(a).unwrap().observation;
        }
        obs
    }

    #[test]
    fn test_masked_distribution() {
        let probs = masked_distribution(&[0.2, 0.3, 0.5], &[false, true, false]);
        assert!((probs[0] - 0.2 / 0.7).abs() < 1e-6);
        assert_eq!(probs[1], 0.0);
        assert!((probs[2] - 0.5 / 0.7).abs() < 1e-6);

        let probs = masked_distribution(&[f32::NAN, -1.0, 2.0], &[false, false, false]);
        assert_eq!(probs, vec![0.0, 0.0, 1.0]);

        let probs = masked_distribution(&[1.0, 1.0], &[true, true]);
        assert_eq!(probs, vec![0.0, 0.0]);
    }

    #[test]
    fn test_uniform_oracle_masks_finished_jobs() {
        let obs = observation_after(&[0, 0]);
        let oracle = NetworkOracle::uniform(obs.instance().env_config());
        let observations = vec![obs];
        let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();

        let embedding = oracle.embed(&observations).unwrap();
        let policy = oracle.act(&observations, &embedding, &masks).unwrap();

        assert_eq!(policy.probabilities[0], vec![0.0, 0.5, 0.5]);
        assert_eq!(policy.log_probabilities[0][0], f64::NEG_INFINITY);
        assert!((policy.log_probabilities[0][1] - 0.5f64.ln()).abs() < 1e-12);
        assert!(validate_policy(&policy, &masks, &[0], 1e-6).is_ok());
        assert_eq!(oracle.value(&observations, &embedding).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_evaluate_matches_act_and_value() {
        let observations = vec![observation_after(&[]), observation_after(&[1, 1])];
        let oracle = NetworkOracle::uniform(observations[0].instance().env_config());
        let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();
        let embedding = oracle.embed(&observations).unwrap();

        let (policy, values) = oracle.evaluate(&observations, &embedding, &masks).unwrap();

        assert_eq!(policy, oracle.act(&observations, &embedding, &masks).unwrap());
        assert_eq!(values, oracle.value(&observations, &embedding).unwrap());
    }

    #[test]
    fn test_wrong_shape_is_an_oracle_error() {
        let small = {
            let instance = JobShopInstance::new(
                vec![vec![0, 1], vec![1, 0]],
                vec![vec![1.0, 1.0], vec![1.0, 1.0]],
            )
            .unwrap();
            let mut env = Environment::from_instance(instance);
            env.reset().unwrap()
        };
        let observations = vec![observation_after(&[]), small];
        let masks: Vec<JobMask> = observations.iter().map(Observation::mask).collect();
        let oracle = NetworkOracle::uniform(EnvConfig::new(3, 2, 2));

        assert!(matches!(
            oracle.embed(&observations),
            Err(OracleError::ObservationShape { slot: 1 })
        ));
        assert!(matches!(
            oracle.act(&observations, &Vec::new(), &masks),
            Err(OracleError::ObservationShape { slot: 1 })
        ));
        assert!(matches!(
            oracle.value(&observations, &Vec::new()),
            Err(OracleError::ObservationShape { slot: 1 })
        ));
    }

    #[test]
    fn test_entropy() {
        let policy = Policy::from_probabilities(vec![vec![0.5, 0.5, 0.0], vec![1.0, 0.0, 0.0]]);
        assert!((policy.entropy(0) - 2f64.ln()).abs() < 1e-12);
        assert_eq!(policy.entropy(1), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_rows() {
        let masks: Vec<JobMask> = vec![smallvec![false, false]; 2];

        let short = Policy::from_probabilities(vec![vec![1.0, 0.0]]);
        assert!(matches!(
            validate_policy(&short, &masks, &[0], 1e-6),
            Err(OracleError::BatchSize { expected: 2, actual: 1 })
        ));

        let wide = Policy::from_probabilities(vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0]]);
        assert!(matches!(
            validate_policy(&wide, &masks, &[0, 1], 1e-6),
            Err(OracleError::ActionCount { slot: 0, .. })
        ));

        let nan = Policy::from_probabilities(vec![vec![1.0, 0.0], vec![f64::NAN, 1.0]]);
        assert!(matches!(
            validate_policy(&nan, &masks, &[0, 1], 1e-6),
            Err(OracleError::InvalidProbability { slot: 1, action: 0, .. })
        ));

        let negative = Policy::from_probabilities(vec![vec![1.5, -0.5], vec![1.0, 0.0]]);
        assert!(matches!(
            validate_policy(&negative, &masks, &[0], 1e-6),
            Err(OracleError::InvalidProbability { slot: 0, action: 1, .. })
        ));

        let unnormalized = Policy::from_probabilities(vec![vec![0.4, 0.4], vec![1.0, 0.0]]);
        assert!(matches!(
            validate_policy(&unnormalized, &masks, &[0], 1e-6),
            Err(OracleError::NotNormalized { slot: 0, .. })
        ));
    }

    #[test]
    fn test_validate_requires_valid_mass() {
        let masks: Vec<JobMask> = vec![smallvec![true, false]];
        let policy = Policy::from_probabilities(vec![vec![1.0, 0.0]]);
        assert!(matches!(
            validate_policy(&policy, &masks, &[0], 1e-6),
            Err(OracleError::NoValidMass { slot: 0 })
        ));
    }

    #[test]
    fn test_validate_skips_unlisted_rows() {
        let masks: Vec<JobMask> = vec![smallvec![true, true], smallvec![false, false]];
        let policy = Policy::from_probabilities(vec![vec![0.0, 0.0], vec![0.5, 0.5]]);
        assert!(validate_policy(&policy, &masks, &[1], 1e-6).is_ok());
    }
}
