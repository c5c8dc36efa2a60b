//! Trained policy.
use anyhow::Result;
use ndarray::{Array1, ArrayD};
use std::path::Path;

/// A policy produced by a learning backend.
///
/// It maps a batch of observations to a batch of discrete actions and can
/// persist itself. The file format is decided by the backend.
pub trait TrainedPolicy {
    /// Takes actions for a batch of observations.
    ///
    /// The first axis of `obs` is the batch axis.
    fn invoke(&mut self, obs: &ArrayD<f32>) -> Array1<i64>;

    /// Saves the policy to the given path.
    fn save(&self, path: &Path) -> Result<()>;
}
