//! Environment.
use super::Step;
use anyhow::Result;
use ndarray::ArrayD;

/// Represents a single simulated environment with a discrete action space.
///
/// Instances are created through an [`EnvFactory`](crate::EnvFactory) and are
/// usually consumed through a [`VecEnv`](crate::vec_env::VecEnv) pipeline.
pub trait Env {
    /// Shape of a single observation.
    fn observation_shape(&self) -> Vec<usize>;

    /// The number of discrete actions.
    fn n_actions(&self) -> usize;

    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> Result<ArrayD<f32>>;

    /// Performes an environment step.
    fn step(&mut self, act: i64) -> Result<Step>;

    /// Releases resources held by the environment.
    ///
    /// Calling this method more than once must be harmless.
    fn close(&mut self) {}
}
