//! Vectorized environments and the wrappers of the preprocessing pipeline.
//!
//! A pipeline starts with [`DummyVecEnv`], built from
//! [`EnvConstructor`](crate::EnvConstructor)s, and is extended with
//! [`VecNormalize`] and [`VecFrameStack`]:
//!
//! ```text
//! DummyVecEnv -> (VecNormalize) -> VecFrameStack
//! ```
mod dummy_vec_env;
mod frame_stack;
mod normalize;
mod running_mean_std;
use crate::VecStep;
use anyhow::Result;
pub use dummy_vec_env::DummyVecEnv;
pub use frame_stack::VecFrameStack;
use ndarray::ArrayD;
pub use normalize::VecNormalize;
pub use running_mean_std::RunningMeanStd;

/// A batch of environments stepped together.
///
/// Observations carry a leading batch axis of length [`VecEnv::num_envs`].
/// Environments whose episode ends are reset automatically.
pub trait VecEnv {
    /// The number of environments.
    fn num_envs(&self) -> usize;

    /// Shape of the observation of a single environment.
    fn observation_shape(&self) -> Vec<usize>;

    /// The number of discrete actions.
    fn n_actions(&self) -> usize;

    /// Resets all environments.
    fn reset(&mut self) -> Result<ArrayD<f32>>;

    /// Steps all environments, one action per environment.
    fn step(&mut self, acts: &[i64]) -> Result<VecStep>;

    /// Releases resources of all environments. Idempotent.
    fn close(&mut self);
}

impl<V: VecEnv + ?Sized> VecEnv for Box<V> {
    fn num_envs(&self) -> usize {
        (**self).num_envs()
    }

    fn observation_shape(&self) -> Vec<usize> {
        (**self).observation_shape()
    }

    fn n_actions(&self) -> usize {
        (**self).n_actions()
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        (**self).reset()
    }

    fn step(&mut self, acts: &[i64]) -> Result<VecStep> {
        (**self).step(acts)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
