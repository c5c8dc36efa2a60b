//! Environment step.
use crate::record::Record;
use ndarray::ArrayD;

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
#[derive(Debug, Clone)]
pub struct Step {
    /// Action.
    pub act: i64,

    /// Observation.
    pub obs: ArrayD<f32>,

    /// Reward.
    pub reward: f32,

    /// Flag denoting if episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if episode is truncated.
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: Record,
}

impl Step {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: ArrayD<f32>,
        act: i64,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: Record,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}

/// A step of a vectorized environment.
///
/// The first axis of `obs` and the elements of `reward` and `is_done`
/// correspond to the environments.
#[derive(Debug, Clone)]
pub struct VecStep {
    /// Observations, with a leading batch axis.
    pub obs: ArrayD<f32>,

    /// Rewards.
    pub reward: Vec<f32>,

    /// `1` where the episode of the environment has ended.
    pub is_done: Vec<i8>,

    /// Information of the environments.
    pub record: Record,
}

impl VecStep {
    /// Returns `true` if the episode of the `i`-th environment has ended.
    pub fn is_done(&self, i: usize) -> bool {
        self.is_done[i] == 1
    }
}
