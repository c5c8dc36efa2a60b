//! Interface of learning backends.
use crate::{LearnParams, QFuncConfig};
use anyhow::Result;
use rlsrl_core::{vec_env::VecEnv, ProgressCallback, Session, TrainedPolicy};
use std::path::Path;

/// An implementation of deep Q-learning.
///
/// The Q-learning update, the networks and the replay buffer live behind this
/// trait. [`DeepQ`](crate::DeepQ) only prepares the environment and the
/// hyperparameters and keeps the resulting policy.
pub trait DeepQBackend {
    /// The trained policy.
    type Policy: TrainedPolicy + Clone;

    /// File extension of saved policies.
    const EXTENSION: &'static str;

    /// Runs the training loop and returns the trained policy.
    ///
    /// `callback` is invoked synchronously while training. Training stops early
    /// when it returns [`CallbackControl::Stop`](rlsrl_core::CallbackControl::Stop).
    fn learn(
        env: &mut dyn VecEnv,
        q_func: &QFuncConfig,
        params: &LearnParams,
        session: &Session,
        callback: &mut ProgressCallback<'_, Self::Policy>,
    ) -> Result<Self::Policy>;

    /// Loads a policy saved with [`TrainedPolicy::save`].
    fn load(path: &Path) -> Result<Self::Policy>;
}
