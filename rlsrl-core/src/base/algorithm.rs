//! Uniform interface of RL algorithms.
use super::TrainedPolicy;
use crate::{
    args::TrainConfig,
    record::{Record, Recorder},
    EnvFactory, EnvKwargs,
};
use anyhow::Result;
use clap::{Command, FromArgMatches};
use ndarray::ArrayD;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, path::Path};

/// Tells the learning backend whether to go on after a callback invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackControl {
    /// Keep training.
    Continue,

    /// Stop training and return the current policy.
    Stop,
}

/// A snapshot of a training run, handed to the progress callback.
///
/// It exposes the policy being trained, so that the caller can persist it
/// in the middle of training with [`RlAlgorithm::save`].
pub struct TrainingLocals<'a, P> {
    policy: &'a P,
    env_steps: usize,
    episodes: usize,
    record: Record,
}

impl<'a, P> TrainingLocals<'a, P> {
    /// Constructs a snapshot.
    pub fn new(policy: &'a P, env_steps: usize, episodes: usize, record: Record) -> Self {
        Self {
            policy,
            env_steps,
            episodes,
            record,
        }
    }

    /// The policy being trained.
    pub fn policy(&self) -> &'a P {
        self.policy
    }

    /// The number of environment steps done so far.
    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    /// The number of finished episodes.
    pub fn episodes(&self) -> usize {
        self.episodes
    }

    /// Progress values reported by the backend.
    pub fn record(&self) -> &Record {
        &self.record
    }
}

/// Progress callback invoked synchronously by a learning backend.
///
/// Invocations never overlap. The cadence is decided by the backend.
pub type ProgressCallback<'a, P> = dyn FnMut(&TrainingLocals<'_, P>) -> CallbackControl + 'a;

/// Returns a progress callback writing every record to `recorder`.
///
/// Training is never stopped by the returned callback.
///
/// ```
/// use rlsrl_core::{record::{BufferedRecorder, Record}, recording_callback, TrainingLocals};
///
/// let mut recorder = BufferedRecorder::new();
/// {
///     let mut callback = recording_callback(&mut recorder);
///     callback(&TrainingLocals::new(&(), 1, 0, Record::from_scalar("steps", 1.0)));
/// }
/// assert_eq!(recorder.len(), 1);
/// ```
pub fn recording_callback<'a, P, R>(
    recorder: &'a mut R,
) -> impl FnMut(&TrainingLocals<'_, P>) -> CallbackControl + 'a
where
    R: Recorder + ?Sized,
{
    move |locals| {
        recorder.write(locals.record().clone());
        CallbackControl::Continue
    }
}

/// An RL algorithm driven by the experiment harness.
///
/// The lifecycle is: construct an empty object, then either [`train`] or
/// [`load`] it, then take actions with [`get_action`] and persist it with
/// [`save`]. Taking actions or saving before a model exists is a programming
/// error and panics.
///
/// [`train`]: RlAlgorithm::train
/// [`load`]: RlAlgorithm::load
/// [`get_action`]: RlAlgorithm::get_action
/// [`save`]: RlAlgorithm::save
pub trait RlAlgorithm: Sized {
    /// Algorithm-specific arguments.
    type Args: FromArgMatches + Serialize + DeserializeOwned + Clone + Debug;

    /// Policy produced by training.
    type Policy: TrainedPolicy + Clone;

    /// Registers the algorithm-specific arguments on the harness command.
    fn custom_arguments(cmd: Command) -> Command;

    /// Trains a model and keeps it in the object.
    fn train(
        &mut self,
        config: &TrainConfig<Self::Args>,
        envs: &dyn EnvFactory,
        callback: &mut ProgressCallback<'_, Self::Policy>,
        env_kwargs: Option<&EnvKwargs>,
    ) -> Result<()>;

    /// Takes an action for a single observation.
    fn get_action(&mut self, obs: &ArrayD<f32>) -> i64;

    /// Saves the model.
    ///
    /// If no model is held yet, the policy in `locals` is adopted first.
    fn save(&mut self, path: &Path, locals: Option<&TrainingLocals<'_, Self::Policy>>)
        -> Result<()>;

    /// Loads a model saved with [`RlAlgorithm::save`].
    fn load(path: &Path) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BufferedRecorder, NullRecorder};

    #[test]
    fn test_recording_callback() -> Result<()> {
        let mut recorder = BufferedRecorder::new();
        {
            let mut callback = recording_callback(&mut recorder);
            for t in 1..=3 {
                let record = Record::from_scalar("steps", t as f32);
                let locals = TrainingLocals::new(&0u8, t, 0, record);
                assert_eq!(callback(&locals), CallbackControl::Continue);
            }
        }
        assert_eq!(recorder.len(), 3);
        let steps = recorder
            .iter()
            .map(|r| r.get_scalar("steps"))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(steps, vec![1.0, 2.0, 3.0]);

        let mut null: Box<dyn Recorder> = Box::new(NullRecorder::default());
        let mut callback = recording_callback(null.as_mut());
        let locals = TrainingLocals::new(&0u8, 1, 0, Record::empty());
        assert_eq!(callback(&locals), CallbackControl::Continue);
        Ok(())
    }
}
