//! DQN agent.
use crate::{DeepQArgs, DeepQBackend, LearnParams, OutDim, QFuncConfig};
use anyhow::Result;
use clap::{Args, Command};
use log::info;
use ndarray::{ArrayD, Axis};
use rlsrl_core::{
    vec_env::{DummyVecEnv, VecEnv, VecFrameStack, VecNormalize},
    EnvFactory, EnvKwargs, ProgressCallback, RlAlgorithm, Session, TrainConfig, TrainedPolicy,
    TrainingLocals, VecStep,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

const NOT_READY: &str = "must train or load model before use";

/// Preprocessing pipeline of a training run.
pub enum EnvPipeline {
    /// Features of a state representation model, normalized with running statistics.
    Srl(VecFrameStack<VecNormalize<DummyVecEnv>>),

    /// Raw pixels, scaled to `[0, 1]` after frame stacking.
    Pixels(VecFrameStack<DummyVecEnv>),
}

impl EnvPipeline {
    /// Returns `true` if observations are normalized with running statistics.
    pub fn is_normalized(&self) -> bool {
        matches!(self, Self::Srl(_))
    }

    /// Returns `true` if stacked frames are scaled by `1 / 255`.
    pub fn is_pixel_normalized(&self) -> bool {
        match self {
            Self::Srl(env) => env.is_normalized(),
            Self::Pixels(env) => env.is_normalized(),
        }
    }

    /// Saves the normalization statistics into `dir`, if any.
    pub fn save_running_average(&self, dir: &Path) -> Result<()> {
        match self {
            Self::Srl(env) => env.get_ref().save_running_average(dir),
            Self::Pixels(_) => Ok(()),
        }
    }

    fn as_vec_env(&mut self) -> &mut dyn VecEnv {
        match self {
            Self::Srl(env) => env as &mut dyn VecEnv,
            Self::Pixels(env) => env as &mut dyn VecEnv,
        }
    }
}

impl VecEnv for EnvPipeline {
    fn num_envs(&self) -> usize {
        match self {
            Self::Srl(env) => env.num_envs(),
            Self::Pixels(env) => env.num_envs(),
        }
    }

    fn observation_shape(&self) -> Vec<usize> {
        match self {
            Self::Srl(env) => env.observation_shape(),
            Self::Pixels(env) => env.observation_shape(),
        }
    }

    fn n_actions(&self) -> usize {
        match self {
            Self::Srl(env) => env.n_actions(),
            Self::Pixels(env) => env.n_actions(),
        }
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        self.as_vec_env().reset()
    }

    fn step(&mut self, acts: &[i64]) -> Result<VecStep> {
        self.as_vec_env().step(acts)
    }

    fn close(&mut self) {
        self.as_vec_env().close()
    }
}

/// DQN agent delegating training to a [`DeepQBackend`].
///
/// A new agent holds no model. It becomes usable after [`RlAlgorithm::train`]
/// or [`RlAlgorithm::load`]; calling [`DeepQ::act`] or saving before that panics.
pub struct DeepQ<B: DeepQBackend> {
    model: Option<B::Policy>,
}

impl<B: DeepQBackend> Default for DeepQ<B> {
    fn default() -> Self {
        Self { model: None }
    }
}

impl<B: DeepQBackend> DeepQ<B> {
    /// Constructs an agent without a model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the agent holds a model.
    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    /// Path of the checkpoint written at the end of training.
    pub fn checkpoint_path(log_dir: &Path) -> PathBuf {
        log_dir.join(format!("deepq_model_end.{}", B::EXTENSION))
    }

    /// Takes the action for a single observation, without a batch axis.
    pub fn act(&mut self, obs: &ArrayD<f32>) -> i64 {
        let model = match self.model.as_mut() {
            Some(model) => model,
            None => panic!("{}", NOT_READY),
        };
        let batch = obs.clone().insert_axis(Axis(0));
        model.invoke(&batch)[0]
    }

    /// Builds the environment and selects the Q-function.
    ///
    /// With a state representation model, features are normalized with running
    /// statistics and fed to an MLP. Otherwise raw pixels are scaled to `[0, 1]`
    /// after frame stacking and fed to a CNN.
    pub fn build_env(
        config: &TrainConfig<DeepQArgs>,
        envs: &dyn EnvFactory,
        env_kwargs: Option<&EnvKwargs>,
    ) -> Result<(EnvPipeline, QFuncConfig)> {
        let base = &config.base;
        let ctor = envs.make_env(
            &base.env,
            base.seed,
            0,
            Some(base.log_dir.as_path()),
            env_kwargs,
        )?;
        let venv = DummyVecEnv::new(vec![ctor])?;
        let n_stack = base.num_stack as usize;

        let (env, mut q_func) = if base.uses_srl_model() {
            info!("Use MLP on features of {}", base.srl_model);
            let env = VecFrameStack::new(VecNormalize::new(venv), n_stack, false)?;
            (EnvPipeline::Srl(env), QFuncConfig::mlp_64_64())
        } else {
            info!("Use CNN on raw pixels");
            let env = VecFrameStack::new(venv, n_stack, true)?;
            (
                EnvPipeline::Pixels(env),
                QFuncConfig::atari_cnn(config.algo.is_dueling()),
            )
        };
        q_func.set_out_dim(env.n_actions() as i64);

        Ok((env, q_func))
    }
}

impl<B: DeepQBackend> RlAlgorithm for DeepQ<B> {
    type Args = DeepQArgs;
    type Policy = B::Policy;

    /// Adds `--prioritized`, `--dueling` and `--buffer-size`.
    fn custom_arguments(cmd: Command) -> Command {
        DeepQArgs::augment_args(cmd)
    }

    fn train(
        &mut self,
        config: &TrainConfig<DeepQArgs>,
        envs: &dyn EnvFactory,
        callback: &mut ProgressCallback<'_, B::Policy>,
        env_kwargs: Option<&EnvKwargs>,
    ) -> Result<()> {
        let log_dir = config.base.log_dir.as_path();
        // Dropping the pipeline closes the environment on early returns
        let (mut env, q_func) = Self::build_env(config, envs, env_kwargs)?;
        let session = Session::ensure_initialized()?;

        fs::create_dir_all(log_dir)?;
        config.save(log_dir.join("args.yaml"))?;

        let params = LearnParams::from(config);
        info!(
            "Train DQN on {} for {} steps",
            config.base.env, params.max_timesteps
        );
        let policy = B::learn(&mut env, &q_func, &params, session, callback)?;
        self.model = Some(policy);

        self.save(&Self::checkpoint_path(log_dir), None)?;
        env.save_running_average(log_dir)?;
        env.close();
        Ok(())
    }

    fn get_action(&mut self, obs: &ArrayD<f32>) -> i64 {
        self.act(obs)
    }

    fn save(&mut self, path: &Path, locals: Option<&TrainingLocals<'_, B::Policy>>) -> Result<()> {
        if self.model.is_none() {
            if let Some(locals) = locals {
                self.model = Some(locals.policy().clone());
            }
        }
        match self.model.as_ref() {
            Some(model) => {
                info!("Save DQN model into {}", path.display());
                model.save(path)
            }
            None => panic!("{}", NOT_READY),
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let model = B::load(path)?;
        info!("Load DQN model from {}", path.display());
        Ok(Self { model: Some(model) })
    }
}
