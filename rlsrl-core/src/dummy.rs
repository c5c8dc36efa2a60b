//! A small deterministic environment, used for tests.
use crate::{record::Record, Env, EnvConstructor, EnvKwargs, Step};
use anyhow::Result;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Configuration of [`DummyEnv`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DummyEnvConfig {
    /// Shape of an observation.
    pub obs_shape: Vec<usize>,

    /// The number of actions.
    pub n_actions: usize,

    /// The number of steps in an episode.
    pub episode_len: usize,

    /// If `true`, observation values are integers in `0..=255`.
    pub pixels: bool,

    #[serde(skip)]
    closed: Option<Arc<AtomicBool>>,
}

impl Default for DummyEnvConfig {
    fn default() -> Self {
        Self {
            obs_shape: vec![4],
            n_actions: 3,
            episode_len: 10,
            pixels: false,
            closed: None,
        }
    }
}

impl DummyEnvConfig {
    /// Builds the configuration from keyword arguments, missing keys take defaults.
    pub fn from_kwargs(kwargs: &EnvKwargs) -> Result<Self> {
        Ok(serde_yaml::from_value(serde_yaml::Value::Mapping(
            kwargs.clone(),
        ))?)
    }

    /// Sets the shape of an observation.
    pub fn obs_shape(mut self, v: Vec<usize>) -> Self {
        self.obs_shape = v;
        self
    }

    /// Sets the number of actions.
    pub fn n_actions(mut self, v: usize) -> Self {
        self.n_actions = v;
        self
    }

    /// Sets the episode length.
    pub fn episode_len(mut self, v: usize) -> Self {
        self.episode_len = v;
        self
    }

    /// Emits pixel-like observations.
    pub fn pixels(mut self, v: bool) -> Self {
        self.pixels = v;
        self
    }

    /// The flag is set when the environment is closed.
    pub fn closed_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.closed = Some(flag);
        self
    }
}

/// An environment emitting random observations.
///
/// The reward is `1` when the action equals `t % n_actions`, where `t` is the
/// step in the episode, and `0` otherwise.
pub struct DummyEnv {
    config: DummyEnvConfig,
    rng: fastrand::Rng,
    t: usize,
}

impl DummyEnv {
    /// Constructs the environment.
    pub fn new(config: DummyEnvConfig, seed: i64) -> Self {
        Self {
            config,
            rng: fastrand::Rng::with_seed(seed as u64),
            t: 0,
        }
    }

    /// Returns a constructor of the environment.
    pub fn constructor(config: DummyEnvConfig, seed: i64) -> EnvConstructor {
        Box::new(move || -> Result<Box<dyn Env>> { Ok(Box::new(DummyEnv::new(config, seed))) })
    }

    fn observe(&mut self) -> ArrayD<f32> {
        let pixels = self.config.pixels;
        let rng = &self.rng;
        ArrayD::from_shape_simple_fn(self.config.obs_shape.clone(), || {
            if pixels {
                rng.u8(..) as f32
            } else {
                rng.f32() * 2.0 - 1.0
            }
        })
    }
}

impl Env for DummyEnv {
    fn observation_shape(&self) -> Vec<usize> {
        self.config.obs_shape.clone()
    }

    fn n_actions(&self) -> usize {
        self.config.n_actions
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        self.t = 0;
        Ok(self.observe())
    }

    fn step(&mut self, act: i64) -> Result<Step> {
        let reward = if act == (self.t % self.config.n_actions) as i64 {
            1.0
        } else {
            0.0
        };
        self.t += 1;
        let is_terminated = self.t >= self.config.episode_len;
        let obs = self.observe();
        Ok(Step::new(obs, act, reward, is_terminated, false, Record::empty()))
    }

    fn close(&mut self) {
        if let Some(flag) = &self.config.closed {
            flag.store(true, Ordering::SeqCst);
        }
    }
}
