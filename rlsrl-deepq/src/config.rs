//! Configuration of the DQN agent.
use anyhow::{Context, Result};
use clap::Args;
use log::info;
use rlsrl_core::TrainConfig;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Arguments specific to the DQN agent.
#[derive(Args, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DeepQArgs {
    /// Enable prioritized experience replay (0 or 1)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub prioritized: u8,

    /// Enable dueling network (0 or 1)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub dueling: u8,

    /// Replay buffer size
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub buffer_size: u64,
}

impl Default for DeepQArgs {
    fn default() -> Self {
        Self {
            prioritized: 1,
            dueling: 1,
            buffer_size: 1000,
        }
    }
}

impl DeepQArgs {
    /// Returns `true` if prioritized experience replay is enabled.
    pub fn is_prioritized(&self) -> bool {
        self.prioritized != 0
    }

    /// Returns `true` if the dueling architecture is enabled.
    pub fn is_dueling(&self) -> bool {
        self.dueling != 0
    }
}

/// Hyperparameters handed to the learning backend.
///
/// Fields are public so that backends outside this crate can read them; use the
/// builder methods to set them.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct LearnParams {
    /// Learning rate.
    pub lr: f64,

    /// The number of environment steps.
    pub max_timesteps: usize,

    /// Capacity of the replay buffer.
    pub buffer_size: usize,

    /// Fraction of the training over which epsilon is annealed.
    pub exploration_fraction: f64,

    /// Final value of epsilon.
    pub exploration_final_eps: f64,

    /// Interval of optimization steps, in environment steps. `0` disables optimization.
    pub train_freq: usize,

    /// The number of environment steps before optimization starts.
    pub learning_starts: usize,

    /// Interval of target network updates, in environment steps.
    pub target_network_update_freq: usize,

    /// Discount factor.
    pub gamma: f64,

    /// Prioritized experience replay.
    pub prioritized_replay: bool,

    /// Interval of progress logs, in episodes. `0` disables the logs.
    pub print_freq: usize,
}

impl Default for LearnParams {
    fn default() -> Self {
        Self {
            lr: 1e-4,
            max_timesteps: 100_000,
            buffer_size: 50_000,
            exploration_fraction: 0.1,
            exploration_final_eps: 0.01,
            train_freq: 4,
            learning_starts: 500,
            target_network_update_freq: 500,
            gamma: 0.99,
            prioritized_replay: false,
            print_freq: 10,
        }
    }
}

impl From<&TrainConfig<DeepQArgs>> for LearnParams {
    /// Takes the timestep budget, the replay buffer size and the prioritized flag
    /// from the configuration, other values are the defaults.
    fn from(config: &TrainConfig<DeepQArgs>) -> Self {
        Self::default()
            .max_timesteps(config.base.num_timesteps)
            .buffer_size(config.algo.buffer_size as usize)
            .prioritized_replay(config.algo.is_prioritized())
    }
}

impl LearnParams {
    /// Learning rate.
    pub fn lr(mut self, v: f64) -> Self {
        self.lr = v;
        self
    }

    /// The number of environment steps.
    pub fn max_timesteps(mut self, v: usize) -> Self {
        self.max_timesteps = v;
        self
    }

    /// Capacity of the replay buffer.
    pub fn buffer_size(mut self, v: usize) -> Self {
        self.buffer_size = v;
        self
    }

    /// Fraction of the training over which epsilon is annealed.
    pub fn exploration_fraction(mut self, v: f64) -> Self {
        self.exploration_fraction = v;
        self
    }

    /// Final value of epsilon.
    pub fn exploration_final_eps(mut self, v: f64) -> Self {
        self.exploration_final_eps = v;
        self
    }

    /// Interval of optimization steps, in environment steps.
    pub fn train_freq(mut self, v: usize) -> Self {
        self.train_freq = v;
        self
    }

    /// The number of environment steps before optimization starts.
    pub fn learning_starts(mut self, v: usize) -> Self {
        self.learning_starts = v;
        self
    }

    /// Interval of target network updates, in environment steps.
    pub fn target_network_update_freq(mut self, v: usize) -> Self {
        self.target_network_update_freq = v;
        self
    }

    /// Discount factor.
    pub fn gamma(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Prioritized experience replay.
    pub fn prioritized_replay(mut self, v: bool) -> Self {
        self.prioritized_replay = v;
        self
    }

    /// Interval of progress logs, in episodes.
    pub fn print_freq(mut self, v: usize) -> Self {
        self.print_freq = v;
        self
    }

    /// Epsilon at environment step `t`, annealed linearly from 1.
    pub fn exploration_eps(&self, t: usize) -> f64 {
        let schedule_steps = self.exploration_fraction * self.max_timesteps as f64;
        let frac = if schedule_steps > 0.0 {
            (t as f64 / schedule_steps).min(1.0)
        } else {
            1.0
        };
        1.0 + frac * (self.exploration_final_eps - 1.0)
    }

    /// Constructs [`LearnParams`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config {}", path.display()))?;
        let rdr = BufReader::new(file);
        let params = serde_yaml::from_reader(rdr)?;
        info!("Load config of DQN agent from {}", path.display());
        Ok(params)
    }

    /// Saves [`LearnParams`] as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create config {}", path.display()))?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of DQN agent into {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlsrl_core::BaseArgs;
    use tempdir::TempDir;

    #[test]
    fn test_from_train_config() {
        let config = TrainConfig::new(
            BaseArgs {
                num_timesteps: 2000,
                ..Default::default()
            },
            DeepQArgs {
                prioritized: 0,
                dueling: 1,
                buffer_size: 5000,
            },
        );
        let params = LearnParams::from(&config);
        assert_eq!(params.max_timesteps, 2000);
        assert_eq!(params.buffer_size, 5000);
        assert!(!params.prioritized_replay);
        assert_eq!(params.lr, 1e-4);
        assert_eq!(params.learning_starts, 500);
        assert_eq!(params.target_network_update_freq, 500);
        assert_eq!(params.train_freq, 4);
        assert_eq!(params.print_freq, 10);
    }

    #[test]
    fn test_exploration_schedule() {
        let params = LearnParams::default().max_timesteps(1000);
        assert_eq!(params.exploration_eps(0), 1.0);
        assert!((params.exploration_eps(50) - 0.505).abs() < 1e-9);
        assert!((params.exploration_eps(100) - 0.01).abs() < 1e-9);
        assert!((params.exploration_eps(900) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_serde_learn_params() -> Result<()> {
        let params = LearnParams::default().gamma(0.9).prioritized_replay(true);
        let dir = TempDir::new("learn_params")?;
        let path = dir.path().join("learn_params.yaml");
        params.save(&path)?;
        assert_eq!(params, LearnParams::load(&path)?);
        Ok(())
    }
}
