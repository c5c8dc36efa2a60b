//! A linear learning backend, used for tests.
use crate::{DeepQBackend, LearnParams, OutDim, QFuncConfig};
use anyhow::{bail, Result};
use log::{info, trace};
use ndarray::{Array1, Array2, ArrayD, Axis};
use rlsrl_core::{
    record::{Record, RecordValue},
    vec_env::VecEnv,
    CallbackControl, ProgressCallback, Session, TrainedPolicy, TrainingLocals,
};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufWriter, Read},
    path::Path,
};

const SEED: u64 = 42;

/// Greedy policy on linear action values.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DummyPolicy {
    // [in_dim, n_actions]
    weights: Array2<f32>,
}

impl DummyPolicy {
    /// Constructs a policy with random weights.
    pub fn new(in_dim: usize, n_actions: usize, seed: u64) -> Self {
        let rng = fastrand::Rng::with_seed(seed);
        let weights = Array2::from_shape_simple_fn((in_dim, n_actions), || rng.f32() - 0.5);
        Self { weights }
    }

    fn flatten(&self, obs: &ArrayD<f32>) -> Array2<f32> {
        let batch_size = obs.len_of(Axis(0));
        let in_dim = self.weights.nrows();
        assert_eq!(
            obs.len(),
            batch_size * in_dim,
            "policy takes observations of {} values",
            in_dim
        );
        let flat: Vec<f32> = obs.iter().cloned().collect();
        Array2::from_shape_fn((batch_size, in_dim), |(i, j)| flat[i * in_dim + j])
    }

    /// Moves the values of the taken actions toward the rewards.
    fn update(&mut self, obs: &ArrayD<f32>, acts: &[i64], rewards: &[f32], lr: f32) {
        let x = self.flatten(obs);
        for (i, (&a, &r)) in acts.iter().zip(rewards.iter()).enumerate() {
            let x = x.row(i);
            let q = x.dot(&self.weights.column(a as usize));
            self.weights
                .column_mut(a as usize)
                .scaled_add(lr * (r - q), &x);
        }
    }
}

impl TrainedPolicy for DummyPolicy {
    fn invoke(&mut self, obs: &ArrayD<f32>) -> Array1<i64> {
        let q = self.flatten(obs).dot(&self.weights);
        q.outer_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::MIN), |best, (a, &v)| if v > best.1 { (a, v) } else { best })
                    .0 as i64
            })
            .collect()
    }

    fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(writer, self)?;
        Ok(())
    }
}

/// Trains a [`DummyPolicy`] with epsilon-greedy exploration.
///
/// The progress callback is invoked after every environment step.
pub struct DummyBackend;

impl DeepQBackend for DummyBackend {
    type Policy = DummyPolicy;
    const EXTENSION: &'static str = "bincode";

    fn learn(
        env: &mut dyn VecEnv,
        q_func: &QFuncConfig,
        params: &LearnParams,
        session: &Session,
        callback: &mut ProgressCallback<'_, DummyPolicy>,
    ) -> Result<DummyPolicy> {
        let obs_shape = env.observation_shape();
        let n_actions = env.n_actions();
        q_func.feature_dim(&obs_shape)?;
        if q_func.get_out_dim() as usize != n_actions {
            bail!(
                "Q-function outputs {} values for {} actions",
                q_func.get_out_dim(),
                n_actions
            );
        }
        trace!("Learn on {:?}", session.device());

        let rng = fastrand::Rng::with_seed(SEED);
        let mut policy = DummyPolicy::new(obs_shape.iter().product(), n_actions, SEED);
        let n_envs = env.num_envs();
        let mut episode_rewards = vec![0f32; n_envs];
        let mut finished_rewards: Vec<f32> = vec![];
        let mut obs = env.reset()?;

        for t in 0..params.max_timesteps {
            let eps = params.exploration_eps(t);
            let acts: Vec<i64> = if rng.f64() < eps {
                (0..n_envs).map(|_| rng.usize(..n_actions) as i64).collect()
            } else {
                policy.invoke(&obs).to_vec()
            };
            let step = env.step(&acts)?;

            if params.train_freq > 0
                && t >= params.learning_starts
                && t % params.train_freq == 0
            {
                policy.update(&obs, &acts, &step.reward, params.lr as f32);
            }

            for (i, r) in step.reward.iter().enumerate() {
                episode_rewards[i] += r;
                if step.is_done(i) {
                    finished_rewards.push(episode_rewards[i]);
                    episode_rewards[i] = 0.0;
                    let episodes = finished_rewards.len();
                    if params.print_freq > 0 && episodes % params.print_freq == 0 {
                        info!(
                            "steps = {}, episodes = {}, mean 100 episode reward = {:.2}",
                            t + 1,
                            episodes,
                            mean_recent(&finished_rewards)
                        );
                    }
                }
            }
            obs = step.obs;

            let record = Record::from_slice(&[
                ("steps", RecordValue::Scalar((t + 1) as f32)),
                ("episodes", RecordValue::Scalar(finished_rewards.len() as f32)),
                (
                    "mean_100ep_reward",
                    RecordValue::Scalar(mean_recent(&finished_rewards)),
                ),
                ("exploration_eps", RecordValue::Scalar(eps as f32)),
            ]);
            let locals = TrainingLocals::new(&policy, t + 1, finished_rewards.len(), record);
            if callback(&locals) == CallbackControl::Stop {
                info!("Training stopped by the callback at step {}", t + 1);
                break;
            }
        }

        Ok(policy)
    }

    fn load(path: &Path) -> Result<DummyPolicy> {
        let mut file = File::open(path)?;
        let mut buf = Vec::<u8>::new();
        file.read_to_end(&mut buf)?;
        Ok(bincode::deserialize(&buf[..])?)
    }
}

fn mean_recent(rewards: &[f32]) -> f32 {
    let recent = &rewards[rewards.len().saturating_sub(100)..];
    if recent.is_empty() {
        0.0
    } else {
        recent.iter().sum::<f32>() / recent.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rlsrl_core::{
        dummy::{DummyEnv, DummyEnvConfig},
        vec_env::DummyVecEnv,
    };
    use tempdir::TempDir;

    #[test]
    fn test_greedy_actions() {
        let mut policy = DummyPolicy {
            weights: array![[1f32, 0.], [0., 1.]],
        };
        let obs = array![[2f32, 1.], [0., 3.]].into_dyn();
        assert_eq!(policy.invoke(&obs).to_vec(), vec![0, 1]);
    }

    #[test]
    fn test_update_moves_toward_reward() {
        let mut policy = DummyPolicy {
            weights: Array2::zeros((2, 2)),
        };
        let obs = array![[1f32, 0.]].into_dyn();
        policy.update(&obs, &[1], &[1.0], 0.5);
        assert_eq!(policy.weights, array![[0f32, 0.5], [0., 0.]]);
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new("dummy_policy")?;
        let path = dir.path().join("policy.bincode");
        let policy = DummyPolicy::new(4, 3, 0);
        policy.save(&path)?;
        assert_eq!(policy, DummyBackend::load(&path)?);
        Ok(())
    }

    #[test]
    fn test_learn_without_optimization_steps() -> Result<()> {
        let config = DummyEnvConfig::default().episode_len(5);
        let mut env = DummyVecEnv::new(vec![DummyEnv::constructor(config, 0)])?;
        let mut q_func = QFuncConfig::mlp_64_64();
        q_func.set_out_dim(3);
        let params = LearnParams::default()
            .max_timesteps(20)
            .learning_starts(0)
            .train_freq(0)
            .print_freq(0);
        let session = Session::ensure_initialized()?;

        let mut n_calls = 0;
        let policy = DummyBackend::learn(
            &mut env,
            &q_func,
            &params,
            session,
            &mut |_| {
                n_calls += 1;
                CallbackControl::Continue
            },
        )?;
        assert_eq!(n_calls, 20);
        assert_eq!(policy, DummyPolicy::new(4, 3, SEED));
        Ok(())
    }
}
