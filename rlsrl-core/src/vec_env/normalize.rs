use super::{RunningMeanStd, VecEnv};
use crate::VecStep;
use anyhow::{Context, Result};
use log::info;
use ndarray::ArrayD;
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

const OBS_RMS_FILE: &str = "obs_rms.yaml";

/// Normalizes observations with their running mean and variance.
///
/// Each observation becomes `clip((obs - mean) / sqrt(var + epsilon), -clip_obs, clip_obs)`.
/// The statistics are updated while in training mode and frozen otherwise.
pub struct VecNormalize<V: VecEnv> {
    venv: V,
    obs_rms: RunningMeanStd,
    clip_obs: f64,
    epsilon: f64,
    training: bool,
}

impl<V: VecEnv> VecNormalize<V> {
    /// Wraps `venv` with `clip_obs = 10` and `epsilon = 1e-8`, in training mode.
    pub fn new(venv: V) -> Self {
        let obs_rms = RunningMeanStd::new(&venv.observation_shape());
        Self {
            venv,
            obs_rms,
            clip_obs: 10.0,
            epsilon: 1e-8,
            training: true,
        }
    }

    /// Sets the clipping range of normalized observations.
    pub fn clip_obs(mut self, v: f64) -> Self {
        self.clip_obs = v;
        self
    }

    /// Switches between updating and freezing the statistics.
    pub fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    /// Statistics of observations.
    pub fn obs_rms(&self) -> &RunningMeanStd {
        &self.obs_rms
    }

    /// Normalizes a batch of observations with the current statistics.
    pub fn normalize(&self, obs: &ArrayD<f32>) -> ArrayD<f32> {
        let std = self.obs_rms.var().mapv(|v| (v + self.epsilon).sqrt());
        let obs = obs.mapv(|v| v as f64);
        let clip = self.clip_obs;
        ((&obs - self.obs_rms.mean()) / &std).mapv(|v| v.max(-clip).min(clip) as f32)
    }

    fn filt(&mut self, obs: ArrayD<f32>) -> Result<ArrayD<f32>> {
        if self.training {
            self.obs_rms.update(&obs)?;
        }
        Ok(self.normalize(&obs))
    }

    /// Saves the statistics into `<dir>/obs_rms.yaml`.
    pub fn save_running_average(&self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join(OBS_RMS_FILE);
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(serde_yaml::to_string(&self.obs_rms)?.as_bytes())?;
        info!("Save running average into {}", path.display());
        Ok(())
    }

    /// Loads the statistics from `<dir>/obs_rms.yaml`.
    pub fn load_running_average(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join(OBS_RMS_FILE);
        let file =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        self.obs_rms = serde_yaml::from_reader(BufReader::new(file))?;
        info!("Load running average from {}", path.display());
        Ok(())
    }
}

impl<V: VecEnv> VecEnv for VecNormalize<V> {
    fn num_envs(&self) -> usize {
        self.venv.num_envs()
    }

    fn observation_shape(&self) -> Vec<usize> {
        self.venv.observation_shape()
    }

    fn n_actions(&self) -> usize {
        self.venv.n_actions()
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        let obs = self.venv.reset()?;
        self.filt(obs)
    }

    fn step(&mut self, acts: &[i64]) -> Result<VecStep> {
        let mut step = self.venv.step(acts)?;
        step.obs = self.filt(step.obs)?;
        Ok(step)
    }

    fn close(&mut self) {
        self.venv.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{DummyEnv, DummyEnvConfig},
        vec_env::DummyVecEnv,
    };
    use tempdir::TempDir;

    fn venv(pixels: bool) -> Result<DummyVecEnv> {
        let config = DummyEnvConfig::default().obs_shape(vec![3]).pixels(pixels);
        DummyVecEnv::new(vec![DummyEnv::constructor(config, 0)])
    }

    #[test]
    fn test_clip() -> Result<()> {
        let mut env = VecNormalize::new(venv(true)?).clip_obs(0.5);
        let obs = env.reset()?;
        for _ in 0..20 {
            let step = env.step(&[0])?;
            assert!(step.obs.iter().all(|v| v.abs() <= 0.5));
        }
        assert!(obs.iter().all(|v| v.abs() <= 0.5));
        Ok(())
    }

    #[test]
    fn test_frozen_statistics() -> Result<()> {
        let mut env = VecNormalize::new(venv(false)?);
        env.reset()?;
        env.set_training(false);
        let rms = env.obs_rms().clone();
        env.step(&[0])?;
        assert_eq!(&rms, env.obs_rms());
        Ok(())
    }

    #[test]
    fn test_save_and_load_running_average() -> Result<()> {
        let dir = TempDir::new("vec_normalize")?;
        let mut env = VecNormalize::new(venv(true)?);
        env.reset()?;
        env.step(&[1])?;
        env.save_running_average(dir.path())?;

        let mut env2 = VecNormalize::new(venv(true)?);
        env2.load_running_average(dir.path())?;
        assert_eq!(env.obs_rms(), env2.obs_rms());
        Ok(())
    }
}
