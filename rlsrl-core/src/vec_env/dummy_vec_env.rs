use super::VecEnv;
use crate::{
    error::RlsrlError,
    record::{Record, RecordValue},
    Env, EnvConstructor, VecStep,
};
use anyhow::{bail, Result};
use log::{info, trace};
use ndarray::{stack, ArrayD, Axis};

/// Runs environments one after another in the current thread.
pub struct DummyVecEnv {
    envs: Vec<Box<dyn Env>>,
    obs_shape: Vec<usize>,
    n_actions: usize,
    closed: bool,
}

impl DummyVecEnv {
    /// Builds the environments by calling the constructors in order.
    pub fn new(ctors: Vec<EnvConstructor>) -> Result<Self> {
        if ctors.is_empty() {
            bail!("DummyVecEnv requires at least one environment");
        }
        let envs = ctors
            .into_iter()
            .map(|ctor| ctor())
            .collect::<Result<Vec<_>>>()?;
        let obs_shape = envs[0].observation_shape();
        let n_actions = envs[0].n_actions();
        for env in envs.iter().skip(1) {
            if env.observation_shape() != obs_shape {
                return Err(RlsrlError::ShapeMismatch {
                    expected: obs_shape,
                    actual: env.observation_shape(),
                }
                .into());
            }
            if env.n_actions() != n_actions {
                bail!("All environments must have the same number of actions");
            }
        }
        info!("DummyVecEnv with {} environment(s)", envs.len());

        Ok(Self {
            envs,
            obs_shape,
            n_actions,
            closed: false,
        })
    }

    fn stack_obs(obs: &[ArrayD<f32>]) -> Result<ArrayD<f32>> {
        let views: Vec<_> = obs.iter().map(|o| o.view()).collect();
        Ok(stack(Axis(0), views.as_slice())?)
    }
}

impl VecEnv for DummyVecEnv {
    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn observation_shape(&self) -> Vec<usize> {
        self.obs_shape.clone()
    }

    fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        let obs = self
            .envs
            .iter_mut()
            .map(|env| env.reset())
            .collect::<Result<Vec<_>>>()?;
        Self::stack_obs(&obs)
    }

    fn step(&mut self, acts: &[i64]) -> Result<VecStep> {
        if acts.len() != self.envs.len() {
            return Err(RlsrlError::ActionCountMismatch {
                expected: self.envs.len(),
                actual: acts.len(),
            }
            .into());
        }

        let n = self.envs.len();
        let mut obs = Vec::with_capacity(n);
        let mut reward = Vec::with_capacity(n);
        let mut is_done = Vec::with_capacity(n);
        let mut record = Record::empty();

        for (i, (env, &act)) in self.envs.iter_mut().zip(acts.iter()).enumerate() {
            let step = env.step(act)?;
            for (k, v) in step.info.into_iter_in_record() {
                record.insert(format!("{}_{}", k, i), v);
            }
            reward.push(step.reward);
            if step.is_terminated || step.is_truncated {
                trace!("Reset environment {}", i);
                let terminal_obs = step.obs.iter().cloned().collect();
                record.insert(
                    format!("terminal_obs_{}", i),
                    RecordValue::Array1(terminal_obs),
                );
                obs.push(env.reset()?);
                is_done.push(1);
            } else {
                obs.push(step.obs);
                is_done.push(0);
            }
        }

        Ok(VecStep {
            obs: Self::stack_obs(&obs)?,
            reward,
            is_done,
            record,
        })
    }

    fn close(&mut self) {
        if !self.closed {
            self.envs.iter_mut().for_each(|env| env.close());
            self.closed = true;
            info!("Closed DummyVecEnv");
        }
    }
}

impl Drop for DummyVecEnv {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{DummyEnv, DummyEnvConfig};
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    fn ctor(config: DummyEnvConfig, seed: i64) -> EnvConstructor {
        DummyEnv::constructor(config, seed)
    }

    #[test]
    fn test_batch_axis_and_auto_reset() -> Result<()> {
        let config = DummyEnvConfig::default().obs_shape(vec![2]).episode_len(2);
        let mut venv = DummyVecEnv::new(vec![ctor(config.clone(), 0), ctor(config, 1)])?;
        assert_eq!(venv.num_envs(), 2);

        let obs = venv.reset()?;
        assert_eq!(obs.shape(), &[2, 2]);

        let step = venv.step(&[0, 1])?;
        assert_eq!(step.reward, vec![1.0, 0.0]);
        assert_eq!(step.is_done, vec![0, 0]);

        let step = venv.step(&[1, 1])?;
        assert!(step.is_done(0) && step.is_done(1));
        assert_eq!(step.record.get_array1("terminal_obs_1")?.len(), 2);
        assert_eq!(step.obs.shape(), &[2, 2]);
        Ok(())
    }

    #[test]
    fn test_wrong_number_of_actions() -> Result<()> {
        let mut venv = DummyVecEnv::new(vec![ctor(DummyEnvConfig::default(), 0)])?;
        venv.reset()?;
        let err = venv.step(&[0, 1]).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RlsrlError>(),
            Some(RlsrlError::ActionCountMismatch { expected: 1, actual: 2 })
        ));
        Ok(())
    }

    #[test]
    fn test_shape_mismatch() {
        let c1 = DummyEnvConfig::default().obs_shape(vec![2]);
        let c2 = DummyEnvConfig::default().obs_shape(vec![3]);
        assert!(DummyVecEnv::new(vec![ctor(c1, 0), ctor(c2, 0)]).is_err());
    }

    #[test]
    fn test_close_on_drop() -> Result<()> {
        let flag = Arc::new(AtomicBool::new(false));
        let config = DummyEnvConfig::default().closed_flag(flag.clone());
        {
            let _venv = DummyVecEnv::new(vec![ctor(config, 0)])?;
        }
        assert!(flag.load(Ordering::SeqCst));
        Ok(())
    }
}
