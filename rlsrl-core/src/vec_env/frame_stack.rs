use super::VecEnv;
use crate::{error::RlsrlError, VecStep};
use anyhow::{bail, Result};
use log::info;
use ndarray::{ArrayD, Axis, Slice};

/// Stacks the last `n_stack` observations along their last axis.
///
/// An observation of shape `[.., c]` becomes `[.., c * n_stack]`, oldest frame
/// first. When an episode ends, the stack of that environment is zeroed before
/// the first observation of the next episode is pushed.
/// With `normalize`, the output is scaled by `1 / 255`, for raw pixels.
pub struct VecFrameStack<V: VecEnv> {
    venv: V,
    n_stack: usize,
    normalize: bool,
    // [n_envs, .., c * n_stack], unscaled
    stacked: ArrayD<f32>,
}

impl<V: VecEnv> VecFrameStack<V> {
    /// Wraps `venv`.
    pub fn new(venv: V, n_stack: usize, normalize: bool) -> Result<Self> {
        if n_stack == 0 {
            bail!("n_stack must be positive");
        }
        let obs_shape = venv.observation_shape();
        if obs_shape.is_empty() {
            bail!("Frame stacking requires observations with at least one axis");
        }
        let mut shape = vec![venv.num_envs()];
        shape.extend(Self::stacked_shape(&obs_shape, n_stack));
        info!(
            "Stack {} frame(s) of shape {:?}, normalize = {}",
            n_stack, obs_shape, normalize
        );

        Ok(Self {
            venv,
            n_stack,
            normalize,
            stacked: ArrayD::zeros(shape),
        })
    }

    fn stacked_shape(obs_shape: &[usize], n_stack: usize) -> Vec<usize> {
        let mut shape = obs_shape.to_vec();
        if let Some(last) = shape.last_mut() {
            *last *= n_stack;
        }
        shape
    }

    /// The number of stacked frames.
    pub fn n_stack(&self) -> usize {
        self.n_stack
    }

    /// The wrapped environment.
    pub fn get_ref(&self) -> &V {
        &self.venv
    }

    /// Returns `true` if the output is scaled by `1 / 255`.
    pub fn is_normalized(&self) -> bool {
        self.normalize
    }

    /// Shifts the stack by one frame and writes `obs` as the newest one.
    fn push(&mut self, obs: &ArrayD<f32>, is_done: Option<&[i8]>) -> Result<()> {
        let mut expected = vec![self.venv.num_envs()];
        expected.extend(self.venv.observation_shape());
        if obs.shape() != expected.as_slice() {
            return Err(RlsrlError::ShapeMismatch {
                expected,
                actual: obs.shape().to_vec(),
            }
            .into());
        }

        let axis = Axis(self.stacked.ndim() - 1);
        let total = self.stacked.len_of(axis);
        let c = total / self.n_stack;

        let shifted = self.stacked.slice_axis(axis, Slice::from(c..)).to_owned();
        self.stacked
            .slice_axis_mut(axis, Slice::from(..total - c))
            .assign(&shifted);

        if let Some(is_done) = is_done {
            for (i, d) in is_done.iter().enumerate() {
                if *d == 1 {
                    self.stacked.index_axis_mut(Axis(0), i).fill(0.0);
                }
            }
        }

        self.stacked
            .slice_axis_mut(axis, Slice::from(total - c..))
            .assign(obs);
        Ok(())
    }

    fn output(&self) -> ArrayD<f32> {
        if self.normalize {
            self.stacked.mapv(|v| v / 255.0)
        } else {
            self.stacked.clone()
        }
    }
}

impl<V: VecEnv> VecEnv for VecFrameStack<V> {
    fn num_envs(&self) -> usize {
        self.venv.num_envs()
    }

    fn observation_shape(&self) -> Vec<usize> {
        Self::stacked_shape(&self.venv.observation_shape(), self.n_stack)
    }

    fn n_actions(&self) -> usize {
        self.venv.n_actions()
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        let obs = self.venv.reset()?;
        self.stacked.fill(0.0);
        self.push(&obs, None)?;
        Ok(self.output())
    }

    fn step(&mut self, acts: &[i64]) -> Result<VecStep> {
        let mut step = self.venv.step(acts)?;
        self.push(&step.obs, Some(&step.is_done))?;
        step.obs = self.output();
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
    use ndarray::s;

    fn venv(config: DummyEnvConfig) -> Result<DummyVecEnv> {
        DummyVecEnv::new(vec![DummyEnv::constructor(config, 0)])
    }

    #[test]
    fn test_stacked_shape() -> Result<()> {
        let config = DummyEnvConfig::default().obs_shape(vec![8, 8, 3]).pixels(true);
        let mut env = VecFrameStack::new(venv(config)?, 4, true)?;
        assert_eq!(env.observation_shape(), vec![8, 8, 12]);

        let obs = env.reset()?;
        assert_eq!(obs.shape(), &[1, 8, 8, 12]);
        assert!(obs.iter().all(|&v| (0.0..=1.0).contains(&v)));
        // Older frames are zero right after reset
        assert!(obs.slice(s![.., .., .., ..9]).iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_frames_shift_and_reset_on_done() -> Result<()> {
        let config = DummyEnvConfig::default().obs_shape(vec![2]).episode_len(3);
        let mut env = VecFrameStack::new(venv(config)?, 3, false)?;

        let o0 = env.reset()?;
        let o1 = env.step(&[0])?.obs;
        let o2 = env.step(&[0])?.obs;
        assert_eq!(o1.slice(s![.., 2..4]), o0.slice(s![.., 4..6]));
        assert_eq!(o2.slice(s![.., 0..2]), o0.slice(s![.., 4..6]));
        assert_eq!(o2.slice(s![.., 2..4]), o1.slice(s![.., 4..6]));

        // The episode ends here: only the first observation of the new episode remains
        let step = env.step(&[0])?;
        assert!(step.is_done(0));
        assert!(step.obs.slice(s![.., 0..4]).iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_invalid_n_stack() -> Result<()> {
        assert!(VecFrameStack::new(venv(DummyEnvConfig::default())?, 0, false).is_err());
        Ok(())
    }
}
