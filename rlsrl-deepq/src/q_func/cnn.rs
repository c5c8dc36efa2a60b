use super::OutDim;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of convolutional layers followed by a multilayer perceptron.
///
/// Inputs are images of shape `[height, width, channels]`.
pub struct CnnToMlpConfig {
    /// `(out_channels, kernel_size, stride)` of each convolutional layer.
    pub(crate) convs: Vec<(i64, i64, i64)>,
    pub(crate) hiddens: Vec<i64>,
    pub(crate) dueling: bool,
    pub(crate) out_dim: i64,
}

impl CnnToMlpConfig {
    /// Constructs the configuration without the dueling architecture.
    pub fn new(convs: Vec<(i64, i64, i64)>, hiddens: Vec<i64>, out_dim: i64) -> Self {
        Self {
            convs,
            hiddens,
            dueling: false,
            out_dim,
        }
    }

    /// Sets the dueling flag.
    pub fn dueling(mut self, v: bool) -> Self {
        self.dueling = v;
        self
    }

    /// Convolutional layers.
    pub fn convs(&self) -> &[(i64, i64, i64)] {
        &self.convs
    }

    /// Units of hidden layers.
    pub fn hiddens(&self) -> &[i64] {
        &self.hiddens
    }

    /// The number of flattened features after the last convolution, without padding.
    ///
    /// For `84x84` inputs and the layers of the DQN paper, this is `7 * 7 * 64 = 3136`.
    pub fn feature_dim(&self, in_shape: &[usize]) -> Result<usize> {
        if in_shape.len() != 3 {
            bail!(
                "CNN requires observations of shape [height, width, channels], got {:?}",
                in_shape
            );
        }
        let (mut h, mut w, mut c) = (in_shape[0] as i64, in_shape[1] as i64, in_shape[2] as i64);
        for &(out_channels, kernel, stride) in self.convs.iter() {
            if h < kernel || w < kernel {
                bail!("Input {:?} is too small for kernel size {}", in_shape, kernel);
            }
            h = (h - kernel) / stride + 1;
            w = (w - kernel) / stride + 1;
            c = out_channels;
        }
        Ok((h * w * c) as usize)
    }
}

impl OutDim for CnnToMlpConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: i64) {
        self.out_dim = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nature() -> CnnToMlpConfig {
        CnnToMlpConfig::new(vec![(32, 8, 4), (64, 4, 2), (64, 3, 1)], vec![256], 3)
    }

    #[test]
    fn test_feature_dim() -> Result<()> {
        assert_eq!(nature().feature_dim(&[84, 84, 4])?, 3136);
        assert_eq!(nature().feature_dim(&[36, 36, 3])?, 64);
        assert!(nature().feature_dim(&[16, 16, 3]).is_err());
        assert!(nature().feature_dim(&[84, 84]).is_err());
        Ok(())
    }
}
