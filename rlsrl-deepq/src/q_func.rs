//! Architectures of the Q-function.
//!
//! Networks themselves are built by a [`DeepQBackend`](crate::DeepQBackend); this
//! module only describes them.
mod cnn;
mod mlp;
use anyhow::Result;
pub use cnn::CnnToMlpConfig;
pub use mlp::MlpConfig;
use serde::{Deserialize, Serialize};

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// Architecture of the Q-function.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum QFuncConfig {
    /// Multilayer perceptron, for low dimensional features.
    Mlp(MlpConfig),

    /// Convolutional layers followed by a multilayer perceptron, for pixels.
    CnnToMlp(CnnToMlpConfig),
}

impl QFuncConfig {
    /// Multilayer perceptron with two hidden layers of 64 units.
    pub fn mlp_64_64() -> Self {
        Self::Mlp(MlpConfig::new(vec![64, 64], 0))
    }

    /// The convolutional network of the DQN paper with a hidden layer of 256 units.
    pub fn atari_cnn(dueling: bool) -> Self {
        Self::CnnToMlp(
            CnnToMlpConfig::new(vec![(32, 8, 4), (64, 4, 2), (64, 3, 1)], vec![256], 0)
                .dueling(dueling),
        )
    }

    /// Returns the number of features fed to the hidden layers.
    ///
    /// Fails if the architecture cannot process observations of `in_shape`.
    pub fn feature_dim(&self, in_shape: &[usize]) -> Result<usize> {
        match self {
            Self::Mlp(config) => config.in_dim(in_shape),
            Self::CnnToMlp(config) => config.feature_dim(in_shape),
        }
    }

    /// Returns `true` for a dueling architecture.
    pub fn is_dueling(&self) -> bool {
        match self {
            Self::Mlp(_) => false,
            Self::CnnToMlp(config) => config.dueling,
        }
    }
}

impl OutDim for QFuncConfig {
    fn get_out_dim(&self) -> i64 {
        match self {
            Self::Mlp(config) => config.get_out_dim(),
            Self::CnnToMlp(config) => config.get_out_dim(),
        }
    }

    fn set_out_dim(&mut self, v: i64) {
        match self {
            Self::Mlp(config) => config.set_out_dim(v),
            Self::CnnToMlp(config) => config.set_out_dim(v),
        }
    }
}
