use super::OutDim;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of a multilayer perceptron with ReLU activations.
pub struct MlpConfig {
    pub(crate) units: Vec<i64>,
    pub(crate) out_dim: i64,
}

impl MlpConfig {
    /// Constructs the configuration.
    pub fn new(units: Vec<i64>, out_dim: i64) -> Self {
        Self { units, out_dim }
    }

    /// Units of hidden layers.
    pub fn units(&self) -> &[i64] {
        &self.units
    }

    /// Observations are flattened.
    pub fn in_dim(&self, in_shape: &[usize]) -> Result<usize> {
        if in_shape.is_empty() {
            bail!("MLP requires observations with at least one axis");
        }
        Ok(in_shape.iter().product())
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: i64) {
        self.out_dim = out_dim;
    }
}
