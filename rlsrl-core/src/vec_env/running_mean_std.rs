use anyhow::Result;
use ndarray::{ArrayD, Axis};
use serde::{Deserialize, Serialize};

/// Running mean and variance of a stream of arrays.
///
/// Batches are merged with the parallel algorithm of Chan et al., so the result
/// does not depend on how the stream is split into batches.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RunningMeanStd {
    mean: ArrayD<f64>,
    var: ArrayD<f64>,
    count: f64,
}

impl RunningMeanStd {
    /// Statistics of arrays of the given shape, starting at mean 0 and variance 1.
    pub fn new(shape: &[usize]) -> Self {
        Self {
            mean: ArrayD::zeros(shape),
            var: ArrayD::ones(shape),
            count: 1e-4,
        }
    }

    /// Updates the statistics with a batch; the first axis is the batch axis.
    pub fn update(&mut self, batch: &ArrayD<f32>) -> Result<()> {
        let batch = batch.mapv(|v| v as f64);
        let batch_count = batch.len_of(Axis(0)) as f64;
        let batch_mean = batch
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow::anyhow!("Empty batch"))?;
        let batch_var = batch.var_axis(Axis(0), 0.0);
        self.update_from_moments(batch_mean, batch_var, batch_count);
        Ok(())
    }

    fn update_from_moments(&mut self, batch_mean: ArrayD<f64>, batch_var: ArrayD<f64>, n: f64) {
        let delta = &batch_mean - &self.mean;
        let tot = self.count + n;
        let m_a = &self.var * self.count;
        let m_b = &batch_var * n;
        let m2 = m_a + m_b + delta.mapv(|d| d * d) * (self.count * n / tot);

        self.mean = &self.mean + &(delta * (n / tot));
        self.var = m2 / tot;
        self.count = tot;
    }

    /// Running mean.
    pub fn mean(&self) -> &ArrayD<f64> {
        &self.mean
    }

    /// Running variance.
    pub fn var(&self) -> &ArrayD<f64> {
        &self.var
    }

    /// The number of samples seen, including the initial pseudo-count.
    pub fn count(&self) -> f64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, concatenate};

    #[test]
    fn test_matches_batch_statistics() -> Result<()> {
        let x1 = array![[1f32, 10.], [2., 20.], [3., 30.]].into_dyn();
        let x2 = array![[4f32, 40.], [5., 50.]].into_dyn();
        let mut rms = RunningMeanStd::new(&[2]);
        rms.update(&x1)?;
        rms.update(&x2)?;

        let x = concatenate(Axis(0), &[x1.view(), x2.view()])?.mapv(|v| v as f64);
        let mean = x.mean_axis(Axis(0)).unwrap();
        let var = x.var_axis(Axis(0), 0.0);

        for (a, b) in rms.mean().iter().zip(mean.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
        for (a, b) in rms.var().iter().zip(var.iter()) {
            assert!((a - b).abs() / b < 1e-3);
        }
        assert!((rms.count() - 5.0).abs() < 1e-3);
        Ok(())
    }
}
