//! Environment wrapper logging episode statistics.
use crate::{
    record::{Record, RecordValue},
    Env, Step,
};
use anyhow::{Context, Result};
use chrono::Local;
use log::{info, trace, warn};
use ndarray::ArrayD;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

#[derive(Serialize)]
struct EpisodeRow {
    r: f32,
    l: usize,
    t: f64,
}

/// Records the reward, length and elapsed time of every episode.
///
/// When a path is given, rows `r,l,t` are appended to a CSV file, preceded by a
/// comment line with the start time and the environment id. At the end of an
/// episode, the statistics are also inserted in the info of the step as
/// `episode_reward`, `episode_length` and `episode_time`.
pub struct Monitor {
    env: Box<dyn Env>,
    writer: Option<csv::Writer<BufWriter<File>>>,
    t_start: Instant,
    rewards: Vec<f32>,
    episode_rewards: Vec<f32>,
    episode_lengths: Vec<usize>,
    total_steps: usize,
}

impl Monitor {
    /// Wraps an environment.
    pub fn new(env: Box<dyn Env>, path: Option<PathBuf>, env_id: &str) -> Result<Self> {
        let writer = match path {
            Some(path) => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                let mut file = BufWriter::new(
                    File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                );
                writeln!(
                    file,
                    "#{{\"t_start\": {}, \"env_id\": \"{}\"}}",
                    Local::now().timestamp(),
                    env_id
                )?;
                info!("Monitor writes to {}", path.display());
                Some(csv::Writer::from_writer(file))
            }
            None => None,
        };

        Ok(Self {
            env,
            writer,
            t_start: Instant::now(),
            rewards: vec![],
            episode_rewards: vec![],
            episode_lengths: vec![],
            total_steps: 0,
        })
    }

    /// Rewards of the finished episodes.
    pub fn episode_rewards(&self) -> &[f32] {
        &self.episode_rewards
    }

    /// Lengths of the finished episodes.
    pub fn episode_lengths(&self) -> &[usize] {
        &self.episode_lengths
    }

    /// The number of steps over all episodes.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    fn end_episode(&mut self) -> Result<Record> {
        let row = EpisodeRow {
            r: self.rewards.iter().sum(),
            l: self.rewards.len(),
            t: self.t_start.elapsed().as_secs_f64(),
        };
        self.rewards.clear();
        self.episode_rewards.push(row.r);
        self.episode_lengths.push(row.l);
        trace!("Episode done: reward = {}, length = {}", row.r, row.l);

        let record = Record::from_slice(&[
            ("episode_reward", RecordValue::Scalar(row.r)),
            ("episode_length", RecordValue::Scalar(row.l as f32)),
            ("episode_time", RecordValue::Scalar(row.t as f32)),
            ("episode_end", RecordValue::DateTime(Local::now())),
        ]);

        if let Some(writer) = &mut self.writer {
            writer.serialize(row)?;
            writer.flush()?;
        }

        Ok(record)
    }
}

impl Env for Monitor {
    fn observation_shape(&self) -> Vec<usize> {
        self.env.observation_shape()
    }

    fn n_actions(&self) -> usize {
        self.env.n_actions()
    }

    fn reset(&mut self) -> Result<ArrayD<f32>> {
        self.rewards.clear();
        self.env.reset()
    }

    fn step(&mut self, act: i64) -> Result<Step> {
        let mut step = self.env.step(act)?;
        self.rewards.push(step.reward);
        self.total_steps += 1;
        if step.is_done() {
            let record = self.end_episode()?;
            step.info.merge_inplace(record);
        }
        Ok(step)
    }

    fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush the monitor log: {}", e);
            }
        }
        self.env.close();
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
    use tempdir::TempDir;

    #[test]
    fn test_monitor_writes_episodes() -> Result<()> {
        let dir = TempDir::new("monitor")?;
        let path = dir.path().join("0.monitor.csv");
        let config = DummyEnvConfig::default().episode_len(3);
        let env = Box::new(DummyEnv::new(config, 0));
        let mut monitor = Monitor::new(env, Some(path.clone()), "Dummy-v0")?;

        for _ in 0..2 {
            monitor.reset()?;
            loop {
                let step = monitor.step(0)?;
                if step.is_done() {
                    assert_eq!(step.info.get_scalar("episode_length")?, 3.0);
                    break;
                }
            }
        }
        monitor.close();

        assert_eq!(monitor.episode_lengths(), &[3, 3]);
        assert_eq!(monitor.total_steps(), 6);

        let content = fs::read_to_string(&path)?;
        let lines: Vec<_> = content.lines().collect();
        assert!(lines[0].starts_with("#{\"t_start\""));
        assert!(lines[0].contains("Dummy-v0"));
        assert_eq!(lines[1], "r,l,t");
        assert_eq!(lines.len(), 4);
        Ok(())
    }

    #[test]
    fn test_close_survives_failing_flush() -> Result<()> {
        // Every write to this device fails
        let path = PathBuf::from("/dev/full");
        if !path.exists() {
            return Ok(());
        }
        let flag = Arc::new(AtomicBool::new(false));
        let config = DummyEnvConfig::default().closed_flag(flag.clone());
        let env = Box::new(DummyEnv::new(config, 0));
        let mut monitor = Monitor::new(env, Some(path), "Dummy-v0")?;
        monitor.reset()?;
        monitor.close();
        assert!(flag.load(Ordering::SeqCst));
        monitor.close();
        Ok(())
    }
}
