//! Arguments of the experiment harness.
use anyhow::{Context, Result};
use clap::{ArgMatches, Args, Command, FromArgMatches};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Arguments shared by all algorithms.
#[derive(Args, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct BaseArgs {
    /// Environment name
    #[arg(long, default_value = "KukaButtonGymEnv-v0")]
    pub env: String,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    pub seed: i64,

    /// Directory for logs and checkpoints
    #[arg(long, default_value = "/tmp/gym/")]
    pub log_dir: PathBuf,

    /// Total number of environment steps
    #[arg(long, default_value_t = 1_000_000)]
    pub num_timesteps: usize,

    /// State representation model, empty for raw pixels
    #[arg(long, default_value = "")]
    pub srl_model: String,

    /// Number of stacked frames
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub num_stack: u64,
}

impl Default for BaseArgs {
    fn default() -> Self {
        Self {
            env: "KukaButtonGymEnv-v0".to_string(),
            seed: 0,
            log_dir: PathBuf::from("/tmp/gym/"),
            num_timesteps: 1_000_000,
            srl_model: "".to_string(),
            num_stack: 1,
        }
    }
}

impl BaseArgs {
    /// Returns `true` if observations come from a state representation model.
    pub fn uses_srl_model(&self) -> bool {
        !self.srl_model.is_empty()
    }
}

/// Returns the harness command with [`BaseArgs`] registered.
pub fn base_command(name: impl Into<clap::builder::Str>) -> Command {
    BaseArgs::augment_args(Command::new(name))
}

/// Configuration of a training run.
///
/// Serialized flat, harness arguments and algorithm arguments side by side.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct TrainConfig<A> {
    /// Arguments shared by all algorithms.
    #[serde(flatten)]
    pub base: BaseArgs,

    /// Algorithm-specific arguments.
    #[serde(flatten)]
    pub algo: A,
}

impl<A> TrainConfig<A>
where
    A: FromArgMatches + Serialize + DeserializeOwned,
{
    /// Constructs a configuration.
    pub fn new(base: BaseArgs, algo: A) -> Self {
        Self { base, algo }
    }

    /// Extracts the configuration from parsed arguments.
    pub fn from_arg_matches(matches: &ArgMatches) -> Result<Self> {
        let base = BaseArgs::from_arg_matches(matches)?;
        let algo = A::from_arg_matches(matches)?;
        Ok(Self { base, algo })
    }

    /// Constructs [`TrainConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config {}", path.display()))?;
        let rdr = BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        info!("Load config from {}", path.display());
        Ok(config)
    }

    /// Saves [`TrainConfig`] as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create config {}", path.display()))?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config into {}", path.display());
        Ok(())
    }
}
