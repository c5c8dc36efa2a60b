//! Construction of environments from their ids.
use crate::{error::RlsrlError, Env, Monitor};
use anyhow::Result;
use log::info;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Keyword arguments overriding the default settings of an environment.
pub type EnvKwargs = serde_yaml::Mapping;

/// Deferred construction of an environment.
///
/// Vectorized environments receive a list of constructors and call each of them
/// once.
pub type EnvConstructor = Box<dyn FnOnce() -> Result<Box<dyn Env>>>;

/// Builds a registered environment from its specification.
pub type EnvBuilder = dyn Fn(&EnvSpec) -> Result<Box<dyn Env>> + Send + Sync;

/// Everything needed to build one environment instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvSpec {
    /// Id of the environment.
    pub env_id: String,

    /// Random seed, already shifted by the rank.
    pub seed: i64,

    /// Index of the environment among the ones of a vectorized environment.
    pub rank: usize,

    /// Directory where the monitor log is written.
    pub log_dir: Option<PathBuf>,

    /// Overrides of the environment settings.
    pub kwargs: EnvKwargs,
}

/// Produces environment constructors.
pub trait EnvFactory {
    /// Returns a constructor of the environment `env_id`.
    ///
    /// The seed of the built environment is `seed + rank`. When `log_dir` is given,
    /// episode statistics are written to `<log_dir>/<rank>.monitor.csv`.
    fn make_env(
        &self,
        env_id: &str,
        seed: i64,
        rank: usize,
        log_dir: Option<&Path>,
        kwargs: Option<&EnvKwargs>,
    ) -> Result<EnvConstructor>;
}

/// Maps environment ids to builders.
#[derive(Default, Clone)]
pub struct EnvRegistry {
    builders: BTreeMap<String, Arc<EnvBuilder>>,
}

impl fmt::Debug for EnvRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl EnvRegistry {
    /// Constructs an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder under `env_id`, replacing any previous one.
    pub fn register<F>(&mut self, env_id: impl Into<String>, builder: F) -> &mut Self
    where
        F: Fn(&EnvSpec) -> Result<Box<dyn Env>> + Send + Sync + 'static,
    {
        self.builders.insert(env_id.into(), Arc::new(builder));
        self
    }

    /// Returns `true` if `env_id` is registered.
    pub fn contains(&self, env_id: &str) -> bool {
        self.builders.contains_key(env_id)
    }

    /// Registered ids in lexicographic order.
    pub fn ids(&self) -> Vec<&str> {
        self.builders.keys().map(|k| k.as_str()).collect()
    }
}

impl EnvFactory for EnvRegistry {
    fn make_env(
        &self,
        env_id: &str,
        seed: i64,
        rank: usize,
        log_dir: Option<&Path>,
        kwargs: Option<&EnvKwargs>,
    ) -> Result<EnvConstructor> {
        if env_id.is_empty() {
            return Err(RlsrlError::EmptyEnvId.into());
        }
        let builder = self
            .builders
            .get(env_id)
            .cloned()
            .ok_or_else(|| RlsrlError::UnknownEnv(env_id.to_string()))?;
        let spec = EnvSpec {
            env_id: env_id.to_string(),
            seed: seed + rank as i64,
            rank,
            log_dir: log_dir
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf),
            kwargs: kwargs.cloned().unwrap_or_default(),
        };

        Ok(Box::new(move || {
            info!("Build {} (rank {}, seed {})", spec.env_id, spec.rank, spec.seed);
            let env = (*builder)(&spec)?;
            match &spec.log_dir {
                Some(dir) => {
                    let path = dir.join(format!("{}.monitor.csv", spec.rank));
                    Ok(Box::new(Monitor::new(env, Some(path), &spec.env_id)?) as Box<dyn Env>)
                }
                None => Ok(env),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::{DummyEnv, DummyEnvConfig};
    use tempdir::TempDir;

    fn registry() -> EnvRegistry {
        let mut registry = EnvRegistry::new();
        registry.register("Dummy-v0", |spec| {
            let config = DummyEnvConfig::from_kwargs(&spec.kwargs)?;
            Ok(Box::new(DummyEnv::new(config, spec.seed)) as Box<dyn Env>)
        });
        registry
    }

    #[test]
    fn test_empty_env_id() {
        let err = registry().make_env("", 0, 0, None, None).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<RlsrlError>(),
            Some(RlsrlError::EmptyEnvId)
        ));
    }

    #[test]
    fn test_unknown_env_id() {
        let err = registry()
            .make_env("Pong-v0", 0, 0, None, None)
            .err()
            .unwrap();
        assert!(matches!(
            err.downcast_ref::<RlsrlError>(),
            Some(RlsrlError::UnknownEnv(id)) if id == "Pong-v0"
        ));
    }

    #[test]
    fn test_kwargs_and_monitor() -> Result<()> {
        let dir = TempDir::new("env_factory")?;
        let mut kwargs = EnvKwargs::new();
        kwargs.insert("obs_shape".into(), serde_yaml::from_str("[2, 3]")?);

        let ctor = registry().make_env("Dummy-v0", 10, 2, Some(dir.path()), Some(&kwargs))?;
        let mut env = ctor()?;
        assert_eq!(env.observation_shape(), vec![2, 3]);
        env.reset()?;
        env.close();

        assert!(dir.path().join("2.monitor.csv").exists());
        Ok(())
    }

    #[test]
    fn test_ids() {
        let mut registry = registry();
        registry.register("A-v0", |spec| {
            Ok(Box::new(DummyEnv::new(DummyEnvConfig::default(), spec.seed)) as Box<dyn Env>)
        });
        assert_eq!(registry.ids(), vec!["A-v0", "Dummy-v0"]);
        assert!(registry.contains("A-v0"));
    }
}
