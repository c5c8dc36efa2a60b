#![warn(missing_docs)]
//! DQN agent on top of a pluggable learning backend.
//!
//! [`DeepQ`] prepares the environment pipeline and the Q-function architecture
//! of a training run and keeps the policy returned by a [`DeepQBackend`].
//!
//! ```no_run
//! use rlsrl_core::{args::base_command, dummy::{DummyEnv, DummyEnvConfig}};
//! use rlsrl_core::{CallbackControl, Env, EnvRegistry, RlAlgorithm, TrainConfig};
//! use rlsrl_deepq::{dummy::DummyBackend, DeepQ, DeepQArgs};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cmd = DeepQ::<DummyBackend>::custom_arguments(base_command("train"));
//! let matches = cmd.get_matches();
//! let config = TrainConfig::<DeepQArgs>::from_arg_matches(&matches)?;
//!
//! let mut registry = EnvRegistry::new();
//! registry.register("KukaButtonGymEnv-v0", |spec| {
//!     let config = DummyEnvConfig::from_kwargs(&spec.kwargs)?;
//!     Ok(Box::new(DummyEnv::new(config, spec.seed)) as Box<dyn Env>)
//! });
//!
//! let mut agent = DeepQ::<DummyBackend>::new();
//! agent.train(&config, &registry, &mut |_| CallbackControl::Continue, None)?;
//! # Ok(())
//! # }
//! ```
mod backend;
mod base;
mod config;
pub mod dummy;
mod q_func;
pub use backend::DeepQBackend;
pub use base::{DeepQ, EnvPipeline};
pub use config::{DeepQArgs, LearnParams};
pub use q_func::{CnnToMlpConfig, MlpConfig, OutDim, QFuncConfig};
