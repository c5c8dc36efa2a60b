#![warn(missing_docs)]
//! Core abstractions for RL agents on state representation learning environments.
//!
//! An algorithm crate implements [`RlAlgorithm`] on top of a learning backend. The
//! harness builds environments through an [`EnvFactory`], and the algorithm
//! assembles the preprocessing pipeline found in [`vec_env`].
pub mod args;
pub mod dummy;
pub mod error;
pub mod record;
pub mod session;
pub mod vec_env;

mod base;
pub use base::{
    recording_callback, CallbackControl, Env, ProgressCallback, RlAlgorithm, Step,
    TrainedPolicy, TrainingLocals, VecStep,
};

mod env_factory;
pub use env_factory::{EnvBuilder, EnvConstructor, EnvFactory, EnvKwargs, EnvRegistry, EnvSpec};

mod monitor;
pub use monitor::Monitor;

pub use args::{BaseArgs, TrainConfig};
pub use session::{Device, Session};
