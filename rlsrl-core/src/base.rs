//! Core functionalities.
mod algorithm;
mod env;
mod policy;
mod step;
pub use algorithm::{
    recording_callback, CallbackControl, ProgressCallback, RlAlgorithm, TrainingLocals,
};
pub use env::Env;
pub use policy::TrainedPolicy;
pub use step::{Step, VecStep};
