//! Types and traits for recording training progress.
//!
//! A [`Record`] is a bag of named values. Environments attach one to every step,
//! learning backends attach one to the [`TrainingLocals`](crate::TrainingLocals)
//! handed to the progress callback, and a [`Recorder`] decides where the values go.
//!
//! ```rust
//! use rlsrl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("episodes", 10.0);
//! record.insert("mean_100ep_reward", RecordValue::Scalar(-1.5));
//! assert_eq!(record.get_scalar("episodes").unwrap(), 10.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
