//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug)]
pub enum RlsrlError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// The environment id was not given.
    #[error("Environment id is empty")]
    EmptyEnvId,

    /// No environment is registered with the id.
    #[error("Unknown environment: {0}")]
    UnknownEnv(String),

    /// The shape of an array does not match the expected one.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// The number of actions does not match the number of environments.
    #[error("Expected {expected} actions, got {actual}")]
    ActionCountMismatch {
        /// The number of environments.
        expected: usize,
        /// The number of given actions.
        actual: usize,
    },

    /// Failed to initialize the execution session.
    #[error("Failed to initialize session: {0}")]
    SessionInitError(String),
}
