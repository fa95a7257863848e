//! Error types for learner-cores-rs.
//!
//! Cores perform no local error recovery: any tensor or optimizer failure is
//! surfaced directly to the external loop, which decides whether to abort the
//! run. There is no retry policy at this layer and no error is silently
//! swallowed.

use thiserror::Error;

use crate::Step;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while driving a training core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// A tensor or autodiff operation failed (shape mismatch, device error,
    /// numeric failure). Propagated unmodified from candle.
    #[error("tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    /// A step that computes a loss was invoked without targets.
    #[error("missing targets for {} step", .step.name())]
    MissingTargets {
        /// The step that required targets.
        step: Step,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
