//! Error type shared across the crate.

use thiserror::Error;

/// Errors produced while configuring or running the fusion layers.
#[derive(Debug, Error)]
pub enum FusionError {
    /// An activation name that no known activation answers to.
    #[error("activation `{0}` is not supported (expected one of: relu, swish, gelu)")]
    UnsupportedActivation(String),

    /// A configuration that cannot describe a runnable module.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An error bubbled up from the underlying tensor framework.
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}

/// Convenience alias for fallible crate operations.
pub type Result<T> = std::result::Result<T, FusionError>;
