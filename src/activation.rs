//! Activations available to the classifier head.
//!
//! Activations are selected by name so that model configs can carry them as
//! plain strings. Unknown names are rejected up front with
//! [`FusionError::UnsupportedActivation`] rather than silently falling back.

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::FusionError;

/// Pointwise non-linearity applied between the classifier projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Activation {
    /// `max(x, 0)`.
    Relu,
    /// `x * sigmoid(x)`, also known as SiLU.
    Swish,
    /// The exact (erf-based) Gaussian error linear unit.
    Gelu,
}

impl Activation {
    /// Resolves an activation from its configuration name.
    ///
    /// Matching is case-insensitive and accepts `silu` as an alias for
    /// `swish`. Anything else is a [`FusionError::UnsupportedActivation`].
    pub fn from_name(name: &str) -> crate::error::Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "relu" => Ok(Self::Relu),
            "swish" | "silu" => Ok(Self::Swish),
            "gelu" => Ok(Self::Gelu),
            _ => Err(FusionError::UnsupportedActivation(name.to_string())),
        }
    }

    /// Canonical lowercase name of the activation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Relu => "relu",
            Self::Swish => "swish",
            Self::Gelu => "gelu",
        }
    }

    /// Applies the activation elementwise.
    pub fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        match self {
            Self::Relu => xs.relu(),
            Self::Swish => xs.silu(),
            Self::Gelu => xs.gelu_erf(),
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::Swish
    }
}

impl std::str::FromStr for Activation {
    type Err = FusionError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::from_name(name)
    }
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Activation {
    type Error = FusionError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::from_name(&name)
    }
}

impl From<Activation> for String {
    fn from(activation: Activation) -> Self {
        activation.name().to_string()
    }
}
