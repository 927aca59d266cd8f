//! Two-layer classifier head with weight-normalized projections.
//!
//! Mirrors the classic VQA answer head: a weight-normalized linear layer, a
//! configurable activation, dropout, then a second weight-normalized linear
//! layer producing raw logits. No softmax is applied; feed the logits to a
//! cross-entropy loss directly.

use candle_core::{DType, Result, Tensor};
use candle_nn::{init, Dropout, Module, VarBuilder};
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::FusionError;

/// Dropout between the hidden activation and the output projection.
pub const DEFAULT_CLASSIFIER_DROPOUT: f32 = 0.5;

/// Linear layer reparameterized as `w = g * v / ||v||`.
///
/// The magnitude `g` is a single scalar (the whole-matrix variant of weight
/// normalization) initialized to the Frobenius norm of the fresh direction
/// matrix, so a newly built layer behaves exactly like a plain linear layer.
/// The effective weight is recomputed on every forward pass, which keeps both
/// factors on the autodiff tape.
#[derive(Debug)]
pub struct WeightNormLinear {
    direction: Tensor,
    scale: Tensor,
    bias: Tensor,
}

impl WeightNormLinear {
    /// Builds the layer, registering `weight_v`, `weight_g` and `bias` under
    /// the given [`VarBuilder`] prefix.
    pub fn new(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Self> {
        let direction =
            vb.get_with_hints((out_dim, in_dim), "weight_v", init::DEFAULT_KAIMING_NORMAL)?;
        let norm = direction
            .sqr()?
            .sum_all()?
            .sqrt()?
            .to_dtype(DType::F64)?
            .to_scalar::<f64>()?;
        let scale = vb.get_with_hints((), "weight_g", init::Init::Const(norm))?;
        let bound = 1.0 / (in_dim as f64).sqrt();
        let bias = vb.get_with_hints(
            out_dim,
            "bias",
            init::Init::Uniform {
                lo: -bound,
                up: bound,
            },
        )?;
        Ok(Self {
            direction,
            scale,
            bias,
        })
    }

    fn effective_weight(&self) -> Result<Tensor> {
        let norm = self.direction.sqr()?.sum_all()?.sqrt()?;
        self.direction.broadcast_mul(&self.scale)?.broadcast_div(&norm)
    }
}

impl Module for WeightNormLinear {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let weight = self.effective_weight()?;
        let weight = match *xs.dims() {
            [b1, b2, _, _] => weight.broadcast_left((b1, b2))?.t()?,
            [bsize, _, _] => weight.broadcast_left(bsize)?.t()?,
            _ => weight.t()?,
        };
        xs.matmul(&weight)?.broadcast_add(&self.bias)
    }
}

/// Shape of a [`Classifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Width of the incoming features.
    pub in_dim: usize,
    /// Width of the hidden projection.
    pub hidden_dim: usize,
    /// Number of output classes.
    pub out_dim: usize,
    /// Non-linearity between the projections.
    pub activation: Activation,
    /// Dropout before the output projection.
    pub dropout: f32,
}

impl ClassifierConfig {
    /// Config with the given widths, swish activation and the default dropout.
    pub fn new(in_dim: usize, hidden_dim: usize, out_dim: usize) -> Self {
        Self {
            in_dim,
            hidden_dim,
            out_dim,
            activation: Activation::Swish,
            dropout: DEFAULT_CLASSIFIER_DROPOUT,
        }
    }

    /// Sets the activation.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Resolves and sets the activation from its configuration name.
    pub fn with_activation_name(self, name: &str) -> crate::error::Result<Self> {
        Ok(self.with_activation(Activation::from_name(name)?))
    }

    /// Sets the dropout.
    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Checks that the config describes a runnable classifier.
    pub fn validate(&self) -> crate::error::Result<()> {
        for (name, dim) in [
            ("in_dim", self.in_dim),
            ("hidden_dim", self.hidden_dim),
            ("out_dim", self.out_dim),
        ] {
            if dim == 0 {
                return Err(FusionError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(FusionError::InvalidConfig(format!(
                "dropout ({}) must lie in [0, 1)",
                self.dropout
            )));
        }
        Ok(())
    }
}

/// `weight_norm(linear) -> activation -> dropout -> weight_norm(linear)`.
#[derive(Debug)]
pub struct Classifier {
    input: WeightNormLinear,
    activation: Activation,
    dropout: Dropout,
    output: WeightNormLinear,
}

impl Classifier {
    /// Builds the head, registering the projections under `input` and
    /// `output` parameter prefixes.
    pub fn new(config: ClassifierConfig, vb: VarBuilder) -> crate::error::Result<Self> {
        config.validate()?;
        let input = WeightNormLinear::new(config.in_dim, config.hidden_dim, vb.pp("input"))?;
        let output = WeightNormLinear::new(config.hidden_dim, config.out_dim, vb.pp("output"))?;
        Ok(Self {
            input,
            activation: config.activation,
            dropout: Dropout::new(config.dropout),
            output,
        })
    }

    /// Maps features to raw logits.
    ///
    /// Accepts `(batch, in_dim)` pooled features or `(batch, seq, in_dim)`
    /// sequences; the feature dimension is replaced by `out_dim`.
    pub fn forward(&self, features: &Tensor, train: bool) -> Result<Tensor> {
        let hidden = self.activation.forward(&self.input.forward(features)?)?;
        let hidden = if train {
            self.dropout.forward(&hidden, train)?
        } else {
            hidden
        };
        self.output.forward(&hidden)
    }
}
