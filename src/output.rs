//! Post-attention projection with residual connection and layer norm.

use candle_core::{Result, Tensor};
use candle_nn::{layer_norm, linear, Dropout, LayerNorm, Linear, Module, VarBuilder};

use crate::error::FusionError;

/// LayerNorm epsilon used by BERT-style encoder blocks.
pub const LAYER_NORM_EPS: f64 = 1e-12;

/// Dropout applied to the projected hidden states, after BERT.
pub const DEFAULT_HIDDEN_DROPOUT: f32 = 0.1;

/// The `dense -> dropout -> add residual -> layer_norm` block that closes an
/// attention sub-layer.
#[derive(Debug)]
pub struct AttentionOutput {
    dense: Linear,
    layer_norm: LayerNorm,
    dropout: Dropout,
}

impl AttentionOutput {
    /// Builds the block, registering `dense` and `layer_norm` parameters
    /// under the given [`VarBuilder`] prefix.
    pub fn new(hidden_size: usize, dropout: f32, vb: VarBuilder) -> crate::error::Result<Self> {
        if hidden_size == 0 {
            return Err(FusionError::InvalidConfig(
                "hidden_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(FusionError::InvalidConfig(format!(
                "dropout ({dropout}) must lie in [0, 1)"
            )));
        }
        let dense = linear(hidden_size, hidden_size, vb.pp("dense"))?;
        let layer_norm = layer_norm(hidden_size, LAYER_NORM_EPS, vb.pp("layer_norm"))?;
        Ok(Self {
            dense,
            layer_norm,
            dropout: Dropout::new(dropout),
        })
    }

    /// Projects `hidden`, applies dropout, adds `residual` and normalizes.
    pub fn forward(&self, hidden: &Tensor, residual: &Tensor, train: bool) -> Result<Tensor> {
        let projected = self.dense.forward(hidden)?;
        let projected = if train {
            self.dropout.forward(&projected, train)?
        } else {
            projected
        };
        self.layer_norm.forward(&(projected + residual)?)
    }
}
