//! Complete attention sub-layers: attention plus its output block.
//!
//! A layer wires a [`MultiHeadAttention`] into an [`AttentionOutput`], so one
//! forward call covers attend, project, dropout, residual and layer norm. The
//! self-attention flavor reads a single stream; the cross-attention flavor
//! attends one stream over another, e.g. language features over visual ones.

use candle_core::{Result, Tensor};
use candle_nn::VarBuilder;
use serde::{Deserialize, Serialize};

use crate::attention::{AttentionConfig, MultiHeadAttention, DEFAULT_ATTENTION_DROPOUT};
use crate::error::FusionError;
use crate::output::{AttentionOutput, DEFAULT_HIDDEN_DROPOUT};

/// Shape of a self- or cross-attention layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Feature width of the stream being updated.
    pub hidden_size: usize,
    /// Number of attention heads; must divide `hidden_size`.
    pub num_heads: usize,
    /// Feature width of the attended context (cross-attention only).
    pub kv_size: usize,
    /// Dropout on attention probabilities.
    pub attention_dropout: f32,
    /// Dropout on the projected hidden states before the residual add.
    pub hidden_dropout: f32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            hidden_size: 512,
            num_heads: 8,
            kv_size: 512,
            attention_dropout: DEFAULT_ATTENTION_DROPOUT,
            hidden_dropout: DEFAULT_HIDDEN_DROPOUT,
        }
    }
}

impl LayerConfig {
    /// Config with the given widths and the default dropouts.
    pub fn new(hidden_size: usize, num_heads: usize) -> Self {
        Self {
            hidden_size,
            num_heads,
            kv_size: hidden_size,
            ..Self::default()
        }
    }

    /// Sets the feature width of the attended context.
    pub fn with_kv_size(mut self, kv_size: usize) -> Self {
        self.kv_size = kv_size;
        self
    }

    /// Sets the dropout on attention probabilities.
    pub fn with_attention_dropout(mut self, dropout: f32) -> Self {
        self.attention_dropout = dropout;
        self
    }

    /// Sets the dropout on the projected hidden states.
    pub fn with_hidden_dropout(mut self, dropout: f32) -> Self {
        self.hidden_dropout = dropout;
        self
    }

    /// Checks that the config describes a runnable layer.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.attention_config().validate()?;
        if !(0.0..1.0).contains(&self.hidden_dropout) {
            return Err(FusionError::InvalidConfig(format!(
                "hidden_dropout ({}) must lie in [0, 1)",
                self.hidden_dropout
            )));
        }
        Ok(())
    }

    fn attention_config(&self) -> AttentionConfig {
        AttentionConfig::new(self.hidden_size, self.num_heads)
            .with_kv_size(self.kv_size)
            .with_dropout(self.attention_dropout)
    }
}

/// Attention over the stream itself, followed by the output block.
#[derive(Debug)]
pub struct SelfAttentionLayer {
    attention: MultiHeadAttention,
    output: AttentionOutput,
}

impl SelfAttentionLayer {
    /// Builds the layer under `attention` and `output` parameter prefixes.
    ///
    /// Keys and values always come from the hidden stream here, so any
    /// `kv_size` in the config is ignored.
    pub fn new(config: LayerConfig, vb: VarBuilder) -> crate::error::Result<Self> {
        let config = LayerConfig {
            kv_size: config.hidden_size,
            ..config
        };
        config.validate()?;
        let attention = MultiHeadAttention::new(config.attention_config(), vb.pp("attention"))?;
        let output =
            AttentionOutput::new(config.hidden_size, config.hidden_dropout, vb.pp("output"))?;
        Ok(Self { attention, output })
    }

    /// Runs the full sub-layer; the input doubles as the residual.
    pub fn forward(&self, hidden: &Tensor, mask: Option<&Tensor>, train: bool) -> Result<Tensor> {
        let attended = self.attention.forward_self(hidden, mask, train)?;
        self.output.forward(&attended, hidden, train)
    }
}

/// Attention of one stream over another, followed by the output block.
#[derive(Debug)]
pub struct CrossAttentionLayer {
    attention: MultiHeadAttention,
    output: AttentionOutput,
}

impl CrossAttentionLayer {
    /// Builds the layer under `attention` and `output` parameter prefixes.
    pub fn new(config: LayerConfig, vb: VarBuilder) -> crate::error::Result<Self> {
        config.validate()?;
        let attention = MultiHeadAttention::new(config.attention_config(), vb.pp("attention"))?;
        let output =
            AttentionOutput::new(config.hidden_size, config.hidden_dropout, vb.pp("output"))?;
        Ok(Self { attention, output })
    }

    /// Attends `hidden` over `context`; `hidden` doubles as the residual.
    pub fn forward(
        &self,
        hidden: &Tensor,
        context: &Tensor,
        mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        let attended = self.attention.forward(hidden, context, mask, train)?;
        self.output.forward(&attended, hidden, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    #[test]
    fn default_config_uses_bert_dimensions() {
        let config = LayerConfig::default();
        assert_eq!(config.hidden_size, 512);
        assert_eq!(config.num_heads, 8);
        assert_eq!(config.kv_size, 512);
        assert!((config.attention_dropout - 0.1).abs() < f32::EPSILON);
        assert!((config.hidden_dropout - 0.1).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(LayerConfig::new(10, 3).validate().is_err());
        assert!(LayerConfig::new(16, 4).with_hidden_dropout(1.5).validate().is_err());
    }

    #[test]
    fn self_layer_preserves_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let layer = SelfAttentionLayer::new(LayerConfig::new(16, 4), vb).unwrap();

        let hidden = Tensor::randn(0f32, 1.0, (2, 6, 16), &device).unwrap();
        let out = layer.forward(&hidden, None, false).unwrap();
        assert_eq!(out.dims(), &[2, 6, 16]);
    }

    #[test]
    fn self_layer_ignores_configured_kv_size() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = LayerConfig::new(16, 4).with_kv_size(999);
        let layer = SelfAttentionLayer::new(config, vb).unwrap();

        let hidden = Tensor::randn(0f32, 1.0, (1, 4, 16), &device).unwrap();
        assert!(layer.forward(&hidden, None, false).is_ok());
    }

    #[test]
    fn cross_layer_accepts_narrow_context() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = LayerConfig::new(16, 4).with_kv_size(12);
        let layer = CrossAttentionLayer::new(config, vb).unwrap();

        let hidden = Tensor::randn(0f32, 1.0, (2, 3, 16), &device).unwrap();
        let context = Tensor::randn(0f32, 1.0, (2, 7, 12), &device).unwrap();
        let out = layer.forward(&hidden, &context, None, false).unwrap();
        assert_eq!(out.dims(), &[2, 3, 16]);
    }
}
