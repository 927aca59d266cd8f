//! Multi-head attention over separate query and context streams.
//!
//! This is the BERT-style attention module: queries are projected from the
//! `hidden` stream, keys and values from a `context` stream that may have a
//! different feature width. Self-attention is the special case where both
//! streams are the same tensor.
//!
//! Layout contract: `hidden` is `(batch, seq_q, hidden_size)`, `context` is
//! `(batch, seq_kv, kv_size)`, and the output is `(batch, seq_q, hidden_size)`.
//! Masks are additive `f32` tensors broadcastable against the
//! `(batch, num_heads, seq_q, seq_kv)` score tensor; see [`crate::mask`].

use std::sync::OnceLock;

use candle_core::{Result, Tensor};
use candle_nn::{linear, Dropout, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

use crate::error::FusionError;

/// Dropout applied to attention probabilities, after BERT.
pub const DEFAULT_ATTENTION_DROPOUT: f32 = 0.1;

/// Shape of a [`MultiHeadAttention`] module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionConfig {
    /// Feature width of the query stream and of the output.
    pub hidden_size: usize,
    /// Number of attention heads; must divide `hidden_size`.
    pub num_heads: usize,
    /// Feature width of the key/value stream.
    pub kv_size: usize,
    /// Probability of dropping an attention weight during training.
    pub dropout: f32,
}

impl AttentionConfig {
    /// Config for self-attention: keys and values share the query width.
    pub fn new(hidden_size: usize, num_heads: usize) -> Self {
        Self {
            hidden_size,
            num_heads,
            kv_size: hidden_size,
            dropout: DEFAULT_ATTENTION_DROPOUT,
        }
    }

    /// Sets the feature width of the context stream.
    pub fn with_kv_size(mut self, kv_size: usize) -> Self {
        self.kv_size = kv_size;
        self
    }

    /// Sets the attention-probability dropout.
    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Width of a single head.
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_heads.max(1)
    }

    /// Combined width of all heads; equals `hidden_size` once validated.
    pub fn all_head_dim(&self) -> usize {
        self.num_heads * self.head_dim()
    }

    /// Checks that the config describes a runnable module.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.hidden_size == 0 {
            return Err(FusionError::InvalidConfig(
                "hidden_size must be greater than zero".to_string(),
            ));
        }
        if self.num_heads == 0 {
            return Err(FusionError::InvalidConfig(
                "num_heads must be greater than zero".to_string(),
            ));
        }
        if self.kv_size == 0 {
            return Err(FusionError::InvalidConfig(
                "kv_size must be greater than zero".to_string(),
            ));
        }
        if self.hidden_size % self.num_heads != 0 {
            return Err(FusionError::InvalidConfig(format!(
                "hidden_size ({}) must be divisible by num_heads ({})",
                self.hidden_size, self.num_heads
            )));
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

/// Scaled dot-product attention with per-head projections.
#[derive(Debug)]
pub struct MultiHeadAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    dropout: Dropout,
    num_heads: usize,
    head_dim: usize,
    kv_size: usize,
    first_forward: OnceLock<()>,
}

impl MultiHeadAttention {
    /// Builds the module, registering `query`, `key` and `value` projections
    /// under the given [`VarBuilder`] prefix.
    pub fn new(config: AttentionConfig, vb: VarBuilder) -> crate::error::Result<Self> {
        config.validate()?;
        let all_heads = config.all_head_dim();
        let query = linear(config.hidden_size, all_heads, vb.pp("query"))?;
        let key = linear(config.kv_size, all_heads, vb.pp("key"))?;
        let value = linear(config.kv_size, all_heads, vb.pp("value"))?;
        Ok(Self {
            query,
            key,
            value,
            dropout: Dropout::new(config.dropout),
            num_heads: config.num_heads,
            head_dim: config.head_dim(),
            kv_size: config.kv_size,
            first_forward: OnceLock::new(),
        })
    }

    /// `(batch, seq, all_heads)` to `(batch, num_heads, seq, head_dim)`.
    fn split_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, seq, _) = xs.dims3()?;
        xs.reshape((batch, seq, self.num_heads, self.head_dim))?
            .permute((0, 2, 1, 3))?
            .contiguous()
    }

    /// Inverse of [`Self::split_heads`].
    fn merge_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, _, seq, _) = xs.dims4()?;
        xs.permute((0, 2, 1, 3))?
            .contiguous()?
            .reshape((batch, seq, self.num_heads * self.head_dim))
    }

    /// Attends `hidden` over `context`.
    ///
    /// `mask` is added to the scaled scores before softmax; `train` enables
    /// dropout on the attention probabilities.
    pub fn forward(
        &self,
        hidden: &Tensor,
        context: &Tensor,
        mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        if self.first_forward.set(()).is_ok() {
            log::info!(
                "attention init: heads={} head_dim={} kv_size={}",
                self.num_heads,
                self.head_dim,
                self.kv_size
            );
        }
        let q = self.split_heads(&self.query.forward(hidden)?)?;
        let k = self.split_heads(&self.key.forward(context)?)?;
        let v = self.split_heads(&self.value.forward(context)?)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = q.matmul(&k.t()?)?.affine(scale, 0.0)?;
        let scores = match mask {
            Some(mask) => scores.broadcast_add(mask)?,
            None => scores,
        };
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;
        let probs = if train {
            self.dropout.forward(&probs, train)?
        } else {
            probs
        };
        self.merge_heads(&probs.matmul(&v)?)
    }

    /// Attends `hidden` over itself.
    pub fn forward_self(
        &self,
        hidden: &Tensor,
        mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        self.forward(hidden, hidden, mask, train)
    }
}
