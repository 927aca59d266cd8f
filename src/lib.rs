//! Encoder-style attention blocks and a weight-normalized classifier head,
//! assembled from candle primitives.
//!
//! The crate provides the pieces of a cross-modal encoder: a BERT-style
//! multi-head attention module whose queries come from one stream and whose
//! keys and values come from a (possibly different-width) context stream, the
//! residual/layer-norm output block that follows it, composed self- and
//! cross-attention layers, and a small two-layer classifier head with
//! weight-normalized projections.
//!
//! All parameters are registered through [`candle_nn::VarBuilder`], so the
//! modules drop into a `VarMap`-backed training loop unchanged. Every forward
//! pass takes a `train` flag; dropout is live only while it is set.
//!
//! ```no_run
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use fusion_layers::{Classifier, ClassifierConfig, CrossAttentionLayer, LayerConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let device = Device::Cpu;
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//!
//! let cross = CrossAttentionLayer::new(
//!     LayerConfig::new(512, 8).with_kv_size(2048),
//!     vb.pp("cross"),
//! )?;
//! let head = Classifier::new(ClassifierConfig::new(512, 1024, 3129), vb.pp("head"))?;
//!
//! let language = Tensor::randn(0f32, 1.0, (2, 20, 512), &device)?;
//! let visual = Tensor::randn(0f32, 1.0, (2, 36, 2048), &device)?;
//! let fused = cross.forward(&language, &visual, None, true)?;
//! let logits = head.forward(&fused.narrow(1, 0, 1)?.squeeze(1)?, true)?;
//! # let _ = logits;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod attention;
pub mod classifier;
pub mod error;
pub mod layer;
pub mod mask;
pub mod output;

pub use activation::Activation;
pub use attention::{AttentionConfig, MultiHeadAttention};
pub use classifier::{Classifier, ClassifierConfig, WeightNormLinear};
pub use error::FusionError;
pub use layer::{CrossAttentionLayer, LayerConfig, SelfAttentionLayer};
pub use output::AttentionOutput;
