//! Additive attention mask construction.
//!
//! Masks are plain `f32` tensors added to the raw attention scores before
//! softmax: `0.0` leaves a position visible, [`MASK_VALUE`] pushes it far
//! enough down that softmax assigns it (effectively) zero probability. A large
//! finite value is used instead of `-inf` so that a row with every position
//! masked still normalizes to finite probabilities.

use candle_core::{Device, Result, Tensor};

/// Score offset added to masked positions.
pub const MASK_VALUE: f32 = -1e9;

/// Builds an additive padding mask from per-sequence valid context lengths.
///
/// The returned tensor has shape `(batch, 1, 1, seq_kv)` with `0.0` at
/// positions `< lengths[b]` and [`MASK_VALUE`] at the padded tail, and
/// broadcasts against `(batch, num_heads, seq_q, seq_kv)` attention scores.
/// Lengths larger than `seq_kv` are clamped.
pub fn padding_mask(lengths: &[usize], seq_kv: usize, device: &Device) -> Result<Tensor> {
    let batch = lengths.len();
    let mut values = vec![0f32; batch * seq_kv];
    for (b, &len) in lengths.iter().enumerate() {
        let visible = len.min(seq_kv);
        for k in visible..seq_kv {
            values[b * seq_kv + k] = MASK_VALUE;
        }
    }
    Tensor::from_vec(values, (batch, 1, 1, seq_kv), device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_mask_marks_tail_positions() {
        let device = Device::Cpu;
        let mask = padding_mask(&[3, 1], 4, &device).unwrap();
        assert_eq!(mask.dims(), &[2, 1, 1, 4]);
        let rows = mask.reshape((2, 4)).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(rows[0], vec![0.0, 0.0, 0.0, MASK_VALUE]);
        assert_eq!(rows[1], vec![0.0, MASK_VALUE, MASK_VALUE, MASK_VALUE]);
    }

    #[test]
    fn lengths_are_clamped_to_context() {
        let device = Device::Cpu;
        let mask = padding_mask(&[9], 2, &device).unwrap();
        let row = mask.reshape((1, 2)).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(row[0], vec![0.0, 0.0]);
    }
}
