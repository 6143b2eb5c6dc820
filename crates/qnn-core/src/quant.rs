// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion of real-valued scale ratios into the integer multiplier/shift
//! pairs consumed by [`crate::fixed_point::requantize`].
//!
//! These helpers run at model-preparation time, not in kernels.

use crate::fixed_point::requantize;
use crate::KernelError;

/// Splits a finite, non-zero `x` into `(mantissa, exponent)` with
/// `x = mantissa * 2^exponent` and `0.5 <= |mantissa| < 1`.
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let exp_bits = ((bits >> 52) & 0x7ff) as i32;
    if exp_bits == 0 {
        // Subnormal: scale into the normal range first.
        let (m, e) = frexp(x * (1u64 << 54) as f64);
        return (m, e - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ffu64 << 52)) | (1022u64 << 52));
    (mantissa, exp_bits - 1022)
}

/// Decomposes `real` into a Q31 mantissa in `[0.5, 1)` and an exponent.
///
/// Returns `(multiplier, shift)` such that
/// `real ≈ multiplier / 2^31 * 2^shift`. Exponents below `-31` flush to a
/// zero multiplier.
///
/// # Examples
/// ```
/// use qnn_core::quant::quantize_multiplier;
/// assert_eq!(quantize_multiplier(1.0), (1 << 30, 1));
/// assert_eq!(quantize_multiplier(0.25), (1 << 30, -1));
/// ```
pub fn quantize_multiplier(real: f64) -> (i32, i32) {
    if real == 0.0 {
        return (0, 0);
    }
    let (q, mut shift) = frexp(real);
    let mut q_fixed = (q * (1u64 << 31) as f64).round() as i64;
    if q_fixed == 1i64 << 31 {
        q_fixed /= 2;
        shift += 1;
    }
    if shift < -31 {
        shift = 0;
        q_fixed = 0;
    }
    (q_fixed as i32, shift)
}

/// Like [`quantize_multiplier`] but requires `0 < real < 1`, so the shift is
/// never positive.
pub fn quantize_multiplier_smaller_than_one(real: f64) -> Result<(i32, i32), KernelError> {
    if !(real > 0.0 && real < 1.0) {
        return Err(KernelError::invalid(
            "quantize_multiplier_smaller_than_one",
            format!("{real} is not in (0, 1)"),
        ));
    }
    Ok(quantize_multiplier(real))
}

/// Like [`quantize_multiplier`] but requires `real > 1`, so the shift is
/// always a left shift.
pub fn quantize_multiplier_greater_than_one(real: f64) -> Result<(i32, i32), KernelError> {
    if !(real > 1.0) {
        return Err(KernelError::invalid(
            "quantize_multiplier_greater_than_one",
            format!("{real} is not greater than 1"),
        ));
    }
    Ok(quantize_multiplier(real))
}

/// Folds a division by `count` into an existing multiplier/shift pair.
///
/// Mean reductions requantize the raw sum once, so the `1 / count` factor
/// has to live in the output multiplier. The multiplier is widened by as
/// many bits as the count occupies (at most 32, and never past a total
/// right shift of 31) before the integer division, to keep precision.
pub fn fold_mean_count(multiplier: i32, shift: i32, count: usize) -> (i32, i32) {
    if count <= 1 {
        return (multiplier, shift);
    }
    let count = count as u64;
    let bits = 63 - count.leading_zeros() as i32;
    let s = bits.min(32).min(31 + shift).max(0);
    let folded = (i64::from(multiplier) << s) / count as i64;
    (folded as i32, shift - s)
}

/// Per-output-channel multipliers for `input_scale * filter_scale[c] /
/// output_scale`.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] if the three slices differ in
/// length or the output scale is not positive.
pub fn per_channel_multipliers(
    input_scale: f32,
    filter_scales: &[f32],
    output_scale: f32,
    multipliers: &mut [i32],
    shifts: &mut [i32],
) -> Result<(), KernelError> {
    if multipliers.len() != filter_scales.len() || shifts.len() != filter_scales.len() {
        return Err(KernelError::invalid(
            "per_channel_multipliers",
            format!(
                "{} filter scales but {} multipliers and {} shifts",
                filter_scales.len(),
                multipliers.len(),
                shifts.len()
            ),
        ));
    }
    if output_scale <= 0.0 {
        return Err(KernelError::invalid(
            "per_channel_multipliers",
            format!("output scale {output_scale} must be positive"),
        ));
    }
    for ((fs, m), s) in filter_scales.iter().zip(multipliers.iter_mut()).zip(shifts.iter_mut()) {
        let effective = f64::from(input_scale) * f64::from(*fs) / f64::from(output_scale);
        (*m, *s) = quantize_multiplier(effective);
    }
    Ok(())
}

/// A per-tensor multiplier/shift pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct QuantParams {
    pub multiplier: i32,
    pub shift: i32,
}

impl QuantParams {
    /// Creates a pair from raw values.
    pub const fn new(multiplier: i32, shift: i32) -> Self {
        Self { multiplier, shift }
    }

    /// The pair encoding a scale of exactly 1.0.
    pub const fn identity() -> Self {
        Self::new(1 << 30, 1)
    }

    /// Quantizes a real-valued scale.
    pub fn from_real(real: f64) -> Self {
        let (multiplier, shift) = quantize_multiplier(real);
        Self { multiplier, shift }
    }

    /// Applies the rescale to `value`.
    #[inline]
    pub fn apply(&self, value: i32) -> i32 {
        requantize(value, self.multiplier, self.shift)
    }
}

impl Default for QuantParams {
    fn default() -> Self {
        Self::identity()
    }
}

/// Per-output-channel multiplier/shift arrays.
#[derive(Debug, Clone, Copy)]
pub struct PerChannelQuant<'a> {
    multipliers: &'a [i32],
    shifts: &'a [i32],
}

impl<'a> PerChannelQuant<'a> {
    /// Pairs the two arrays.
    ///
    /// # Errors
    /// Returns [`KernelError::InvalidArgument`] if the lengths differ.
    pub fn new(multipliers: &'a [i32], shifts: &'a [i32]) -> Result<Self, KernelError> {
        if multipliers.len() != shifts.len() {
            return Err(KernelError::invalid(
                "per_channel_quant",
                format!(
                    "{} multipliers but {} shifts",
                    multipliers.len(),
                    shifts.len()
                ),
            ));
        }
        Ok(Self {
            multipliers,
            shifts,
        })
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.multipliers.len()
    }

    /// Whether there are no channels.
    pub fn is_empty(&self) -> bool {
        self.multipliers.is_empty()
    }

    /// The pair for channel `ch`.
    #[inline]
    pub fn get(&self, ch: usize) -> QuantParams {
        QuantParams::new(self.multipliers[ch], self.shifts[ch])
    }

    /// Checks that there is exactly one pair per output channel.
    pub fn expect_channels(&self, op: &'static str, channels: usize) -> Result<(), KernelError> {
        if self.len() != channels {
            return Err(KernelError::invalid(
                op,
                format!("{} quantization pairs for {channels} output channels", self.len()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frexp() {
        assert_eq!(frexp(1.0), (0.5, 1));
        assert_eq!(frexp(0.375), (0.75, -1));
        assert_eq!(frexp(-8.0), (-0.5, 4));
    }

    #[test]
    fn test_quantize_multiplier() {
        assert_eq!(quantize_multiplier(0.0), (0, 0));
        assert_eq!(quantize_multiplier(1.0), (1 << 30, 1));
        assert_eq!(quantize_multiplier(0.5), (1 << 30, 0));
        let (m, s) = quantize_multiplier(0.75);
        assert_eq!((m, s), (1_610_612_736, 0));
        // Underflow flushes to zero.
        assert_eq!(quantize_multiplier(1e-12), (0, 0));
    }

    #[test]
    fn test_quantize_multiplier_renormalises() {
        // Just below 1.0: the mantissa rounds up to 2^31 and is halved.
        let (m, s) = quantize_multiplier(1.0 - 1e-12);
        assert_eq!((m, s), (1 << 30, 1));
    }

    #[test]
    fn test_bounded_variants() {
        assert!(quantize_multiplier_smaller_than_one(0.3).is_ok());
        assert!(quantize_multiplier_smaller_than_one(1.5).is_err());
        let (_, s) = quantize_multiplier_greater_than_one(3.0).unwrap();
        assert_eq!(s, 2);
        assert!(quantize_multiplier_greater_than_one(0.5).is_err());
    }

    #[test]
    fn test_fold_mean_count() {
        // 1.0 folded over 4 elements is 0.25.
        assert_eq!(fold_mean_count(1 << 30, 1, 4), (1 << 30, -1));
        let (m, s) = fold_mean_count(1 << 30, 1, 3);
        let q = QuantParams::new(m, s);
        assert_eq!(q.apply(300), 100);
        assert_eq!(fold_mean_count(1 << 30, 1, 1), (1 << 30, 1));
    }

    #[test]
    fn test_per_channel_multipliers() {
        let mut m = [0; 2];
        let mut s = [0; 2];
        per_channel_multipliers(0.5, &[1.0, 0.25], 0.5, &mut m, &mut s).unwrap();
        assert_eq!((m[0], s[0]), (1 << 30, 1));
        assert_eq!((m[1], s[1]), (1 << 30, -1));

        let mut short = [0; 1];
        assert!(per_channel_multipliers(0.5, &[1.0, 0.25], 0.5, &mut short, &mut s).is_err());
    }

    #[test]
    fn test_per_channel_quant() {
        let m = [1 << 30, 1 << 30];
        let s = [1, 0];
        let q = PerChannelQuant::new(&m, &s).unwrap();
        assert_eq!(q.get(1), QuantParams::new(1 << 30, 0));
        assert!(q.expect_channels("conv", 2).is_ok());
        assert!(q.expect_channels("conv", 3).is_err());
        assert!(PerChannelQuant::new(&m, &s[..1]).is_err());
    }
}
