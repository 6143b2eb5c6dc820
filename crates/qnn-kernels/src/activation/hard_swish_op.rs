// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hard-swish, `x * relu6(x + 3) / 6`, under two quantization schemes.
//!
//! The int8 kernel reproduces the TFLite reference arithmetic: the input
//! is lifted to a 16-bit high-resolution scale, a "reluish" factor in
//! `[0, 1]` is formed with int16 fixed-point multiplies, and the two are
//! combined with one doubling high multiply. The int16 kernel computes the
//! product directly in 64 bits and requantizes once.

use qnn_core::fixed_point::{
    reduce_multiplier_q15, requantize_s64, rounding_divide_by_pot_i16, saturating_doubling_high_mul_i16,
    saturating_left_shift_i16, saturating_rounding_doubling_high_mul_i16,
};
use qnn_core::quant::quantize_multiplier;
use qnn_core::{KernelError, TensorView, TensorViewMut};

use crate::validate;

/// Narrows a Q31 multiplier to Q15 with rounding.
fn downscale_to_i16(multiplier: i32) -> i16 {
    const ROUNDING: i32 = 1 << 15;
    if multiplier >= i32::MAX - ROUNDING {
        i16::MAX
    } else {
        ((multiplier + ROUNDING) >> 16) as i16
    }
}

fn positive_scale(op: &'static str, what: &str, scale: f32) -> Result<(), KernelError> {
    if !(scale > 0.0 && scale.is_finite()) {
        return Err(KernelError::invalid(op, format!("{what} scale {scale} must be positive")));
    }
    Ok(())
}

/// Prepared int8 hard-swish parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardSwishParams {
    pub input_zero_point: i32,
    pub output_zero_point: i32,
    pub reluish_multiplier: i16,
    pub reluish_exponent: i32,
    pub output_multiplier: i16,
    /// Never positive.
    pub output_exponent: i32,
}

impl HardSwishParams {
    /// Prepares the two int16 multipliers from the tensor scales.
    ///
    /// # Errors
    /// Returns [`KernelError::InvalidArgument`] for a non-positive scale or
    /// when the output scale is so much finer than the input's that the
    /// output rescale would need a left shift.
    pub fn from_scales(input: (f32, i32), output: (f32, i32)) -> Result<Self, KernelError> {
        const OP: &str = "hard_swish_s8";
        positive_scale(OP, "input", input.0)?;
        positive_scale(OP, "output", output.0)?;
        let hires_input_scale = input.0 / 128.0;
        let reluish_scale = 3.0f32 / 32768.0;

        let (out_m, output_exponent) = quantize_multiplier(f64::from(hires_input_scale / output.0));
        if output_exponent > 0 {
            return Err(KernelError::invalid(
                OP,
                format!("output rescale needs a left shift of {output_exponent}"),
            ));
        }
        let (reluish_m, reluish_exponent) = quantize_multiplier(f64::from(hires_input_scale / reluish_scale));
        Ok(Self {
            input_zero_point: input.1,
            output_zero_point: output.1,
            reluish_multiplier: downscale_to_i16(reluish_m),
            reluish_exponent,
            output_multiplier: downscale_to_i16(out_m),
            output_exponent,
        })
    }

    fn apply(&self, x: i8) -> i8 {
        let centred = (i32::from(x) - self.input_zero_point) as i16;
        let hires = centred.wrapping_mul(1 << 7);
        let preshift = saturating_rounding_doubling_high_mul_i16(hires, self.output_multiplier);

        let mut reluish = hires;
        if self.reluish_exponent > 0 {
            reluish = saturating_left_shift_i16(reluish, self.reluish_exponent - 1);
        }
        reluish = saturating_rounding_doubling_high_mul_i16(reluish, self.reluish_multiplier);
        if self.reluish_exponent > 0 {
            reluish = saturating_left_shift_i16(reluish, 1);
        }
        if self.reluish_exponent < 0 {
            reluish = rounding_divide_by_pot_i16(reluish, -self.reluish_exponent);
        }
        // [-1, 1] in Q15 onto [0, 1].
        let reluish = ((i32::from(reluish) + (1 << 15)) >> 1) as i16;

        let product = saturating_doubling_high_mul_i16(reluish, preshift);
        let out = i32::from(rounding_divide_by_pot_i16(product, -self.output_exponent)) + self.output_zero_point;
        out.clamp(i8::MIN.into(), i8::MAX.into()) as i8
    }
}

/// int8 hard-swish.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn hard_swish_s8(
    params: &HardSwishParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    validate::same_dims("hard_swish_s8", input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = params.apply(x);
    }
    Ok(())
}

/// Prepared int16 hard-swish parameters. int16 tensors are symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardSwishPreciseParams {
    /// 3.0 in input units.
    pub three: i32,
    /// Q15 multiplier for `input_scale² / (6 * output_scale)`.
    pub multiplier: i32,
    pub shift: i32,
}

impl HardSwishPreciseParams {
    /// # Errors
    /// Returns [`KernelError::InvalidArgument`] for a non-positive scale.
    pub fn from_scales(input_scale: f32, output_scale: f32) -> Result<Self, KernelError> {
        const OP: &str = "hard_swish_s16";
        positive_scale(OP, "input", input_scale)?;
        positive_scale(OP, "output", output_scale)?;
        let s_in = f64::from(input_scale);
        let three = (3.0 / s_in).round().min(f64::from(i32::MAX / 2)) as i32;
        let (m, shift) = quantize_multiplier(s_in * s_in / (6.0 * f64::from(output_scale)));
        Ok(Self {
            three,
            multiplier: reduce_multiplier_q15(m),
            shift,
        })
    }

    fn apply(&self, x: i16) -> i16 {
        let x = i64::from(x);
        let three = i64::from(self.three);
        let relu6 = (x + three).clamp(0, 2 * three);
        let v = requantize_s64(x * relu6, self.multiplier, self.shift);
        v.clamp(i16::MIN.into(), i16::MAX.into()) as i16
    }
}

/// int16 hard-swish.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn hard_swish_s16(
    params: &HardSwishPreciseParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    validate::same_dims("hard_swish_s16", input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = params.apply(x);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hard_swish(x: f64) -> f64 {
        x * (x + 3.0).clamp(0.0, 6.0) / 6.0
    }

    #[test]
    fn test_s8_known_points() {
        let params = HardSwishParams::from_scales((0.05, 0), (0.05, 0)).unwrap();
        let x = [60i8, -60, 0, 127];
        let mut y = [0i8; 4];
        hard_swish_s8(&params, &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
        assert_eq!(y, [60, 0, 0, 127]);
    }

    #[test]
    fn test_rejects_output_left_shift() {
        // hires/out = (1/128)*4 > 1 would need a left shift.
        let err = HardSwishParams::from_scales((4.0, 0), (1.0 / 512.0, 0)).unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }

    #[test]
    fn test_s16_known_points() {
        let s = 1.0 / 1024.0;
        let params = HardSwishPreciseParams::from_scales(s, s).unwrap();
        let x = [3072i16, -4096, 0, 32767, 1024];
        let mut y = [0i16; 5];
        hard_swish_s16(&params, &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
        assert_eq!(&y[..4], &[3072, 0, 0, 32767]);
        // 1 * 4 / 6 = 0.667 -> 682.67.
        assert!((i32::from(y[4]) - 683).abs() <= 1);
    }

    proptest! {
        #[test]
        fn prop_s8_tracks_float(x in any::<i8>(), zp in -20i32..20) {
            let (s_in, s_out) = (0.04f32, 0.03f32);
            let params = HardSwishParams::from_scales((s_in, zp), (s_out, -30)).unwrap();
            let real = hard_swish(f64::from(s_in) * f64::from(i32::from(x) - zp));
            let want = ((real / f64::from(s_out)).round() as i32 - 30).clamp(-128, 127);
            let got = i32::from(params.apply(x));
            prop_assert!((got - want).abs() <= 1, "x={x} got={got} want={want}");
        }

        #[test]
        fn prop_s16_tracks_float(x in any::<i16>()) {
            let (s_in, s_out) = (1.0f32 / 4096.0, 1.0f32 / 2048.0);
            let params = HardSwishPreciseParams::from_scales(s_in, s_out).unwrap();
            let real = hard_swish(f64::from(s_in) * f64::from(x));
            let want = (real / f64::from(s_out)).round().clamp(-32768.0, 32767.0) as i32;
            let got = i32::from(params.apply(x));
            prop_assert!((got - want).abs() <= 1, "x={x} got={got} want={want}");
        }
    }
}
