// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax over int8 rows with int8 or int16 output.
//!
//! Each element's distance below its row maximum is rescaled into Q5.26
//! and exponentiated in fixed point. Distances below `diff_min` contribute
//! nothing and map straight to the output minimum. The row sum is inverted
//! once with a Newton-Raphson reciprocal.

use qnn_core::fixed_point::{divide_by_pow2, doubling_high_mult, exp_on_negative_values, one_over_one_plus_x_for_x_in_0_1};
use qnn_core::quant::quantize_multiplier_greater_than_one;
use qnn_core::{Backend, KernelError, QuantElem, TensorView, TensorViewMut};

use crate::lanes::LaneElem;
use crate::validate;

/// Fractional bits kept per exponential when accumulating a row sum.
const ACCUM_BITS: i32 = 12;
/// Integer bits of the rescaled difference.
const SCALED_DIFF_INTEGER_BITS: i32 = 5;

/// Prepared int8 softmax parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftmaxParams {
    pub multiplier: i32,
    pub left_shift: i32,
    /// Largest negative distance from the row maximum still exponentiated.
    pub diff_min: i32,
}

impl SoftmaxParams {
    /// Prepares the rescale of `beta * input_scale` into Q5.26.
    ///
    /// # Errors
    /// Returns [`KernelError::InvalidArgument`] if `beta * input_scale` is
    /// too small to rescale with a left shift.
    pub fn from_beta_scale(beta: f32, input_scale: f32) -> Result<Self, KernelError> {
        let max_real = f64::from(i32::MAX);
        let real = (f64::from(beta) * f64::from(input_scale) * f64::from(1u32 << (31 - SCALED_DIFF_INTEGER_BITS)))
            .min(max_real);
        let (multiplier, left_shift) = quantize_multiplier_greater_than_one(real)?;
        let radius = f64::from((1 << SCALED_DIFF_INTEGER_BITS) - 1)
            * f64::from(1u32 << (31 - SCALED_DIFF_INTEGER_BITS))
            / 2f64.powi(left_shift);
        Ok(Self {
            multiplier,
            left_shift,
            diff_min: -(radius.floor() as i32),
        })
    }

    #[inline]
    fn exp(&self, diff: i32) -> i32 {
        exp_on_negative_values(doubling_high_mult(diff.wrapping_shl(self.left_shift as u32), self.multiplier))
    }
}

fn softmax_rows<O: QuantElem>(
    op: &'static str,
    backend: Backend,
    params: &SoftmaxParams,
    unit_bits: i32,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, O>,
) -> Result<(), KernelError> {
    let dims = input.dims();
    validate::same_dims(op, dims, output.dims())?;
    let row = dims.c;
    if row == 0 {
        return Ok(());
    }
    let ops = backend.ops();

    for (x, y) in input.data().chunks_exact(row).zip(output.data_mut().chunks_exact_mut(row)) {
        let max = i32::from(<i8 as LaneElem>::row_max(ops, x));
        let sum = x
            .iter()
            .map(|&v| i32::from(v) - max)
            .filter(|&d| d >= params.diff_min)
            .fold(0i32, |acc, d| acc.wrapping_add(divide_by_pow2(params.exp(d), ACCUM_BITS)));

        let headroom = (sum as u32).leading_zeros() as i32;
        let shifted = if sum > 0 {
            ((sum as u32) << headroom).wrapping_sub(1 << 31) as i32
        } else {
            i32::MIN
        };
        let scale = one_over_one_plus_x_for_x_in_0_1(shifted);
        let bits_over_unit = ACCUM_BITS - headroom + unit_bits;

        for (o, &v) in y.iter_mut().zip(x) {
            let d = i32::from(v) - max;
            *o = if d >= params.diff_min {
                let r = divide_by_pow2(doubling_high_mult(scale, params.exp(d)), bits_over_unit) + O::MIN;
                O::saturate(r)
            } else {
                O::from_i32(O::MIN)
            };
        }
    }
    Ok(())
}

/// int8 softmax along the innermost axis. The output has scale 1/256 and
/// zero point -128.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn softmax_s8(
    backend: Backend,
    params: &SoftmaxParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    softmax_rows("softmax_s8", backend, params, 23, input, output)
}

/// int8 softmax with int16 output (scale 1/65536, zero point -32768).
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn softmax_s8_s16(
    backend: Backend,
    params: &SoftmaxParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    softmax_rows("softmax_s8_s16", backend, params, 15, input, output)
}
