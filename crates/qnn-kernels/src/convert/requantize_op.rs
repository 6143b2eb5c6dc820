// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integer-to-integer requantization between affine domains.

use qnn_core::{KernelError, QuantElem, QuantParams, TensorView, TensorViewMut};

use crate::validate;

/// A single requantization between two affine-quantized tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequantParams {
    pub input_zero_point: i32,
    pub quant: QuantParams,
    pub output_zero_point: i32,
}

impl RequantParams {
    /// Same scale, zero points of 0.
    pub fn identity() -> Self {
        Self {
            input_zero_point: 0,
            quant: QuantParams::identity(),
            output_zero_point: 0,
        }
    }

    /// Rescale from `(in_scale, in_zp)` to `(out_scale, out_zp)`.
    pub fn from_scales(input: (f32, i32), output: (f32, i32)) -> Self {
        Self {
            input_zero_point: input.1,
            quant: QuantParams::from_real(f64::from(input.0) / f64::from(output.0)),
            output_zero_point: output.1,
        }
    }

    /// `requantize(x - in_zp) + out_zp`, unclamped.
    #[inline]
    pub(crate) fn apply(&self, x: i32) -> i32 {
        self.quant
            .apply(x.wrapping_sub(self.input_zero_point))
            .wrapping_add(self.output_zero_point)
    }
}

/// Requantizes every element from `I` to `O`, saturating to `O`'s range.
///
/// Covers s8→s8, s16→s16, s8→s16 and s16→s8.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn requantize<I: QuantElem, O: QuantElem>(
    params: &RequantParams,
    input: &TensorView<'_, I>,
    output: &mut TensorViewMut<'_, O>,
) -> Result<(), KernelError> {
    validate::same_dims("requantize", input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = O::saturate(params.apply(x.to_i32()));
    }
    Ok(())
}
