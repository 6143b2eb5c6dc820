// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! ReLU family: requantize, then clamp.
//!
//! `relu_*` clamps to `[output_zero_point, T::MAX]` and `relu6_s8` to
//! `[output_zero_point, output_zero_point + six]`; leaky ReLU picks between
//! two rescales by the sign of the centred input.

use qnn_core::{ActivationRange, KernelError, QuantElem, QuantParams, TensorView, TensorViewMut};

use crate::convert::RequantParams;
use crate::validate;

fn requant_clamp<T: QuantElem>(
    op: &'static str,
    params: &RequantParams,
    range: ActivationRange,
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    validate::same_dims(op, input.dims(), output.dims())?;
    range.validate(op)?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = T::saturate(range.clamp(params.apply(x.to_i32())));
    }
    Ok(())
}

/// int8 ReLU.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
///
/// # Examples
/// ```
/// use qnn_core::{TensorView, TensorViewMut};
/// use qnn_kernels::activation::relu_s8;
/// use qnn_kernels::convert::RequantParams;
///
/// let x = [-5i8, 0, 5, 127, -128];
/// let mut y = [0i8; 5];
/// relu_s8(&RequantParams::identity(), &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
/// assert_eq!(y, [0, 0, 5, 127, 0]);
/// ```
pub fn relu_s8(
    params: &RequantParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let range = ActivationRange::relu::<i8>(params.output_zero_point);
    requant_clamp("relu_s8", params, range, input, output)
}

/// int16 ReLU.
///
/// # Errors
/// As [`relu_s8`].
pub fn relu_s16(
    params: &RequantParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    let range = ActivationRange::relu::<i16>(params.output_zero_point);
    requant_clamp("relu_s16", params, range, input, output)
}

/// int8 ReLU6. `six` is 6.0 in the output's quantized units.
///
/// # Errors
/// As [`relu_s8`].
pub fn relu6_s8(
    params: &RequantParams,
    six: i32,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let range = ActivationRange::relu6::<i8>(params.output_zero_point, six);
    requant_clamp("relu6_s8", params, range, input, output)
}

/// Leaky ReLU rescales: `identity` for `x >= input_zero_point`, `alpha`
/// below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakyReluParams {
    pub input_zero_point: i32,
    pub identity: QuantParams,
    pub alpha: QuantParams,
    pub output_zero_point: i32,
}

impl LeakyReluParams {
    /// Derives both rescales from the tensor scales and the real slope.
    pub fn from_scales(input: (f32, i32), alpha: f32, output: (f32, i32)) -> Self {
        let ratio = f64::from(input.0) / f64::from(output.0);
        Self {
            input_zero_point: input.1,
            identity: QuantParams::from_real(ratio),
            alpha: QuantParams::from_real(ratio * f64::from(alpha)),
            output_zero_point: output.1,
        }
    }
}

fn leaky<T: QuantElem>(
    op: &'static str,
    params: &LeakyReluParams,
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    validate::same_dims(op, input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        let centred = x.to_i32() - params.input_zero_point;
        let q = if centred >= 0 { params.identity } else { params.alpha };
        *o = T::saturate(q.apply(centred).wrapping_add(params.output_zero_point));
    }
    Ok(())
}

/// int8 leaky ReLU.
///
/// # Errors
/// As [`relu_s8`].
pub fn leaky_relu_s8(
    params: &LeakyReluParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    leaky("leaky_relu_s8", params, input, output)
}

/// int16 leaky ReLU.
///
/// # Errors
/// As [`relu_s8`].
pub fn leaky_relu_s16(
    params: &LeakyReluParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    leaky("leaky_relu_s16", params, input, output)
}
