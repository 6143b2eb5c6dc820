// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Float to quantized and back.
//!
//! `q = clamp(round(x / scale) + zero_point)` with ties rounded away from
//! zero, and `x = (q - zero_point) * scale`. Half-precision variants go
//! through `f32`.

use half::f16;
use qnn_core::{KernelError, QuantElem, TensorView, TensorViewMut};

use crate::validate;

/// Affine quantization of a tensor: `real = scale * (q - zero_point)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineQuant {
    pub scale: f32,
    pub zero_point: i32,
}

impl AffineQuant {
    pub fn new(scale: f32, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }

    fn check(&self, op: &'static str) -> Result<(), KernelError> {
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(KernelError::invalid(op, format!("scale {} must be positive", self.scale)));
        }
        Ok(())
    }

    #[inline]
    fn quantize<O: QuantElem>(&self, x: f32) -> O {
        let q = (x / self.scale).round() as i32;
        O::saturate(q.saturating_add(self.zero_point))
    }

    #[inline]
    fn dequantize<I: QuantElem>(&self, q: I) -> f32 {
        (q.to_i32() - self.zero_point) as f32 * self.scale
    }
}

fn quantize<F: Copy, O: QuantElem>(
    op: &'static str,
    quant: &AffineQuant,
    to_f32: impl Fn(F) -> f32,
    input: &TensorView<'_, F>,
    output: &mut TensorViewMut<'_, O>,
) -> Result<(), KernelError> {
    quant.check(op)?;
    validate::same_dims(op, input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = quant.quantize(to_f32(x));
    }
    Ok(())
}

fn dequantize<I: QuantElem, F>(
    op: &'static str,
    quant: &AffineQuant,
    from_f32: impl Fn(f32) -> F,
    input: &TensorView<'_, I>,
    output: &mut TensorViewMut<'_, F>,
) -> Result<(), KernelError> {
    quant.check(op)?;
    validate::same_dims(op, input.dims(), output.dims())?;
    for (o, &q) in output.data_mut().iter_mut().zip(input.data()) {
        *o = from_f32(quant.dequantize(q));
    }
    Ok(())
}

/// `f32` to int8.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] for a non-positive scale and
/// [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn quantize_f32_s8(
    quant: &AffineQuant,
    input: &TensorView<'_, f32>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    quantize("quantize_f32_s8", quant, |x| x, input, output)
}

/// `f32` to int16.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn quantize_f32_s16(
    quant: &AffineQuant,
    input: &TensorView<'_, f32>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    quantize("quantize_f32_s16", quant, |x| x, input, output)
}

/// `f16` to int8.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn quantize_f16_s8(
    quant: &AffineQuant,
    input: &TensorView<'_, f16>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    quantize("quantize_f16_s8", quant, f16::to_f32, input, output)
}

/// `f16` to int16.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn quantize_f16_s16(
    quant: &AffineQuant,
    input: &TensorView<'_, f16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    quantize("quantize_f16_s16", quant, f16::to_f32, input, output)
}

/// int8 to `f32`.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn dequantize_s8_f32(
    quant: &AffineQuant,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, f32>,
) -> Result<(), KernelError> {
    dequantize("dequantize_s8_f32", quant, |x| x, input, output)
}

/// int16 to `f32`.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn dequantize_s16_f32(
    quant: &AffineQuant,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, f32>,
) -> Result<(), KernelError> {
    dequantize("dequantize_s16_f32", quant, |x| x, input, output)
}

/// int8 to `f16`.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn dequantize_s8_f16(
    quant: &AffineQuant,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, f16>,
) -> Result<(), KernelError> {
    dequantize("dequantize_s8_f16", quant, f16::from_f32, input, output)
}

/// int16 to `f16`.
///
/// # Errors
/// As [`quantize_f32_s8`].
pub fn dequantize_s16_f16(
    quant: &AffineQuant,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, f16>,
) -> Result<(), KernelError> {
    dequantize("dequantize_s16_f16", quant, f16::from_f32, input, output)
}
