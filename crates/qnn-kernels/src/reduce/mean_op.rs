// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Mean and sum reductions.

use super::strategy::{self, ReduceStrategy};
use crate::lanes::LaneElem;
use qnn_core::quant::fold_mean_count;
use qnn_core::{AxisMask, Backend, KernelError, QuantParams, TensorView, TensorViewMut};
use scratch_arena::Scratch;

/// Quantization of a mean or sum reduction.
///
/// For a mean, `output` must already carry the `1 / count` factor; see
/// [`ReduceParams::for_mean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReduceParams {
    /// Added to every input element (the negated input zero point).
    pub input_offset: i32,
    pub output: QuantParams,
    pub output_offset: i32,
}

impl ReduceParams {
    /// Prepares a mean from real scales: the input-to-output ratio with the
    /// element count folded in.
    pub fn for_mean(
        input: (f32, i32),
        output: (f32, i32),
        input_dims: &qnn_core::Dims,
        mask: &AxisMask,
    ) -> Result<Self, KernelError> {
        if !(input.0 > 0.0 && output.0 > 0.0) {
            return Err(KernelError::invalid("reduce_params", "scales must be positive"));
        }
        let base = QuantParams::from_real(f64::from(input.0) / f64::from(output.0));
        let (multiplier, shift) = fold_mean_count(base.multiplier, base.shift, mask.reduced_count(input_dims));
        Ok(Self {
            input_offset: -input.1,
            output: QuantParams::new(multiplier, shift),
            output_offset: output.1,
        })
    }
}

/// Mean over the masked axes of an int8 tensor.
///
/// Each output element is `clamp(rescale(Σx + input_offset·count) +
/// output_offset)`; the sum is rescaled once.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if `output` does not have the
/// reduced dims and [`KernelError::ScratchTooSmall`] if the spatial
/// strategy is chosen and `scratch` lacks
/// [`reduce_get_buffer_size`](super::reduce_get_buffer_size) bytes.
pub fn mean_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, i8>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let strategy = ReduceStrategy::plan(&input.dims(), mask);
    reduce_sum("mean_s8", backend, scratch, input, mask, params, output, strategy)
}

/// [`mean_s8`] with a caller-chosen strategy.
pub fn mean_s8_with_strategy(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, i8>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, i8>,
    strategy: ReduceStrategy,
) -> Result<(), KernelError> {
    reduce_sum("mean_s8", backend, scratch, input, mask, params, output, strategy)
}

/// Mean over the masked axes of an int16 tensor.
pub fn mean_s16(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, i16>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    let strategy = ReduceStrategy::plan(&input.dims(), mask);
    reduce_sum("mean_s16", backend, scratch, input, mask, params, output, strategy)
}

/// [`mean_s16`] with a caller-chosen strategy.
pub fn mean_s16_with_strategy(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, i16>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, i16>,
    strategy: ReduceStrategy,
) -> Result<(), KernelError> {
    reduce_sum("mean_s16", backend, scratch, input, mask, params, output, strategy)
}

/// Sum over the masked axes of an int8 tensor, rescaled by `params.output`.
pub fn reduce_sum_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, i8>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let strategy = ReduceStrategy::plan(&input.dims(), mask);
    reduce_sum("reduce_sum_s8", backend, scratch, input, mask, params, output, strategy)
}

/// Sum over the masked axes of an int16 tensor, rescaled by `params.output`.
pub fn reduce_sum_s16(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, i16>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    let strategy = ReduceStrategy::plan(&input.dims(), mask);
    reduce_sum("reduce_sum_s16", backend, scratch, input, mask, params, output, strategy)
}

#[allow(clippy::too_many_arguments)]
fn reduce_sum<T: LaneElem>(
    op: &'static str,
    backend: Backend,
    scratch: &mut Scratch<'_>,
    input: &TensorView<'_, T>,
    mask: &AxisMask,
    params: &ReduceParams,
    output: &mut TensorViewMut<'_, T>,
    strategy: ReduceStrategy,
) -> Result<(), KernelError> {
    let dims = input.dims();
    strategy::check_output(op, &dims, mask, &output.dims())?;
    let strategy = strategy.check(op, &dims, mask)?;
    let acc: &mut [i32] = match strategy {
        ReduceStrategy::Spatial => scratch.take(dims.c).map_err(|e| e.for_op(op))?,
        _ => &mut [],
    };

    let count = mask.reduced_count(&dims) as i32;
    let bias = params.input_offset.wrapping_mul(count);
    let p = *params;
    let out = output.data_mut();
    strategy::sum_each(backend.ops(), strategy, input.data(), &dims, mask, acc, |o, sum| {
        let v = p.output.apply(sum.wrapping_add(bias)).wrapping_add(p.output_offset);
        out[o] = T::saturate(v);
    });
    Ok(())
}
