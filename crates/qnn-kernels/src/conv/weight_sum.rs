// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-channel weight sums for offset folding in depthwise convolution.
//!
//! `Σ (x + off) * w` splits into `Σ x * w + off * Σ w`. The second term is
//! constant per output channel, so it can be computed once per model and
//! folded into the bias. Padding taps then have to contribute nothing to
//! the first term either, which the folded kernel achieves by reading
//! `-off` for them.
//!
//! Only the lane backend carries the folded kernel.

use super::depthwise_op::{check_depthwise, sweep};
use super::params::{check_output_extent, ConvParams};
use crate::validate;
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut};

/// Bytes of folded bias the caller must keep for a depthwise filter: one
/// int32 per output channel, or 0 when the backend has no folded kernel.
pub fn depthwise_conv_weight_sum_size(backend: Backend, filter: &Dims) -> usize {
    if backend.supports_weight_sum() {
        filter.c * std::mem::size_of::<i32>()
    } else {
        0
    }
}

/// Computes `bias[oc] + input_offset * Σ filter[.., oc]` into `out`.
///
/// # Errors
/// Returns [`KernelError::NotImplemented`] on the scalar backend and
/// [`KernelError::InvalidArgument`] if `out` or `bias` is not one entry per
/// output channel.
pub fn depthwise_conv_weight_sum(
    backend: Backend,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    input_offset: i32,
    out: &mut [i32],
) -> Result<(), KernelError> {
    const OP: &str = "depthwise_conv_weight_sum";
    if !backend.supports_weight_sum() {
        return Err(KernelError::NotImplemented {
            op: OP,
            backend: backend.as_str(),
        });
    }
    let fd = filter.dims();
    validate::channel_slice(OP, "bias", bias, fd.c)?;
    validate::channel_slice(OP, "weight sum buffer", Some(&*out), fd.c)?;

    let ops = backend.ops();
    out.fill(0);
    for row in filter.data().chunks_exact(fd.c.max(1)) {
        ops.accumulate_i8(out, row);
    }
    for (oc, s) in out.iter_mut().enumerate() {
        *s = bias
            .map_or(0, |b| b[oc])
            .wrapping_add(s.wrapping_mul(input_offset));
    }
    Ok(())
}

/// Depthwise convolution consuming a folded bias from
/// [`depthwise_conv_weight_sum`]. Numerically identical to
/// [`depthwise_conv_s8`](super::depthwise_conv_s8) with the same offset and
/// bias.
///
/// # Errors
/// Returns [`KernelError::NotImplemented`] on the scalar backend, otherwise
/// as [`depthwise_conv_s8`](super::depthwise_conv_s8).
pub fn depthwise_conv_s8_folded(
    backend: Backend,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    folded_bias: &[i32],
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "depthwise_conv_s8_folded";
    if !backend.supports_weight_sum() {
        return Err(KernelError::NotImplemented {
            op: OP,
            backend: backend.as_str(),
        });
    }
    params.validate_s8(OP)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    let ch_mult = check_depthwise(OP, quant, &id, &fd, Some(folded_bias.len()), &od)?;
    check_output_extent(OP, params, &id, &fd, &od)?;

    let pad_value = -params.input_offset;
    let out = output.data_mut();
    sweep(
        params,
        input.data(),
        &id,
        filter.data(),
        &fd,
        &od,
        ch_mult,
        |x, w| i32::from(x) * i32::from(w),
        |w| pad_value * i32::from(w),
        |oc| folded_bias[oc],
        |o, oc, acc| {
            let v = quant.get(oc).apply(acc).wrapping_add(params.output_offset);
            out[o] = params.activation.clamp(v) as i8;
        },
    );
    Ok(())
}
