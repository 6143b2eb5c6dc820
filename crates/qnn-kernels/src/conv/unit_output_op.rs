// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution whose receptive field is the whole input.
//!
//! When the filter covers the full H×W extent with no padding the output is
//! 1×1 and each batch collapses into a single GEMM row.

use super::params::{check_conv, check_output_extent, ConvParams};
use crate::validate;
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut, Tile};

/// Whether the unit-output variant can run this configuration.
pub(crate) fn applies(params: &ConvParams, input: &Dims, filter: &Dims, output: &Dims) -> bool {
    output.h == 1
        && output.w == 1
        && filter.h == input.h
        && filter.w == input.w
        && filter.c == input.c
        && params.padding == Tile::zero()
        && params.dilation == Tile::unit()
}

/// Unit-output int8 convolution.
///
/// `kernel_sums`, when given, holds each filter row's sum (see
/// [`vector_sum_s8`](crate::fully_connected::vector_sum_s8)); the input
/// offset is then folded in once per output channel instead of once per
/// tap. Both forms give identical results.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] unless the filter spans the
/// whole input with no padding and the output is 1×1.
#[allow(clippy::too_many_arguments)]
pub fn convolve_unit_output_s8(
    backend: Backend,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    kernel_sums: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "convolve_unit_output_s8";
    params.validate_s8(OP)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    if !applies(params, &id, &fd, &od) {
        return Err(KernelError::invalid(
            OP,
            format!("filter {fd} must cover input {id} exactly with a 1x1 output"),
        ));
    }
    check_conv(OP, quant, &id, &fd, bias.map(<[i32]>::len), &od)?;
    check_output_extent(OP, params, &id, &fd, &od)?;
    validate::channel_slice(OP, "kernel sums", kernel_sums, od.c)?;

    let ops = backend.ops();
    let depth = id.h * id.w * id.c;
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    for n in 0..od.n {
        let slab = &x[n * depth..(n + 1) * depth];
        for (oc, row) in w.chunks_exact(depth.max(1)).take(od.c).enumerate() {
            let raw = match kernel_sums {
                Some(sums) => ops
                    .dot_i8_offset(slab, row, 0)
                    .wrapping_add(sums[oc].wrapping_mul(params.input_offset)),
                None => ops.dot_i8_offset(slab, row, params.input_offset),
            };
            let acc = raw.wrapping_add(bias.map_or(0, |b| b[oc]));
            let v = quant.get(oc).apply(acc).wrapping_add(params.output_offset);
            out[n * od.c + oc] = params.activation.clamp(v) as i8;
        }
    }
    Ok(())
}
