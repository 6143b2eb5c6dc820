// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution wrapper that picks the cheapest applicable int8 variant.

use super::convolve_op::{convolve_s8, convolve_s8_get_buffer_size};
use super::params::ConvParams;
use super::pointwise_op::{self, convolve_1x1_s8, convolve_1x1_s8_fast};
use super::unit_output_op::{self, convolve_unit_output_s8};
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut, Tile};
use scratch_arena::Scratch;
use tracing::trace;

/// The int8 convolution variants the wrapper can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvVariant {
    /// 1×1 filter, unit stride, output spatial dims equal to the input's.
    Pointwise1x1Fast,
    /// 1×1 filter with any stride.
    Pointwise1x1,
    /// Filter covers the whole input; output is 1×1.
    UnitOutput,
    /// General im2col path.
    Im2col,
}

impl ConvVariant {
    /// Selects the variant for a configuration. The first match wins.
    pub fn select(params: &ConvParams, input: &Dims, filter: &Dims, output: &Dims) -> Self {
        if pointwise_op::applies(params, input, filter) {
            if params.stride == Tile::unit() && (output.h, output.w) == (input.h, input.w) {
                ConvVariant::Pointwise1x1Fast
            } else {
                ConvVariant::Pointwise1x1
            }
        } else if unit_output_op::applies(params, input, filter, output) {
            ConvVariant::UnitOutput
        } else {
            ConvVariant::Im2col
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConvVariant::Pointwise1x1Fast => "pointwise-1x1-fast",
            ConvVariant::Pointwise1x1 => "pointwise-1x1",
            ConvVariant::UnitOutput => "unit-output",
            ConvVariant::Im2col => "im2col",
        }
    }
}

impl std::fmt::Display for ConvVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scratch bytes [`convolve_wrapper_s8`] needs for the variant it will pick.
pub fn convolve_wrapper_s8_get_buffer_size(params: &ConvParams, input: &Dims, filter: &Dims, output: &Dims) -> usize {
    match ConvVariant::select(params, input, filter, output) {
        ConvVariant::Im2col => convolve_s8_get_buffer_size(input, filter),
        _ => 0,
    }
}

/// int8 convolution through the variant [`ConvVariant::select`] picks.
///
/// # Errors
/// Whatever the chosen variant returns.
#[allow(clippy::too_many_arguments)]
pub fn convolve_wrapper_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let variant = ConvVariant::select(params, &input.dims(), &filter.dims(), &output.dims());
    trace!(variant = variant.as_str(), backend = backend.as_str(), "convolve_wrapper_s8");
    match variant {
        ConvVariant::Pointwise1x1Fast => convolve_1x1_s8_fast(backend, params, quant, input, filter, bias, output),
        ConvVariant::Pointwise1x1 => convolve_1x1_s8(backend, params, quant, input, filter, bias, output),
        ConvVariant::UnitOutput => convolve_unit_output_s8(backend, params, quant, input, filter, bias, None, output),
        ConvVariant::Im2col => convolve_s8(backend, scratch, params, quant, input, filter, bias, output),
    }
}
