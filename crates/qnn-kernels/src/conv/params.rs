// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution parameters and shape checks shared by every variant.

use crate::validate;
use qnn_core::{ActivationRange, Dims, KernelError, PerChannelQuant, Tile};

/// Geometry and zero points of a convolution.
///
/// Filters are laid out `[out_c, kh, kw, in_c / groups]` for standard and
/// transpose convolution and `[1, kh, kw, out_c]` for depthwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParams {
    /// Added to every input value (the negated input zero point).
    pub input_offset: i32,
    /// Added after requantization (the output zero point).
    pub output_offset: i32,
    pub stride: Tile,
    pub padding: Tile,
    pub dilation: Tile,
    pub activation: ActivationRange,
}

impl ConvParams {
    /// Unit stride and dilation, no padding, no activation clamp.
    pub fn new(input_offset: i32, output_offset: i32) -> Self {
        Self {
            input_offset,
            output_offset,
            stride: Tile::unit(),
            padding: Tile::zero(),
            dilation: Tile::unit(),
            activation: ActivationRange::full::<i8>(),
        }
    }

    pub fn with_stride(mut self, stride: Tile) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: Tile) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_dilation(mut self, dilation: Tile) -> Self {
        self.dilation = dilation;
        self
    }

    pub fn with_activation(mut self, activation: ActivationRange) -> Self {
        self.activation = activation;
        self
    }

    /// Checks stride, dilation and the activation range.
    pub(crate) fn validate(&self, op: &'static str) -> Result<(), KernelError> {
        validate::positive(op, "stride", self.stride.h)?;
        validate::positive(op, "stride", self.stride.w)?;
        validate::positive(op, "dilation", self.dilation.h)?;
        validate::positive(op, "dilation", self.dilation.w)?;
        self.activation.validate(op)
    }

    /// Additionally checks that the zero points fit an int8 tensor.
    pub(crate) fn validate_s8(&self, op: &'static str) -> Result<(), KernelError> {
        self.validate(op)?;
        validate::in_range(op, "input offset", self.input_offset, -128, 128)?;
        validate::in_range(op, "output offset", self.output_offset, -128, 127)
    }

    /// Input coordinate of tap `k` for output `o` along the H axis, or
    /// `None` inside the padding.
    #[inline]
    pub(crate) fn tap_h(&self, o: usize, k: usize, extent: usize) -> Option<usize> {
        tap(o, k, self.stride.h, self.padding.h, self.dilation.h, extent)
    }

    /// Input coordinate of tap `k` for output `o` along the W axis.
    #[inline]
    pub(crate) fn tap_w(&self, o: usize, k: usize, extent: usize) -> Option<usize> {
        tap(o, k, self.stride.w, self.padding.w, self.dilation.w, extent)
    }
}

#[inline]
fn tap(o: usize, k: usize, stride: usize, pad: usize, dilation: usize, extent: usize) -> Option<usize> {
    (o * stride + k * dilation).checked_sub(pad).filter(|&i| i < extent)
}

/// Output extent along one spatial axis.
///
/// # Examples
/// ```
/// use qnn_kernels::conv::conv_output_extent;
/// // 3x3 filter, stride 1, padding 1: "same" size.
/// assert_eq!(conv_output_extent(5, 3, 1, 1, 1), 5);
/// // Stride 2, no padding.
/// assert_eq!(conv_output_extent(7, 3, 2, 0, 1), 3);
/// ```
pub fn conv_output_extent(input: usize, filter: usize, stride: usize, padding: usize, dilation: usize) -> usize {
    let span = dilation * filter.saturating_sub(1) + 1;
    let padded = input + 2 * padding;
    if padded < span || stride == 0 {
        0
    } else {
        (padded - span) / stride + 1
    }
}

/// Checks that the output's H and W are the ones `params` produces from
/// the input and filter.
pub(crate) fn check_output_extent(
    op: &'static str,
    params: &ConvParams,
    input: &Dims,
    filter: &Dims,
    output: &Dims,
) -> Result<(), KernelError> {
    let h = conv_output_extent(input.h, filter.h, params.stride.h, params.padding.h, params.dilation.h);
    let w = conv_output_extent(input.w, filter.w, params.stride.w, params.padding.w, params.dilation.w);
    if output.h != h || output.w != w {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: Dims::new(output.n, h, w, output.c),
            rhs: *output,
        });
    }
    Ok(())
}

/// Channel grouping of a standard convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Groups {
    /// Number of independent channel groups.
    pub count: usize,
    /// Input channels per group (the filter's C).
    pub in_per_group: usize,
    /// Output channels per group.
    pub out_per_group: usize,
}

/// Checks a standard convolution's tensors against each other and returns
/// its channel grouping.
pub(crate) fn check_conv(
    op: &'static str,
    quant: &PerChannelQuant<'_>,
    input: &Dims,
    filter: &Dims,
    bias_len: Option<usize>,
    output: &Dims,
) -> Result<Groups, KernelError> {
    if output.n != input.n || output.c != filter.n {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: Dims::new(input.n, output.h, output.w, filter.n),
            rhs: *output,
        });
    }
    validate::positive(op, "filter channels", filter.c)?;
    if input.c % filter.c != 0 {
        return Err(KernelError::ChannelDivisibility {
            op,
            channels: input.c,
            divisor: filter.c,
        });
    }
    let count = input.c / filter.c;
    if count == 0 || output.c % count != 0 {
        return Err(KernelError::ChannelDivisibility {
            op,
            channels: output.c,
            divisor: count.max(1),
        });
    }
    quant.expect_channels(op, output.c)?;
    if let Some(len) = bias_len {
        if len != output.c {
            return Err(KernelError::invalid(
                op,
                format!("bias has {len} entries for {} output channels", output.c),
            ));
        }
    }
    Ok(Groups {
        count,
        in_per_group: filter.c,
        out_per_group: output.c / count,
    })
}
