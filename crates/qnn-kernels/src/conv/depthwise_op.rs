// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Depthwise convolution.
//!
//! Each input channel is convolved on its own with `ch_mult = out_c / in_c`
//! filters; output channel `ic * ch_mult + m` reads only input channel `ic`.
//! The filter is laid out `[1, kh, kw, out_c]`.

use super::params::{check_output_extent, ConvParams};
use crate::validate;
use qnn_core::fixed_point::{reduce_multiplier_q15, requantize_s64};
use qnn_core::{Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut};

/// Shape checks shared by the depthwise variants. Returns `ch_mult`.
pub(crate) fn check_depthwise(
    op: &'static str,
    quant: &PerChannelQuant<'_>,
    input: &Dims,
    filter: &Dims,
    bias_len: Option<usize>,
    output: &Dims,
) -> Result<usize, KernelError> {
    if filter.n != 1 || output.n != input.n || output.c != filter.c {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: Dims::new(input.n, output.h, output.w, filter.c),
            rhs: *output,
        });
    }
    validate::positive(op, "input channels", input.c)?;
    if output.c % input.c != 0 {
        return Err(KernelError::ChannelDivisibility {
            op,
            channels: output.c,
            divisor: input.c,
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
    Ok(output.c / input.c)
}

/// Accumulator type of a depthwise sweep. Sums wrap like the int32/int64
/// registers they stand for.
pub(crate) trait Accumulator: Copy {
    fn wrapping_add(self, rhs: Self) -> Self;
}

impl Accumulator for i32 {
    fn wrapping_add(self, rhs: Self) -> Self {
        i32::wrapping_add(self, rhs)
    }
}

impl Accumulator for i64 {
    fn wrapping_add(self, rhs: Self) -> Self {
        i64::wrapping_add(self, rhs)
    }
}

/// Runs `emit(out_index, oc, acc)` for every output element, where `acc` is
/// `init(oc)` plus `tap(x, w)` for every in-bounds tap and `outside(w)` for
/// every tap in the padding.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sweep<T: Copy, A: Accumulator>(
    params: &ConvParams,
    x: &[T],
    id: &Dims,
    w: &[i8],
    fd: &Dims,
    od: &Dims,
    ch_mult: usize,
    tap: impl Fn(T, i8) -> A,
    outside: impl Fn(i8) -> A,
    init: impl Fn(usize) -> A,
    mut emit: impl FnMut(usize, usize, A),
) {
    for n in 0..od.n {
        for oh in 0..od.h {
            for ow in 0..od.w {
                let px = od.offset(n, oh, ow, 0);
                for ic in 0..id.c {
                    for m in 0..ch_mult {
                        let oc = ic * ch_mult + m;
                        let mut acc = init(oc);
                        for kh in 0..fd.h {
                            let ih = params.tap_h(oh, kh, id.h);
                            for kw in 0..fd.w {
                                let wv = w[(kh * fd.w + kw) * fd.c + oc];
                                match (ih, params.tap_w(ow, kw, id.w)) {
                                    (Some(ih), Some(iw)) => {
                                        acc = acc.wrapping_add(tap(x[id.offset(n, ih, iw, ic)], wv));
                                    }
                                    _ => acc = acc.wrapping_add(outside(wv)),
                                }
                            }
                        }
                        emit(px + oc, oc, acc);
                    }
                }
            }
        }
    }
}

/// int8 depthwise convolution with per-channel requantization.
///
/// # Errors
/// Returns [`KernelError::ChannelDivisibility`] if the output channels are
/// not a multiple of the input channels and
/// [`KernelError::ShapeMismatch`] if the filter does not match the output.
#[allow(clippy::too_many_arguments)]
pub fn depthwise_conv_s8(
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "depthwise_conv_s8";
    params.validate_s8(OP)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    let ch_mult = check_depthwise(OP, quant, &id, &fd, bias.map(<[i32]>::len), &od)?;
    check_output_extent(OP, params, &id, &fd, &od)?;

    let offset = params.input_offset;
    let out = output.data_mut();
    sweep(
        params,
        input.data(),
        &id,
        filter.data(),
        &fd,
        &od,
        ch_mult,
        |x, w| (i32::from(x) + offset) * i32::from(w),
        |_| 0,
        |oc| bias.map_or(0, |b| b[oc]),
        |o, oc, acc| {
            let v = quant.get(oc).apply(acc).wrapping_add(params.output_offset);
            out[o] = params.activation.clamp(v) as i8;
        },
    );
    Ok(())
}

/// int16 depthwise convolution with int64 bias. Offsets are ignored.
#[allow(clippy::too_many_arguments)]
pub fn depthwise_conv_s16(
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i16>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i64]>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    const OP: &str = "depthwise_conv_s16";
    params.validate(OP)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    let ch_mult = check_depthwise(OP, quant, &id, &fd, bias.map(<[i64]>::len), &od)?;
    check_output_extent(OP, params, &id, &fd, &od)?;

    let out = output.data_mut();
    sweep(
        params,
        input.data(),
        &id,
        filter.data(),
        &fd,
        &od,
        ch_mult,
        |x, w| i64::from(x) * i64::from(w),
        |_| 0,
        |oc| bias.map_or(0, |b| b[oc]),
        |o, oc, acc| {
            let q = quant.get(oc);
            let v = requantize_s64(acc, reduce_multiplier_q15(q.multiplier), q.shift);
            out[o] = params.activation.clamp(v).clamp(i16::MIN.into(), i16::MAX.into()) as i16;
        },
    );
    Ok(())
}
