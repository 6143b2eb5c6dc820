// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Transpose convolution.
//!
//! The adjoint of [`convolve_s8`](super::convolve_s8): every input pixel
//! scatters `(x + off) * w` into an int32 accumulator plane at
//! `oh = ih * stride + kh - pad`. Once all inputs of a batch have landed,
//! a single pass requantizes the plane into the output.

use super::params::{check_conv, ConvParams};
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut, Tile};
use scratch_arena::Scratch;

/// Scratch bytes [`transpose_conv_s8`] needs: one int32 per output element
/// of a batch.
pub fn transpose_conv_s8_get_buffer_size(output: &Dims) -> usize {
    output.h * output.w * output.c * std::mem::size_of::<i32>()
}

/// int8 transpose convolution. The filter is `[out_c, kh, kw, in_c]`;
/// dilation must be 1 and groups are not supported.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] for a dilated filter or a
/// filter that does not span all input channels, and
/// [`KernelError::ScratchTooSmall`] if `scratch` holds less than
/// [`transpose_conv_s8_get_buffer_size`].
#[allow(clippy::too_many_arguments)]
pub fn transpose_conv_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "transpose_conv_s8";
    params.validate_s8(OP)?;
    if params.dilation != Tile::unit() {
        return Err(KernelError::invalid(OP, "dilation must be 1"));
    }
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    if fd.c != id.c {
        return Err(KernelError::invalid(
            OP,
            format!("filter {fd} must span all {} input channels", id.c),
        ));
    }
    check_conv(OP, quant, &id, &fd, bias.map(<[i32]>::len), &od)?;
    let plane_len = od.h * od.w * od.c;
    let plane: &mut [i32] = scratch.take(plane_len).map_err(|e| e.for_op(OP))?;

    let ops = backend.ops();
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    let tap_len = fd.c;
    let filter_row = fd.h * fd.w * fd.c;

    for n in 0..od.n {
        for px in plane.chunks_exact_mut(od.c.max(1)) {
            match bias {
                Some(b) => px.copy_from_slice(b),
                None => px.fill(0),
            }
        }
        for ih in 0..id.h {
            for iw in 0..id.w {
                let ip = id.offset(n, ih, iw, 0);
                let pixel = &x[ip..ip + id.c];
                for kh in 0..fd.h {
                    let Some(oh) = (ih * params.stride.h + kh).checked_sub(params.padding.h) else {
                        continue;
                    };
                    if oh >= od.h {
                        continue;
                    }
                    for kw in 0..fd.w {
                        let Some(ow) = (iw * params.stride.w + kw).checked_sub(params.padding.w) else {
                            continue;
                        };
                        if ow >= od.w {
                            continue;
                        }
                        let base = (oh * od.w + ow) * od.c;
                        for (oc, acc) in plane[base..base + od.c].iter_mut().enumerate() {
                            let t = oc * filter_row + (kh * fd.w + kw) * tap_len;
                            let contrib = ops.dot_i8_offset(pixel, &w[t..t + tap_len], params.input_offset);
                            *acc = acc.wrapping_add(contrib);
                        }
                    }
                }
            }
        }

        let dst = &mut out[n * plane_len..(n + 1) * plane_len];
        for (i, (o, &acc)) in dst.iter_mut().zip(plane.iter()).enumerate() {
            let oc = i % od.c;
            let v = quant.get(oc).apply(acc).wrapping_add(params.output_offset);
            *o = params.activation.clamp(v) as i8;
        }
    }
    Ok(())
}
