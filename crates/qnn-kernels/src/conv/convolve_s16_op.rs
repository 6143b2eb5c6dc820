// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! int16-activation convolution with int64 accumulation.
//!
//! int16 tensors are symmetric, so no input or output offset applies; the
//! offsets in [`ConvParams`] are ignored. Accumulators and bias are 64-bit
//! and the per-channel multiplier is reduced to Q15 before rescaling.

use super::im2col::fill_column;
use super::params::{check_conv, check_output_extent, ConvParams};
use qnn_core::fixed_point::{reduce_multiplier_q15, requantize_s64};
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut};
use scratch_arena::Scratch;

/// Scratch bytes [`convolve_s16`] needs: one int16 column.
pub fn convolve_s16_get_buffer_size(_input: &Dims, filter: &Dims) -> usize {
    filter.h * filter.w * filter.c * std::mem::size_of::<i16>()
}

/// int16 × int8 convolution with optional int64 bias.
///
/// # Errors
/// As [`convolve_s8`](super::convolve_s8).
#[allow(clippy::too_many_arguments)]
pub fn convolve_s16(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i16>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i64]>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    const OP: &str = "convolve_s16";
    params.validate(OP)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    let groups = check_conv(OP, quant, &id, &fd, bias.map(<[i64]>::len), &od)?;
    check_output_extent(OP, params, &id, &fd, &od)?;

    let col_len = fd.h * fd.w * fd.c;
    let col: &mut [i16] = scratch.take(col_len).map_err(|e| e.for_op(OP))?;

    let ops = backend.ops();
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    for n in 0..od.n {
        for oh in 0..od.h {
            for ow in 0..od.w {
                let px = od.offset(n, oh, ow, 0);
                for g in 0..groups.count {
                    fill_column(col, x, &id, params, (fd.h, fd.w), (n, oh, ow), g * groups.in_per_group, |v| v);
                    let first = g * groups.out_per_group;
                    for oc in first..first + groups.out_per_group {
                        let row = &w[oc * col_len..(oc + 1) * col_len];
                        let acc = ops.dot_i16_i8(col, row).wrapping_add(bias.map_or(0, |b| b[oc]));
                        let q = quant.get(oc);
                        let v = requantize_s64(acc, reduce_multiplier_q15(q.multiplier), q.shift);
                        out[px + oc] = params.activation.clamp(v).clamp(i16::MIN.into(), i16::MAX.into()) as i16;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::{ActivationRange, Tile};
    use scratch_arena::{ArenaBudget, ScratchArena};

    #[test]
    fn test_identity_kernel_with_large_bias() {
        // 3x3 centre tap of 1, scale 1.0, same padding.
        let id = Dims::new(1, 2, 2, 1);
        let fd = Dims::new(1, 3, 3, 1);
        let x = [1000i16, -2000, 30000, -32768];
        let mut w = [0i8; 9];
        w[4] = 1;
        let m = [1 << 30];
        let s = [1];
        let params = ConvParams::new(0, 0)
            .with_padding(Tile::new(1, 1))
            .with_activation(ActivationRange::full::<i16>());
        let mut arena = ScratchArena::new(ArenaBudget::from_kb(1));
        let mut out = [0i16; 4];
        convolve_s16(
            Backend::Lanes,
            &mut arena.scratch_for(convolve_s16_get_buffer_size(&id, &fd)).unwrap(),
            &params,
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            Some(&[5000]),
            &mut TensorViewMut::new(id, &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [6000, 3000, 32767, -27768]);
    }

    #[test]
    fn test_accumulates_in_64_bits() {
        // 1024 taps of 32767 * 127 overflow int32.
        let id = Dims::new(1, 1, 1, 1024);
        let fd = Dims::new(1, 1, 1, 1024);
        let x = vec![32767i16; 1024];
        let w = vec![127i8; 1024];
        let (m, s) = qnn_core::quant::quantize_multiplier(1.0 / 1_048_576.0);
        let params = ConvParams::new(0, 0).with_activation(ActivationRange::full::<i16>());
        let mut arena = ScratchArena::new(ArenaBudget::from_kb(4));
        let mut out = [0i16; 1];
        convolve_s16(
            Backend::Scalar,
            &mut arena.scratch_for(convolve_s16_get_buffer_size(&id, &fd)).unwrap(),
            &params,
            &PerChannelQuant::new(&[m], &[s]).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            None,
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 1), &mut out).unwrap(),
        )
        .unwrap();
        let expected = (32767.0f64 * 127.0 * 1024.0 / 1_048_576.0).round() as i32;
        assert!((i32::from(out[0]) - expected).abs() <= 1);
    }
}
