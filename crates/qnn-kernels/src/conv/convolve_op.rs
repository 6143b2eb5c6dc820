// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Standard convolution through im2col and a GEMM row per output channel.

use super::im2col::fill_column;
use super::params::{check_conv, check_output_extent, ConvParams};
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut};
use scratch_arena::Scratch;

/// Scratch bytes [`convolve_s8`] needs: one int16 column.
pub fn convolve_s8_get_buffer_size(_input: &Dims, filter: &Dims) -> usize {
    filter.h * filter.w * filter.c * std::mem::size_of::<i16>()
}

/// int8 convolution with per-channel requantization.
///
/// Supports channel groups: the filter's C may divide the input's C, each
/// group of `in_c / filter_c` channels feeding `out_c / groups` outputs.
/// `bias` holds one int32 per output channel.
///
/// # Errors
/// Returns [`KernelError::ChannelDivisibility`] for an invalid grouping,
/// [`KernelError::ShapeMismatch`] when the output does not match the
/// filter, [`KernelError::InvalidArgument`] for invalid parameters and
/// [`KernelError::ScratchTooSmall`] if `scratch` holds less than
/// [`convolve_s8_get_buffer_size`].
#[allow(clippy::too_many_arguments)]
pub fn convolve_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "convolve_s8";
    params.validate_s8(OP)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    let groups = check_conv(OP, quant, &id, &fd, bias.map(<[i32]>::len), &od)?;
    check_output_extent(OP, params, &id, &fd, &od)?;

    let col_len = fd.h * fd.w * fd.c;
    let col: &mut [i16] = scratch.take(col_len).map_err(|e| e.for_op(OP))?;

    let ops = backend.ops();
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    let offset = params.input_offset;

    for n in 0..od.n {
        for oh in 0..od.h {
            for ow in 0..od.w {
                let px = od.offset(n, oh, ow, 0);
                for g in 0..groups.count {
                    fill_column(col, x, &id, params, (fd.h, fd.w), (n, oh, ow), g * groups.in_per_group, |v| {
                        (i32::from(v) + offset) as i16
                    });
                    let first = g * groups.out_per_group;
                    for oc in first..first + groups.out_per_group {
                        let row = &w[oc * col_len..(oc + 1) * col_len];
                        let acc = (ops.dot_i16_i8(col, row) as i32).wrapping_add(bias.map_or(0, |b| b[oc]));
                        let v = quant.get(oc).apply(acc).wrapping_add(params.output_offset);
                        out[px + oc] = params.activation.clamp(v) as i8;
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

    /// Direct nested-loop reference.
    fn reference(
        params: &ConvParams,
        m: &[i32],
        s: &[i32],
        id: Dims,
        x: &[i8],
        fd: Dims,
        w: &[i8],
        bias: &[i32],
        od: Dims,
    ) -> Vec<i8> {
        let groups = id.c / fd.c;
        let opg = od.c / groups;
        let mut out = vec![0i8; od.num_elements()];
        for n in 0..od.n {
            for oh in 0..od.h {
                for ow in 0..od.w {
                    for oc in 0..od.c {
                        let g = oc / opg;
                        let mut acc = bias[oc];
                        for kh in 0..fd.h {
                            for kw in 0..fd.w {
                                let ih = (oh * params.stride.h + kh * params.dilation.h) as isize - params.padding.h as isize;
                                let iw = (ow * params.stride.w + kw * params.dilation.w) as isize - params.padding.w as isize;
                                if ih < 0 || iw < 0 || ih >= id.h as isize || iw >= id.w as isize {
                                    continue;
                                }
                                for ic in 0..fd.c {
                                    let xv = i32::from(x[id.offset(n, ih as usize, iw as usize, g * fd.c + ic)]);
                                    let wv = i32::from(w[fd.offset(oc, kh, kw, ic)]);
                                    acc += (xv + params.input_offset) * wv;
                                }
                            }
                        }
                        let v = qnn_core::fixed_point::requantize(acc, m[oc], s[oc]) + params.output_offset;
                        out[od.offset(n, oh, ow, oc)] = params.activation.clamp(v) as i8;
                    }
                }
            }
        }
        out
    }

    fn pattern(len: usize, seed: i32) -> Vec<i8> {
        (0..len as i32).map(|i| ((i * 37 + seed) % 255 - 127) as i8).collect()
    }

    #[test]
    fn test_matches_reference_with_padding_and_stride() {
        let id = Dims::new(1, 5, 5, 3);
        let fd = Dims::new(4, 3, 3, 3);
        let params = ConvParams::new(7, -3)
            .with_stride(Tile::new(2, 1))
            .with_padding(Tile::new(1, 1))
            .with_activation(ActivationRange::new(-100, 100).unwrap());
        let od = Dims::new(1, 3, 5, 4);
        let x = pattern(id.num_elements(), 3);
        let w = pattern(fd.num_elements(), 11);
        let bias = [100, -200, 0, 5000];
        let m = [1 << 30, 1 << 29, 1_500_000_000, 1 << 30];
        let s = [-6, -5, -7, -8];
        let quant = PerChannelQuant::new(&m, &s).unwrap();

        let mut arena = ScratchArena::new(ArenaBudget::from_kb(4));
        for backend in [Backend::Scalar, Backend::Lanes] {
            let mut out = vec![0i8; od.num_elements()];
            convolve_s8(
                backend,
                &mut arena.scratch_for(convolve_s8_get_buffer_size(&id, &fd)).unwrap(),
                &params,
                &quant,
                &TensorView::new(id, &x).unwrap(),
                &TensorView::new(fd, &w).unwrap(),
                Some(&bias),
                &mut TensorViewMut::new(od, &mut out).unwrap(),
            )
            .unwrap();
            assert_eq!(out, reference(&params, &m, &s, id, &x, fd, &w, &bias, od), "{backend}");
        }
    }

    #[test]
    fn test_grouped_with_dilation() {
        let id = Dims::new(2, 4, 4, 4);
        let fd = Dims::new(6, 2, 2, 2);
        let params = ConvParams::new(-1, 2).with_dilation(Tile::new(2, 1));
        let od = Dims::new(2, 2, 3, 6);
        let x = pattern(id.num_elements(), 5);
        let w = pattern(fd.num_elements(), 1);
        let bias = [0; 6];
        let m = [1 << 30; 6];
        let s = [-4; 6];
        let quant = PerChannelQuant::new(&m, &s).unwrap();
        let mut backing = ScratchArena::with_capacity(ArenaBudget::from_kb(1), 64).unwrap();
        let mut out = vec![0i8; od.num_elements()];
        convolve_s8(
            Backend::Lanes,
            &mut backing.scratch(),
            &params,
            &quant,
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            None,
            &mut TensorViewMut::new(od, &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, reference(&params, &m, &s, id, &x, fd, &w, &bias, od));
    }

    #[test]
    fn test_scratch_too_small_writes_nothing() {
        let id = Dims::new(1, 3, 3, 1);
        let fd = Dims::new(1, 3, 3, 1);
        let od = Dims::new(1, 1, 1, 1);
        let x = [1i8; 9];
        let w = [1i8; 9];
        let m = [1 << 30];
        let s = [1];
        let mut out = [42i8];
        let err = convolve_s8(
            Backend::Scalar,
            &mut Scratch::empty(),
            &ConvParams::new(0, 0),
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            None,
            &mut TensorViewMut::new(od, &mut out).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::ScratchTooSmall { required: 18, .. }));
        assert_eq!(out, [42]);
    }

    #[test]
    fn test_rejects_output_larger_than_geometry() {
        // 3x3 valid conv over 3x3 gives 1x1; a 2x2 output would read past the input.
        let id = Dims::new(1, 3, 3, 1);
        let fd = Dims::new(1, 3, 3, 1);
        let od = Dims::new(1, 2, 2, 1);
        let x = [1i8; 9];
        let w = [1i8; 9];
        let m = [1 << 30];
        let s = [1];
        let mut backing = ScratchArena::with_capacity(ArenaBudget::from_kb(1), 64).unwrap();
        let mut out = [42i8; 4];
        let err = convolve_s8(
            Backend::Lanes,
            &mut backing.scratch_for(convolve_s8_get_buffer_size(&id, &fd)).unwrap(),
            &ConvParams::new(0, 0),
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            None,
            &mut TensorViewMut::new(od, &mut out).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
        assert_eq!(out, [42; 4]);
    }
}
