// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 1×1 convolutions that skip im2col.
//!
//! With a 1×1 filter and no padding each output pixel reads exactly one
//! input pixel, so the GEMM runs straight off the input tensor.

use super::params::{check_conv, check_output_extent, ConvParams};
use qnn_core::{Backend, Dims, KernelError, PerChannelQuant, TensorView, TensorViewMut, Tile};

/// Scratch bytes the 1×1 variants need: none.
pub fn convolve_1x1_s8_get_buffer_size(_input: &Dims) -> usize {
    0
}

/// 1×1 convolution with unit stride: the output has the input's spatial
/// dims.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] unless the filter is 1×1 with
/// unit stride, unit dilation and no padding, and the filter spans every
/// input channel.
#[allow(clippy::too_many_arguments)]
pub fn convolve_1x1_s8_fast(
    backend: Backend,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "convolve_1x1_s8_fast";
    if params.stride != Tile::unit() {
        return Err(KernelError::invalid(OP, "stride must be 1"));
    }
    let (id, od) = (input.dims(), output.dims());
    if (od.h, od.w) != (id.h, id.w) {
        return Err(KernelError::ShapeMismatch {
            op: OP,
            lhs: Dims::new(id.n, id.h, id.w, od.c),
            rhs: od,
        });
    }
    pointwise(OP, backend, params, quant, input, filter, bias, output)
}

/// 1×1 convolution with any stride.
///
/// # Errors
/// As [`convolve_1x1_s8_fast`], except that the stride is free. The output
/// H and W must be the ones the stride produces.
#[allow(clippy::too_many_arguments)]
pub fn convolve_1x1_s8(
    backend: Backend,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    pointwise("convolve_1x1_s8", backend, params, quant, input, filter, bias, output)
}

/// Whether a 1×1 variant can run these params and filter.
pub(crate) fn applies(params: &ConvParams, input: &Dims, filter: &Dims) -> bool {
    filter.h == 1
        && filter.w == 1
        && filter.c == input.c
        && params.padding == Tile::zero()
        && params.dilation == Tile::unit()
}

#[allow(clippy::too_many_arguments)]
fn pointwise(
    op: &'static str,
    backend: Backend,
    params: &ConvParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    params.validate_s8(op)?;
    let (id, fd, od) = (input.dims(), filter.dims(), output.dims());
    if !applies(params, &id, &fd) {
        return Err(KernelError::invalid(
            op,
            "requires a 1x1 filter over all input channels, no padding and unit dilation",
        ));
    }
    check_conv(op, quant, &id, &fd, bias.map(<[i32]>::len), &od)?;
    check_output_extent(op, params, &id, &fd, &od)?;

    let ops = backend.ops();
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    let c = id.c;
    for n in 0..od.n {
        for oh in 0..od.h {
            for ow in 0..od.w {
                let ip = id.offset(n, oh * params.stride.h, ow * params.stride.w, 0);
                let pixel = &x[ip..ip + c];
                let px = od.offset(n, oh, ow, 0);
                for (oc, row) in w.chunks_exact(c.max(1)).take(od.c).enumerate() {
                    let acc = ops
                        .dot_i8_offset(pixel, row, params.input_offset)
                        .wrapping_add(bias.map_or(0, |b| b[oc]));
                    let v = quant.get(oc).apply(acc).wrapping_add(params.output_offset);
                    out[px + oc] = params.activation.clamp(v) as i8;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Vec<i8>, Vec<i8>, [i32; 2], [i32; 2]) {
        let x: Vec<i8> = (0..18).map(|i| (i * 13 % 50 - 25) as i8).collect();
        let w = vec![1i8, 2, -1, 3, 0, -2];
        (x, w, [1 << 30; 2], [1; 2])
    }

    #[test]
    fn test_fast_matches_direct_sum() {
        let (x, w, m, s) = setup();
        let id = Dims::new(1, 2, 3, 3);
        let od = Dims::new(1, 2, 3, 2);
        let params = ConvParams::new(4, -1);
        let bias = [10, -10];
        let mut out = vec![0i8; od.num_elements()];
        convolve_1x1_s8_fast(
            Backend::Lanes,
            &params,
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(Dims::new(2, 1, 1, 3), &w).unwrap(),
            Some(&bias),
            &mut TensorViewMut::new(od, &mut out).unwrap(),
        )
        .unwrap();
        for p in 0..6 {
            for oc in 0..2 {
                let acc: i32 = (0..3).map(|c| (i32::from(x[p * 3 + c]) + 4) * i32::from(w[oc * 3 + c])).sum();
                let expected = (acc + bias[oc] - 1).clamp(-128, 127);
                assert_eq!(i32::from(out[p * 2 + oc]), expected);
            }
        }
    }

    #[test]
    fn test_strided_picks_every_other_pixel() {
        let (x, w, m, s) = setup();
        let id = Dims::new(1, 2, 3, 3);
        let od = Dims::new(1, 1, 2, 2);
        let params = ConvParams::new(0, 0).with_stride(Tile::new(2, 2));
        let mut out = vec![0i8; od.num_elements()];
        convolve_1x1_s8(
            Backend::Scalar,
            &params,
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(Dims::new(2, 1, 1, 3), &w).unwrap(),
            None,
            &mut TensorViewMut::new(od, &mut out).unwrap(),
        )
        .unwrap();
        // Output (0, 1) reads input pixel (0, 2).
        let acc: i32 = (0..3).map(|c| i32::from(x[2 * 3 + c]) * i32::from(w[c])).sum();
        assert_eq!(i32::from(out[2]), acc.clamp(-128, 127));
    }

    #[test]
    fn test_rejects_padding() {
        let (x, w, m, s) = setup();
        let params = ConvParams::new(0, 0).with_padding(Tile::new(1, 0));
        let mut out = vec![0i8; 12];
        let err = convolve_1x1_s8_fast(
            Backend::Scalar,
            &params,
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(Dims::new(1, 2, 3, 3), &x).unwrap(),
            &TensorView::new(Dims::new(2, 1, 1, 3), &w).unwrap(),
            None,
            &mut TensorViewMut::new(Dims::new(1, 2, 3, 2), &mut out).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }
}
