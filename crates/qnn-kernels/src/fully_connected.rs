// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected (dense) layers.
//!
//! The input is treated as `N` rows of `H*W*C` features. The filter is
//! `[out_c, 1, 1, depth]` (any shape whose `H*W*C` equals the depth is
//! accepted) and the output is `[N, 1, 1, out_c]`.
//!
//! On [`Backend::Lanes`] with a non-zero input offset the offset is folded
//! out of the inner loop: each filter row's sum is computed once into
//! scratch and `offset * sum` is added after a plain dot product.
//!
//! [`fully_connected_f16`] is the half-precision float variant: it
//! accumulates in `f32` and rounds once per output.

use half::f16;
use qnn_core::fixed_point::{reduce_multiplier_q15, requantize_s64};
use qnn_core::{
    ActivationRange, Backend, Dims, KernelError, PerChannelQuant, QuantParams, TensorView, TensorViewMut,
};
use scratch_arena::Scratch;

use crate::validate;

/// Offsets and activation range of a fully-connected layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullyConnectedParams {
    /// Added to every input value (the negated input zero point).
    pub input_offset: i32,
    pub output_offset: i32,
    pub activation: ActivationRange,
}

impl FullyConnectedParams {
    /// Params with the full int8 activation range.
    pub fn new(input_offset: i32, output_offset: i32) -> Self {
        Self {
            input_offset,
            output_offset,
            activation: ActivationRange::full::<i8>(),
        }
    }

    pub fn with_activation(mut self, activation: ActivationRange) -> Self {
        self.activation = activation;
        self
    }
}

/// Scratch bytes the int8 fully-connected kernels need on `backend`.
pub fn fully_connected_s8_get_buffer_size(backend: Backend, filter: &Dims) -> usize {
    match backend {
        Backend::Lanes => filter.n * std::mem::size_of::<i32>(),
        Backend::Scalar => 0,
    }
}

/// Writes each filter row's sum into `out`.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] if `out` does not hold one entry
/// per filter row.
pub fn vector_sum_s8(backend: Backend, filter: &TensorView<'_, i8>, out: &mut [i32]) -> Result<(), KernelError> {
    const OP: &str = "vector_sum_s8";
    let fd = filter.dims();
    validate::channel_slice(OP, "sum buffer", Some(&*out), fd.n)?;
    let depth = fd.h * fd.w * fd.c;
    let ops = backend.ops();
    for (sum, row) in out.iter_mut().zip(filter.data().chunks_exact(depth.max(1))) {
        *sum = ops.sum_i8(row);
    }
    Ok(())
}

/// Shape of a dense layer: batches, depth and output channels.
struct Dense {
    batches: usize,
    depth: usize,
    out_c: usize,
}

fn check_dense(
    op: &'static str,
    input: &Dims,
    filter: &Dims,
    bias_len: Option<usize>,
    output: &Dims,
) -> Result<Dense, KernelError> {
    let depth = input.h * input.w * input.c;
    if filter.h * filter.w * filter.c != depth {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: Dims::new(filter.n, 1, 1, depth),
            rhs: *filter,
        });
    }
    validate::same_dims(op, Dims::new(input.n, 1, 1, filter.n), *output)?;
    if let Some(len) = bias_len {
        if len != filter.n {
            return Err(KernelError::invalid(
                op,
                format!("bias has {len} entries for {} output channels", filter.n),
            ));
        }
    }
    Ok(Dense {
        batches: input.n,
        depth,
        out_c: filter.n,
    })
}

/// int8 fully connected with per-tensor requantization.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the filter depth or the output
/// shape does not match the input, [`KernelError::InvalidArgument`] for an
/// invalid bias or offset, and [`KernelError::ScratchTooSmall`] if a
/// folding backend finds less than [`fully_connected_s8_get_buffer_size`]
/// in `scratch`.
#[allow(clippy::too_many_arguments)]
pub fn fully_connected_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &FullyConnectedParams,
    quant: QuantParams,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    dense_s8("fully_connected_s8", backend, scratch, params, |_| quant, input, filter, bias, output)
}

/// int8 fully connected with one multiplier/shift pair per output channel.
///
/// # Errors
/// As [`fully_connected_s8`], plus [`KernelError::InvalidArgument`] if
/// `quant` does not hold one pair per output channel.
#[allow(clippy::too_many_arguments)]
pub fn fully_connected_per_channel_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &FullyConnectedParams,
    quant: &PerChannelQuant<'_>,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    const OP: &str = "fully_connected_per_channel_s8";
    quant.expect_channels(OP, filter.dims().n)?;
    dense_s8(OP, backend, scratch, params, |oc| quant.get(oc), input, filter, bias, output)
}

#[allow(clippy::too_many_arguments)]
fn dense_s8(
    op: &'static str,
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &FullyConnectedParams,
    quant: impl Fn(usize) -> QuantParams,
    input: &TensorView<'_, i8>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i32]>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    validate::in_range(op, "input offset", params.input_offset, -128, 128)?;
    validate::in_range(op, "output offset", params.output_offset, -128, 127)?;
    params.activation.validate(op)?;
    let shape = check_dense(op, &input.dims(), &filter.dims(), bias.map(<[i32]>::len), &output.dims())?;

    let fold = backend == Backend::Lanes && params.input_offset != 0;
    let sums: Option<&[i32]> = if fold {
        let buf: &mut [i32] = scratch.take(shape.out_c).map_err(|e| e.for_op(op))?;
        vector_sum_s8(backend, filter, buf)?;
        Some(buf)
    } else {
        None
    };

    let ops = backend.ops();
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    let depth = shape.depth;
    for b in 0..shape.batches {
        let row_in = &x[b * depth..(b + 1) * depth];
        let row_out = &mut out[b * shape.out_c..(b + 1) * shape.out_c];
        for (oc, (o, row_w)) in row_out.iter_mut().zip(w.chunks_exact(depth.max(1))).enumerate() {
            let dot = match sums {
                Some(s) => ops
                    .dot_i8_offset(row_in, row_w, 0)
                    .wrapping_add(s[oc].wrapping_mul(params.input_offset)),
                None => ops.dot_i8_offset(row_in, row_w, params.input_offset),
            };
            let acc = dot.wrapping_add(bias.map_or(0, |b| b[oc]));
            let v = quant(oc).apply(acc).wrapping_add(params.output_offset);
            *o = params.activation.clamp(v) as i8;
        }
    }
    Ok(())
}

/// int16 × int8 fully connected with optional int64 bias.
///
/// int16 tensors are symmetric; the offsets in `params` are ignored.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the filter depth or the output
/// shape does not match the input.
pub fn fully_connected_s16(
    backend: Backend,
    params: &FullyConnectedParams,
    quant: QuantParams,
    input: &TensorView<'_, i16>,
    filter: &TensorView<'_, i8>,
    bias: Option<&[i64]>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    const OP: &str = "fully_connected_s16";
    params.activation.validate(OP)?;
    let shape = check_dense(OP, &input.dims(), &filter.dims(), bias.map(<[i64]>::len), &output.dims())?;
    let reduced = reduce_multiplier_q15(quant.multiplier);

    let ops = backend.ops();
    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    let depth = shape.depth;
    for b in 0..shape.batches {
        let row_in = &x[b * depth..(b + 1) * depth];
        let row_out = &mut out[b * shape.out_c..(b + 1) * shape.out_c];
        for (oc, (o, row_w)) in row_out.iter_mut().zip(w.chunks_exact(depth.max(1))).enumerate() {
            let acc = ops.dot_i16_i8(row_in, row_w).wrapping_add(bias.map_or(0, |b| b[oc]));
            let v = requantize_s64(acc, reduced, quant.shift);
            *o = params.activation.clamp(v).clamp(i16::MIN.into(), i16::MAX.into()) as i16;
        }
    }
    Ok(())
}

/// Output clamp of [`fully_connected_f16`], applied in `f32`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatActivation {
    pub min: f32,
    pub max: f32,
}

impl FloatActivation {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// No clamp.
    pub fn unbounded() -> Self {
        Self::new(f32::NEG_INFINITY, f32::INFINITY)
    }
}

/// Half-precision fully connected with optional `f16` bias.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the filter depth or the output
/// shape does not match the input and [`KernelError::InvalidArgument`] for a
/// bias of the wrong length or an activation whose min exceeds its max.
pub fn fully_connected_f16(
    activation: FloatActivation,
    input: &TensorView<'_, f16>,
    filter: &TensorView<'_, f16>,
    bias: Option<&[f16]>,
    output: &mut TensorViewMut<'_, f16>,
) -> Result<(), KernelError> {
    const OP: &str = "fully_connected_f16";
    if activation.min.is_nan() || activation.max.is_nan() || activation.min > activation.max {
        return Err(KernelError::invalid(
            OP,
            format!("activation min {} above max {}", activation.min, activation.max),
        ));
    }
    let shape = check_dense(OP, &input.dims(), &filter.dims(), bias.map(<[f16]>::len), &output.dims())?;

    let (x, w) = (input.data(), filter.data());
    let out = output.data_mut();
    let depth = shape.depth;
    for b in 0..shape.batches {
        let row_in = &x[b * depth..(b + 1) * depth];
        let row_out = &mut out[b * shape.out_c..(b + 1) * shape.out_c];
        for (oc, (o, row_w)) in row_out.iter_mut().zip(w.chunks_exact(depth.max(1))).enumerate() {
            let dot: f32 = row_in.iter().zip(row_w).map(|(a, b)| a.to_f32() * b.to_f32()).sum();
            let acc = dot + bias.map_or(0.0, |b| b[oc].to_f32());
            *o = f16::from_f32(acc.clamp(activation.min, activation.max));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scratch_arena::{ArenaBudget, ScratchArena};

    fn reference(x: &[i8], w: &[i8], bias: &[i32], depth: usize, off: i32, out_off: i32, q: QuantParams) -> Vec<i8> {
        let out_c = bias.len();
        let batches = x.len() / depth;
        let mut out = Vec::new();
        for b in 0..batches {
            for oc in 0..out_c {
                let mut acc = bias[oc];
                for k in 0..depth {
                    acc += (i32::from(x[b * depth + k]) + off) * i32::from(w[oc * depth + k]);
                }
                out.push((q.apply(acc) + out_off).clamp(-128, 127) as i8);
            }
        }
        out
    }

    #[test]
    fn test_backends_agree_with_reference() {
        let id = Dims::new(3, 1, 2, 10);
        let fd = Dims::new(5, 1, 1, 20);
        let od = Dims::new(3, 1, 1, 5);
        let x: Vec<i8> = (0..60).map(|i| (i * 53 % 256 - 128) as i8).collect();
        let w: Vec<i8> = (0..100).map(|i| (i * 19 % 200 - 100) as i8).collect();
        let bias = [100, -200, 300, -400, 0];
        let q = QuantParams::from_real(0.003);
        let params = FullyConnectedParams::new(12, -7);
        let expected = reference(&x, &w, &bias, 20, 12, -7, q);

        for backend in [Backend::Scalar, Backend::Lanes] {
            let mut arena = ScratchArena::new(ArenaBudget::from_kb(1));
            let mut out = vec![0i8; 15];
            fully_connected_s8(
                backend,
                &mut arena.scratch_for(fully_connected_s8_get_buffer_size(backend, &fd)).unwrap(),
                &params,
                q,
                &TensorView::new(id, &x).unwrap(),
                &TensorView::new(fd, &w).unwrap(),
                Some(&bias),
                &mut TensorViewMut::new(od, &mut out).unwrap(),
            )
            .unwrap();
            assert_eq!(out, expected, "{backend}");
        }
    }

    #[test]
    fn test_lanes_needs_scratch_only_for_offset() {
        let fd = Dims::new(2, 1, 1, 2);
        let x = [1i8, 2];
        let w = [1i8, 1, 2, 2];
        let mut out = [0i8; 2];
        let run = |off: i32, out: &mut [i8]| {
            fully_connected_s8(
                Backend::Lanes,
                &mut Scratch::empty(),
                &FullyConnectedParams::new(off, 0),
                QuantParams::identity(),
                &TensorView::new(Dims::new(1, 1, 1, 2), &x).unwrap(),
                &TensorView::new(fd, &w).unwrap(),
                None,
                &mut TensorViewMut::new(Dims::new(1, 1, 1, 2), out).unwrap(),
            )
        };
        run(0, &mut out).unwrap();
        assert_eq!(out, [3, 6]);
        let err = run(1, &mut out).unwrap_err();
        assert!(matches!(err, KernelError::ScratchTooSmall { .. }));
    }

    #[test]
    fn test_per_channel_scales() {
        let id = Dims::new(1, 1, 1, 2);
        let fd = Dims::new(2, 1, 1, 2);
        let x = [10i8, 20];
        let w = [1i8, 1, 1, 1];
        // Channel 0 at 1.0, channel 1 at 0.5.
        let m = [1 << 30, 1 << 30];
        let s = [1, 0];
        let mut out = [0i8; 2];
        fully_connected_per_channel_s8(
            Backend::Scalar,
            &mut Scratch::empty(),
            &FullyConnectedParams::new(0, 0),
            &PerChannelQuant::new(&m, &s).unwrap(),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            None,
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 2), &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [30, 15]);
    }

    #[test]
    fn test_s16_large_bias() {
        let id = Dims::new(1, 1, 1, 2);
        let fd = Dims::new(1, 1, 1, 2);
        let x = [30000i16, 30000];
        let w = [127i8, 127];
        let mut out = [0i16; 1];
        // Accumulator 7_620_000 plus a bias beyond i32 range, scaled by 2^-30.
        let bias = [(1i64 << 33) - 7_620_000];
        fully_connected_s16(
            Backend::Lanes,
            &FullyConnectedParams::new(0, 0).with_activation(ActivationRange::full::<i16>()),
            QuantParams::new(1 << 30, -29),
            &TensorView::new(id, &x).unwrap(),
            &TensorView::new(fd, &w).unwrap(),
            Some(&bias),
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 1), &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [8]);
    }

    #[test]
    fn test_depth_mismatch() {
        let x = [0i8; 4];
        let w = [0i8; 3];
        let mut out = [0i8; 1];
        let err = fully_connected_s8(
            Backend::Scalar,
            &mut Scratch::empty(),
            &FullyConnectedParams::new(0, 0),
            QuantParams::identity(),
            &TensorView::new(Dims::new(1, 1, 1, 4), &x).unwrap(),
            &TensorView::new(Dims::new(1, 1, 1, 3), &w).unwrap(),
            None,
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 1), &mut out).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
    }

    fn halves(v: &[f32]) -> Vec<f16> {
        v.iter().copied().map(f16::from_f32).collect()
    }

    #[test]
    fn test_f16_matches_f32_reference() {
        let id = Dims::new(2, 1, 1, 3);
        let fd = Dims::new(2, 1, 1, 3);
        let x = [1.0, 2.0, -0.5, 0.25, -4.0, 8.0];
        let w = [0.5, -1.0, 2.0, 3.0, 0.125, -0.75];
        let bias = [1.5, -2.0];

        let mut expected = Vec::new();
        for row in x.chunks(3) {
            for (oc, wr) in w.chunks(3).enumerate() {
                let dot: f32 = row.iter().zip(wr).map(|(a, b)| a * b).sum();
                expected.push(f16::from_f32(dot + bias[oc]));
            }
        }

        let mut out = [f16::ZERO; 4];
        fully_connected_f16(
            FloatActivation::unbounded(),
            &TensorView::new(id, &halves(&x)).unwrap(),
            &TensorView::new(fd, &halves(&w)).unwrap(),
            Some(halves(&bias).as_slice()),
            &mut TensorViewMut::new(Dims::new(2, 1, 1, 2), &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out.to_vec(), expected);
    }

    #[test]
    fn test_f16_activation_clamps() {
        let x = halves(&[3.0, -3.0]);
        let w = halves(&[1.0, 1.0, 1.0, -1.0]);
        let mut out = [f16::ZERO; 2];
        fully_connected_f16(
            FloatActivation::new(0.0, 4.0),
            &TensorView::new(Dims::new(1, 1, 1, 2), &x).unwrap(),
            &TensorView::new(Dims::new(2, 1, 1, 2), &w).unwrap(),
            None,
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 2), &mut out).unwrap(),
        )
        .unwrap();
        // 0 stays, 6 clamps to 4.
        assert_eq!(out, [f16::from_f32(0.0), f16::from_f32(4.0)]);

        let err = fully_connected_f16(
            FloatActivation::new(1.0, -1.0),
            &TensorView::new(Dims::new(1, 1, 1, 2), &x).unwrap(),
            &TensorView::new(Dims::new(2, 1, 1, 2), &w).unwrap(),
            None,
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 2), &mut out).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }
}
