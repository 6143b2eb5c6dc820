// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Average and max pooling.
//!
//! Windows are clipped to the input: padded taps are skipped, so an average
//! divides by the number of in-bounds taps only. Every window must contain
//! at least one in-bounds tap; configurations that would produce an empty
//! window are rejected up front.

use qnn_core::{ActivationRange, Backend, Dims, KernelError, TensorView, TensorViewMut, Tile};
use scratch_arena::Scratch;

use crate::lanes::LaneElem;
use crate::validate;

/// Window geometry and output clamp of a pooling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub stride: Tile,
    pub padding: Tile,
    /// Window extent.
    pub filter: Tile,
    pub activation: ActivationRange,
}

impl PoolParams {
    /// A `filter` window at unit stride, no padding, full int8 range.
    pub fn new(filter: Tile) -> Self {
        Self {
            stride: Tile::unit(),
            padding: Tile::zero(),
            filter,
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

    pub fn with_activation(mut self, activation: ActivationRange) -> Self {
        self.activation = activation;
        self
    }

    /// In-bounds input rows (or columns) of the window for output index `o`.
    fn window(o: usize, stride: usize, pad: usize, filter: usize, extent: usize) -> std::ops::Range<usize> {
        let start = o * stride;
        let lo = start.saturating_sub(pad);
        let hi = (start + filter).saturating_sub(pad).min(extent);
        lo..hi
    }
}

/// Scratch bytes [`avgpool_s8`] and [`avgpool_s16`] need: one int32 per
/// channel.
pub fn avgpool_get_buffer_size(input: &Dims) -> usize {
    input.c * std::mem::size_of::<i32>()
}

fn check_pool(op: &'static str, params: &PoolParams, input: &Dims, output: &Dims) -> Result<(), KernelError> {
    params.activation.validate(op)?;
    validate::positive(op, "stride h", params.stride.h)?;
    validate::positive(op, "stride w", params.stride.w)?;
    validate::positive(op, "filter h", params.filter.h)?;
    validate::positive(op, "filter w", params.filter.w)?;
    if output.n != input.n || output.c != input.c {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: Dims::new(input.n, output.h, output.w, input.c),
            rhs: *output,
        });
    }
    let empty = |out: usize, stride: usize, pad: usize, filter: usize, extent: usize| {
        out > 0 && (extent == 0 || filter <= pad || (out - 1) * stride >= extent + pad)
    };
    if empty(output.h, params.stride.h, params.padding.h, params.filter.h, input.h)
        || empty(output.w, params.stride.w, params.padding.w, params.filter.w, input.w)
    {
        return Err(KernelError::invalid(
            op,
            format!("a {}x{} window leaves output {output} with no in-bounds tap", params.filter.h, params.filter.w),
        ));
    }
    Ok(())
}

fn round_div(sum: i32, count: i32) -> i32 {
    if sum > 0 {
        (sum + count / 2) / count
    } else {
        (sum - count / 2) / count
    }
}

fn avgpool<T: LaneElem>(
    op: &'static str,
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &PoolParams,
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    let (id, od) = (input.dims(), output.dims());
    check_pool(op, params, &id, &od)?;
    let acc: &mut [i32] = scratch.take(id.c).map_err(|e| e.for_op(op))?;

    let ops = backend.ops();
    let x = input.data();
    let out = output.data_mut();
    let c = id.c;
    for n in 0..od.n {
        for oh in 0..od.h {
            let rows = PoolParams::window(oh, params.stride.h, params.padding.h, params.filter.h, id.h);
            for ow in 0..od.w {
                let cols = PoolParams::window(ow, params.stride.w, params.padding.w, params.filter.w, id.w);
                acc.fill(0);
                for ih in rows.clone() {
                    for iw in cols.clone() {
                        let ip = id.offset(n, ih, iw, 0);
                        T::accumulate(ops, acc, &x[ip..ip + c]);
                    }
                }
                let count = (rows.len() * cols.len()) as i32;
                if count == 0 {
                    return Err(KernelError::invalid(op, format!("window at ({oh}, {ow}) has no in-bounds tap")));
                }
                let px = od.offset(n, oh, ow, 0);
                for (o, &sum) in out[px..px + c].iter_mut().zip(acc.iter()) {
                    *o = T::from_i32(params.activation.clamp(round_div(sum, count)));
                }
            }
        }
    }
    Ok(())
}

fn max_pool<T: LaneElem>(
    op: &'static str,
    backend: Backend,
    params: &PoolParams,
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    let (id, od) = (input.dims(), output.dims());
    check_pool(op, params, &id, &od)?;

    let ops = backend.ops();
    let x = input.data();
    let out = output.data_mut();
    let c = id.c;
    for n in 0..od.n {
        for oh in 0..od.h {
            let rows = PoolParams::window(oh, params.stride.h, params.padding.h, params.filter.h, id.h);
            for ow in 0..od.w {
                let cols = PoolParams::window(ow, params.stride.w, params.padding.w, params.filter.w, id.w);
                if rows.is_empty() || cols.is_empty() {
                    return Err(KernelError::invalid(op, format!("window at ({oh}, {ow}) has no in-bounds tap")));
                }
                let px = od.offset(n, oh, ow, 0);
                let dst = &mut out[px..px + c];
                let first = id.offset(n, rows.start, cols.start, 0);
                dst.copy_from_slice(&x[first..first + c]);
                for ih in rows.clone() {
                    for iw in cols.clone() {
                        let ip = id.offset(n, ih, iw, 0);
                        T::max_assign(ops, dst, &x[ip..ip + c]);
                    }
                }
                for v in dst.iter_mut() {
                    *v = T::from_i32(params.activation.clamp(v.to_i32()));
                }
            }
        }
    }
    Ok(())
}

/// int8 average pooling.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] for a zero stride or window or
/// a window with no in-bounds tap, [`KernelError::ShapeMismatch`] if the
/// output batch or channels differ from the input's, and
/// [`KernelError::ScratchTooSmall`] if `scratch` holds less than
/// [`avgpool_get_buffer_size`].
pub fn avgpool_s8(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &PoolParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    avgpool("avgpool_s8", backend, scratch, params, input, output)
}

/// int16 average pooling.
///
/// # Errors
/// As [`avgpool_s8`].
pub fn avgpool_s16(
    backend: Backend,
    scratch: &mut Scratch<'_>,
    params: &PoolParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    avgpool("avgpool_s16", backend, scratch, params, input, output)
}

/// int8 max pooling. Needs no scratch.
///
/// # Errors
/// As [`avgpool_s8`], without the scratch case.
pub fn max_pool_s8(
    backend: Backend,
    params: &PoolParams,
    input: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    max_pool("max_pool_s8", backend, params, input, output)
}

/// int16 max pooling.
///
/// # Errors
/// As [`max_pool_s8`].
pub fn max_pool_s16(
    backend: Backend,
    params: &PoolParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    max_pool("max_pool_s16", backend, params, input, output)
}
