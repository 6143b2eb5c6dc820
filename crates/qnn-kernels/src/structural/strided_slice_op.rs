// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strided slice.
//!
//! Every axis is sliced independently: starting at `begin`, step by
//! `stride` (negative steps walk backwards) for `extent` elements, the
//! extent being the output's dim. Unit-stride slices that leave the inner
//! axes whole copy contiguous runs instead of single elements; every fast
//! path gives the same result as [`strided_slice_general`].

use qnn_core::{Axis, Dims, KernelError, TensorView, TensorViewMut};
use tracing::trace;

/// Resolved start and step per NHWC axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StridedSliceParams {
    pub begin: [usize; 4],
    pub stride: [isize; 4],
}

impl StridedSliceParams {
    /// Normalises raw slice arguments against `input`.
    ///
    /// Negative `begin`/`end` count from the end of the axis. A set bit `k`
    /// in `begin_mask` (`end_mask`) ignores `begin[k]` (`end[k]`) and uses
    /// the widest start (stop) for the stride's direction. Indices are then
    /// clamped into the axis. Returns the params and the output dims.
    ///
    /// # Errors
    /// Returns [`KernelError::InvalidArgument`] for a zero stride.
    ///
    /// # Examples
    /// ```
    /// use qnn_core::Dims;
    /// use qnn_kernels::structural::StridedSliceParams;
    ///
    /// // Reverse the channels: begin and end masked, stride -1.
    /// let (p, out) = StridedSliceParams::resolve(&Dims::new(1, 1, 1, 5), [0; 4], [1, 1, 1, 0], [1, 1, 1, -1], 0b1000, 0b1000)
    ///     .unwrap();
    /// assert_eq!(p.begin[3], 4);
    /// assert_eq!(out, Dims::new(1, 1, 1, 5));
    /// ```
    pub fn resolve(
        input: &Dims,
        begin: [i32; 4],
        end: [i32; 4],
        strides: [i32; 4],
        begin_mask: u8,
        end_mask: u8,
    ) -> Result<(Self, Dims), KernelError> {
        let dims = input.as_array();
        let mut params = Self {
            begin: [0; 4],
            stride: [1; 4],
        };
        let mut extents = [0usize; 4];
        for axis in 0..4 {
            let stride = i64::from(strides[axis]);
            if stride == 0 {
                return Err(KernelError::invalid("strided_slice", format!("zero stride on axis {axis}")));
            }
            let size = dims[axis] as i64;
            let (lo, hi) = if stride > 0 { (0, size) } else { (-1, size - 1) };
            let normalise = |v: i64, masked: bool, widest: i64| {
                let v = if masked { widest } else { v };
                let v = if v < 0 { v + size } else { v };
                v.clamp(lo, hi)
            };
            let (wide_start, wide_stop) = if stride > 0 { (i64::MIN / 2, i64::MAX / 2) } else { (i64::MAX / 2, i64::MIN / 2) };
            let start = normalise(i64::from(begin[axis]), begin_mask & (1 << axis) != 0, wide_start);
            let stop = normalise(i64::from(end[axis]), end_mask & (1 << axis) != 0, wide_stop);

            let extent = if stride > 0 {
                (stop - start + stride - 1).div_euclid(stride)
            } else {
                (start - stop - stride - 1).div_euclid(-stride)
            }
            .max(0);
            extents[axis] = extent as usize;
            params.begin[axis] = if size == 0 { 0 } else { start.max(0) as usize };
            params.stride[axis] = stride as isize;
        }
        Ok((params, Dims::from_array(extents)))
    }

    fn is_unit(&self) -> bool {
        self.stride == [1; 4]
    }
}

/// How [`strided_slice`] copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceStrategy {
    /// Only N is sliced: one contiguous run.
    Slab,
    /// N and H are sliced: one run per batch.
    Batch,
    /// W is sliced too: one run per row.
    Row,
    /// C is sliced: one run per pixel.
    Pixel,
    /// Non-unit strides: element by element.
    General,
}

impl SliceStrategy {
    /// Picks the widest contiguous copy these params allow.
    pub fn plan(params: &StridedSliceParams, input: &Dims, output: &Dims) -> Self {
        if !params.is_unit() {
            return SliceStrategy::General;
        }
        let partial = |axis: Axis| output.get(axis) != input.get(axis);
        if partial(Axis::C) {
            SliceStrategy::Pixel
        } else if partial(Axis::W) {
            SliceStrategy::Row
        } else if partial(Axis::H) {
            SliceStrategy::Batch
        } else {
            SliceStrategy::Slab
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SliceStrategy::Slab => "slab",
            SliceStrategy::Batch => "batch",
            SliceStrategy::Row => "row",
            SliceStrategy::Pixel => "pixel",
            SliceStrategy::General => "general",
        }
    }
}

fn check(params: &StridedSliceParams, input: &Dims, output: &Dims) -> Result<(), KernelError> {
    let (i, o) = (input.as_array(), output.as_array());
    for axis in 0..4 {
        if o[axis] == 0 {
            continue;
        }
        let first = params.begin[axis] as isize;
        let last = first + (o[axis] as isize - 1) * params.stride[axis];
        if params.stride[axis] == 0 || first >= i[axis] as isize || last < 0 || last >= i[axis] as isize {
            return Err(KernelError::invalid(
                "strided_slice",
                format!(
                    "axis {axis}: {} steps of {} from {first} leave [0, {})",
                    o[axis], params.stride[axis], i[axis]
                ),
            ));
        }
    }
    Ok(())
}

/// Strided slice through the fastest applicable copy.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] if any slice position falls
/// outside the input.
pub fn strided_slice<T: Copy>(
    params: &StridedSliceParams,
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    let (id, od) = (input.dims(), output.dims());
    check(params, &id, &od)?;
    let strategy = SliceStrategy::plan(params, &id, &od);
    trace!(strategy = strategy.as_str(), input = %id, output = %od, "strided_slice");

    let x = input.data();
    let out = output.data_mut();
    let [b, s] = [params.begin, id.strides()];
    match strategy {
        SliceStrategy::Slab => {
            let start = b[0] * s[0];
            out.copy_from_slice(&x[start..start + out.len()]);
        }
        SliceStrategy::Batch => {
            let run = od.h * s[1];
            for (n, dst) in out.chunks_exact_mut(run.max(1)).enumerate() {
                let start = (b[0] + n) * s[0] + b[1] * s[1];
                dst.copy_from_slice(&x[start..start + run]);
            }
        }
        SliceStrategy::Row => {
            let run = od.w * s[2];
            for (r, dst) in out.chunks_exact_mut(run.max(1)).enumerate() {
                let (n, h) = (r / od.h, r % od.h);
                let start = (b[0] + n) * s[0] + (b[1] + h) * s[1] + b[2] * s[2];
                dst.copy_from_slice(&x[start..start + run]);
            }
        }
        SliceStrategy::Pixel => {
            let run = od.c;
            for (p, dst) in out.chunks_exact_mut(run.max(1)).enumerate() {
                let (n, h, w) = (p / (od.h * od.w), p / od.w % od.h, p % od.w);
                let start = (b[0] + n) * s[0] + (b[1] + h) * s[1] + (b[2] + w) * s[2] + b[3];
                dst.copy_from_slice(&x[start..start + run]);
            }
        }
        SliceStrategy::General => general(params, x, &id, out, &od),
    }
    Ok(())
}

/// Strided slice element by element, for any strides.
///
/// # Errors
/// As [`strided_slice`].
pub fn strided_slice_general<T: Copy>(
    params: &StridedSliceParams,
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    let (id, od) = (input.dims(), output.dims());
    check(params, &id, &od)?;
    general(params, input.data(), &id, output.data_mut(), &od);
    Ok(())
}

fn general<T: Copy>(params: &StridedSliceParams, x: &[T], id: &Dims, out: &mut [T], od: &Dims) {
    let s = id.strides();
    let pos = |axis: usize, i: usize| (params.begin[axis] as isize + i as isize * params.stride[axis]) as usize;
    let mut o = out.iter_mut();
    for n in 0..od.n {
        for h in 0..od.h {
            for w in 0..od.w {
                let base = pos(0, n) * s[0] + pos(1, h) * s[1] + pos(2, w) * s[2];
                for c in 0..od.c {
                    if let Some(slot) = o.next() {
                        *slot = x[base + pos(3, c)];
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(params: &StridedSliceParams, id: Dims, od: Dims, general_only: bool) -> Vec<i16> {
        let x: Vec<i16> = (0..id.num_elements() as i16).collect();
        let mut y = vec![0i16; od.num_elements()];
        let input = TensorView::new(id, &x).unwrap();
        let mut output = TensorViewMut::new(od, &mut y).unwrap();
        if general_only {
            strided_slice_general(params, &input, &mut output).unwrap();
        } else {
            strided_slice(params, &input, &mut output).unwrap();
        }
        y
    }

    #[test]
    fn test_resolve_negative_and_masks() {
        let id = Dims::new(2, 4, 4, 6);
        let (p, od) = StridedSliceParams::resolve(&id, [0, -3, 1, 0], [1, 0, -1, 6], [1, 1, 2, 1], 0, 0b0010).unwrap();
        assert_eq!(p.begin, [0, 1, 1, 0]);
        assert_eq!(od, Dims::new(1, 3, 1, 6));
    }

    #[test]
    fn test_resolve_negative_stride_and_empty() {
        let id = Dims::new(1, 1, 1, 5);
        let (p, od) = StridedSliceParams::resolve(&id, [0, 0, 0, -1], [1, 1, 1, 0], [1, 1, 1, -2], 0, 0).unwrap();
        assert_eq!(p.begin[3], 4);
        assert_eq!(od.c, 2);
        let (_, empty) = StridedSliceParams::resolve(&id, [0, 0, 0, 3], [1, 1, 1, 1], [1, 1, 1, 1], 0, 0).unwrap();
        assert_eq!(empty.c, 0);
        assert!(StridedSliceParams::resolve(&id, [0; 4], [1; 4], [1, 1, 1, 0], 0, 0).is_err());
    }

    #[test]
    fn test_reverse_channels() {
        let id = Dims::new(1, 1, 2, 3);
        let (p, od) = StridedSliceParams::resolve(&id, [0; 4], [0; 4], [1, 1, 1, -1], 0b1111, 0b1111).unwrap();
        assert_eq!(run(&p, id, od, false), vec![2, 1, 0, 5, 4, 3]);
    }

    #[test]
    fn test_each_fast_path() {
        let id = Dims::new(3, 4, 5, 6);
        let cases = [
            ([1, 0, 0, 0], [3, 4, 5, 6], SliceStrategy::Slab),
            ([1, 1, 0, 0], [3, 3, 5, 6], SliceStrategy::Batch),
            ([0, 1, 2, 0], [2, 4, 4, 6], SliceStrategy::Row),
            ([0, 0, 0, 2], [3, 4, 5, 5], SliceStrategy::Pixel),
        ];
        for (begin, end, expected) in cases {
            let (p, od) = StridedSliceParams::resolve(&id, begin, end, [1; 4], 0, 0).unwrap();
            assert_eq!(SliceStrategy::plan(&p, &id, &od), expected);
            assert_eq!(run(&p, id, od, false), run(&p, id, od, true), "{}", expected.as_str());
        }
    }

    #[test]
    fn test_out_of_bounds_params_rejected() {
        let id = Dims::new(1, 1, 1, 4);
        let p = StridedSliceParams { begin: [0, 0, 0, 2], stride: [1, 1, 1, 1] };
        let x = [0i8; 4];
        let mut y = [0i8; 3];
        let err = strided_slice(&p, &TensorView::new(id, &x).unwrap(), &mut TensorViewMut::vector(&mut y)).unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }

    proptest! {
        #[test]
        fn prop_fast_paths_match_general(
            begin in prop::array::uniform4(-6i32..6),
            end in prop::array::uniform4(-6i32..7),
            strides in prop::array::uniform4(prop::sample::select(vec![-2i32, -1, 1, 1, 1, 2])),
            begin_mask in 0u8..16,
            end_mask in 0u8..16,
        ) {
            let id = Dims::new(2, 3, 4, 5);
            let (p, od) = StridedSliceParams::resolve(&id, begin, end, strides, begin_mask, end_mask).unwrap();
            prop_assert_eq!(run(&p, id, od, false), run(&p, id, od, true));
        }
    }
}
