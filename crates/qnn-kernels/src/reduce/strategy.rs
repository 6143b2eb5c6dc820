// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reduction strategy selection and the shared traversal.
//!
//! Three traversals visit the reduced subset of each output element:
//!
//! - [`ReduceStrategy::FlattenSuffix`]: the reduced axes form a trailing
//!   run, so every output element owns one contiguous block.
//! - [`ReduceStrategy::Spatial`]: the mask is exactly `{H, W}`; whole
//!   channel rows are folded together per batch.
//! - [`ReduceStrategy::General`]: nested loops over any mask.
//!
//! All three produce identical results wherever they apply.

use crate::lanes::LaneElem;
use crate::validate;
use qnn_core::{AxisMask, Dims, KernelError, LaneOps};
use tracing::trace;

/// Traversal used by a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceStrategy {
    /// `outer` blocks of `inner` contiguous elements.
    FlattenSuffix { outer: usize, inner: usize },
    /// Sum or max over the H×W plane, channels in lockstep.
    Spatial,
    /// Fallback for arbitrary masks.
    General,
}

impl ReduceStrategy {
    /// Chooses the fastest strategy for reducing `dims` over `mask`.
    pub fn plan(dims: &Dims, mask: &AxisMask) -> Self {
        if let Some((outer, inner)) = mask.flatten_suffix(dims) {
            ReduceStrategy::FlattenSuffix { outer, inner }
        } else if *mask == AxisMask::spatial() {
            ReduceStrategy::Spatial
        } else {
            ReduceStrategy::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReduceStrategy::FlattenSuffix { .. } => "flatten_suffix",
            ReduceStrategy::Spatial => "spatial",
            ReduceStrategy::General => "general",
        }
    }

    /// The strategy re-derived for `dims`/`mask`, or an error if `self` was
    /// forced onto a mask it cannot handle.
    pub(crate) fn check(self, op: &'static str, dims: &Dims, mask: &AxisMask) -> Result<Self, KernelError> {
        let resolved = match self {
            ReduceStrategy::FlattenSuffix { .. } => mask
                .flatten_suffix(dims)
                .map(|(outer, inner)| ReduceStrategy::FlattenSuffix { outer, inner }),
            ReduceStrategy::Spatial => (*mask == AxisMask::spatial()).then_some(ReduceStrategy::Spatial),
            ReduceStrategy::General => Some(ReduceStrategy::General),
        };
        resolved.ok_or_else(|| {
            KernelError::invalid(
                op,
                format!("strategy {} does not apply to mask {mask} over {dims}", self.as_str()),
            )
        })
    }
}

/// Scratch bytes a sum or mean over `input` may need: one int32 per
/// channel for the spatial strategy.
pub fn reduce_get_buffer_size(input: &Dims) -> usize {
    input.c * std::mem::size_of::<i32>()
}

/// Validates the output dims of a reduction.
pub(crate) fn check_output(op: &'static str, input: &Dims, mask: &AxisMask, output: &Dims) -> Result<(), KernelError> {
    validate::same_dims(op, mask.reduced_dims(input), *output)
}

/// Calls `emit(out_index, sum)` once per output element with the wrapping
/// int32 sum of its reduced subset. `acc` must hold `input.c` elements when
/// `strategy` is [`ReduceStrategy::Spatial`].
pub(crate) fn sum_each<T: LaneElem>(
    ops: &dyn LaneOps,
    strategy: ReduceStrategy,
    input: &[T],
    dims: &Dims,
    mask: &AxisMask,
    acc: &mut [i32],
    mut emit: impl FnMut(usize, i32),
) {
    trace!(strategy = strategy.as_str(), dims = %dims, mask = %mask, "reduce sum");
    match strategy {
        ReduceStrategy::FlattenSuffix { outer, inner } => {
            for o in 0..outer {
                emit(o, T::row_sum(ops, &input[o * inner..(o + 1) * inner]));
            }
        }
        ReduceStrategy::Spatial => {
            let plane = dims.h * dims.w * dims.c;
            let acc = &mut acc[..dims.c];
            for n in 0..dims.n {
                acc.fill(0);
                for row in input[n * plane..(n + 1) * plane].chunks_exact(dims.c.max(1)) {
                    T::accumulate(ops, acc, row);
                }
                for (c, &s) in acc.iter().enumerate() {
                    emit(n * dims.c + c, s);
                }
            }
        }
        ReduceStrategy::General => general(input, dims, mask, |subset| {
            subset.fold(0i32, |s, x| s.wrapping_add(x.to_i32()))
        }, emit),
    }
}

/// Calls `emit(out_index, max)` once per output element.
pub(crate) fn max_each<T: LaneElem>(
    ops: &dyn LaneOps,
    strategy: ReduceStrategy,
    input: &[T],
    dims: &Dims,
    mask: &AxisMask,
    out: &mut [T],
) {
    trace!(strategy = strategy.as_str(), dims = %dims, mask = %mask, "reduce max");
    match strategy {
        ReduceStrategy::FlattenSuffix { outer, inner } => {
            for (o, dst) in out.iter_mut().enumerate().take(outer) {
                *dst = T::row_max(ops, &input[o * inner..(o + 1) * inner]);
            }
        }
        ReduceStrategy::Spatial => {
            let c = dims.c;
            let plane = dims.h * dims.w * c;
            if plane == 0 {
                return;
            }
            for n in 0..dims.n {
                let slab = &input[n * plane..(n + 1) * plane];
                let dst = &mut out[n * c..(n + 1) * c];
                dst.copy_from_slice(&slab[..c]);
                for row in slab[c..].chunks_exact(c) {
                    T::max_assign(ops, dst, row);
                }
            }
        }
        ReduceStrategy::General => general(
            input,
            dims,
            mask,
            |subset| subset.max().unwrap_or(T::from_i32(T::MIN)),
            |o, m| out[o] = m,
        ),
    }
}

/// Walks every output coordinate and folds the input elements that map to
/// it.
fn general<T: Copy, R>(
    input: &[T],
    dims: &Dims,
    mask: &AxisMask,
    fold: impl Fn(&mut dyn Iterator<Item = T>) -> R,
    mut emit: impl FnMut(usize, R),
) {
    let out_dims = mask.reduced_dims(dims);
    let flags = mask.flags();
    let d = dims.as_array();
    let span = |axis: usize, at: usize| if flags[axis] { 0..d[axis] } else { at..at + 1 };

    let mut o = 0;
    for on in 0..out_dims.n {
        for oh in 0..out_dims.h {
            for ow in 0..out_dims.w {
                for oc in 0..out_dims.c {
                    let mut subset = span(0, on).flat_map(|n| {
                        span(1, oh).flat_map(move |h| {
                            span(2, ow).flat_map(move |w| span(3, oc).map(move |c| input[dims.offset(n, h, w, c)]))
                        })
                    });
                    emit(o, fold(&mut subset));
                    o += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan() {
        let d = Dims::new(2, 3, 4, 5);
        assert_eq!(
            ReduceStrategy::plan(&d, &AxisMask::new(false, false, true, true)),
            ReduceStrategy::FlattenSuffix { outer: 6, inner: 20 }
        );
        assert_eq!(ReduceStrategy::plan(&d, &AxisMask::spatial()), ReduceStrategy::Spatial);
        assert_eq!(
            ReduceStrategy::plan(&d, &AxisMask::new(true, false, false, true)),
            ReduceStrategy::General
        );
    }

    #[test]
    fn test_spatial_with_single_channel_flattens() {
        // With C = 1 the {H, W} reduction is a trailing run.
        let d = Dims::new(1, 2, 2, 1);
        assert_eq!(
            ReduceStrategy::plan(&d, &AxisMask::spatial()),
            ReduceStrategy::FlattenSuffix { outer: 1, inner: 4 }
        );
    }

    #[test]
    fn test_check_forced() {
        let d = Dims::new(2, 3, 4, 5);
        let spatial = AxisMask::spatial();
        assert!(ReduceStrategy::Spatial.check("t", &d, &spatial).is_ok());
        assert!(ReduceStrategy::General.check("t", &d, &spatial).is_ok());
        let forced = ReduceStrategy::FlattenSuffix { outer: 0, inner: 0 };
        assert!(forced.check("t", &d, &spatial).is_err());
        let trailing = AxisMask::new(false, false, false, true);
        assert_eq!(
            forced.check("t", &d, &trailing).unwrap(),
            ReduceStrategy::FlattenSuffix { outer: 24, inner: 5 }
        );
    }
}
