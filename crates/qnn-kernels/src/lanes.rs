// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Width-generic access to the [`LaneOps`] row primitives.

use qnn_core::{LaneOps, QuantElem};

/// An element type the lane primitives have a row method for.
pub(crate) trait LaneElem: QuantElem {
    fn row_sum(ops: &dyn LaneOps, xs: &[Self]) -> i32;
    fn row_max(ops: &dyn LaneOps, xs: &[Self]) -> Self;
    fn accumulate(ops: &dyn LaneOps, acc: &mut [i32], row: &[Self]);
    fn max_assign(ops: &dyn LaneOps, acc: &mut [Self], row: &[Self]);
}

impl LaneElem for i8 {
    #[inline]
    fn row_sum(ops: &dyn LaneOps, xs: &[Self]) -> i32 {
        ops.sum_i8(xs)
    }

    #[inline]
    fn row_max(ops: &dyn LaneOps, xs: &[Self]) -> Self {
        ops.max_i8(xs)
    }

    #[inline]
    fn accumulate(ops: &dyn LaneOps, acc: &mut [i32], row: &[Self]) {
        ops.accumulate_i8(acc, row)
    }

    #[inline]
    fn max_assign(ops: &dyn LaneOps, acc: &mut [Self], row: &[Self]) {
        ops.max_assign_i8(acc, row)
    }
}

impl LaneElem for i16 {
    #[inline]
    fn row_sum(ops: &dyn LaneOps, xs: &[Self]) -> i32 {
        ops.sum_i16(xs)
    }

    #[inline]
    fn row_max(ops: &dyn LaneOps, xs: &[Self]) -> Self {
        ops.max_i16(xs)
    }

    #[inline]
    fn accumulate(ops: &dyn LaneOps, acc: &mut [i32], row: &[Self]) {
        ops.accumulate_i16(acc, row)
    }

    #[inline]
    fn max_assign(ops: &dyn LaneOps, acc: &mut [Self], row: &[Self]) {
        ops.max_assign_i16(acc, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Backend;

    fn row_extremes<T: LaneElem>(backend: Backend, xs: &[T]) -> (i32, T) {
        let ops = backend.ops();
        (T::row_sum(ops, xs), T::row_max(ops, xs))
    }

    #[test]
    fn test_row_methods_per_width() {
        for backend in [Backend::Scalar, Backend::Lanes] {
            let narrow: Vec<i8> = (0..40).map(|i| (i * 7 % 50 - 25) as i8).collect();
            let wide: Vec<i16> = (0..40).map(|i| (i * 977 % 4000 - 2000) as i16).collect();
            assert_eq!(
                row_extremes(backend, &narrow[..]),
                (narrow.iter().map(|&v| i32::from(v)).sum(), narrow.iter().copied().max().unwrap_or(i8::MIN)),
                "{backend}"
            );
            assert_eq!(
                row_extremes(backend, &wide[..]),
                (wide.iter().map(|&v| i32::from(v)).sum(), wide.iter().copied().max().unwrap_or(i16::MIN)),
                "{backend}"
            );
        }
    }
}
