// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise minimum and maximum.
//!
//! Both operands must share a quantization, so the raw values compare
//! directly.

use super::broadcast::{self, BroadcastStrategy};
use qnn_core::{KernelError, QuantElem, TensorView, TensorViewMut};

/// `out = min(lhs, rhs)` with broadcasting.
pub fn minimum_s8(
    lhs: &TensorView<'_, i8>,
    rhs: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    select("minimum_s8", lhs, rhs, output, std::cmp::min)
}

/// `out = min(lhs, rhs)` with broadcasting.
pub fn minimum_s16(
    lhs: &TensorView<'_, i16>,
    rhs: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    select("minimum_s16", lhs, rhs, output, std::cmp::min)
}

/// `out = max(lhs, rhs)` with broadcasting.
pub fn maximum_s8(
    lhs: &TensorView<'_, i8>,
    rhs: &TensorView<'_, i8>,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    select("maximum_s8", lhs, rhs, output, std::cmp::max)
}

/// `out = max(lhs, rhs)` with broadcasting.
pub fn maximum_s16(
    lhs: &TensorView<'_, i16>,
    rhs: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    select("maximum_s16", lhs, rhs, output, std::cmp::max)
}

fn select<T: QuantElem>(
    op: &'static str,
    lhs: &TensorView<'_, T>,
    rhs: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
    pick: fn(T, T) -> T,
) -> Result<(), KernelError> {
    let strategy = BroadcastStrategy::plan(&lhs.dims(), &rhs.dims());
    broadcast::check(op, strategy, lhs.dims(), rhs.dims(), output.dims())?;
    let dims = output.dims();
    broadcast::apply(op, strategy, lhs, rhs, output.data_mut(), dims, pick);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Dims;

    #[test]
    fn test_minimum_maximum() {
        let a = [1i8, -5, 7, 0];
        let b = [2i8];
        let d = Dims::new(1, 1, 2, 2);
        let mut lo = [0i8; 4];
        let mut hi = [0i8; 4];
        let lhs = TensorView::new(d, &a).unwrap();
        let rhs = TensorView::new(Dims::scalar(), &b).unwrap();
        minimum_s8(&lhs, &rhs, &mut TensorViewMut::new(d, &mut lo).unwrap()).unwrap();
        maximum_s8(&lhs, &rhs, &mut TensorViewMut::new(d, &mut hi).unwrap()).unwrap();
        assert_eq!(lo, [1, -5, 2, 0]);
        assert_eq!(hi, [2, 2, 7, 2]);
    }

    #[test]
    fn test_maximum_s16_channel_broadcast() {
        let a = [100i16, -100, 300, -300];
        let b = [0i16, 200];
        let mut out = [0i16; 4];
        maximum_s16(
            &TensorView::new(Dims::new(1, 1, 2, 2), &a).unwrap(),
            &TensorView::new(Dims::new(1, 1, 1, 2), &b).unwrap(),
            &mut TensorViewMut::new(Dims::new(1, 1, 2, 2), &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [100, 200, 300, 200]);
    }
}
