// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Max reduction.

use super::strategy::{self, ReduceStrategy};
use crate::lanes::LaneElem;
use qnn_core::{AxisMask, Backend, KernelError, TensorView, TensorViewMut};

/// Maximum over the masked axes of an int8 tensor.
///
/// A pure comparison: no offsets or rescaling, and no scratch.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if `output` does not have the
/// reduced dims.
pub fn reduce_max_s8(
    backend: Backend,
    input: &TensorView<'_, i8>,
    mask: &AxisMask,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let strategy = ReduceStrategy::plan(&input.dims(), mask);
    reduce_max("reduce_max_s8", backend, input, mask, output, strategy)
}

/// [`reduce_max_s8`] with a caller-chosen strategy.
pub fn reduce_max_s8_with_strategy(
    backend: Backend,
    input: &TensorView<'_, i8>,
    mask: &AxisMask,
    output: &mut TensorViewMut<'_, i8>,
    strategy: ReduceStrategy,
) -> Result<(), KernelError> {
    reduce_max("reduce_max_s8", backend, input, mask, output, strategy)
}

/// Maximum over the masked axes of an int16 tensor.
pub fn reduce_max_s16(
    backend: Backend,
    input: &TensorView<'_, i16>,
    mask: &AxisMask,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    let strategy = ReduceStrategy::plan(&input.dims(), mask);
    reduce_max("reduce_max_s16", backend, input, mask, output, strategy)
}

/// [`reduce_max_s16`] with a caller-chosen strategy.
pub fn reduce_max_s16_with_strategy(
    backend: Backend,
    input: &TensorView<'_, i16>,
    mask: &AxisMask,
    output: &mut TensorViewMut<'_, i16>,
    strategy: ReduceStrategy,
) -> Result<(), KernelError> {
    reduce_max("reduce_max_s16", backend, input, mask, output, strategy)
}

fn reduce_max<T: LaneElem>(
    op: &'static str,
    backend: Backend,
    input: &TensorView<'_, T>,
    mask: &AxisMask,
    output: &mut TensorViewMut<'_, T>,
    strategy: ReduceStrategy,
) -> Result<(), KernelError> {
    let dims = input.dims();
    strategy::check_output(op, &dims, mask, &output.dims())?;
    let strategy = strategy.check(op, &dims, mask)?;
    strategy::max_each(backend.ops(), strategy, input.data(), &dims, mask, output.data_mut());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Dims;

    #[test]
    fn test_max_spatial() {
        let d = Dims::new(1, 2, 2, 2);
        let data = [1i8, -7, 9, -3, -128, -2, 4, -9];
        let mut out = [0i8; 2];
        reduce_max_s8(
            Backend::Lanes,
            &TensorView::new(d, &data).unwrap(),
            &AxisMask::spatial(),
            &mut TensorViewMut::new(Dims::new(1, 1, 1, 2), &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [9, -2]);
    }

    #[test]
    fn test_max_strategies_agree() {
        let d = Dims::new(2, 2, 3, 2);
        let data: Vec<i16> = (0..24).map(|i| ((i * 7919) % 23 - 11) as i16).collect();
        let mask = AxisMask::new(false, false, true, true);
        let od = mask.reduced_dims(&d);
        let mut fast = vec![0i16; od.num_elements()];
        let mut slow = vec![0i16; od.num_elements()];
        let input = TensorView::new(d, &data).unwrap();
        reduce_max_s16(Backend::Scalar, &input, &mask, &mut TensorViewMut::new(od, &mut fast).unwrap()).unwrap();
        reduce_max_s16_with_strategy(
            Backend::Scalar,
            &input,
            &mask,
            &mut TensorViewMut::new(od, &mut slow).unwrap(),
            ReduceStrategy::General,
        )
        .unwrap();
        assert_eq!(fast, slow);
    }
}
