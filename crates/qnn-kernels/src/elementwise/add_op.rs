// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantized elementwise addition.

use super::broadcast::{self, BroadcastStrategy, OperandQuant};
use crate::validate;
use qnn_core::{ActivationRange, KernelError, QuantElem, QuantParams, TensorView, TensorViewMut};

/// Quantization of an addition.
///
/// Each operand is offset, widened by `left_shift` bits of headroom and
/// rescaled to a shared intermediate scale with its own pair. The sum is
/// rescaled once more to the output scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddParams {
    pub lhs: OperandQuant,
    pub rhs: OperandQuant,
    /// Headroom bits applied before the per-operand rescale.
    pub left_shift: i32,
    pub output: QuantParams,
    pub output_offset: i32,
    pub activation: ActivationRange,
}

impl AddParams {
    /// Prepares an int8 addition from real scales and zero points.
    ///
    /// Uses 20 bits of headroom and rescales both inputs to twice the larger
    /// input scale.
    pub fn from_scales(
        lhs: (f32, i32),
        rhs: (f32, i32),
        output: (f32, i32),
        activation: ActivationRange,
    ) -> Result<Self, KernelError> {
        const LEFT_SHIFT: i32 = 20;
        let (ls, lz) = lhs;
        let (rs, rz) = rhs;
        let (os, oz) = output;
        if !(ls > 0.0 && rs > 0.0 && os > 0.0) {
            return Err(KernelError::invalid("add_params", "scales must be positive"));
        }
        let twice_max = 2.0 * f64::from(ls.max(rs));
        let real_out = twice_max / (f64::from(1u32 << LEFT_SHIFT) * f64::from(os));
        Ok(Self {
            lhs: OperandQuant::new(-lz, QuantParams::from_real(f64::from(ls) / twice_max)),
            rhs: OperandQuant::new(-rz, QuantParams::from_real(f64::from(rs) / twice_max)),
            left_shift: LEFT_SHIFT,
            output: QuantParams::from_real(real_out),
            output_offset: oz,
            activation,
        })
    }
}

/// Adds two int8 tensors with broadcasting.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the operands do not broadcast
/// or `output` does not have the broadcast dims, and
/// [`KernelError::InvalidArgument`] for an invalid activation range or
/// shift.
pub fn add_s8(
    lhs: &TensorView<'_, i8>,
    rhs: &TensorView<'_, i8>,
    params: &AddParams,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    let strategy = BroadcastStrategy::plan(&lhs.dims(), &rhs.dims());
    add("add_s8", lhs, rhs, params, output, strategy)
}

/// [`add_s8`] with a caller-chosen loop strategy.
pub fn add_s8_with_strategy(
    lhs: &TensorView<'_, i8>,
    rhs: &TensorView<'_, i8>,
    params: &AddParams,
    output: &mut TensorViewMut<'_, i8>,
    strategy: BroadcastStrategy,
) -> Result<(), KernelError> {
    add("add_s8", lhs, rhs, params, output, strategy)
}

/// Adds two int16 tensors with broadcasting.
pub fn add_s16(
    lhs: &TensorView<'_, i16>,
    rhs: &TensorView<'_, i16>,
    params: &AddParams,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    let strategy = BroadcastStrategy::plan(&lhs.dims(), &rhs.dims());
    add("add_s16", lhs, rhs, params, output, strategy)
}

/// [`add_s16`] with a caller-chosen loop strategy.
pub fn add_s16_with_strategy(
    lhs: &TensorView<'_, i16>,
    rhs: &TensorView<'_, i16>,
    params: &AddParams,
    output: &mut TensorViewMut<'_, i16>,
    strategy: BroadcastStrategy,
) -> Result<(), KernelError> {
    add("add_s16", lhs, rhs, params, output, strategy)
}

fn add<T: QuantElem>(
    op: &'static str,
    lhs: &TensorView<'_, T>,
    rhs: &TensorView<'_, T>,
    params: &AddParams,
    output: &mut TensorViewMut<'_, T>,
    strategy: BroadcastStrategy,
) -> Result<(), KernelError> {
    broadcast::check(op, strategy, lhs.dims(), rhs.dims(), output.dims())?;
    params.activation.validate(op)?;
    validate::in_range(op, "left shift", params.left_shift, 0, 30)?;

    let p = *params;
    let range = ActivationRange::new(p.activation.min.max(T::MIN), p.activation.max.min(T::MAX))
        .map_err(|_| KernelError::invalid(op, "activation range lies outside the output type"))?;
    let scale = move |x: T, q: OperandQuant| {
        let widened = (x.to_i32() + q.offset).wrapping_shl(p.left_shift as u32);
        q.quant.apply(widened)
    };

    let dims = output.dims();
    broadcast::apply(op, strategy, lhs, rhs, output.data_mut(), dims, |a, b| {
        let sum = scale(a, p.lhs).wrapping_add(scale(b, p.rhs));
        T::from_i32(range.clamp(p.output.apply(sum).wrapping_add(p.output_offset)))
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Dims;

    fn unit_params() -> AddParams {
        // Offsets 0, no headroom, every scale 1.0.
        AddParams {
            lhs: OperandQuant::new(0, QuantParams::identity()),
            rhs: OperandQuant::new(0, QuantParams::identity()),
            left_shift: 0,
            output: QuantParams::identity(),
            output_offset: 0,
            activation: ActivationRange::full::<i8>(),
        }
    }

    #[test]
    fn test_add_flat() {
        let d = Dims::vector(4);
        let a = [1i8, -2, 100, -100];
        let b = [3i8, 4, 100, -100];
        let mut out = [0i8; 4];
        add_s8(
            &TensorView::new(d, &a).unwrap(),
            &TensorView::new(d, &b).unwrap(),
            &unit_params(),
            &mut TensorViewMut::new(d, &mut out).unwrap(),
        )
        .unwrap();
        // Saturates at both ends.
        assert_eq!(out, [4, 2, 127, -128]);
    }

    #[test]
    fn test_add_offsets_and_activation() {
        let d = Dims::vector(3);
        let mut p = unit_params();
        p.lhs.offset = 10;
        p.output_offset = -5;
        p.activation = ActivationRange::new(-5, 50).unwrap();
        let a = [0i8, 20, 60];
        let b = [0i8, 0, 0];
        let mut out = [0i8; 3];
        add_s8(
            &TensorView::new(d, &a).unwrap(),
            &TensorView::new(d, &b).unwrap(),
            &p,
            &mut TensorViewMut::new(d, &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [5, 25, 50]);
    }

    #[test]
    fn test_from_scales_matches_float() {
        // 0.5 * (a - 1) + 0.25 * (b + 2), output scale 0.5, zero point 3.
        let p = AddParams::from_scales((0.5, 1), (0.25, -2), (0.5, 3), ActivationRange::full::<i8>())
            .unwrap();
        let d = Dims::vector(3);
        let a = [1i8, 11, -9];
        let b = [-2i8, 6, 10];
        let mut out = [0i8; 3];
        add_s8(
            &TensorView::new(d, &a).unwrap(),
            &TensorView::new(d, &b).unwrap(),
            &p,
            &mut TensorViewMut::new(d, &mut out).unwrap(),
        )
        .unwrap();
        for i in 0..3 {
            let real = 0.5 * (f32::from(a[i]) - 1.0) + 0.25 * (f32::from(b[i]) + 2.0);
            let expected = (real / 0.5).round() as i32 + 3;
            assert!((i32::from(out[i]) - expected).abs() <= 1, "{i}: {} vs {expected}", out[i]);
        }
    }

    #[test]
    fn test_add_rejects_wrong_output_dims() {
        let a = [0i8; 4];
        let mut out = [0i8; 3];
        let err = add_s8(
            &TensorView::new(Dims::vector(4), &a).unwrap(),
            &TensorView::new(Dims::vector(4), &a).unwrap(),
            &unit_params(),
            &mut TensorViewMut::new(Dims::vector(3), &mut out).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_add_s16() {
        let d = Dims::vector(2);
        let a = [30000i16, -1000];
        let b = [10000i16, -500];
        let mut out = [0i16; 2];
        add_s16(
            &TensorView::new(d, &a).unwrap(),
            &TensorView::new(d, &b).unwrap(),
            &AddParams {
                activation: ActivationRange::full::<i16>(),
                ..unit_params()
            },
            &mut TensorViewMut::new(d, &mut out).unwrap(),
        )
        .unwrap();
        assert_eq!(out, [32767, -1500]);
    }
}
