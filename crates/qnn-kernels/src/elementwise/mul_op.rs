// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantized elementwise multiplication.

use super::broadcast::{self, BroadcastStrategy};
use qnn_core::{ActivationRange, KernelError, QuantElem, QuantParams, TensorView, TensorViewMut};

/// Quantization of a multiplication: `out = rescale((a + lhs_offset) *
/// (b + rhs_offset)) + output_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulParams {
    pub lhs_offset: i32,
    pub rhs_offset: i32,
    pub output: QuantParams,
    pub output_offset: i32,
    pub activation: ActivationRange,
}

impl MulParams {
    /// Prepares a multiplication from real scales and zero points.
    pub fn from_scales(
        lhs: (f32, i32),
        rhs: (f32, i32),
        output: (f32, i32),
        activation: ActivationRange,
    ) -> Result<Self, KernelError> {
        if !(lhs.0 > 0.0 && rhs.0 > 0.0 && output.0 > 0.0) {
            return Err(KernelError::invalid("mul_params", "scales must be positive"));
        }
        let real = f64::from(lhs.0) * f64::from(rhs.0) / f64::from(output.0);
        Ok(Self {
            lhs_offset: -lhs.1,
            rhs_offset: -rhs.1,
            output: QuantParams::from_real(real),
            output_offset: output.1,
            activation,
        })
    }
}

/// Multiplies two int8 tensors with broadcasting.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the operands do not broadcast
/// to `output`'s dims.
pub fn mul_s8(
    lhs: &TensorView<'_, i8>,
    rhs: &TensorView<'_, i8>,
    params: &MulParams,
    output: &mut TensorViewMut<'_, i8>,
) -> Result<(), KernelError> {
    mul("mul_s8", lhs, rhs, params, output)
}

/// Multiplies two int16 tensors with broadcasting.
pub fn mul_s16(
    lhs: &TensorView<'_, i16>,
    rhs: &TensorView<'_, i16>,
    params: &MulParams,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    mul("mul_s16", lhs, rhs, params, output)
}

fn mul<T: QuantElem>(
    op: &'static str,
    lhs: &TensorView<'_, T>,
    rhs: &TensorView<'_, T>,
    params: &MulParams,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    let strategy = BroadcastStrategy::plan(&lhs.dims(), &rhs.dims());
    broadcast::check(op, strategy, lhs.dims(), rhs.dims(), output.dims())?;
    params.activation.validate(op)?;

    let p = *params;
    let dims = output.dims();
    broadcast::apply(op, strategy, lhs, rhs, output.data_mut(), dims, |a, b| {
        let prod = (a.to_i32() + p.lhs_offset).wrapping_mul(b.to_i32() + p.rhs_offset);
        let v = p.output.apply(prod).wrapping_add(p.output_offset);
        T::saturate(p.activation.clamp(v))
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Dims;

    #[test]
    fn test_mul_scalar_broadcast() {
        let p = MulParams {
            lhs_offset: 0,
            rhs_offset: 0,
            output: QuantParams::from_real(0.5),
            output_offset: 1,
            activation: ActivationRange::full::<i8>(),
        };
        let a = [4i8, -6, 100];
        let b = [3i8];
        let mut out = [0i8; 3];
        mul_s8(
            &TensorView::new(Dims::vector(3), &a).unwrap(),
            &TensorView::new(Dims::scalar(), &b).unwrap(),
            &p,
            &mut TensorViewMut::new(Dims::vector(3), &mut out).unwrap(),
        )
        .unwrap();
        // 4*3/2+1, -6*3/2+1, 150+1 saturated.
        assert_eq!(out, [7, -8, 127]);
    }

    #[test]
    fn test_mul_offsets() {
        let p = MulParams::from_scales((1.0, 2), (1.0, -1), (1.0, 0), ActivationRange::full::<i16>())
            .unwrap();
        let a = [2i16, 12];
        let b = [-1i16, 3];
        let mut out = [0i16; 2];
        mul_s16(
            &TensorView::vector(&a),
            &TensorView::vector(&b),
            &p,
            &mut TensorViewMut::vector(&mut out),
        )
        .unwrap();
        assert_eq!(out, [0, 40]);
    }
}
