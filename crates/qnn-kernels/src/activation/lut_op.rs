// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 256-entry lookup tables for int8 elementwise transforms.

use qnn_core::{KernelError, TensorView, TensorViewMut};

use crate::validate;

/// Output value for every int8 input, indexed by the input's bit pattern.
#[derive(Clone, PartialEq, Eq)]
pub struct Lut256 {
    table: [i8; 256],
}

impl Lut256 {
    /// Tabulates `f` between two affine-quantized int8 domains. Outputs round
    /// half away from zero and saturate.
    pub fn populate(f: impl Fn(f32) -> f32, input_scale: f32, input_zero_point: i32, output_scale: f32, output_zero_point: i32) -> Self {
        let inverse_scale = 1.0 / output_scale;
        let mut table = [0i8; 256];
        for v in i32::from(i8::MIN)..=i32::from(i8::MAX) {
            let real = input_scale * (v - input_zero_point) as f32;
            let q = (f(real) * inverse_scale).round() as i32 + output_zero_point;
            table[usize::from(v as i8 as u8)] = q.clamp(i8::MIN.into(), i8::MAX.into()) as i8;
        }
        Self { table }
    }

    /// Tanh table.
    pub fn tanh(input_scale: f32, input_zero_point: i32, output_scale: f32, output_zero_point: i32) -> Self {
        Self::populate(f32::tanh, input_scale, input_zero_point, output_scale, output_zero_point)
    }

    /// Logistic table.
    pub fn logistic(input_scale: f32, input_zero_point: i32, output_scale: f32, output_zero_point: i32) -> Self {
        Self::populate(
            |x| 1.0 / (1.0 + (-x).exp()),
            input_scale,
            input_zero_point,
            output_scale,
            output_zero_point,
        )
    }

    #[inline]
    pub fn get(&self, x: i8) -> i8 {
        self.table[usize::from(x as u8)]
    }
}

impl std::fmt::Debug for Lut256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lut256")
            .field("min", &self.get(i8::MIN))
            .field("zero", &self.get(0))
            .field("max", &self.get(i8::MAX))
            .finish()
    }
}

/// Maps every element through `lut`.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn lut_s8(lut: &Lut256, input: &TensorView<'_, i8>, output: &mut TensorViewMut<'_, i8>) -> Result<(), KernelError> {
    validate::same_dims("lut_s8", input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = lut.get(x);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_standard_quantization() {
        // Output scale 1/256 with zero point -128 spans [0, 1).
        let lut = Lut256::logistic(1.0 / 16.0, 0, 1.0 / 256.0, -128);
        let x = [i8::MIN, 0, i8::MAX];
        let mut y = [0i8; 3];
        lut_s8(&lut, &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
        assert_eq!(y, [-128, 0, 127]);
    }

    #[test]
    fn test_tanh_is_odd() {
        let lut = Lut256::tanh(1.0 / 32.0, 0, 1.0 / 128.0, 0);
        for v in -127i8..=127 {
            assert_eq!(lut.get(v), -lut.get(-v), "{v}");
        }
        assert_eq!(lut.get(32), 97);
    }

    #[test]
    fn test_identity_transform_with_zero_points() {
        let lut = Lut256::populate(|x| x, 0.5, 10, 0.5, -10);
        assert_eq!(lut.get(10), -10);
        assert_eq!(lut.get(127), 107);
        assert_eq!(lut.get(-128), -128);
    }
}
