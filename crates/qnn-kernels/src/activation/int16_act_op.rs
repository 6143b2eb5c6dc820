// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! int16 tanh and logistic by table interpolation.
//!
//! Both share one 256-entry table of `sigmoid(i / 24)` in unsigned Q16.
//! The input is first scaled so that `±2^17` spans about `±10.7`; the
//! magnitude's high bits then index the table (shift 9 for logistic, 8 for
//! tanh, since `tanh(x) = 2·sigmoid(2x) - 1`), the low bits interpolate
//! linearly, and the sign is folded back in at the end. Indices at or past
//! entry 255 saturate.

use once_cell::sync::Lazy;
use qnn_core::{KernelError, TensorView, TensorViewMut};

use crate::validate;

static SIGMOID_TABLE: Lazy<[u16; 256]> = Lazy::new(|| {
    let mut table = [0u16; 256];
    for (i, t) in table.iter_mut().enumerate() {
        let s = 1.0 / (1.0 + (-(i as f64) / 24.0).exp());
        *t = (65536.0 * s).round().min(65535.0) as u16;
    }
    table
});

/// Rescale from the input's scale onto the table's fixed input scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int16ActivationParams {
    /// 0 means `3 << input_left_shift` with no shift.
    pub input_multiplier: i32,
    pub input_left_shift: i32,
}

impl Int16ActivationParams {
    /// Derives the rescale for an input of the given scale.
    ///
    /// Power-of-two scales of `2^-12` and `2^-11` get the exact form (a zero
    /// multiplier); everything else gets a 15-bit multiplier and a right
    /// shift.
    pub fn from_scale(input_scale: f32) -> Self {
        let log2 = f64::from(input_scale).log2();
        let rounded = log2.round();
        let left_shift = 12 + rounded as i32;
        if (log2 - rounded).abs() < 1e-3 && (left_shift == 0 || left_shift == 1) {
            return Self {
                input_multiplier: 0,
                input_left_shift: left_shift,
            };
        }
        let mut multiplier = f64::from(input_scale) * 4096.0 * 3.0;
        let mut shift = 0;
        while multiplier <= 32767.0 / 2.0 && shift <= 30 {
            shift += 1;
            multiplier *= 2.0;
        }
        Self {
            input_multiplier: multiplier as i32,
            input_left_shift: shift,
        }
    }

    #[inline]
    fn scale(&self, x: i16) -> i32 {
        let (multiplier, shift) = match self.input_multiplier {
            0 => (3 << self.input_left_shift, 0),
            m => (m, self.input_left_shift),
        };
        let round = if shift > 0 { 1 << (shift - 1) } else { 0 };
        (i32::from(x) * multiplier + round) >> shift
    }
}

/// Interpolated `table` lookup of `|x|` with `bits` fractional bits.
#[inline]
fn interpolate(abs: u32, bits: u32, saturated: u32) -> u32 {
    let table = &*SIGMOID_TABLE;
    let index = (abs >> bits) as usize;
    if index >= 255 {
        return saturated;
    }
    let lo = u32::from(table[index]);
    let hi = u32::from(table[index + 1]);
    let frac = abs & ((1 << bits) - 1);
    (lo << bits) + frac * (hi - lo)
}

fn logistic(params: &Int16ActivationParams, x: i16) -> i16 {
    let v = params.scale(x);
    let r = interpolate(v.unsigned_abs(), 9, 0x7FFF << 10) as i32;
    let r = if v >= 0 { r + (1 << 9) } else { (1 << 25) - r + (1 << 9) - 1 };
    (r >> 10).clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

fn tanh(params: &Int16ActivationParams, x: i16) -> i16 {
    let v = params.scale(x);
    let r = interpolate(v.unsigned_abs(), 8, 0xFFFF << 8) as i32;
    let r = if v >= 0 {
        r - (1 << 23) + (1 << 7)
    } else {
        -r + (1 << 23) + (1 << 7) - 1
    };
    (r >> 8).clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

fn map(
    op: &'static str,
    f: fn(&Int16ActivationParams, i16) -> i16,
    params: &Int16ActivationParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    validate::same_dims(op, input.dims(), output.dims())?;
    for (o, &x) in output.data_mut().iter_mut().zip(input.data()) {
        *o = f(params, x);
    }
    Ok(())
}

/// int16 tanh. The output is Q0.15.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn tanh_s16(
    params: &Int16ActivationParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    map("tanh_s16", tanh, params, input, output)
}

/// int16 logistic. The output is Q0.15.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn logistic_s16(
    params: &Int16ActivationParams,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    map("logistic_s16", logistic, params, input, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_endpoints() {
        assert_eq!(SIGMOID_TABLE[0], 32768);
        assert_eq!(SIGMOID_TABLE[24], 47910);
        assert!(SIGMOID_TABLE.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_from_scale() {
        let q3_12 = Int16ActivationParams::from_scale(1.0 / 4096.0);
        assert_eq!(q3_12, Int16ActivationParams { input_multiplier: 0, input_left_shift: 0 });
        let q4_11 = Int16ActivationParams::from_scale(1.0 / 2048.0);
        assert_eq!(q4_11, Int16ActivationParams { input_multiplier: 0, input_left_shift: 1 });
        let odd = Int16ActivationParams::from_scale(1.0 / 3000.0);
        assert_eq!(odd.input_left_shift, 12);
        assert_eq!(odd.input_multiplier, 16777);
    }

    #[test]
    fn test_fixed_points_and_saturation() {
        let p = Int16ActivationParams::from_scale(1.0 / 4096.0);
        assert_eq!(logistic(&p, 0), 16384);
        assert_eq!(tanh(&p, 0), 0);
        assert_eq!(tanh(&p, i16::MAX), 32767);
        assert_eq!(tanh(&p, i16::MIN), -32767);
        // At 1/1000 the full int16 range reaches past the last entry.
        let wide = Int16ActivationParams::from_scale(1.0 / 1000.0);
        assert_eq!(logistic(&wide, i16::MAX), 32767);
        assert_eq!(logistic(&wide, i16::MIN), 1);
        assert_eq!(logistic(&p, 4096), 23955);
        assert_eq!(tanh(&p, 4096), 24957);
    }

    #[test]
    fn test_kernels_map_every_element() {
        let p = Int16ActivationParams::from_scale(1.0 / 4096.0);
        let x = [-4096i16, 0, 4096];
        let mut y = [0i16; 3];
        tanh_s16(&p, &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
        assert_eq!(y, [-24957, 0, 24957]);
        logistic_s16(&p, &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
        assert_eq!(y[1], 16384);
        assert!((i32::from(y[0]) + i32::from(y[2]) - 32768).abs() <= 1);
    }

    proptest! {
        #[test]
        fn prop_tracks_float(x in any::<i16>(), scale in prop::sample::select(vec![1.0f32 / 4096.0, 1.0 / 3000.0, 1.0 / 1000.0])) {
            let p = Int16ActivationParams::from_scale(scale);
            let real = f64::from(scale) * f64::from(x);
            let t = (real.tanh() * 32768.0).clamp(-32768.0, 32767.0);
            let l = ((1.0 / (1.0 + (-real).exp())) * 32768.0).min(32767.0);
            prop_assert!((f64::from(tanh(&p, x)) - t).abs() <= 16.0);
            prop_assert!((f64::from(logistic(&p, x)) - l).abs() <= 16.0);
        }
    }
}
