// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! int16 softmax through two interpolated lookup tables.
//!
//! Distances below the row maximum are rescaled so that `[-10, 0]` spans
//! the int16 range and looked up in an `exp` table. The row sum is
//! normalised into `[1, 2)` and inverted with a `1 / (1 + x)` table. Both
//! tables have 513 entries: 512 steps plus the right endpoint, so that
//! every index has a successor to interpolate towards.

use once_cell::sync::Lazy;
use qnn_core::fixed_point::requantize;
use qnn_core::quant::quantize_multiplier;
use qnn_core::{Backend, KernelError, TensorView, TensorViewMut};

use crate::lanes::LaneElem;
use crate::validate;

/// Number of interpolation steps in each table.
const STEPS: usize = 512;

/// The `exp` and `1 / (1 + x)` tables.
#[derive(Clone, PartialEq, Eq)]
pub struct SoftmaxLutS16 {
    pub exp: [i16; STEPS + 1],
    pub one_by_one: [i16; STEPS + 1],
}

static SHARED: Lazy<SoftmaxLutS16> = Lazy::new(SoftmaxLutS16::generate);

impl SoftmaxLutS16 {
    /// Builds both tables: `exp` over `[-10, 0]` and `1 / (1 + x)` over
    /// `[0, 1]`, each output scaled by 32768.
    pub fn generate() -> Self {
        let mut exp = [0i16; STEPS + 1];
        let mut one_by_one = [0i16; STEPS + 1];
        tabulate(f32::exp, -10.0, 0.0, &mut exp);
        tabulate(|x| 1.0 / (1.0 + x), 0.0, 1.0, &mut one_by_one);
        Self { exp, one_by_one }
    }

    /// Process-wide tables, built on first use.
    pub fn shared() -> &'static Self {
        &SHARED
    }
}

impl std::fmt::Debug for SoftmaxLutS16 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftmaxLutS16")
            .field("exp", &(self.exp[0], self.exp[STEPS]))
            .field("one_by_one", &(self.one_by_one[0], self.one_by_one[STEPS]))
            .finish()
    }
}

/// Samples `func` at 512 steps over `[min, max]` for an int16 output range
/// of `[-1, 1]`. Each sample is biased by half the interpolation error at
/// its step's midpoint.
fn tabulate(func: impl Fn(f32) -> f32, min: f32, max: f32, lut: &mut [i16; STEPS + 1]) {
    let step = (max - min) / STEPS as f32;
    let half_step = step / 2.0;
    let scaling = 65536.0f32 / 2.0;
    let saturate = |v: f32| v.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16;

    for (i, entry) in lut.iter_mut().take(STEPS).enumerate() {
        let at = min + i as f32 * step;
        let val = func(at);
        let val_midpoint = func(at + half_step);
        let val_next = func(min + (i + 1) as f32 * step);

        let sample = (val * scaling).round();
        let midpoint_interp = ((val_next * scaling + sample) / 2.0).round();
        let midpoint = (val_midpoint * scaling).round();
        let bias = ((midpoint_interp - midpoint) / 2.0).round();
        *entry = saturate(sample - bias);
    }
    lut[STEPS] = saturate((func(max) * scaling).round());
}

/// Linear interpolation in a 513-entry table for an int16 position.
#[inline]
fn lookup(lut: &[i16; STEPS + 1], x: i16) -> i16 {
    let index = (256 + (i32::from(x) >> 7)) as usize;
    let offset = i32::from(x) & 0x7f;
    let base = lut[index];
    let slope = i32::from(lut[index + 1]) - i32::from(base);
    let delta = ((slope * offset + 64) >> 7) as i16;
    base.wrapping_add(delta)
}

/// Rescale of row distances onto the `exp` table's input range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftmaxS16Params {
    pub multiplier: i32,
    pub shift: i32,
}

impl SoftmaxS16Params {
    /// `beta * input_scale`, relative to the table step of `10 / 65535`.
    pub fn from_beta_scale(beta: f32, input_scale: f32) -> Self {
        let real = f64::from(input_scale) * f64::from(beta) / (10.0 / 65535.0);
        let (multiplier, shift) = quantize_multiplier(real);
        Self { multiplier, shift }
    }
}

/// int16 softmax along the innermost axis. The output is Q0.15.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ in shape.
pub fn softmax_s16(
    backend: Backend,
    params: &SoftmaxS16Params,
    lut: &SoftmaxLutS16,
    input: &TensorView<'_, i16>,
    output: &mut TensorViewMut<'_, i16>,
) -> Result<(), KernelError> {
    let dims = input.dims();
    validate::same_dims("softmax_s16", dims, output.dims())?;
    let row = dims.c;
    if row == 0 {
        return Ok(());
    }
    let ops = backend.ops();

    for (x, y) in input.data().chunks_exact(row).zip(output.data_mut().chunks_exact_mut(row)) {
        let max = i32::from(<i16 as LaneElem>::row_max(ops, x));

        // The output row caches the exponentials.
        let mut sum = 0i32;
        for (o, &v) in y.iter_mut().zip(x) {
            let scaled = requantize(i32::from(v) - max, params.multiplier, params.shift);
            let symmetric = scaled
                .wrapping_add(i32::from(i16::MAX))
                .clamp(i16::MIN.into(), i16::MAX.into()) as i16;
            *o = lookup(&lut.exp, symmetric);
            sum = sum.wrapping_add(i32::from(*o));
        }

        let headroom = (sum as u32).leading_zeros() as i32;
        let shifted_sum = ((i64::from(sum) << (headroom - 1).max(0)) + (1 << 13)) >> 14;
        // x = sum - 1 on the table's [0, 1] input, recentred to int16.
        let symmetric_sum = (shifted_sum - 98304) as i16;
        let reciprocal = i32::from(lookup(&lut.one_by_one, symmetric_sum));

        for o in y.iter_mut() {
            let r = (reciprocal * i32::from(*o)) >> (30 - headroom);
            *o = ((r + 1) >> 1) as i16;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_table_endpoints() {
        let lut = SoftmaxLutS16::shared();
        // exp(-10) * 32768 ~ 1.49 and exp(0) saturates.
        assert!((1..=2).contains(&lut.exp[0]));
        assert_eq!(lut.exp[STEPS], i16::MAX);
        assert_eq!(lut.one_by_one[0], i16::MAX);
        assert_eq!(lut.one_by_one[STEPS], 16384);
    }

    #[test]
    fn test_uniform_row_is_a_quarter() {
        let p = SoftmaxS16Params::from_beta_scale(1.0, 1.0 / 1024.0);
        let x = [500i16; 4];
        let mut y = [0i16; 4];
        softmax_s16(
            Backend::Lanes,
            &p,
            SoftmaxLutS16::shared(),
            &TensorView::vector(&x),
            &mut TensorViewMut::vector(&mut y),
        )
        .unwrap();
        for v in y {
            assert!((i32::from(v) - 8192).abs() <= 1, "{v}");
        }
    }

    proptest! {
        #[test]
        fn prop_tracks_float(x in prop::collection::vec(-8000i16..8000, 1..16)) {
            let scale = 1.0f32 / 1024.0;
            let p = SoftmaxS16Params::from_beta_scale(1.0, scale);
            let mut y = vec![0i16; x.len()];
            softmax_s16(Backend::Scalar, &p, SoftmaxLutS16::shared(), &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y)).unwrap();
            let max = f64::from(*x.iter().max().unwrap());
            let e: Vec<f64> = x.iter().map(|&v| ((f64::from(v) - max) * f64::from(scale)).exp()).collect();
            let total: f64 = e.iter().sum();
            for (&got, &ei) in y.iter().zip(&e) {
                let want = ei / total * 32768.0;
                prop_assert!((f64::from(got) - want).abs() <= 64.0, "got={got} want={want}");
            }
        }
    }
}
