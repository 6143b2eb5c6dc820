// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-point arithmetic shared by every kernel.
//!
//! All rounding here is round-half-away-from-zero and every backend goes
//! through these functions (or reproduces them bit for bit), so results do
//! not depend on which backend ran the kernel.
//!
//! Q-format notation: `Qm.n` is a signed value with `m` integer bits and `n`
//! fractional bits; a plain multiplier is Q0.31.

/// Saturating rounding doubling high multiply: `round(a * b / 2^31)`.
///
/// The single overflowing case `i32::MIN * i32::MIN` saturates to
/// `i32::MAX`.
#[inline]
pub fn doubling_high_mult(m1: i32, m2: i32) -> i32 {
    if m1 == m2 && m1 == i32::MIN {
        return i32::MAX;
    }
    let nudge: i64 = if (m1 < 0) ^ (m2 < 0) {
        1 - (1 << 30)
    } else {
        1 << 30
    };
    let prod = nudge + i64::from(m1) * i64::from(m2);
    (prod / (1i64 << 31)) as i32
}

/// Doubling high multiply without the saturation case, rounding with a
/// positive nudge.
#[inline]
pub fn doubling_high_mult_no_sat(m1: i32, m2: i32) -> i32 {
    (((1i64 << 30) + i64::from(m1) * i64::from(m2)) >> 31) as i32
}

/// Divides by `2^exponent`, rounding half away from zero.
///
/// `exponent` must lie in `0..=31`.
#[inline]
pub fn divide_by_pow2(dividend: i32, exponent: i32) -> i32 {
    debug_assert!((0..=31).contains(&exponent));
    let mask = ((1i64 << exponent) - 1) as i32;
    let remainder = mask & dividend;
    let mut result = dividend >> exponent;
    let mut threshold = mask >> 1;
    if result < 0 {
        threshold += 1;
    }
    if remainder > threshold {
        result += 1;
    }
    result
}

/// Saturating multiply by `2^exp` for `exp` in `0..=31`.
#[inline]
pub fn mult_by_pow2(val: i32, exp: i32) -> i32 {
    debug_assert!((0..=31).contains(&exp));
    let thresh = ((1i64 << (31 - exp)) - 1) as i32;
    if val > thresh {
        i32::MAX
    } else if val < -thresh {
        i32::MIN
    } else {
        val.wrapping_shl(exp as u32)
    }
}

/// Rescales `val` by a Q31 `multiplier` and a power-of-two `shift`.
///
/// Positive shifts are applied as a left shift before the multiply, negative
/// shifts as a rounding right shift after it. This is the requantization
/// step of every kernel.
///
/// # Examples
/// ```
/// use qnn_core::fixed_point::requantize;
/// // (1 << 30, 1) encodes a scale of exactly 1.0.
/// assert_eq!(requantize(-77, 1 << 30, 1), -77);
/// // (1 << 30, -1) encodes 0.25.
/// assert_eq!(requantize(100, 1 << 30, -1), 25);
/// ```
#[inline]
pub fn requantize(val: i32, multiplier: i32, shift: i32) -> i32 {
    let left = shift.max(0);
    let right = (-shift).max(0);
    divide_by_pow2(
        doubling_high_mult_no_sat(val.wrapping_mul(1i32.wrapping_shl(left as u32)), multiplier),
        right,
    )
}

/// Rescales a 64-bit accumulator with a 16-bit reduced multiplier.
///
/// `reduced_multiplier` comes from [`reduce_multiplier_q15`]. Used by int16
/// kernels whose bias and accumulators are 64-bit.
#[inline]
pub fn requantize_s64(val: i64, reduced_multiplier: i32, shift: i32) -> i32 {
    let new_val = val.wrapping_mul(i64::from(reduced_multiplier));
    let s = 14 - shift;
    let shifted = if s >= 0 {
        new_val >> s.min(63)
    } else {
        new_val.wrapping_shl((-s) as u32)
    };
    (shifted as i32).wrapping_add(1) >> 1
}

/// Reduces a Q31 multiplier to Q15 with rounding, saturating at `0x7FFF`.
#[inline]
pub fn reduce_multiplier_q15(multiplier: i32) -> i32 {
    if multiplier < 0x7FFF_0000 {
        (multiplier + (1 << 15)) >> 16
    } else {
        0x7FFF
    }
}

/// `exp(val)` for `val ≤ 0` given in Q5.26, returned in Q0.31.
///
/// Evaluates a polynomial on `[-1/4, 0)` and multiplies in the constants
/// `exp(-2^k / 4)` for every set bit of the remaining whole quarters.
pub fn exp_on_negative_values(val: i32) -> i32 {
    const SHIFT: i32 = 24;
    let val_mod_minus_quarter = (val & ((1 << SHIFT) - 1)) - (1 << SHIFT);
    let remainder = val_mod_minus_quarter.wrapping_sub(val);
    let x = (val_mod_minus_quarter << 5) + (1 << 28);
    let x2 = doubling_high_mult(x, x);

    let inner = divide_by_pow2(doubling_high_mult(x2, x2), 2).wrapping_add(doubling_high_mult(x2, x));
    let poly = divide_by_pow2(doubling_high_mult(inner, 715_827_883).wrapping_add(x2), 1);
    let mut result = 1_895_147_668i32.wrapping_add(doubling_high_mult(1_895_147_668, x.wrapping_add(poly)));

    const BARREL: [i32; 7] = [
        1_672_461_947,
        1_302_514_674,
        790_015_084,
        290_630_308,
        39_332_535,
        720_401,
        242,
    ];
    for (i, &factor) in BARREL.iter().enumerate() {
        if remainder & (1 << (SHIFT + i as i32)) != 0 {
            result = doubling_high_mult(result, factor);
        }
    }

    if val == 0 {
        i32::MAX
    } else {
        result
    }
}

/// `1 / (1 + x)` for `x` in `[0, 1)` given in Q0.31, returned in Q0.31.
///
/// Three Newton-Raphson steps from a linear initial guess.
pub fn one_over_one_plus_x_for_x_in_0_1(val: i32) -> i32 {
    let sum = i64::from(val) + i64::from(i32::MAX);
    let half_denominator = ((sum + if sum >= 0 { 1 } else { -1 }) / 2) as i32;
    let mut x = 1_515_870_810i32.wrapping_add(doubling_high_mult(half_denominator, -1_010_580_540));

    const ONE_Q29: i32 = 1 << 29;
    for _ in 0..3 {
        let err = ONE_Q29.wrapping_sub(doubling_high_mult(half_denominator, x));
        x = x.wrapping_add(mult_by_pow2(doubling_high_mult(x, err), 2));
    }

    mult_by_pow2(x, 1)
}

// ── 16-bit helpers (hard-swish) ───────────────────────────────

/// `round(a * b / 2^15)` on int16 operands, saturating `MIN * MIN`.
#[inline]
pub fn saturating_rounding_doubling_high_mul_i16(a: i16, b: i16) -> i16 {
    if a == b && a == i16::MIN {
        return i16::MAX;
    }
    let ab = i32::from(a) * i32::from(b);
    let nudge = if ab >= 0 { 1 << 14 } else { 1 - (1 << 14) };
    ((ab + nudge) / (1 << 15)) as i16
}

/// `trunc(a * b / 2^15)` on int16 operands, saturating `MIN * MIN`.
#[inline]
pub fn saturating_doubling_high_mul_i16(a: i16, b: i16) -> i16 {
    if a == b && a == i16::MIN {
        return i16::MAX;
    }
    ((i32::from(a) * i32::from(b)) / (1 << 15)) as i16
}

/// Rounding right shift of an int16 value, ties away from zero.
#[inline]
pub fn rounding_divide_by_pot_i16(x: i16, exponent: i32) -> i16 {
    let x = i32::from(x);
    let mask = (1i32 << exponent) - 1;
    let remainder = x & mask;
    let threshold = (mask >> 1) + i32::from(x < 0);
    ((x >> exponent) + i32::from(remainder > threshold)) as i16
}

/// `x * 2^amount`, saturated to the int16 range.
#[inline]
pub fn saturating_left_shift_i16(x: i16, amount: i32) -> i16 {
    (i32::from(x) << amount).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
