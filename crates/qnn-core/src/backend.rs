// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend selection and the lane-level primitives behind it.
//!
//! Kernels are written once against [`LaneOps`]. Two implementations exist:
//!
//! - [`ScalarOps`]: one element at a time, the reference.
//! - [`Lanes16`]: processes 16-element chunks with per-lane accumulators
//!   and a scalar tail, the shape a 128-bit SIMD unit executes. The chunked
//!   loops are written so the compiler can vectorise them.
//!
//! Both produce bit-identical results for every input. Integer sums wrap
//! modulo 2^32 in both, so reassociating a sum across lanes cannot change
//! the answer.

use crate::{ActivationRange, QuantParams};
use std::fmt;
use std::str::FromStr;

/// Number of lanes processed per chunk by [`Lanes16`].
pub const LANES: usize = 16;

/// Which implementation of [`LaneOps`] a kernel should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Portable element-at-a-time reference.
    Scalar,
    /// 16-lane chunked implementation.
    Lanes,
}

impl Backend {
    /// The backend this build prefers: `Lanes` when the `lanes` feature is
    /// enabled, `Scalar` otherwise.
    pub fn detect() -> Self {
        if cfg!(feature = "lanes") {
            Backend::Lanes
        } else {
            Backend::Scalar
        }
    }

    /// Returns the primitive implementation for this backend.
    pub fn ops(self) -> &'static dyn LaneOps {
        match self {
            Backend::Scalar => &ScalarOps,
            Backend::Lanes => &Lanes16,
        }
    }

    /// Whether kernels that consume precomputed per-channel weight sums are
    /// available. Only the lane backend carries them.
    pub fn supports_weight_sum(self) -> bool {
        matches!(self, Backend::Lanes)
    }

    /// Returns a human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Scalar => "scalar",
            Backend::Lanes => "lanes",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scalar" => Ok(Backend::Scalar),
            "lanes" | "simd" => Ok(Backend::Lanes),
            other => Err(format!("unknown backend '{other}'; expected 'scalar' or 'lanes'")),
        }
    }
}

/// Row-level primitives the kernels are built from.
///
/// Every method must return the same value on every implementation.
pub trait LaneOps: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Wrapping sum of `xs`.
    fn sum_i8(&self, xs: &[i8]) -> i32;

    /// Wrapping sum of `xs`.
    fn sum_i16(&self, xs: &[i16]) -> i32;

    /// Maximum of `xs`, `i8::MIN` when empty.
    fn max_i8(&self, xs: &[i8]) -> i8;

    /// Maximum of `xs`, `i16::MIN` when empty.
    fn max_i16(&self, xs: &[i16]) -> i16;

    /// `acc[i] += row[i]`.
    fn accumulate_i8(&self, acc: &mut [i32], row: &[i8]);

    /// `acc[i] += row[i]`.
    fn accumulate_i16(&self, acc: &mut [i32], row: &[i16]);

    /// `acc[i] = max(acc[i], row[i])`.
    fn max_assign_i8(&self, acc: &mut [i8], row: &[i8]);

    /// `acc[i] = max(acc[i], row[i])`.
    fn max_assign_i16(&self, acc: &mut [i16], row: &[i16]);

    /// `Σ (lhs[i] + lhs_offset) * rhs[i]`, wrapping.
    fn dot_i8_offset(&self, lhs: &[i8], rhs: &[i8], lhs_offset: i32) -> i32;

    /// `Σ lhs[i] * rhs[i]`, wrapping.
    fn dot_i16_i8(&self, lhs: &[i16], rhs: &[i8]) -> i64;

    /// `out[i] = clamp(requantize(acc[i]) + offset)`.
    fn requantize_i32_to_i8(
        &self,
        acc: &[i32],
        out: &mut [i8],
        quant: QuantParams,
        offset: i32,
        range: ActivationRange,
    );
}

// ── Scalar ─────────────────────────────────────────────────────

/// Element-at-a-time reference implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarOps;

impl LaneOps for ScalarOps {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn sum_i8(&self, xs: &[i8]) -> i32 {
        xs.iter().fold(0i32, |a, &x| a.wrapping_add(i32::from(x)))
    }

    fn sum_i16(&self, xs: &[i16]) -> i32 {
        xs.iter().fold(0i32, |a, &x| a.wrapping_add(i32::from(x)))
    }

    fn max_i8(&self, xs: &[i8]) -> i8 {
        xs.iter().copied().fold(i8::MIN, i8::max)
    }

    fn max_i16(&self, xs: &[i16]) -> i16 {
        xs.iter().copied().fold(i16::MIN, i16::max)
    }

    fn accumulate_i8(&self, acc: &mut [i32], row: &[i8]) {
        for (a, &x) in acc.iter_mut().zip(row) {
            *a = a.wrapping_add(i32::from(x));
        }
    }

    fn accumulate_i16(&self, acc: &mut [i32], row: &[i16]) {
        for (a, &x) in acc.iter_mut().zip(row) {
            *a = a.wrapping_add(i32::from(x));
        }
    }

    fn max_assign_i8(&self, acc: &mut [i8], row: &[i8]) {
        for (a, &x) in acc.iter_mut().zip(row) {
            *a = (*a).max(x);
        }
    }

    fn max_assign_i16(&self, acc: &mut [i16], row: &[i16]) {
        for (a, &x) in acc.iter_mut().zip(row) {
            *a = (*a).max(x);
        }
    }

    fn dot_i8_offset(&self, lhs: &[i8], rhs: &[i8], lhs_offset: i32) -> i32 {
        lhs.iter().zip(rhs).fold(0i32, |a, (&l, &r)| {
            a.wrapping_add((i32::from(l) + lhs_offset).wrapping_mul(i32::from(r)))
        })
    }

    fn dot_i16_i8(&self, lhs: &[i16], rhs: &[i8]) -> i64 {
        lhs.iter()
            .zip(rhs)
            .fold(0i64, |a, (&l, &r)| a.wrapping_add(i64::from(l) * i64::from(r)))
    }

    fn requantize_i32_to_i8(
        &self,
        acc: &[i32],
        out: &mut [i8],
        quant: QuantParams,
        offset: i32,
        range: ActivationRange,
    ) {
        for (o, &a) in out.iter_mut().zip(acc) {
            *o = range.clamp(quant.apply(a).wrapping_add(offset)) as i8;
        }
    }
}

// ── 16 lanes ───────────────────────────────────────────────────

/// Chunked implementation: full 16-element chunks go through per-lane
/// accumulators, the remainder through the scalar path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lanes16;

#[inline]
fn horizontal_sum(lanes: &[i32; LANES]) -> i32 {
    lanes.iter().fold(0i32, |a, &x| a.wrapping_add(x))
}

impl LaneOps for Lanes16 {
    fn name(&self) -> &'static str {
        "lanes16"
    }

    fn sum_i8(&self, xs: &[i8]) -> i32 {
        let mut lanes = [0i32; LANES];
        let chunks = xs.chunks_exact(LANES);
        let tail = chunks.remainder();
        for chunk in chunks {
            for (l, &x) in lanes.iter_mut().zip(chunk) {
                *l = l.wrapping_add(i32::from(x));
            }
        }
        horizontal_sum(&lanes).wrapping_add(ScalarOps.sum_i8(tail))
    }

    fn sum_i16(&self, xs: &[i16]) -> i32 {
        let mut lanes = [0i32; LANES];
        let chunks = xs.chunks_exact(LANES);
        let tail = chunks.remainder();
        for chunk in chunks {
            for (l, &x) in lanes.iter_mut().zip(chunk) {
                *l = l.wrapping_add(i32::from(x));
            }
        }
        horizontal_sum(&lanes).wrapping_add(ScalarOps.sum_i16(tail))
    }

    fn max_i8(&self, xs: &[i8]) -> i8 {
        let mut lanes = [i8::MIN; LANES];
        let chunks = xs.chunks_exact(LANES);
        let tail = chunks.remainder();
        for chunk in chunks {
            for (l, &x) in lanes.iter_mut().zip(chunk) {
                *l = (*l).max(x);
            }
        }
        ScalarOps.max_i8(&lanes).max(ScalarOps.max_i8(tail))
    }

    fn max_i16(&self, xs: &[i16]) -> i16 {
        let mut lanes = [i16::MIN; LANES];
        let chunks = xs.chunks_exact(LANES);
        let tail = chunks.remainder();
        for chunk in chunks {
            for (l, &x) in lanes.iter_mut().zip(chunk) {
                *l = (*l).max(x);
            }
        }
        ScalarOps.max_i16(&lanes).max(ScalarOps.max_i16(tail))
    }

    fn accumulate_i8(&self, acc: &mut [i32], row: &[i8]) {
        let n = acc.len().min(row.len());
        let split = n - n % LANES;
        for (a, r) in acc[..split]
            .chunks_exact_mut(LANES)
            .zip(row[..split].chunks_exact(LANES))
        {
            for (a, &x) in a.iter_mut().zip(r) {
                *a = a.wrapping_add(i32::from(x));
            }
        }
        ScalarOps.accumulate_i8(&mut acc[split..n], &row[split..n]);
    }

    fn accumulate_i16(&self, acc: &mut [i32], row: &[i16]) {
        let n = acc.len().min(row.len());
        let split = n - n % LANES;
        for (a, r) in acc[..split]
            .chunks_exact_mut(LANES)
            .zip(row[..split].chunks_exact(LANES))
        {
            for (a, &x) in a.iter_mut().zip(r) {
                *a = a.wrapping_add(i32::from(x));
            }
        }
        ScalarOps.accumulate_i16(&mut acc[split..n], &row[split..n]);
    }

    fn max_assign_i8(&self, acc: &mut [i8], row: &[i8]) {
        let n = acc.len().min(row.len());
        let split = n - n % LANES;
        for (a, r) in acc[..split]
            .chunks_exact_mut(LANES)
            .zip(row[..split].chunks_exact(LANES))
        {
            for (a, &x) in a.iter_mut().zip(r) {
                *a = (*a).max(x);
            }
        }
        ScalarOps.max_assign_i8(&mut acc[split..n], &row[split..n]);
    }

    fn max_assign_i16(&self, acc: &mut [i16], row: &[i16]) {
        let n = acc.len().min(row.len());
        let split = n - n % LANES;
        for (a, r) in acc[..split]
            .chunks_exact_mut(LANES)
            .zip(row[..split].chunks_exact(LANES))
        {
            for (a, &x) in a.iter_mut().zip(r) {
                *a = (*a).max(x);
            }
        }
        ScalarOps.max_assign_i16(&mut acc[split..n], &row[split..n]);
    }

    fn dot_i8_offset(&self, lhs: &[i8], rhs: &[i8], lhs_offset: i32) -> i32 {
        // Σ (l + off) * r = Σ l * r + off * Σ r, evaluated lane-wise.
        let n = lhs.len().min(rhs.len());
        let mut dot = [0i32; LANES];
        let mut rsum = [0i32; LANES];
        let split = n - n % LANES;
        for (l, r) in lhs[..split]
            .chunks_exact(LANES)
            .zip(rhs[..split].chunks_exact(LANES))
        {
            for i in 0..LANES {
                let rv = i32::from(r[i]);
                dot[i] = dot[i].wrapping_add(i32::from(l[i]).wrapping_mul(rv));
                rsum[i] = rsum[i].wrapping_add(rv);
            }
        }
        let head = horizontal_sum(&dot).wrapping_add(lhs_offset.wrapping_mul(horizontal_sum(&rsum)));
        head.wrapping_add(ScalarOps.dot_i8_offset(&lhs[split..n], &rhs[split..n], lhs_offset))
    }

    fn dot_i16_i8(&self, lhs: &[i16], rhs: &[i8]) -> i64 {
        let n = lhs.len().min(rhs.len());
        let mut lanes = [0i64; LANES];
        let split = n - n % LANES;
        for (l, r) in lhs[..split]
            .chunks_exact(LANES)
            .zip(rhs[..split].chunks_exact(LANES))
        {
            for i in 0..LANES {
                lanes[i] = lanes[i].wrapping_add(i64::from(l[i]) * i64::from(r[i]));
            }
        }
        let head = lanes.iter().fold(0i64, |a, &x| a.wrapping_add(x));
        head.wrapping_add(ScalarOps.dot_i16_i8(&lhs[split..n], &rhs[split..n]))
    }

    fn requantize_i32_to_i8(
        &self,
        acc: &[i32],
        out: &mut [i8],
        quant: QuantParams,
        offset: i32,
        range: ActivationRange,
    ) {
        let n = acc.len().min(out.len());
        let split = n - n % LANES;
        for (o, a) in out[..split]
            .chunks_exact_mut(LANES)
            .zip(acc[..split].chunks_exact(LANES))
        {
            let mut lanes = [0i32; LANES];
            for (l, &v) in lanes.iter_mut().zip(a) {
                *l = quant.apply(v).wrapping_add(offset);
            }
            for (o, l) in o.iter_mut().zip(lanes) {
                *o = range.clamp(l) as i8;
            }
        }
        ScalarOps.requantize_i32_to_i8(&acc[split..n], &mut out[split..n], quant, offset, range);
    }
}
