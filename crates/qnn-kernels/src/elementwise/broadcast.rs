// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Broadcast resolution for binary elementwise kernels.
//!
//! Two NHWC operands combine when, on every axis, their extents match or
//! one of them is 1. [`BroadcastStrategy::plan`] picks the cheapest loop
//! shape for a given pair of dims; every strategy visits the same output
//! elements with the same operand pairs, so any applicable strategy gives
//! the same result.
//!
//! The general sweep walks N and H explicitly and decides per output row
//! whether both rows are contiguous, whether one side is a single value
//! for the whole row, or whether it has to step pixel by pixel. Broadcast
//! axes use a stride of zero, so a broadcasting operand re-reads its
//! segment instead of rewinding a pointer.

use crate::validate;
use qnn_core::{Dims, KernelError, QuantParams, TensorView};
use tracing::trace;

/// Zero point and rescale of one elementwise operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperandQuant {
    /// Added to every raw value before rescaling (the negated zero point).
    pub offset: i32,
    pub quant: QuantParams,
}

impl OperandQuant {
    pub const fn new(offset: i32, quant: QuantParams) -> Self {
        Self { offset, quant }
    }
}

/// Loop shape used to combine two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastStrategy {
    /// Identical dims: one flat loop.
    Flat,
    /// The left operand is a single element.
    ScalarLhs,
    /// The right operand is a single element.
    ScalarRhs,
    /// General N/H/W sweep with per-row fast cases.
    Sweep,
}

impl BroadcastStrategy {
    /// Chooses the cheapest strategy for `lhs` op `rhs`.
    pub fn plan(lhs: &Dims, rhs: &Dims) -> Self {
        if lhs == rhs {
            BroadcastStrategy::Flat
        } else if lhs.num_elements() == 1 {
            BroadcastStrategy::ScalarLhs
        } else if rhs.num_elements() == 1 {
            BroadcastStrategy::ScalarRhs
        } else {
            BroadcastStrategy::Sweep
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastStrategy::Flat => "flat",
            BroadcastStrategy::ScalarLhs => "scalar_lhs",
            BroadcastStrategy::ScalarRhs => "scalar_rhs",
            BroadcastStrategy::Sweep => "sweep",
        }
    }

    fn applies(self, lhs: &Dims, rhs: &Dims) -> bool {
        match self {
            BroadcastStrategy::Flat => lhs == rhs,
            BroadcastStrategy::ScalarLhs => lhs.num_elements() == 1,
            BroadcastStrategy::ScalarRhs => rhs.num_elements() == 1,
            BroadcastStrategy::Sweep => true,
        }
    }
}

/// Checks that the operands broadcast to `out` and that `strategy` can
/// handle them.
pub(crate) fn check(
    op: &'static str,
    strategy: BroadcastStrategy,
    lhs: Dims,
    rhs: Dims,
    out: Dims,
) -> Result<(), KernelError> {
    let expected = lhs
        .broadcast_with(&rhs)
        .ok_or(KernelError::ShapeMismatch { op, lhs, rhs })?;
    validate::same_dims(op, expected, out)?;
    if !strategy.applies(&lhs, &rhs) {
        return Err(KernelError::invalid(
            op,
            format!(
                "strategy {} does not apply to {lhs} and {rhs}",
                strategy.as_str()
            ),
        ));
    }
    Ok(())
}

/// Writes `f(lhs, rhs)` for every output element. Arguments must have
/// passed [`check`].
pub(crate) fn apply<A: Copy, B: Copy, O>(
    op: &'static str,
    strategy: BroadcastStrategy,
    lhs: &TensorView<'_, A>,
    rhs: &TensorView<'_, B>,
    out: &mut [O],
    out_dims: Dims,
    f: impl Fn(A, B) -> O,
) {
    trace!(op, strategy = strategy.as_str(), dims = %out_dims, "elementwise");
    let (l, r) = (lhs.data(), rhs.data());
    match strategy {
        BroadcastStrategy::Flat => {
            for ((o, &a), &b) in out.iter_mut().zip(l).zip(r) {
                *o = f(a, b);
            }
        }
        BroadcastStrategy::ScalarLhs => {
            if let Some(&a) = l.first() {
                broadcast_left(out, a, r, &f);
            }
        }
        BroadcastStrategy::ScalarRhs => {
            if let Some(&b) = r.first() {
                broadcast_right(out, l, b, &f);
            }
        }
        BroadcastStrategy::Sweep => sweep(lhs, rhs, out, out_dims, &f),
    }
}

#[inline]
fn broadcast_left<A: Copy, B: Copy, O>(out: &mut [O], a: A, r: &[B], f: &impl Fn(A, B) -> O) {
    for (o, &b) in out.iter_mut().zip(r) {
        *o = f(a, b);
    }
}

#[inline]
fn broadcast_right<A: Copy, B: Copy, O>(out: &mut [O], l: &[A], b: B, f: &impl Fn(A, B) -> O) {
    for (o, &a) in out.iter_mut().zip(l) {
        *o = f(a, b);
    }
}

fn sweep<A: Copy, B: Copy, O>(
    lhs: &TensorView<'_, A>,
    rhs: &TensorView<'_, B>,
    out: &mut [O],
    od: Dims,
    f: &impl Fn(A, B) -> O,
) {
    let (ld, rd) = (lhs.dims(), rhs.dims());
    let (l, r) = (lhs.data(), rhs.data());
    let (ls, rs) = (ld.broadcast_strides(), rd.broadcast_strides());
    let row = od.w * od.c;
    if row == 0 {
        return;
    }

    let lhs_full = ld.w == od.w && ld.c == od.c;
    let rhs_full = rd.w == od.w && rd.c == od.c;
    let lhs_single = ld.w == 1 && ld.c == 1;
    let rhs_single = rd.w == 1 && rd.c == 1;

    for n in 0..od.n {
        for h in 0..od.h {
            let lo = n * ls[0] + h * ls[1];
            let ro = n * rs[0] + h * rs[1];
            let oo = od.offset(n, h, 0, 0);
            let dst = &mut out[oo..oo + row];

            if lhs_full && rhs_full {
                for ((o, &a), &b) in dst.iter_mut().zip(&l[lo..lo + row]).zip(&r[ro..ro + row]) {
                    *o = f(a, b);
                }
            } else if lhs_single && rhs_full {
                broadcast_left(dst, l[lo], &r[ro..ro + row], f);
            } else if rhs_single && lhs_full {
                broadcast_right(dst, &l[lo..lo + row], r[ro], f);
            } else {
                for (w, px) in dst.chunks_exact_mut(od.c).enumerate() {
                    let lp = lo + w * ls[2];
                    let rp = ro + w * rs[2];
                    if ld.c == rd.c {
                        for ((o, &a), &b) in px.iter_mut().zip(&l[lp..lp + od.c]).zip(&r[rp..rp + od.c]) {
                            *o = f(a, b);
                        }
                    } else if ld.c == 1 {
                        broadcast_left(px, l[lp], &r[rp..rp + od.c], f);
                    } else {
                        broadcast_right(px, &l[lp..lp + od.c], r[rp], f);
                    }
                }
            }
        }
    }
}
