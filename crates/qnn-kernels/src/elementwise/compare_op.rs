// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantized comparisons.
//!
//! The operands may carry different quantizations, so both are rescaled to
//! a common scale before comparing, the same way addition rescales them.

use super::broadcast::{self, BroadcastStrategy, OperandQuant};
use crate::validate;
use qnn_core::{KernelError, QuantElem, QuantParams, TensorView, TensorViewMut};

/// The six comparison relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

impl ComparisonOp {
    #[inline]
    fn eval(self, a: i32, b: i32) -> bool {
        match self {
            ComparisonOp::Equal => a == b,
            ComparisonOp::NotEqual => a != b,
            ComparisonOp::Greater => a > b,
            ComparisonOp::GreaterEqual => a >= b,
            ComparisonOp::Less => a < b,
            ComparisonOp::LessEqual => a <= b,
        }
    }
}

/// Per-operand rescale to the common comparison scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareParams {
    pub lhs: OperandQuant,
    pub rhs: OperandQuant,
    pub left_shift: i32,
}

impl CompareParams {
    /// Headroom used by [`CompareParams::from_scales`].
    pub const LEFT_SHIFT: i32 = 8;

    /// Operands already in the same quantization: raw comparison.
    pub fn same_scale() -> Self {
        Self {
            lhs: OperandQuant::new(0, QuantParams::identity()),
            rhs: OperandQuant::new(0, QuantParams::identity()),
            left_shift: 0,
        }
    }

    /// Prepares the rescale from each operand's real scale and zero point.
    pub fn from_scales(lhs: (f32, i32), rhs: (f32, i32)) -> Result<Self, KernelError> {
        if !(lhs.0 > 0.0 && rhs.0 > 0.0) {
            return Err(KernelError::invalid("compare_params", "scales must be positive"));
        }
        let twice_max = 2.0 * f64::from(lhs.0.max(rhs.0));
        Ok(Self {
            lhs: OperandQuant::new(-lhs.1, QuantParams::from_real(f64::from(lhs.0) / twice_max)),
            rhs: OperandQuant::new(-rhs.1, QuantParams::from_real(f64::from(rhs.0) / twice_max)),
            left_shift: Self::LEFT_SHIFT,
        })
    }
}

/// Compares two int8 tensors elementwise with broadcasting.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the operands do not broadcast
/// to `output`'s dims.
pub fn compare_s8(
    op: ComparisonOp,
    lhs: &TensorView<'_, i8>,
    rhs: &TensorView<'_, i8>,
    params: &CompareParams,
    output: &mut TensorViewMut<'_, bool>,
) -> Result<(), KernelError> {
    compare("compare_s8", op, lhs, rhs, params, output)
}

/// Compares two int16 tensors elementwise with broadcasting.
pub fn compare_s16(
    op: ComparisonOp,
    lhs: &TensorView<'_, i16>,
    rhs: &TensorView<'_, i16>,
    params: &CompareParams,
    output: &mut TensorViewMut<'_, bool>,
) -> Result<(), KernelError> {
    compare("compare_s16", op, lhs, rhs, params, output)
}

fn compare<T: QuantElem>(
    name: &'static str,
    op: ComparisonOp,
    lhs: &TensorView<'_, T>,
    rhs: &TensorView<'_, T>,
    params: &CompareParams,
    output: &mut TensorViewMut<'_, bool>,
) -> Result<(), KernelError> {
    let strategy = BroadcastStrategy::plan(&lhs.dims(), &rhs.dims());
    broadcast::check(name, strategy, lhs.dims(), rhs.dims(), output.dims())?;
    validate::in_range(name, "left shift", params.left_shift, 0, 30)?;

    let p = *params;
    let scale = move |x: T, q: OperandQuant| {
        q.quant
            .apply((x.to_i32() + q.offset).wrapping_shl(p.left_shift as u32))
    };
    let dims = output.dims();
    broadcast::apply(name, strategy, lhs, rhs, output.data_mut(), dims, |a, b| {
        op.eval(scale(a, p.lhs), scale(b, p.rhs))
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Dims;

    fn run(op: ComparisonOp, a: &[i8], b: &[i8], params: &CompareParams) -> Vec<bool> {
        let mut out = vec![false; a.len()];
        compare_s8(
            op,
            &TensorView::vector(a),
            &TensorView::vector(b),
            params,
            &mut TensorViewMut::vector(&mut out),
        )
        .unwrap();
        out
    }

    #[test]
    fn test_all_relations() {
        let a = [1i8, 2, 3];
        let b = [2i8, 2, 2];
        let p = CompareParams::same_scale();
        assert_eq!(run(ComparisonOp::Equal, &a, &b, &p), [false, true, false]);
        assert_eq!(run(ComparisonOp::NotEqual, &a, &b, &p), [true, false, true]);
        assert_eq!(run(ComparisonOp::Greater, &a, &b, &p), [false, false, true]);
        assert_eq!(run(ComparisonOp::GreaterEqual, &a, &b, &p), [false, true, true]);
        assert_eq!(run(ComparisonOp::Less, &a, &b, &p), [true, false, false]);
        assert_eq!(run(ComparisonOp::LessEqual, &a, &b, &p), [true, true, false]);
    }

    #[test]
    fn test_different_scales() {
        // lhs: scale 0.5, zp 0. rhs: scale 1.0, zp 10. Both hold real 2.0.
        let p = CompareParams::from_scales((0.5, 0), (1.0, 10)).unwrap();
        let eq = run(ComparisonOp::Equal, &[4, 4], &[12, 13], &p);
        assert_eq!(eq, [true, false]);
    }

    #[test]
    fn test_broadcast_s16() {
        let a = [1i16, 5, 9];
        let b = [5i16];
        let mut out = [false; 3];
        compare_s16(
            ComparisonOp::Greater,
            &TensorView::vector(&a),
            &TensorView::new(Dims::scalar(), &b).unwrap(),
            &CompareParams::same_scale(),
            &mut TensorViewMut::vector(&mut out),
        )
        .unwrap();
        assert_eq!(out, [false, false, true]);
    }
}
