// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Axis permutation.

use qnn_core::{Dims, KernelError, TensorView, TensorViewMut};

use crate::validate;

/// Permutes the axes of `input`: output axis `i` is input axis `perm[i]`.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] if `perm` is not a permutation
/// of `0..4` and [`KernelError::ShapeMismatch`] if the output dims are not
/// the permuted input dims.
pub fn transpose<T: Copy>(
    perm: [usize; 4],
    input: &TensorView<'_, T>,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    const OP: &str = "transpose";
    let mut seen = [false; 4];
    for &p in &perm {
        if p >= 4 || std::mem::replace(&mut seen[p], true) {
            return Err(KernelError::invalid(OP, format!("{perm:?} is not a permutation of 0..4")));
        }
    }
    let id = input.dims();
    let dims = id.as_array();
    let od = output.dims();
    validate::same_dims(OP, Dims::from_array(perm.map(|p| dims[p])), od)?;

    let in_strides = id.strides();
    let s = perm.map(|p| in_strides[p]);
    let x = input.data();
    let mut out = output.data_mut().iter_mut();
    for n in 0..od.n {
        for h in 0..od.h {
            for w in 0..od.w {
                let base = n * s[0] + h * s[1] + w * s[2];
                for c in 0..od.c {
                    if let Some(slot) = out.next() {
                        *slot = x[base + c * s[3]];
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nhwc_to_nchw() {
        // Two pixels of three channels become three planes of two pixels.
        let x = [1i8, 2, 3, 4, 5, 6];
        let mut y = [0i8; 6];
        transpose(
            [0, 3, 1, 2],
            &TensorView::new(Dims::new(1, 1, 2, 3), &x).unwrap(),
            &mut TensorViewMut::new(Dims::new(1, 3, 1, 2), &mut y).unwrap(),
        )
        .unwrap();
        assert_eq!(y, [1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_inverse_permutation_round_trips() {
        let id = Dims::new(2, 3, 4, 5);
        let x: Vec<i16> = (0..120).collect();
        let perm = [2, 0, 3, 1];
        let inverse = [1, 3, 0, 2];
        let mid = Dims::new(4, 2, 5, 3);
        let mut t = vec![0i16; 120];
        let mut back = vec![0i16; 120];
        transpose(perm, &TensorView::new(id, &x).unwrap(), &mut TensorViewMut::new(mid, &mut t).unwrap()).unwrap();
        transpose(inverse, &TensorView::new(mid, &t).unwrap(), &mut TensorViewMut::new(id, &mut back).unwrap()).unwrap();
        assert_eq!(x, back);
    }

    #[test]
    fn test_rejects_repeated_axis() {
        let x = [0i8; 1];
        let mut y = [0i8; 1];
        let err = transpose(
            [0, 0, 1, 2],
            &TensorView::new(Dims::scalar(), &x).unwrap(),
            &mut TensorViewMut::new(Dims::scalar(), &mut y).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }
}
