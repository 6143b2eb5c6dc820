// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Constant padding.

use qnn_core::{Dims, KernelError, TensorView, TensorViewMut};

use crate::validate;

/// Copies `input` into the interior of `output`, filling a border of
/// `pre` elements before and `post` elements after along every axis with
/// `fill`.
///
/// `fill` is already in the output's quantized domain. The output must be
/// exactly `pre + input + post` on each axis.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the output dims are not the
/// padded input dims.
///
/// # Examples
/// ```
/// use qnn_core::{Dims, TensorView, TensorViewMut};
/// use qnn_kernels::structural::pad;
///
/// let x = [1i8, 2];
/// let mut y = [0i8; 5];
/// pad(
///     &TensorView::vector(&x),
///     Dims::new(0, 0, 0, 1),
///     Dims::new(0, 0, 0, 2),
///     -1,
///     &mut TensorViewMut::vector(&mut y),
/// )
/// .unwrap();
/// assert_eq!(y, [-1, 1, 2, -1, -1]);
/// ```
pub fn pad<T: Copy>(
    input: &TensorView<'_, T>,
    pre: Dims,
    post: Dims,
    fill: T,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    let id = input.dims();
    let (i, a, b) = (id.as_array(), pre.as_array(), post.as_array());
    let expected = Dims::from_array(std::array::from_fn(|k| a[k] + i[k] + b[k]));
    let od = output.dims();
    validate::same_dims("pad", expected, od)?;

    let x = input.data();
    let out = output.data_mut();
    let [batch_len, row_len, px_len, _] = od.strides();

    // Whole batches of border first, then rows, then pixels.
    out[..pre.n * batch_len].fill(fill);
    out[(pre.n + id.n) * batch_len..].fill(fill);
    for n in 0..id.n {
        let batch = &mut out[(pre.n + n) * batch_len..(pre.n + n + 1) * batch_len];
        batch[..pre.h * row_len].fill(fill);
        batch[(pre.h + id.h) * row_len..].fill(fill);
        for h in 0..id.h {
            let row = &mut batch[(pre.h + h) * row_len..(pre.h + h + 1) * row_len];
            row[..pre.w * px_len].fill(fill);
            row[(pre.w + id.w) * px_len..].fill(fill);
            for w in 0..id.w {
                let px = &mut row[(pre.w + w) * px_len..(pre.w + w + 1) * px_len];
                px[..pre.c].fill(fill);
                px[pre.c + id.c..].fill(fill);
                let src = id.offset(n, h, w, 0);
                px[pre.c..pre.c + id.c].copy_from_slice(&x[src..src + id.c]);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_every_axis() {
        let id = Dims::new(1, 1, 2, 1);
        let x = [5i16, 6];
        let pre = Dims::new(1, 1, 0, 0);
        let post = Dims::new(0, 0, 1, 1);
        let od = Dims::new(2, 2, 3, 2);
        let mut y = vec![0i16; od.num_elements()];
        pad(&TensorView::new(id, &x).unwrap(), pre, post, 9, &mut TensorViewMut::new(od, &mut y).unwrap()).unwrap();
        let mut expected = vec![9i16; od.num_elements()];
        expected[od.offset(1, 1, 0, 0)] = 5;
        expected[od.offset(1, 1, 1, 0)] = 6;
        assert_eq!(y, expected);
    }

    #[test]
    fn test_zero_padding_is_a_copy() {
        let id = Dims::new(2, 2, 2, 2);
        let x: Vec<i8> = (0..16).collect();
        let mut y = vec![0i8; 16];
        let zero = Dims::new(0, 0, 0, 0);
        pad(&TensorView::new(id, &x).unwrap(), zero, zero, 0, &mut TensorViewMut::new(id, &mut y).unwrap()).unwrap();
        assert_eq!(x, y);
    }

    #[test]
    fn test_output_shape_checked() {
        let x = [0i8; 2];
        let mut y = [0i8; 4];
        let err = pad(
            &TensorView::vector(&x),
            Dims::new(0, 0, 0, 1),
            Dims::new(0, 0, 0, 0),
            0,
            &mut TensorViewMut::vector(&mut y),
        )
        .unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
    }
}
