// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Patch gathering for GEMM-based convolution.

use super::params::ConvParams;
use qnn_core::Dims;

/// Fills `col` with the receptive field of output pixel `(n, oh, ow)` for
/// input channels `c0..c0 + col_c`, laid out `[kh][kw][c]` to match a filter
/// row. Taps that fall into the padding are 0; in-bounds values pass
/// through `map`.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn fill_column<T: Copy>(
    col: &mut [i16],
    input: &[T],
    dims: &Dims,
    params: &ConvParams,
    kernel: (usize, usize),
    (n, oh, ow): (usize, usize, usize),
    c0: usize,
    map: impl Fn(T) -> i16,
) {
    let col_c = col.len() / (kernel.0 * kernel.1).max(1);
    let mut chunks = col.chunks_exact_mut(col_c.max(1));
    for kh in 0..kernel.0 {
        let ih = params.tap_h(oh, kh, dims.h);
        for kw in 0..kernel.1 {
            let Some(dst) = chunks.next() else { return };
            match (ih, params.tap_w(ow, kw, dims.w)) {
                (Some(ih), Some(iw)) => {
                    let base = dims.offset(n, ih, iw, c0);
                    for (d, &x) in dst.iter_mut().zip(&input[base..base + col_c]) {
                        *d = map(x);
                    }
                }
                _ => dst.fill(0),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnn_core::Tile;

    #[test]
    fn test_fill_column_with_padding() {
        // 2x2 single-channel input, 3x3 window centred on (0, 0).
        let dims = Dims::new(1, 2, 2, 1);
        let input = [1i8, 2, 3, 4];
        let params = ConvParams::new(10, 0).with_padding(Tile::new(1, 1));
        let mut col = [99i16; 9];
        fill_column(&mut col, &input, &dims, &params, (3, 3), (0, 0, 0), 0, |x| {
            (i32::from(x) + params.input_offset) as i16
        });
        assert_eq!(col, [0, 0, 0, 0, 11, 12, 0, 13, 14]);
    }

    #[test]
    fn test_fill_column_channel_slice() {
        // Second group of a 4-channel input.
        let dims = Dims::new(1, 1, 1, 4);
        let input = [1i16, 2, 3, 4];
        let params = ConvParams::new(0, 0);
        let mut col = [0i16; 2];
        fill_column(&mut col, &input, &dims, &params, (1, 1), (0, 0, 0), 2, |x| x);
        assert_eq!(col, [3, 4]);
    }
}
