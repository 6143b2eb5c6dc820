// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Argument checks shared by the kernels.
//!
//! Every check runs before a kernel touches its output.

use qnn_core::{Dims, KernelError};

/// Requires `actual == expected`.
pub(crate) fn same_dims(op: &'static str, expected: Dims, actual: Dims) -> Result<(), KernelError> {
    if expected != actual {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: expected,
            rhs: actual,
        });
    }
    Ok(())
}

/// Requires an optional per-channel slice (bias, kernel sums) to hold one
/// entry per output channel.
pub(crate) fn channel_slice<T>(
    op: &'static str,
    what: &str,
    slice: Option<&[T]>,
    channels: usize,
) -> Result<(), KernelError> {
    match slice {
        Some(s) if s.len() != channels => Err(KernelError::invalid(
            op,
            format!("{what} has {} entries for {channels} output channels", s.len()),
        )),
        _ => Ok(()),
    }
}

/// Requires a strictly positive stride, dilation or window extent.
pub(crate) fn positive(op: &'static str, what: &str, v: usize) -> Result<(), KernelError> {
    if v == 0 {
        return Err(KernelError::invalid(op, format!("{what} must be at least 1")));
    }
    Ok(())
}

/// Requires `v` to lie in `[lo, hi]`.
pub(crate) fn in_range(op: &'static str, what: &str, v: i32, lo: i32, hi: i32) -> Result<(), KernelError> {
    if v < lo || v > hi {
        return Err(KernelError::invalid(
            op,
            format!("{what} {v} is outside [{lo}, {hi}]"),
        ));
    }
    Ok(())
}
