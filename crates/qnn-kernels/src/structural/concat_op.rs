// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concatenation, split, pack and unpack along one axis.
//!
//! Along `axis` a tensor is `outer` blocks of `extent * inner` contiguous
//! elements, where `outer` multiplies the dims before the axis and `inner`
//! those after it. Concatenation interleaves each input's blocks into the
//! output; split is its inverse.

use qnn_core::{Axis, Dims, KernelError, TensorView, TensorViewMut};

/// Checks that `part` matches `whole` on every axis except `axis`.
fn check_part(op: &'static str, part: &Dims, whole: &Dims, axis: Axis) -> Result<(), KernelError> {
    if part.with(axis, whole.get(axis)) != *whole {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: whole.with(axis, part.get(axis)),
            rhs: *part,
        });
    }
    Ok(())
}

fn check_total(op: &'static str, total: usize, whole: &Dims, axis: Axis) -> Result<(), KernelError> {
    if total != whole.get(axis) {
        return Err(KernelError::invalid(
            op,
            format!("parts add up to {total} along {axis:?} but the whole tensor {whole} has {}", whole.get(axis)),
        ));
    }
    Ok(())
}

/// Copies `input` into `output` starting at `offset` along `axis`.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if the tensors differ off the
/// axis and [`KernelError::InvalidArgument`] if the input does not fit at
/// `offset`.
pub fn concatenate_at<T: Copy>(
    input: &TensorView<'_, T>,
    axis: Axis,
    offset: usize,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    const OP: &str = "concatenate_at";
    let (id, od) = (input.dims(), output.dims());
    check_part(OP, &id, &od, axis)?;
    if offset + id.get(axis) > od.get(axis) {
        return Err(KernelError::invalid(
            OP,
            format!("{} elements at offset {offset} overrun {} along {axis:?}", id.get(axis), od.get(axis)),
        ));
    }
    let inner = od.inner_size(axis);
    let block = id.get(axis) * inner;
    let out_block = od.get(axis) * inner;
    let start = offset * inner;
    if block == 0 {
        return Ok(());
    }
    let out = output.data_mut();
    for (o, src) in input.data().chunks_exact(block).enumerate() {
        let at = o * out_block + start;
        out[at..at + block].copy_from_slice(src);
    }
    Ok(())
}

/// Concatenates `inputs` along `axis` in order.
///
/// # Errors
/// Returns [`KernelError::ShapeMismatch`] if an input differs from the
/// output off the axis and [`KernelError::InvalidArgument`] if the extents
/// along the axis do not add up to the output's.
pub fn concatenate<T: Copy>(
    inputs: &[TensorView<'_, T>],
    axis: Axis,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    const OP: &str = "concatenate";
    let od = output.dims();
    for input in inputs {
        check_part(OP, &input.dims(), &od, axis)?;
    }
    check_total(OP, inputs.iter().map(|t| t.dims().get(axis)).sum(), &od, axis)?;
    let mut offset = 0;
    for input in inputs {
        concatenate_at(input, axis, offset, output)?;
        offset += input.dims().get(axis);
    }
    Ok(())
}

/// Distributes `input` along `axis` among `outputs` in order.
///
/// # Errors
/// As [`concatenate`], with the roles of input and outputs swapped.
pub fn split<T: Copy>(
    input: &TensorView<'_, T>,
    axis: Axis,
    outputs: &mut [TensorViewMut<'_, T>],
) -> Result<(), KernelError> {
    const OP: &str = "split";
    let id = input.dims();
    for output in outputs.iter() {
        check_part(OP, &output.dims(), &id, axis)?;
    }
    check_total(OP, outputs.iter().map(|t| t.dims().get(axis)).sum(), &id, axis)?;

    let inner = id.inner_size(axis);
    let in_block = id.get(axis) * inner;
    let x = input.data();
    let mut start = 0;
    for output in outputs.iter_mut() {
        let block = output.dims().get(axis) * inner;
        if block > 0 {
            for (o, dst) in output.data_mut().chunks_exact_mut(block).enumerate() {
                let at = o * in_block + start;
                dst.copy_from_slice(&x[at..at + block]);
            }
        }
        start += block;
    }
    Ok(())
}

/// Fills in the one `-1` entry of a split's `sizes` so they add up to
/// `total`.
///
/// # Errors
/// Returns [`KernelError::InvalidArgument`] for more than one `-1`, any
/// other negative size, or sizes that cannot add up to `total`.
///
/// # Examples
/// ```
/// use qnn_kernels::structural::resolve_split_sizes;
///
/// let mut sizes = [2, -1, 3];
/// resolve_split_sizes(10, &mut sizes).unwrap();
/// assert_eq!(sizes, [2, 5, 3]);
/// ```
pub fn resolve_split_sizes(total: usize, sizes: &mut [i64]) -> Result<(), KernelError> {
    const OP: &str = "resolve_split_sizes";
    let mut inferred = None;
    let mut known = 0i64;
    for (i, &s) in sizes.iter().enumerate() {
        match s {
            -1 if inferred.is_none() => inferred = Some(i),
            -1 => return Err(KernelError::invalid(OP, "more than one size is -1")),
            s if s < 0 => return Err(KernelError::invalid(OP, format!("negative size {s}"))),
            s => known += s,
        }
    }
    let total = total as i64;
    match inferred {
        Some(i) if known <= total => sizes[i] = total - known,
        None if known == total => {}
        _ => {
            return Err(KernelError::invalid(
                OP,
                format!("sizes add up to {known}, not {total}"),
            ))
        }
    }
    Ok(())
}

fn check_unit(op: &'static str, dims: &Dims, axis: Axis) -> Result<(), KernelError> {
    if dims.get(axis) != 1 {
        return Err(KernelError::ShapeMismatch {
            op,
            lhs: dims.with(axis, 1),
            rhs: *dims,
        });
    }
    Ok(())
}

/// Stacks `inputs`, each of extent 1 along `axis`, into `output`.
///
/// # Errors
/// As [`concatenate`], plus [`KernelError::ShapeMismatch`] for an input
/// whose extent along the axis is not 1.
pub fn pack<T: Copy>(
    inputs: &[TensorView<'_, T>],
    axis: Axis,
    output: &mut TensorViewMut<'_, T>,
) -> Result<(), KernelError> {
    for input in inputs {
        check_unit("pack", &input.dims(), axis)?;
    }
    concatenate(inputs, axis, output)
}

/// Unstacks `input` along `axis` into `outputs` of extent 1 each.
///
/// # Errors
/// As [`split`], plus [`KernelError::ShapeMismatch`] for an output whose
/// extent along the axis is not 1.
pub fn unpack<T: Copy>(
    input: &TensorView<'_, T>,
    axis: Axis,
    outputs: &mut [TensorViewMut<'_, T>],
) -> Result<(), KernelError> {
    for output in outputs.iter() {
        check_unit("unpack", &output.dims(), axis)?;
    }
    split(input, axis, outputs)
}
