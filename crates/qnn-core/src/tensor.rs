// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Borrowed, typed tensor views.
//!
//! Kernels never own tensor memory. The caller keeps its buffers and hands
//! the kernel a [`TensorView`] for each input and a [`TensorViewMut`] for the
//! output. Construction checks that the buffer length matches the dims, which
//! is the only thing the rest of the kernel code relies on.

use crate::{Dims, KernelError};

/// An immutable view over a caller-owned NHWC buffer.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a, T> {
    dims: Dims,
    data: &'a [T],
}

impl<'a, T> TensorView<'a, T> {
    /// Wraps `data` as a tensor of the given dims.
    ///
    /// # Errors
    /// Returns [`KernelError::BufferSizeMismatch`] if `data.len()` differs from
    /// `dims.num_elements()`.
    pub fn new(dims: Dims, data: &'a [T]) -> Result<Self, KernelError> {
        if data.len() != dims.num_elements() {
            return Err(KernelError::BufferSizeMismatch {
                op: "tensor_view",
                dims,
                expected: dims.num_elements(),
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Wraps a flat slice as a `[1, 1, 1, len]` vector.
    pub fn vector(data: &'a [T]) -> Self {
        Self {
            dims: Dims::vector(data.len()),
            data,
        }
    }

    /// Returns the dims.
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Returns the flat data.
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A mutable view over a caller-owned output buffer.
#[derive(Debug)]
pub struct TensorViewMut<'a, T> {
    dims: Dims,
    data: &'a mut [T],
}

impl<'a, T> TensorViewMut<'a, T> {
    /// Wraps `data` as a tensor of the given dims.
    ///
    /// # Errors
    /// Returns [`KernelError::BufferSizeMismatch`] if `data.len()` differs from
    /// `dims.num_elements()`.
    pub fn new(dims: Dims, data: &'a mut [T]) -> Result<Self, KernelError> {
        if data.len() != dims.num_elements() {
            return Err(KernelError::BufferSizeMismatch {
                op: "tensor_view_mut",
                dims,
                expected: dims.num_elements(),
                actual: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Wraps a flat slice as a `[1, 1, 1, len]` vector.
    pub fn vector(data: &'a mut [T]) -> Self {
        Self {
            dims: Dims::vector(data.len()),
            data,
        }
    }

    /// Returns the dims.
    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Returns the flat data.
    pub fn data(&self) -> &[T] {
        &*self.data
    }

    /// Returns the flat data mutably.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reborrows as an immutable view.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView {
            dims: self.dims,
            data: &*self.data,
        }
    }

    /// Reborrows mutably for a shorter lifetime.
    pub fn reborrow(&mut self) -> TensorViewMut<'_, T> {
        TensorViewMut {
            dims: self.dims,
            data: &mut *self.data,
        }
    }
}
