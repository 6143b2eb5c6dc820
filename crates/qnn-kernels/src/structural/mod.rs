// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Data-movement kernels. They never requantize, so they are generic over
//! the element type.

mod concat_op;
mod pad_op;
mod strided_slice_op;
mod transpose_op;

pub use concat_op::{concatenate, concatenate_at, pack, resolve_split_sizes, split, unpack};
pub use pad_op::pad;
pub use strided_slice_op::{strided_slice, strided_slice_general, SliceStrategy, StridedSliceParams};
pub use transpose_op::transpose;
