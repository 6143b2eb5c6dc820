// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # qnn-kernels
//!
//! Bit-exact int8/int16 quantized kernels for NHWC tensors.
//!
//! Every kernel takes caller-owned [`TensorView`](qnn_core::TensorView)s,
//! validates all arguments before writing, and either fills its output
//! completely or returns a [`KernelError`](qnn_core::KernelError). Kernels
//! that need temporary memory document a `*_get_buffer_size` companion and
//! borrow a [`Scratch`](scratch_arena::Scratch) from the caller's arena.
//!
//! Results are identical on [`Backend::Scalar`](qnn_core::Backend) and
//! [`Backend::Lanes`](qnn_core::Backend); the lane backend only changes how
//! inner rows are walked.
//!
//! ## Modules
//! - [`elementwise`]: add, mul, compare, min/max with broadcasting.
//! - [`reduce`]: mean, sum and max over an axis mask.
//! - [`conv`]: convolution family, depthwise, transpose and the wrapper.
//! - [`fully_connected`]: dense layers.
//! - [`pooling`]: average and max pooling.
//! - [`activation`]: ReLU family, hard-swish, tanh/logistic, lookup tables.
//! - [`softmax`]: int8 and int16 softmax.
//! - [`structural`]: pad, strided slice, concat/split, transpose.
//! - [`convert`]: quantize, dequantize and requantize.

pub mod activation;
pub mod conv;
pub mod convert;
pub mod elementwise;
pub mod fully_connected;
pub mod pooling;
pub mod reduce;
pub mod softmax;
pub mod structural;

mod lanes;
mod validate;
