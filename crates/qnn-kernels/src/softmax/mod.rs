// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax along the innermost axis.

mod softmax_s16_op;
mod softmax_s8_op;

pub use softmax_s16_op::{softmax_s16, SoftmaxLutS16, SoftmaxS16Params};
pub use softmax_s8_op::{softmax_s8, softmax_s8_s16, SoftmaxParams};
