// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary elementwise kernels with NHWC broadcasting.

mod add_op;
mod broadcast;
mod compare_op;
mod minmax_op;
mod mul_op;

pub use add_op::{add_s16, add_s16_with_strategy, add_s8, add_s8_with_strategy, AddParams};
pub use broadcast::{BroadcastStrategy, OperandQuant};
pub use compare_op::{compare_s16, compare_s8, CompareParams, ComparisonOp};
pub use minmax_op::{maximum_s16, maximum_s8, minimum_s16, minimum_s8};
pub use mul_op::{mul_s16, mul_s8, MulParams};
