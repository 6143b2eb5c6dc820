// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Mean, sum and max reductions over an axis mask.

mod max_op;
mod mean_op;
mod strategy;

pub use max_op::{reduce_max_s16, reduce_max_s16_with_strategy, reduce_max_s8, reduce_max_s8_with_strategy};
pub use mean_op::{
    mean_s16, mean_s16_with_strategy, mean_s8, mean_s8_with_strategy, reduce_sum_s16, reduce_sum_s8, ReduceParams,
};
pub use strategy::{reduce_get_buffer_size, ReduceStrategy};
