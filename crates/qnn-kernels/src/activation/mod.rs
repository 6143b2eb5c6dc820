// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise activation kernels.

mod hard_swish_op;
mod int16_act_op;
mod lut_op;
mod relu_op;

pub use hard_swish_op::{hard_swish_s16, hard_swish_s8, HardSwishParams, HardSwishPreciseParams};
pub use int16_act_op::{logistic_s16, tanh_s16, Int16ActivationParams};
pub use lut_op::{lut_s8, Lut256};
pub use relu_op::{leaky_relu_s16, leaky_relu_s8, relu6_s8, relu_s16, relu_s8, LeakyReluParams};
