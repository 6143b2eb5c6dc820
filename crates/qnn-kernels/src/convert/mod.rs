// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Quantize, dequantize and requantize converters.

mod quantize_op;
mod requantize_op;

pub use quantize_op::{
    dequantize_s16_f16, dequantize_s16_f32, dequantize_s8_f16, dequantize_s8_f32, quantize_f16_s16, quantize_f16_s8,
    quantize_f32_s16, quantize_f32_s8, AffineQuant,
};
pub use requantize_op::{requantize, RequantParams};
