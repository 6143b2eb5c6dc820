// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Convolution kernels: standard (im2col), 1×1, unit-output, depthwise,
//! transpose, and the selecting wrapper.

mod convolve_op;
mod convolve_s16_op;
mod depthwise_op;
mod im2col;
mod params;
mod pointwise_op;
mod transpose_op;
mod unit_output_op;
mod weight_sum;
mod wrapper;

pub use convolve_op::{convolve_s8, convolve_s8_get_buffer_size};
pub use convolve_s16_op::{convolve_s16, convolve_s16_get_buffer_size};
pub use depthwise_op::{depthwise_conv_s16, depthwise_conv_s8};
pub use params::{conv_output_extent, ConvParams};
pub use pointwise_op::{convolve_1x1_s8, convolve_1x1_s8_fast, convolve_1x1_s8_get_buffer_size};
pub use transpose_op::{transpose_conv_s8, transpose_conv_s8_get_buffer_size};
pub use unit_output_op::convolve_unit_output_s8;
pub use weight_sum::{depthwise_conv_s8_folded, depthwise_conv_weight_sum, depthwise_conv_weight_sum_size};
pub use wrapper::{convolve_wrapper_s8, convolve_wrapper_s8_get_buffer_size, ConvVariant};
