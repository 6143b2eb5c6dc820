// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # qnn-core
//!
//! Data model and fixed-point arithmetic for quantized int8/int16 tensor
//! kernels.
//!
//! This crate provides:
//! - [`Dims`], [`Axis`], [`AxisMask`]: NHWC shape descriptors, broadcast
//!   resolution and flatten-suffix detection.
//! - [`TensorView`] / [`TensorViewMut`]: borrowed, length-checked views over
//!   caller-owned buffers.
//! - [`fixed_point`]: the requantize primitive and the Q-format helpers
//!   every kernel builds on.
//! - [`quant`]: turning real-valued scale ratios into multiplier/shift pairs.
//! - [`Backend`] / [`LaneOps`]: interchangeable scalar and 16-lane row
//!   primitives.
//! - [`KernelError`] / [`Status`]: the error taxonomy shared by all kernels.
//!
//! # Design Goals
//! - Bit-exact results regardless of backend.
//! - No heap allocation in anything a kernel calls.
//! - Clean error types via `thiserror`.

mod backend;
mod dims;
mod dtype;
mod error;
pub mod fixed_point;
mod params;
pub mod quant;
mod tensor;

pub use backend::{Backend, LaneOps, Lanes16, ScalarOps, LANES};
pub use dims::{Axis, AxisMask, Dims};
pub use dtype::{DType, QuantElem};
pub use error::{KernelError, Status};
pub use params::{ActivationRange, Tile};
pub use quant::{PerChannelQuant, QuantParams};
pub use tensor::{TensorView, TensorViewMut};
