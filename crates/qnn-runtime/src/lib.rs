// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # qnn-runtime
//!
//! The thin layer a graph interpreter drives the kernels through.
//!
//! The runtime takes:
//! - A [`RuntimeConfig`] naming the backend and the scratch budget.
//! - Kernel calls from `qnn-kernels`, each with the scratch size its
//!   `*_get_buffer_size` companion reported.
//!
//! And runs them pass by pass on one [`InferenceSession`], lending each
//! kernel a borrowed view of the session's arena and recording per-kernel
//! timing, scratch usage and status.
//!
//! # Scoping
//! ```text
//! InferenceSession ─▶ Pass<'_> ─▶ Scratch<'_> (one per kernel call)
//! ```
//! Each level borrows the one above mutably, so a scratch view can never
//! outlive its kernel call and two passes can never share the arena at once.

mod config;
mod error;
mod metrics;
mod session;

pub use config::RuntimeConfig;
pub use error::RuntimeError;
pub use metrics::{KernelMetrics, PassMetrics};
pub use session::{InferenceSession, Pass};
