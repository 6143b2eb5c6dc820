// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # Scratch Arena
//!
//! Caller-owned scratch memory for quantized kernels.
//!
//! Kernels in this workspace never allocate. Anything they need beyond
//! their input and output tensors (im2col columns, accumulator planes,
//! softmax row buffers) is carved out of a [`Scratch`] view the caller
//! passes in. Each kernel publishes a `*_get_buffer_size` function so the
//! caller can size the view ahead of time.
//!
//! ## Components
//!
//! - [`ScratchArena`]: owns one buffer bounded by an [`ArenaBudget`]
//! - [`Scratch`]: a borrowed, bump-allocated view handing out typed regions
//! - [`ArenaStats`]: usage counters collected as views are dropped
//!
//! ## Example
//!
//! ```
//! use scratch_arena::{ArenaBudget, ScratchArena};
//!
//! let mut arena = ScratchArena::new(ArenaBudget::from_kb(4));
//! let mut scratch = arena.scratch_for(256).unwrap();
//! let col: &mut [i16] = scratch.take(64).unwrap();
//! assert_eq!(col.len(), 64);
//! ```

mod arena;
mod budget;
mod error;
mod scratch;
mod stats;

pub use arena::ScratchArena;
pub use budget::ArenaBudget;
pub use error::ArenaError;
pub use scratch::Scratch;
pub use stats::ArenaStats;
