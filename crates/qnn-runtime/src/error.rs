// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.

use qnn_core::{KernelError, Status};
use scratch_arena::ArenaError;

/// Errors that can occur while running kernels through a session.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// A kernel rejected its arguments or is unavailable on the backend.
    #[error("kernel '{kernel}' failed: {source}")]
    Kernel {
        kernel: String,
        #[source]
        source: KernelError,
    },

    /// The scratch arena could not be sized for a kernel.
    #[error("scratch arena error: {0}")]
    Arena(#[from] ArenaError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl RuntimeError {
    /// Maps onto the kernel status taxonomy. Everything that is not a
    /// backend gap is an argument error.
    pub fn status(&self) -> Status {
        match self {
            RuntimeError::Kernel { source, .. } => source.status(),
            _ => Status::ArgError,
        }
    }
}
