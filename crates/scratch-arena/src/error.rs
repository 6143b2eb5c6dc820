// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the scratch arena.

use qnn_core::KernelError;

/// Errors raised while sizing or carving scratch memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// A scratch view ran out of room for a requested region.
    #[error("scratch exhausted: requested {requested} bytes, {available} available")]
    Exhausted { requested: usize, available: usize },

    /// Growing the arena would exceed its budget.
    #[error("scratch budget exceeded: requested {requested} bytes, budget is {budget} bytes")]
    BudgetExceeded { requested: usize, budget: usize },

    /// A budget string could not be parsed.
    #[error("invalid scratch budget: {0}")]
    InvalidBudget(String),
}

impl ArenaError {
    /// Converts into the kernel error reported by `op`.
    ///
    /// A scratch shortfall is an argument error from the kernel's point of
    /// view: the caller sized the buffer wrong.
    pub fn for_op(self, op: &'static str) -> KernelError {
        match self {
            ArenaError::Exhausted {
                requested,
                available,
            } => KernelError::ScratchTooSmall {
                op,
                required: requested,
                available,
            },
            other => KernelError::invalid(op, other.to_string()),
        }
    }
}
