// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types and the status taxonomy for kernel calls.

use crate::{DType, Dims};

/// Errors that can occur when invoking a kernel.
///
/// Every variant is raised before the kernel writes to its output, so an
/// `Err` never leaves a partially written buffer behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// A buffer length does not match the element count of its dims.
    #[error("{op}: buffer holds {actual} elements but dims {dims} require {expected}")]
    BufferSizeMismatch {
        op: &'static str,
        dims: Dims,
        expected: usize,
        actual: usize,
    },

    /// Two tensors have dims that the operation cannot combine.
    #[error("{op}: incompatible dims {lhs} and {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Dims,
        rhs: Dims,
    },

    /// A channel count is not evenly divisible as the operation requires.
    #[error("{op}: {channels} channels are not divisible by {divisor}")]
    ChannelDivisibility {
        op: &'static str,
        channels: usize,
        divisor: usize,
    },

    /// A parameter value is outside the range the kernel accepts.
    #[error("{op}: invalid argument: {detail}")]
    InvalidArgument { op: &'static str, detail: String },

    /// The scratch buffer handed to the kernel is too small.
    #[error("{op}: scratch buffer too small: need {required} bytes, {available} available")]
    ScratchTooSmall {
        op: &'static str,
        required: usize,
        available: usize,
    },

    /// The kernel does not support the given element type.
    #[error("{op}: unsupported dtype {dtype}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// The requested variant is not available on the selected backend.
    #[error("{op}: not implemented for the {backend} backend")]
    NotImplemented {
        op: &'static str,
        backend: &'static str,
    },
}

impl KernelError {
    /// Shorthand for [`KernelError::InvalidArgument`].
    pub fn invalid(op: &'static str, detail: impl Into<String>) -> Self {
        KernelError::InvalidArgument {
            op,
            detail: detail.into(),
        }
    }

    /// Maps this error onto the closed status taxonomy.
    pub fn status(&self) -> Status {
        match self {
            KernelError::NotImplemented { .. } => Status::NoImplError,
            _ => Status::ArgError,
        }
    }
}

/// Closed status code returned to the graph interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Status {
    /// The kernel ran to completion and wrote its output.
    Success,
    /// An argument was rejected; nothing was written.
    ArgError,
    /// The variant is compiled out for this backend; pick another one.
    NoImplError,
}

impl Status {
    /// Collapses a kernel result into its status code.
    pub fn of<T>(result: &Result<T, KernelError>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }

    /// Returns a human-readable label.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::ArgError => "arg-error",
            Status::NoImplError => "no-impl-error",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let e = KernelError::invalid("pad", "negative pad");
        assert_eq!(e.status(), Status::ArgError);

        let e = KernelError::NotImplemented {
            op: "depthwise_conv_weight_sum",
            backend: "scalar",
        };
        assert_eq!(e.status(), Status::NoImplError);
    }

    #[test]
    fn test_status_of_result() {
        let ok: Result<(), KernelError> = Ok(());
        assert_eq!(Status::of(&ok), Status::Success);

        let err: Result<(), KernelError> = Err(KernelError::ChannelDivisibility {
            op: "depthwise_conv_s8",
            channels: 5,
            divisor: 2,
        });
        assert_eq!(Status::of(&err), Status::ArgError);
    }

    #[test]
    fn test_display() {
        let e = KernelError::ShapeMismatch {
            op: "add_s8",
            lhs: Dims::new(1, 2, 3, 4),
            rhs: Dims::new(1, 3, 3, 4),
        };
        let msg = e.to_string();
        assert!(msg.contains("add_s8"));
        assert!(msg.contains("[1, 2, 3, 4]"));
    }
}
