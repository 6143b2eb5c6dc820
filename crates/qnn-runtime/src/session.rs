// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inference sessions and the passes they scope.
//!
//! ```text
//! InferenceSession::new(config)
//!     │  .begin_pass()
//!     ▼
//! Pass<'_>  ── .invoke(name, scratch_bytes, kernel) ──▶ kernel(backend, &mut Scratch)
//!     │  .finish()
//!     ▼
//! PassMetrics
//! ```
//!
//! A [`Pass`] borrows its session mutably, so only one pass runs at a time
//! and every kernel in it sees the same arena. Each `invoke` lends a fresh
//! scratch view that lives exactly as long as the kernel call.

use crate::{KernelMetrics, PassMetrics, RuntimeConfig, RuntimeError};
use qnn_core::{Backend, KernelError, Status};
use scratch_arena::{ArenaStats, Scratch, ScratchArena};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Owns the scratch arena and the resolved backend for a sequence of
/// inference passes.
///
/// # Example
/// ```
/// use qnn_core::{TensorView, TensorViewMut};
/// use qnn_kernels::activation::relu_s8;
/// use qnn_kernels::convert::RequantParams;
/// use qnn_runtime::{InferenceSession, RuntimeConfig};
///
/// let mut session = InferenceSession::new(RuntimeConfig::default()).unwrap();
/// let x = [-3i8, 4];
/// let mut y = [0i8; 2];
/// let mut pass = session.begin_pass();
/// pass.invoke("relu", 0, |_, _| {
///     relu_s8(&RequantParams::identity(), &TensorView::vector(&x), &mut TensorViewMut::vector(&mut y))
/// })
/// .unwrap();
/// let metrics = pass.finish();
/// assert_eq!(metrics.kernel_metrics.len(), 1);
/// assert_eq!(y, [0, 4]);
/// ```
#[derive(Debug)]
pub struct InferenceSession {
    config: RuntimeConfig,
    backend: Backend,
    arena: ScratchArena,
    passes: usize,
}

impl InferenceSession {
    /// Resolves the backend and budget and creates an empty arena.
    ///
    /// # Errors
    /// Returns [`RuntimeError::ConfigError`] for an unknown backend or an
    /// unparsable budget.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        let backend = config.resolve_backend()?;
        let budget = config.parse_budget()?;
        info!(backend = backend.as_str(), budget = %budget, "session created");
        Ok(Self {
            config,
            backend,
            arena: ScratchArena::new(budget),
            passes: 0,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Usage counters of the session's arena.
    pub fn arena_stats(&self) -> &ArenaStats {
        self.arena.stats()
    }

    /// Current arena size in bytes.
    pub fn arena_capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Number of passes that reached [`Pass::finish`].
    pub fn passes_completed(&self) -> usize {
        self.passes
    }

    /// Grows the arena up front, typically to the largest
    /// `*_get_buffer_size` of the graph, so that no pass has to.
    ///
    /// # Errors
    /// Returns [`RuntimeError::Arena`] if `bytes` exceeds the budget.
    pub fn reserve(&mut self, bytes: usize) -> Result<(), RuntimeError> {
        self.arena.reserve(bytes)?;
        debug!(bytes, capacity = self.arena.capacity(), "arena reserved");
        Ok(())
    }

    /// Starts a pass. The session stays borrowed until the pass finishes or
    /// is dropped.
    pub fn begin_pass(&mut self) -> Pass<'_> {
        let index = self.passes;
        debug!(pass = index, "pass started");
        Pass {
            session: self,
            metrics: PassMetrics::new(index),
            start: Instant::now(),
        }
    }
}

/// One inference pass over a session.
#[derive(Debug)]
pub struct Pass<'s> {
    session: &'s mut InferenceSession,
    metrics: PassMetrics,
    start: Instant,
}

impl Pass<'_> {
    pub fn backend(&self) -> Backend {
        self.session.backend
    }

    /// Runs one kernel with a scratch view of `scratch_bytes`.
    ///
    /// The arena grows first if it is smaller than `scratch_bytes`. The
    /// kernel's status and timing are recorded when profiling is enabled,
    /// whether or not it succeeds.
    ///
    /// # Errors
    /// Returns [`RuntimeError::Arena`] if the scratch would exceed the
    /// budget, and [`RuntimeError::Kernel`] carrying the kernel's own error
    /// if it fails.
    pub fn invoke<T, F>(&mut self, name: &str, scratch_bytes: usize, kernel: F) -> Result<T, RuntimeError>
    where
        F: FnOnce(Backend, &mut Scratch<'_>) -> Result<T, KernelError>,
    {
        let backend = self.session.backend;
        let mut scratch = self.session.arena.scratch_for(scratch_bytes).map_err(|e| {
            warn!(kernel = name, scratch_bytes, error = %e, "scratch reservation failed");
            RuntimeError::from(e)
        })?;

        let start = Instant::now();
        let result = kernel(backend, &mut scratch);
        let duration = start.elapsed();
        let used = scratch.used();
        drop(scratch);

        let status = Status::of(&result);
        debug!(
            kernel = name,
            backend = backend.as_str(),
            scratch = used,
            micros = duration.as_micros() as u64,
            status = status.as_str(),
            "kernel finished"
        );
        if self.session.config.enable_profiling {
            self.metrics.record_kernel(KernelMetrics {
                kernel_name: name.to_string(),
                backend,
                scratch_bytes: used,
                duration,
                status,
            });
        }

        result.map_err(|source| {
            warn!(kernel = name, error = %source, "kernel failed");
            RuntimeError::Kernel {
                kernel: name.to_string(),
                source,
            }
        })
    }

    /// Ends the pass and returns its metrics.
    pub fn finish(mut self) -> PassMetrics {
        self.metrics.finalise(self.start.elapsed());
        self.session.passes += 1;
        info!("{}", self.metrics.summary());
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(budget: &str) -> InferenceSession {
        InferenceSession::new(RuntimeConfig {
            backend: "scalar".into(),
            scratch_budget: budget.into(),
            enable_profiling: true,
        })
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_backend() {
        let err = InferenceSession::new(RuntimeConfig {
            backend: "npu".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, RuntimeError::ConfigError(_)));
    }

    #[test]
    fn test_invoke_grows_arena_and_records_usage() {
        let mut s = session("4K");
        let mut pass = s.begin_pass();
        let sum = pass
            .invoke("take", 256, |backend, scratch| {
                assert_eq!(backend, Backend::Scalar);
                let buf: &mut [i32] = scratch.take(16).map_err(|e| e.for_op("take"))?;
                Ok(buf.len())
            })
            .unwrap();
        assert_eq!(sum, 16);
        let m = pass.finish();
        assert_eq!(m.peak_scratch_bytes, 64);
        assert_eq!(m.kernel_metrics[0].status, Status::Success);

        assert_eq!(s.passes_completed(), 1);
        assert!(s.arena_capacity() >= 256);
        assert_eq!(s.arena_stats().views_issued, 1);
    }

    #[test]
    fn test_invoke_over_budget() {
        let mut s = session("1K");
        let mut pass = s.begin_pass();
        let err = pass.invoke("big", 4096, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, RuntimeError::Arena(_)));
        // Nothing ran, so nothing was recorded.
        assert!(pass.finish().kernel_metrics.is_empty());
    }

    #[test]
    fn test_kernel_error_is_wrapped_and_recorded() {
        let mut s = session("1K");
        let mut pass = s.begin_pass();
        let err = pass
            .invoke("short", 8, |_, scratch| {
                scratch.take::<i32>(4).map_err(|e| e.for_op("short"))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Kernel {
                source: KernelError::ScratchTooSmall { .. },
                ..
            }
        ));
        let m = pass.finish();
        assert_eq!(m.failed_kernels, 1);
        assert_eq!(m.kernel_metrics[0].status, Status::ArgError);
    }

    #[test]
    fn test_profiling_disabled() {
        let mut s = InferenceSession::new(RuntimeConfig {
            enable_profiling: false,
            ..Default::default()
        })
        .unwrap();
        let mut pass = s.begin_pass();
        pass.invoke("noop", 0, |_, _| Ok(())).unwrap();
        assert!(pass.finish().kernel_metrics.is_empty());
    }

    #[test]
    fn test_reserve_respects_budget() {
        let mut s = session("2K");
        s.reserve(1024).unwrap();
        assert!(s.arena_capacity() >= 1024);
        assert!(matches!(s.reserve(4096), Err(RuntimeError::Arena(_))));
    }
}
