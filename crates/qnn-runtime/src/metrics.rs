// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-kernel and per-pass profiling metrics.

use crate::RuntimeError;
use qnn_core::{Backend, Status};
use std::time::Duration;

/// Metrics for a single kernel invocation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct KernelMetrics {
    /// Name the caller gave the invocation.
    pub kernel_name: String,
    pub backend: Backend,
    /// Scratch bytes the kernel actually consumed.
    pub scratch_bytes: usize,
    /// Time spent inside the kernel.
    pub duration: Duration,
    pub status: Status,
}

/// Aggregate metrics for one inference pass.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PassMetrics {
    /// Zero-based index of the pass within its session.
    pub pass_index: usize,
    /// Wall-clock time from `begin_pass` to `finish`.
    pub total_duration: Duration,
    /// Sum of the kernel durations.
    pub total_kernel_duration: Duration,
    /// Largest scratch consumption of any kernel in the pass.
    pub peak_scratch_bytes: usize,
    /// Number of kernels that did not return `Success`.
    pub failed_kernels: usize,
    pub kernel_metrics: Vec<KernelMetrics>,
}

impl PassMetrics {
    /// Creates an empty metrics container.
    pub fn new(pass_index: usize) -> Self {
        Self {
            pass_index,
            total_duration: Duration::ZERO,
            total_kernel_duration: Duration::ZERO,
            peak_scratch_bytes: 0,
            failed_kernels: 0,
            kernel_metrics: Vec::new(),
        }
    }

    /// Records metrics for a single kernel.
    pub fn record_kernel(&mut self, metrics: KernelMetrics) {
        self.total_kernel_duration += metrics.duration;
        self.peak_scratch_bytes = self.peak_scratch_bytes.max(metrics.scratch_bytes);
        if metrics.status != Status::Success {
            self.failed_kernels += 1;
        }
        self.kernel_metrics.push(metrics);
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Share of the pass spent inside kernels, in percent.
    pub fn kernel_share(&self) -> f64 {
        let total = self.total_duration.as_secs_f64();
        if total <= 0.0 {
            return 0.0;
        }
        (self.total_kernel_duration.as_secs_f64() / total * 100.0).min(100.0)
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Pass {}: {:.3}ms total, {} kernels ({} failed), {:.3}ms in kernels ({:.0}%), peak scratch {} B",
            self.pass_index,
            self.total_duration.as_secs_f64() * 1000.0,
            self.kernel_metrics.len(),
            self.failed_kernels,
            self.total_kernel_duration.as_secs_f64() * 1000.0,
            self.kernel_share(),
            self.peak_scratch_bytes,
        )
    }

    /// Serialises the metrics to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, RuntimeError> {
        serde_json::to_string_pretty(self).map_err(|e| RuntimeError::ConfigError(format!("JSON serialise error: {e}")))
    }
}
