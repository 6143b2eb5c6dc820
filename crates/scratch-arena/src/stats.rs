// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scratch usage statistics.

/// Counters describing how kernels have used an arena.
///
/// Updated when a [`Scratch`](crate::Scratch) view borrowed from the arena is
/// dropped, so the numbers reflect whole kernel invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Number of scratch views handed out.
    pub views_issued: u64,
    /// Largest number of bytes any single view consumed.
    pub peak_used_bytes: usize,
    /// Sum of bytes consumed over all views.
    pub cumulative_used_bytes: u64,
    /// Number of `take` calls that failed for lack of room.
    pub exhausted_count: u64,
    /// Number of times the backing buffer was grown.
    pub reservations: u64,
}

impl ArenaStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one finished scratch view.
    pub fn record_view(&mut self, used: usize) {
        self.views_issued += 1;
        self.cumulative_used_bytes += used as u64;
        self.peak_used_bytes = self.peak_used_bytes.max(used);
    }

    pub fn record_exhausted(&mut self) {
        self.exhausted_count += 1;
    }

    pub fn record_reservation(&mut self) {
        self.reservations += 1;
    }

    /// Mean bytes consumed per view.
    pub fn average_used_bytes(&self) -> f64 {
        if self.views_issued == 0 {
            0.0
        } else {
            self.cumulative_used_bytes as f64 / self.views_issued as f64
        }
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "views={} peak={}B avg={:.1}B exhausted={} reservations={}",
            self.views_issued,
            self.peak_used_bytes,
            self.average_used_bytes(),
            self.exhausted_count,
            self.reservations
        )
    }
}
