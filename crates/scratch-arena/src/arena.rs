// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned scratch arena.

use crate::{ArenaBudget, ArenaError, ArenaStats, Scratch};
use tracing::debug;

/// Owns one scratch buffer sized up front and lends it to kernels.
///
/// Backing storage is a `Vec<u64>` so every view starts 8-byte aligned.
/// The buffer only grows through [`reserve`](Self::reserve), never while a
/// kernel runs.
#[derive(Debug)]
pub struct ScratchArena {
    words: Vec<u64>,
    budget: ArenaBudget,
    stats: ArenaStats,
}

impl ScratchArena {
    /// Creates an empty arena with the given ceiling.
    pub fn new(budget: ArenaBudget) -> Self {
        Self {
            words: Vec::new(),
            budget,
            stats: ArenaStats::new(),
        }
    }

    /// Creates an arena and reserves `bytes` immediately.
    pub fn with_capacity(budget: ArenaBudget, bytes: usize) -> Result<Self, ArenaError> {
        let mut arena = Self::new(budget);
        arena.reserve(bytes)?;
        Ok(arena)
    }

    /// Ensures at least `bytes` are available. Never shrinks.
    pub fn reserve(&mut self, bytes: usize) -> Result<(), ArenaError> {
        if bytes > self.budget.as_bytes() {
            return Err(ArenaError::BudgetExceeded {
                requested: bytes,
                budget: self.budget.as_bytes(),
            });
        }
        if bytes > self.capacity() {
            let words = bytes.div_ceil(8);
            debug!(
                from = self.capacity(),
                to = words * 8,
                budget = %self.budget,
                "growing scratch arena"
            );
            self.words.resize(words, 0);
            self.stats.record_reservation();
        }
        Ok(())
    }

    /// Lends the whole buffer as a fresh view.
    pub fn scratch(&mut self) -> Scratch<'_> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(self.words.as_mut_slice());
        Scratch::with_stats(bytes, &mut self.stats)
    }

    /// Lends a view of exactly `bytes`, reserving first if needed.
    pub fn scratch_for(&mut self, bytes: usize) -> Result<Scratch<'_>, ArenaError> {
        self.reserve(bytes)?;
        let all: &mut [u8] = bytemuck::cast_slice_mut(self.words.as_mut_slice());
        Ok(Scratch::with_stats(&mut all[..bytes], &mut self.stats))
    }

    pub fn capacity(&self) -> usize {
        self.words.len() * 8
    }

    pub fn budget(&self) -> ArenaBudget {
        self.budget
    }

    pub fn stats(&self) -> &ArenaStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_rounds_up_to_words() {
        let mut arena = ScratchArena::new(ArenaBudget::from_kb(1));
        arena.reserve(13).unwrap();
        assert_eq!(arena.capacity(), 16);
        arena.reserve(4).unwrap();
        assert_eq!(arena.capacity(), 16);
        assert_eq!(arena.stats().reservations, 1);
    }

    #[test]
    fn test_reserve_over_budget() {
        let mut arena = ScratchArena::new(ArenaBudget::from_bytes(64));
        let err = arena.reserve(65).unwrap_err();
        assert_eq!(
            err,
            ArenaError::BudgetExceeded {
                requested: 65,
                budget: 64
            }
        );
        assert_eq!(arena.capacity(), 0);
    }

    #[test]
    fn test_scratch_for_exact_view() {
        let mut arena = ScratchArena::new(ArenaBudget::from_kb(1));
        let mut s = arena.scratch_for(20).unwrap();
        assert_eq!(s.capacity(), 20);
        let words: &mut [i32] = s.take(5).unwrap();
        assert_eq!(words.len(), 5);
        assert!(s.take::<u8>(1).is_err());
    }

    #[test]
    fn test_views_are_recorded() {
        let mut arena = ScratchArena::with_capacity(ArenaBudget::from_kb(1), 64).unwrap();
        {
            let mut s = arena.scratch();
            let _: &mut [i16] = s.take(10).unwrap();
        }
        {
            let _s = arena.scratch();
        }
        assert_eq!(arena.stats().views_issued, 2);
        assert_eq!(arena.stats().peak_used_bytes, 20);
    }

    #[test]
    fn test_reuse_sees_zeroed_regions() {
        let mut arena = ScratchArena::with_capacity(ArenaBudget::from_kb(1), 32).unwrap();
        {
            let mut s = arena.scratch();
            let r: &mut [u8] = s.take(32).unwrap();
            r.fill(0xFF);
        }
        let mut s = arena.scratch();
        let r: &mut [u8] = s.take(32).unwrap();
        assert!(r.iter().all(|&b| b == 0));
    }
}
