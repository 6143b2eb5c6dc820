// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Borrowed scratch views.
//!
//! Kernels never allocate. They receive a [`Scratch`] and carve typed,
//! zero-initialised regions out of it with [`Scratch::take`]. Regions are
//! handed out front to back and live as long as the underlying buffer, so a
//! kernel can hold several at once.

use crate::{ArenaError, ArenaStats};
use bytemuck::Pod;
use std::mem;

/// A bump-allocated view over caller-owned bytes.
pub struct Scratch<'a> {
    buf: &'a mut [u8],
    capacity: usize,
    used: usize,
    stats: Option<&'a mut ArenaStats>,
}

impl<'a> Scratch<'a> {
    /// Wraps a caller-provided byte buffer.
    ///
    /// Kernel buffer sizes assume the buffer starts 8-byte aligned. A
    /// misaligned start costs alignment padding on the first
    /// [`take`](Self::take), so a view sized exactly to a kernel's
    /// requirement may then report [`ArenaError::Exhausted`]. Use
    /// [`from_words`](Self::from_words) or a [`ScratchArena`](crate::ScratchArena)
    /// to get an aligned view.
    pub fn new(buf: &'a mut [u8]) -> Self {
        let capacity = buf.len();
        Self {
            buf,
            capacity,
            used: 0,
            stats: None,
        }
    }

    /// Wraps caller-owned words; the view is always 8-byte aligned.
    pub fn from_words(words: &'a mut [u64]) -> Self {
        Self::new(bytemuck::cast_slice_mut(words))
    }

    /// A zero-capacity view for kernels that need no scratch.
    pub fn empty() -> Self {
        Self {
            buf: &mut [],
            capacity: 0,
            used: 0,
            stats: None,
        }
    }

    pub(crate) fn with_stats(buf: &'a mut [u8], stats: &'a mut ArenaStats) -> Self {
        let mut scratch = Self::new(buf);
        scratch.stats = Some(stats);
        scratch
    }

    /// Carves a zeroed region of `len` elements of `T`.
    ///
    /// Padding is inserted so the region is aligned for `T`. Padding counts
    /// towards [`used`](Self::used).
    pub fn take<T: Pod>(&mut self, len: usize) -> Result<&'a mut [T], ArenaError> {
        let elem = mem::size_of::<T>();
        let align = mem::align_of::<T>();
        let bytes = len.checked_mul(elem).ok_or(ArenaError::Exhausted {
            requested: usize::MAX,
            available: self.remaining(),
        })?;

        let buf = mem::take(&mut self.buf);
        let pad = buf.as_ptr().align_offset(align);
        if pad == usize::MAX || pad.saturating_add(bytes) > buf.len() {
            let available = buf.len();
            self.buf = buf;
            if let Some(stats) = self.stats.as_deref_mut() {
                stats.record_exhausted();
            }
            return Err(ArenaError::Exhausted {
                requested: bytes,
                available,
            });
        }

        let (_, rest) = buf.split_at_mut(pad);
        let (region, rest) = rest.split_at_mut(bytes);
        self.buf = rest;
        self.used += pad + bytes;

        region.fill(0);
        bytemuck::try_cast_slice_mut(region).map_err(|_| ArenaError::Exhausted {
            requested: bytes,
            available: 0,
        })
    }

    /// Bytes consumed so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available before alignment.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Total bytes the view started with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        if let Some(stats) = self.stats.as_deref_mut() {
            stats.record_view(self.used);
        }
    }
}

impl std::fmt::Debug for Scratch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scratch")
            .field("capacity", &self.capacity)
            .field("used", &self.used)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_zeroed() {
        let mut backing = [0xAAu8; 64];
        let mut s = Scratch::new(&mut backing);
        let region: &mut [u8] = s.take(16).unwrap();
        assert!(region.iter().all(|&b| b == 0));
        assert_eq!(s.used(), 16);
        assert_eq!(s.remaining(), 48);
    }

    #[test]
    fn test_regions_are_disjoint() {
        let mut backing = vec![0u8; 128];
        let mut s = Scratch::new(&mut backing);
        let a: &mut [i16] = s.take(8).unwrap();
        let b: &mut [i16] = s.take(8).unwrap();
        a.fill(1);
        b.fill(2);
        assert!(a.iter().all(|&v| v == 1));
        assert!(b.iter().all(|&v| v == 2));
    }

    #[test]
    fn test_alignment() {
        let mut backing = vec![0u64; 8];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(backing.as_mut_slice());
        let mut s = Scratch::new(bytes);
        let _: &mut [u8] = s.take(1).unwrap();
        let words: &mut [i32] = s.take(2).unwrap();
        assert_eq!(words.as_ptr() as usize % 4, 0);
        assert_eq!(s.used(), 4 + 8);
    }

    #[test]
    fn test_exhausted() {
        let mut backing = [0u64; 1];
        let mut s = Scratch::new(bytemuck::cast_slice_mut(&mut backing[..]));
        let err = s.take::<i32>(3).unwrap_err();
        assert_eq!(
            err,
            ArenaError::Exhausted {
                requested: 12,
                available: 8
            }
        );
        // A failed take leaves the view usable.
        assert!(s.take::<i32>(2).is_ok());
    }

    #[test]
    fn test_empty() {
        let mut s = Scratch::empty();
        assert_eq!(s.capacity(), 0);
        assert!(s.take::<u8>(0).unwrap().is_empty());
        assert!(s.take::<u8>(1).is_err());
    }

    #[test]
    fn test_drop_records_stats() {
        let mut backing = [0u8; 32];
        let mut stats = ArenaStats::new();
        {
            let mut s = Scratch::with_stats(&mut backing, &mut stats);
            let _: &mut [u8] = s.take(10).unwrap();
        }
        assert_eq!(stats.views_issued, 1);
        assert_eq!(stats.peak_used_bytes, 10);
    }

    #[test]
    fn test_misaligned_start_costs_padding() {
        let mut backing = [0u64; 2];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut backing[..]);
        // Eight bytes starting one past an 8-byte boundary.
        let mut s = Scratch::new(&mut bytes[1..9]);
        assert!(s.take::<i32>(2).is_err());

        let mut words = [0u64; 1];
        let mut s = Scratch::from_words(&mut words);
        assert_eq!(s.take::<i32>(2).unwrap().len(), 2);
        assert_eq!(s.used(), 8);
    }
}
