// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scratch budget configuration and parsing.
//!
//! An [`ArenaBudget`] is the hard ceiling for the single scratch buffer an
//! inference session owns. Microcontroller-sized budgets are usually given
//! in kilobytes, so parsing accepts `"48K"`-style strings.

use crate::ArenaError;
use std::fmt;

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Suffixes accepted by [`ArenaBudget::parse`], longest first so that `"KB"`
/// is tried before `"B"`.
const SUFFIXES: [(&str, usize); 5] = [("KB", KIB), ("MB", MIB), ("K", KIB), ("M", MIB), ("B", 1)];

/// A hard ceiling on scratch memory.
///
/// # Parsing
/// - `"48K"` or `"48KB"` → 48 × 1024 bytes
/// - `"2M"` or `"2MB"` → 2 × 1024² bytes
/// - `"4096"` or `"4096B"` → raw byte count
///
/// # Examples
/// ```
/// use scratch_arena::ArenaBudget;
///
/// let b = ArenaBudget::parse("48K").unwrap();
/// assert_eq!(b.as_bytes(), 48 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArenaBudget {
    bytes: usize,
}

impl ArenaBudget {
    /// Creates a budget from a byte count.
    pub const fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from kibibytes.
    pub const fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * KIB }
    }

    /// Creates a budget from mebibytes.
    pub const fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MIB }
    }

    /// Returns the budget in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget in kibibytes (truncated).
    pub fn as_kb(&self) -> usize {
        self.bytes / KIB
    }

    /// Parses a human-readable budget string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, ArenaError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ArenaError::InvalidBudget("empty budget string".into()));
        }
        let upper = trimmed.to_ascii_uppercase();
        let (digits, unit) = SUFFIXES
            .iter()
            .find_map(|(suffix, unit)| upper.strip_suffix(suffix).map(|d| (d.to_string(), *unit)))
            .unwrap_or((upper.clone(), 1));

        let value: usize = digits.trim().parse().map_err(|_| {
            ArenaError::InvalidBudget(format!(
                "'{trimmed}': expected a number with an optional K or M suffix"
            ))
        })?;
        let bytes = value
            .checked_mul(unit)
            .ok_or_else(|| ArenaError::InvalidBudget(format!("'{trimmed}' overflows")))?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for ArenaBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= MIB && self.bytes % MIB == 0 {
            write!(f, "{} MB", self.bytes / MIB)
        } else if self.bytes >= KIB && self.bytes % KIB == 0 {
            write!(f, "{} KB", self.bytes / KIB)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}
