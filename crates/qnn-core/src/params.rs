// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Small parameter types shared by many kernels.

use crate::{KernelError, QuantElem};

/// A `(h, w)` pair used for strides, padding and dilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    pub h: usize,
    pub w: usize,
}

impl Tile {
    /// Creates a tile.
    pub const fn new(h: usize, w: usize) -> Self {
        Self { h, w }
    }

    /// `(1, 1)`, the unit stride or dilation.
    pub const fn unit() -> Self {
        Self::new(1, 1)
    }

    /// `(0, 0)`, no padding.
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }
}

/// Inclusive output clamp `[min, max]` in the quantized domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ActivationRange {
    pub min: i32,
    pub max: i32,
}

impl ActivationRange {
    /// Creates a range.
    ///
    /// # Errors
    /// Returns [`KernelError::InvalidArgument`] if `min > max`.
    pub fn new(min: i32, max: i32) -> Result<Self, KernelError> {
        let r = Self { min, max };
        r.validate("activation_range")?;
        Ok(r)
    }

    /// The full range of `T`, i.e. no activation.
    pub const fn full<T: QuantElem>() -> Self {
        Self {
            min: T::MIN,
            max: T::MAX,
        }
    }

    /// ReLU in the quantized domain: `[zero_point, T::MAX]`.
    pub fn relu<T: QuantElem>(zero_point: i32) -> Self {
        Self {
            min: zero_point.clamp(T::MIN, T::MAX),
            max: T::MAX,
        }
    }

    /// ReLU6: `[zero_point, zero_point + six]` where `six` is 6.0 quantized.
    pub fn relu6<T: QuantElem>(zero_point: i32, six: i32) -> Self {
        Self {
            min: zero_point.clamp(T::MIN, T::MAX),
            max: zero_point.saturating_add(six).clamp(T::MIN, T::MAX),
        }
    }

    /// Checks `min <= max`.
    pub fn validate(&self, op: &'static str) -> Result<(), KernelError> {
        if self.min > self.max {
            return Err(KernelError::invalid(
                op,
                format!("activation min {} exceeds max {}", self.min, self.max),
            ));
        }
        Ok(())
    }

    /// Clamps `v` into the range.
    #[inline]
    pub fn clamp(&self, v: i32) -> i32 {
        v.max(self.min).min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_range() {
        assert!(ActivationRange::new(5, 4).is_err());
        let r = ActivationRange::new(-10, 10).unwrap();
        assert_eq!(r.clamp(20), 10);
        assert_eq!(r.clamp(-20), -10);
        assert_eq!(ActivationRange::full::<i8>(), ActivationRange { min: -128, max: 127 });
    }

    #[test]
    fn test_relu_ranges() {
        assert_eq!(ActivationRange::relu::<i8>(-3), ActivationRange { min: -3, max: 127 });
        let r6 = ActivationRange::relu6::<i8>(-128, 300);
        assert_eq!((r6.min, r6.max), (-128, 127));
    }
}
