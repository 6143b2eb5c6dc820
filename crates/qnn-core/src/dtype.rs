// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element data types handled by the kernels.

/// Enumerates the numeric types a tensor buffer can hold.
///
/// Kernels operate on `I8`/`I16` activations with `I32`/`I64` accumulators
/// and biases. `F32` and `F16` only appear at the quantize/dequantize
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DType {
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer (accumulators, bias).
    I32,
    /// 64-bit signed integer (int16 kernel bias).
    I64,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 32-bit IEEE 754 floating point.
    F32,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::I8 => 1,
            DType::I16 | DType::F16 => 2,
            DType::I32 | DType::F32 => 4,
            DType::I64 => 8,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F16 => "f16",
            DType::F32 => "f32",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i8 {}
    impl Sealed for i16 {}
}

/// A quantized activation element: `i8` or `i16`.
///
/// Gives generic kernels the saturation bounds and the narrowing conversion
/// they need without repeating every loop per width.
pub trait QuantElem: sealed::Sealed + Copy + Default + Ord + Send + Sync + 'static {
    /// The matching [`DType`].
    const DTYPE: DType;
    /// Smallest representable value, widened.
    const MIN: i32;
    /// Largest representable value, widened.
    const MAX: i32;

    /// Widens to `i32`.
    fn to_i32(self) -> i32;

    /// Narrows an already-clamped value. Out-of-range inputs wrap.
    fn from_i32(v: i32) -> Self;

    /// Clamps to the type range, then narrows.
    #[inline]
    fn saturate(v: i32) -> Self {
        Self::from_i32(v.clamp(Self::MIN, Self::MAX))
    }
}

impl QuantElem for i8 {
    const DTYPE: DType = DType::I8;
    const MIN: i32 = i8::MIN as i32;
    const MAX: i32 = i8::MAX as i32;

    #[inline]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline]
    fn from_i32(v: i32) -> Self {
        v as i8
    }
}

impl QuantElem for i16 {
    const DTYPE: DType = DType::I16;
    const MIN: i32 = i16::MIN as i32;
    const MAX: i32 = i16::MAX as i32;

    #[inline]
    fn to_i32(self) -> i32 {
        self as i32
    }

    #[inline]
    fn from_i32(v: i32) -> Self {
        v as i16
    }
}
