// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! NHWC dimension descriptors, axis masks and the shape arithmetic shared
//! by broadcasting, reduction and structural kernels.

use std::fmt;

/// One of the four NHWC axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    N,
    H,
    W,
    C,
}

impl Axis {
    /// All axes in memory order, outermost first.
    pub const ALL: [Axis; 4] = [Axis::N, Axis::H, Axis::W, Axis::C];

    /// Position of the axis in an NHWC tuple.
    pub fn index(self) -> usize {
        match self {
            Axis::N => 0,
            Axis::H => 1,
            Axis::W => 2,
            Axis::C => 3,
        }
    }

    /// Inverse of [`Axis::index`].
    pub fn from_index(index: usize) -> Option<Axis> {
        Axis::ALL.get(index).copied()
    }
}

/// Dimensions of a rank-4 tensor stored NHWC, channel innermost.
///
/// Lower-rank tensors are expressed by setting leading dims to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Dims {
    pub n: usize,
    pub h: usize,
    pub w: usize,
    pub c: usize,
}

impl Dims {
    /// Creates dims from the four NHWC extents.
    ///
    /// # Examples
    /// ```
    /// use qnn_core::Dims;
    /// let d = Dims::new(1, 3, 3, 8);
    /// assert_eq!(d.num_elements(), 72);
    /// ```
    pub const fn new(n: usize, h: usize, w: usize, c: usize) -> Self {
        Self { n, h, w, c }
    }

    /// A single element.
    pub const fn scalar() -> Self {
        Self::new(1, 1, 1, 1)
    }

    /// A flat vector of `len` elements laid along C.
    pub const fn vector(len: usize) -> Self {
        Self::new(1, 1, 1, len)
    }

    /// Creates dims from an `[n, h, w, c]` array.
    pub const fn from_array(d: [usize; 4]) -> Self {
        Self::new(d[0], d[1], d[2], d[3])
    }

    /// Returns `[n, h, w, c]`.
    pub const fn as_array(&self) -> [usize; 4] {
        [self.n, self.h, self.w, self.c]
    }

    /// Total number of elements, `N×H×W×C`.
    pub const fn num_elements(&self) -> usize {
        self.n * self.h * self.w * self.c
    }

    /// Extent along `axis`.
    pub fn get(&self, axis: Axis) -> usize {
        self.as_array()[axis.index()]
    }

    /// Returns a copy with the extent along `axis` replaced.
    pub fn with(&self, axis: Axis, extent: usize) -> Self {
        let mut d = self.as_array();
        d[axis.index()] = extent;
        Self::from_array(d)
    }

    /// Flat element offset of `(n, h, w, c)`.
    #[inline]
    pub fn offset(&self, n: usize, h: usize, w: usize, c: usize) -> usize {
        ((n * self.h + h) * self.w + w) * self.c + c
    }

    /// Row-major element strides `[h*w*c, w*c, c, 1]`.
    pub fn strides(&self) -> [usize; 4] {
        [self.h * self.w * self.c, self.w * self.c, self.c, 1]
    }

    /// Strides with 0 on every axis of extent 1, so that indexing with the
    /// coordinates of a larger broadcast tensor re-reads the same element.
    pub fn broadcast_strides(&self) -> [usize; 4] {
        let s = self.strides();
        let d = self.as_array();
        std::array::from_fn(|i| if d[i] == 1 { 0 } else { s[i] })
    }

    /// Product of the extents before `axis`.
    pub fn outer_size(&self, axis: Axis) -> usize {
        self.as_array()[..axis.index()].iter().product()
    }

    /// Product of the extents after `axis`.
    pub fn inner_size(&self, axis: Axis) -> usize {
        self.as_array()[axis.index() + 1..].iter().product()
    }

    /// Resolves the broadcast of two dims, or `None` if some axis has two
    /// different extents neither of which is 1.
    pub fn broadcast_with(&self, other: &Dims) -> Option<Dims> {
        let a = self.as_array();
        let b = other.as_array();
        let mut out = [0usize; 4];
        for i in 0..4 {
            out[i] = if a[i] == b[i] || b[i] == 1 {
                a[i]
            } else if a[i] == 1 {
                b[i]
            } else {
                return None;
            };
        }
        Some(Dims::from_array(out))
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.n, self.h, self.w, self.c)
    }
}

impl From<[usize; 4]> for Dims {
    fn from(d: [usize; 4]) -> Self {
        Self::from_array(d)
    }
}

/// Marks which of the four axes a reduction collapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct AxisMask {
    flags: [bool; 4],
}

impl AxisMask {
    /// Creates a mask from one flag per NHWC axis.
    pub const fn new(n: bool, h: bool, w: bool, c: bool) -> Self {
        Self {
            flags: [n, h, w, c],
        }
    }

    /// Mask selecting exactly the given axes.
    pub fn from_axes(axes: &[Axis]) -> Self {
        let mut flags = [false; 4];
        for a in axes {
            flags[a.index()] = true;
        }
        Self { flags }
    }

    /// The `{H, W}` mask of global average pooling.
    pub const fn spatial() -> Self {
        Self::new(false, true, true, false)
    }

    /// Returns `[n, h, w, c]` flags.
    pub const fn flags(&self) -> [bool; 4] {
        self.flags
    }

    /// Whether `axis` is reduced.
    pub fn is_set(&self, axis: Axis) -> bool {
        self.flags[axis.index()]
    }

    /// Output dims: 1 on every reduced axis, the input extent elsewhere.
    pub fn reduced_dims(&self, input: &Dims) -> Dims {
        let d = input.as_array();
        Dims::from_array(std::array::from_fn(|i| if self.flags[i] { 1 } else { d[i] }))
    }

    /// Number of input elements folded into each output element.
    pub fn reduced_count(&self, input: &Dims) -> usize {
        let d = input.as_array();
        (0..4).filter(|&i| self.flags[i]).map(|i| d[i]).product()
    }

    /// Detects whether the reduced axes form a contiguous trailing run.
    ///
    /// Axes of extent 1 may be absorbed on either side of the run, since
    /// reducing or keeping them moves no data. Returns `(outer, inner)`: the
    /// tensor viewed as `outer` independent blocks of `inner` contiguous
    /// elements, each block folding into one output element.
    pub fn flatten_suffix(&self, input: &Dims) -> Option<(usize, usize)> {
        let d = input.as_array();
        let mut start = 4;
        while start > 0 && (self.flags[start - 1] || d[start - 1] == 1) {
            start -= 1;
        }
        if (0..start).any(|i| self.flags[i] && d[i] > 1) {
            return None;
        }
        let outer = d[..start].iter().product();
        let inner = d[start..].iter().product();
        Some((outer, inner))
    }
}

impl fmt::Display for AxisMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (axis, &set) in Axis::ALL.iter().zip(self.flags.iter()) {
            if set {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, "{axis:?}")?;
                first = false;
            }
        }
        write!(f, "}}")
    }
}
