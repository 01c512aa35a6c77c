//! Slice descriptors and index arguments

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorError};

/// A uniform arithmetic selection along one axis.
///
/// Logical position `i` (`0 <= i < size`) maps to `start + i * stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slice {
    /// First selected position
    pub start: usize,
    /// Number of selected positions
    pub size: usize,
    /// Distance between selected positions
    pub stride: usize,
}

impl Slice {
    /// Selects `size` positions starting at `start`, `stride` apart
    pub const fn new(start: usize, size: usize, stride: usize) -> Self {
        Self { start, size, stride }
    }

    /// Selects a whole axis
    pub const fn all() -> Self {
        Self::new(0, usize::MAX, 1)
    }

    /// Selects positions `start, start + 1, ..` up to the end of the axis
    pub const fn starting_at(start: usize) -> Self {
        Self::new(start, usize::MAX, 1)
    }

    /// Selects `start..stop` with a step, as a half-open range
    pub fn range(start: usize, stop: usize, step: usize) -> Self {
        let step = step.max(1);
        let size = if stop > start { (stop - start).div_ceil(step) } else { 0 };
        Self::new(start, size, step)
    }

    /// Returns whether the slice selects nothing
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The largest mapped position; the slice must be non-empty
    pub fn last(&self) -> usize {
        debug_assert!(self.size > 0, "last() of an empty slice");
        self.start + (self.size - 1) * self.stride
    }

    /// Clips the slice to an axis of `len` elements
    pub fn clip(&self, len: usize) -> Result<Self> {
        if self.stride == 0 {
            return Err(TensorError::invalid_argument(
                "SLICE_ZERO_STEP",
                "slice step cannot be zero",
                "slicing",
                "Use a positive slice stride",
            ));
        }
        if self.start >= len || self.size == 0 {
            return Ok(Self::new(self.start.min(len), 0, self.stride));
        }
        let available = (len - 1 - self.start) / self.stride + 1;
        Ok(Self::new(self.start, self.size.min(available), self.stride))
    }
}

impl Default for Slice {
    fn default() -> Self {
        Self::all()
    }
}

/// One argument of an indexing call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexArg {
    /// Fixes the axis at one coordinate, removing it from the result
    At(usize),
    /// Keeps the axis, restricted to a slice
    Span(Slice),
}

impl IndexArg {
    /// Returns whether this argument keeps its axis in the result
    pub fn is_span(&self) -> bool {
        matches!(self, IndexArg::Span(_))
    }
}

impl From<usize> for IndexArg {
    fn from(index: usize) -> Self {
        IndexArg::At(index)
    }
}

impl From<Slice> for IndexArg {
    fn from(slice: Slice) -> Self {
        IndexArg::Span(slice)
    }
}

impl From<RangeFull> for IndexArg {
    fn from(_: RangeFull) -> Self {
        IndexArg::Span(Slice::all())
    }
}

impl From<Range<usize>> for IndexArg {
    fn from(range: Range<usize>) -> Self {
        IndexArg::Span(Slice::range(range.start, range.end, 1))
    }
}

impl From<RangeFrom<usize>> for IndexArg {
    fn from(range: RangeFrom<usize>) -> Self {
        IndexArg::Span(Slice::starting_at(range.start))
    }
}

impl From<RangeTo<usize>> for IndexArg {
    fn from(range: RangeTo<usize>) -> Self {
        IndexArg::Span(Slice::range(0, range.end, 1))
    }
}

/// Builds an array of [`IndexArg`]s from integers, ranges and [`Slice`]s.
///
/// ```
/// use numbat_tensor::{s, Slice, IndexArg};
///
/// let args = s![1, .., Slice::new(0, 2, 3)];
/// assert_eq!(args[0], IndexArg::At(1));
/// assert!(args[1].is_span());
/// ```
#[macro_export]
macro_rules! s {
    ($($arg:expr),* $(,)?) => {
        [$($crate::IndexArg::from($arg)),*]
    };
}
