//! Iteration over any storage kind
//!
//! [`Offsets`] is the engine: it walks the coordinates of a [`Mapping`] in
//! row-major or column-major order and yields buffer offsets. [`Iter`] pairs
//! it with the element buffer and behaves like a random-access cursor:
//! jumps, distances and comparisons only touch the linear position.

use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::ops::{Add, Sub};

use crate::layout::Layout;
use crate::shape::{ravel_index, unravel, NdIndex, Order, Shape};

/// How logical coordinates map onto buffer offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping<'a, const N: usize> {
    /// Offsets follow a strided layout
    Strided(Layout<N>),
    /// Offsets are listed explicitly, in row-major order of `shape`
    Indirect {
        /// Logical shape of the selection
        shape: Shape<N>,
        /// One buffer offset per logical position
        offsets: &'a [usize],
    },
}

impl<'a, const N: usize> Mapping<'a, N> {
    /// Logical shape
    pub fn shape(&self) -> Shape<N> {
        match self {
            Mapping::Strided(layout) => layout.shape(),
            Mapping::Indirect { shape, .. } => *shape,
        }
    }

    /// Buffer offset of in-bounds `coords`
    #[inline]
    pub fn offset_of(&self, coords: &[usize; N]) -> usize {
        match self {
            Mapping::Strided(layout) => layout.offset_of(coords),
            Mapping::Indirect { shape, offsets } => offsets[ravel_index(coords, shape, Order::RowMajor)],
        }
    }

    #[inline]
    fn offset_at(&self, position: usize, coords: &[usize; N], order: Order) -> usize {
        match (self, order) {
            (Mapping::Indirect { offsets, .. }, Order::RowMajor) => offsets[position],
            _ => self.offset_of(coords),
        }
    }

    /// Walks every offset in `order`
    pub fn offsets(self, order: Order) -> Offsets<'a, N> {
        Offsets::new(self, order)
    }
}

/// Offset walker over a [`Mapping`]
#[derive(Debug, Clone)]
pub struct Offsets<'a, const N: usize> {
    mapping: Mapping<'a, N>,
    shape: Shape<N>,
    order: Order,
    pos: usize,
    end: usize,
    coords: [usize; N],
}

impl<'a, const N: usize> Offsets<'a, N> {
    /// Starts at linear position 0
    pub fn new(mapping: Mapping<'a, N>, order: Order) -> Self {
        let shape = mapping.shape();
        Self {
            mapping,
            shape,
            order,
            pos: 0,
            end: shape.size(),
            coords: [0; N],
        }
    }

    /// Traversal order
    pub fn order(&self) -> Order {
        self.order
    }

    /// Current linear position, in `[0, size]`
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total number of positions, ignoring consumption from either end
    pub fn total(&self) -> usize {
        self.shape.size()
    }

    /// Coordinates of the current position. At the end sentinel every axis
    /// reports its extent, one past the last valid coordinate.
    pub fn coords(&self) -> NdIndex<N> {
        if self.pos >= self.end {
            return NdIndex::new(*self.shape.dims());
        }
        NdIndex::new(self.coords)
    }

    /// Offset of the current position, or `None` at the end
    pub fn current(&self) -> Option<usize> {
        (self.pos < self.end).then(|| self.mapping.offset_at(self.pos, &self.coords, self.order))
    }

    /// Moves to linear position `pos`, clamped to the end sentinel
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
        if self.pos < self.end {
            self.coords = unravel(self.pos, &self.shape, self.order).into_array();
        }
    }

    /// Yields the coordinates and offset of the current position, then
    /// advances by one
    pub fn next_indexed(&mut self) -> Option<([usize; N], usize)> {
        if self.pos >= self.end {
            return None;
        }
        let coords = self.coords;
        let offset = self.mapping.offset_at(self.pos, &coords, self.order);
        self.pos += 1;
        self.step();
        Some((coords, offset))
    }

    /// Increments the coordinates under the traversal order, carrying into
    /// the next slower axis on overflow
    fn step(&mut self) {
        for k in 0..N {
            let axis = match self.order {
                Order::RowMajor => N - 1 - k,
                Order::ColumnMajor => k,
            };
            self.coords[axis] += 1;
            if self.coords[axis] < self.shape[axis] {
                return;
            }
            self.coords[axis] = 0;
        }
    }
}

impl<const N: usize> Iterator for Offsets<'_, N> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_indexed().map(|(_, offset)| offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.end - self.pos;
        (len, Some(len))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.seek(self.pos.saturating_add(n));
        self.next()
    }
}

impl<const N: usize> DoubleEndedIterator for Offsets<'_, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        self.end -= 1;
        let coords = unravel(self.end, &self.shape, self.order).into_array();
        Some(self.mapping.offset_at(self.end, &coords, self.order))
    }
}

impl<const N: usize> ExactSizeIterator for Offsets<'_, N> {}

impl<const N: usize> FusedIterator for Offsets<'_, N> {}

/// Random-access cursor yielding element references
pub struct Iter<'a, T, const N: usize> {
    data: &'a [T],
    offsets: Offsets<'a, N>,
}

impl<'a, T, const N: usize> Iter<'a, T, N> {
    /// Creates a cursor at position 0 over `data` as described by `mapping`
    pub fn new(data: &'a [T], mapping: Mapping<'a, N>, order: Order) -> Self {
        Self {
            data,
            offsets: Offsets::new(mapping, order),
        }
    }

    /// Linear position under this iterator's order
    pub fn index(&self) -> usize {
        self.offsets.position()
    }

    /// Coordinates of the current position; equal to the shape at the end
    /// sentinel
    pub fn coords(&self) -> NdIndex<N> {
        self.offsets.coords()
    }

    /// Traversal order
    pub fn order(&self) -> Order {
        self.offsets.order()
    }

    /// The element at the current position; `None` at the end sentinel
    pub fn current(&self) -> Option<&'a T> {
        self.offsets.current().map(|offset| &self.data[offset])
    }

    /// Returns whether the cursor sits on the end sentinel
    pub fn is_end(&self) -> bool {
        self.offsets.current().is_none()
    }

    /// The buffer this cursor reads from
    pub fn buffer(&self) -> &'a [T] {
        self.data
    }

    /// Moves to linear position `pos`
    pub fn seek(&mut self, pos: usize) {
        self.offsets.seek(pos);
    }
}

impl<T, const N: usize> Clone for Iter<'_, T, N> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            offsets: self.offsets.clone(),
        }
    }
}

impl<T, const N: usize> std::fmt::Debug for Iter<'_, T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iter")
            .field("index", &self.index())
            .field("order", &self.order())
            .field("total", &self.offsets.total())
            .finish()
    }
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.offsets.next().map(|offset| &self.data[offset])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.offsets.nth(n).map(|offset| &self.data[offset])
    }
}

impl<T, const N: usize> DoubleEndedIterator for Iter<'_, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.offsets.next_back().map(|offset| &self.data[offset])
    }
}

impl<T, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, const N: usize> FusedIterator for Iter<'_, T, N> {}

impl<T, const N: usize> Add<usize> for Iter<'_, T, N> {
    type Output = Self;

    fn add(mut self, n: usize) -> Self::Output {
        let pos = self.index().saturating_add(n);
        self.seek(pos);
        self
    }
}

impl<T, const N: usize> Sub<usize> for Iter<'_, T, N> {
    type Output = Self;

    fn sub(mut self, n: usize) -> Self::Output {
        let pos = self.index().saturating_sub(n);
        self.seek(pos);
        self
    }
}

impl<'a, T, const N: usize> Sub<&Iter<'a, T, N>> for &Iter<'a, T, N> {
    type Output = isize;

    /// Distance between two cursors over the same storage and order
    fn sub(self, rhs: &Iter<'a, T, N>) -> Self::Output {
        self.index() as isize - rhs.index() as isize
    }
}

impl<T, const N: usize> PartialEq for Iter<'_, T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.index() == other.index()
    }
}

impl<T, const N: usize> PartialOrd for Iter<'_, T, N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.index().partial_cmp(&other.index())
    }
}

/// Iterator yielding `(coordinates, element)` pairs
#[derive(Debug, Clone)]
pub struct IndexedIter<'a, T, const N: usize> {
    inner: Iter<'a, T, N>,
}

impl<'a, T, const N: usize> IndexedIter<'a, T, N> {
    /// Wraps a cursor
    pub fn new(inner: Iter<'a, T, N>) -> Self {
        Self { inner }
    }
}

impl<'a, T, const N: usize> Iterator for IndexedIter<'a, T, N> {
    type Item = (NdIndex<N>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.inner.data;
        self.inner
            .offsets
            .next_indexed()
            .map(|(coords, offset)| (NdIndex::new(coords), &data[offset]))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, const N: usize> ExactSizeIterator for IndexedIter<'_, T, N> {}

/// Every coordinate of `shape`, in `order`
#[derive(Debug, Clone)]
pub struct Indices<const N: usize> {
    offsets: Offsets<'static, N>,
}

impl<const N: usize> Indices<N> {
    /// Enumerates the coordinates of `shape`
    pub fn new(shape: Shape<N>, order: Order) -> Self {
        Self {
            offsets: Offsets::new(Mapping::Strided(Layout::contiguous(shape)), order),
        }
    }
}

impl<const N: usize> Iterator for Indices<N> {
    type Item = NdIndex<N>;

    fn next(&mut self) -> Option<Self::Item> {
        self.offsets.next_indexed().map(|(coords, _)| NdIndex::new(coords))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }
}

impl<const N: usize> ExactSizeIterator for Indices<N> {}
