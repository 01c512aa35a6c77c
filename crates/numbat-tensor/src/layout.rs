//! Strided layouts: how coordinates map onto a flat buffer
//!
//! A [`Layout`] is the `(shape, strides, offset)` triple behind every strided
//! tensor kind. All view-producing transforms (transpose, slicing, flips,
//! reshapes and broadcasts) are pure functions from one layout to another;
//! none of them touch the element buffer.

use crate::broadcast;
use crate::error::{Result, TensorError};
use crate::shape::{check_reshape, ravel, Shape, Strides};
use crate::slice::{IndexArg, Slice};

/// Shape, strides and starting offset of a strided tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout<const N: usize> {
    shape: Shape<N>,
    strides: Strides<N>,
    offset: usize,
}

impl<const N: usize> Layout<N> {
    /// Creates a layout from its parts.
    ///
    /// The caller guarantees that every in-bounds coordinate maps to a
    /// non-negative offset inside the buffer it will be used with.
    pub fn new(shape: Shape<N>, strides: Strides<N>, offset: usize) -> Self {
        Self { shape, strides, offset }
    }

    /// The canonical row-major layout of `shape`, starting at offset 0
    pub fn contiguous(shape: Shape<N>) -> Self {
        Self::new(shape, shape.row_major_strides(), 0)
    }

    /// Returns the shape
    pub fn shape(&self) -> Shape<N> {
        self.shape
    }

    /// Returns the strides
    pub fn strides(&self) -> Strides<N> {
        self.strides
    }

    /// Returns the buffer offset of the first element
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Total number of addressed elements
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Buffer offset of `coords`; `coords` must be in bounds
    #[inline]
    pub fn offset_of(&self, coords: &[usize; N]) -> usize {
        (self.offset as isize + ravel(coords, &self.strides)) as usize
    }

    /// One past the largest offset this layout can address
    pub fn required_len(&self) -> usize {
        if self.shape.is_empty() {
            return 0;
        }
        let mut max = self.offset as isize;
        for axis in 0..N {
            let step = self.strides[axis] * (self.shape[axis] as isize - 1);
            if step > 0 {
                max += step;
            }
        }
        max as usize + 1
    }

    /// Returns whether elements are laid out densely in row-major order;
    /// empty layouts always are
    pub fn is_row_major_contiguous(&self) -> bool {
        if self.shape.is_empty() {
            return true;
        }
        let mut expected = 1isize;
        for axis in (0..N).rev() {
            let dim = self.shape[axis];
            if dim != 1 && self.strides[axis] != expected {
                return false;
            }
            expected *= dim as isize;
        }
        true
    }

    /// Returns whether elements are laid out densely in column-major order;
    /// empty layouts always are
    pub fn is_column_major_contiguous(&self) -> bool {
        if self.shape.is_empty() {
            return true;
        }
        let mut expected = 1isize;
        for axis in 0..N {
            let dim = self.shape[axis];
            if dim != 1 && self.strides[axis] != expected {
                return false;
            }
            expected *= dim as isize;
        }
        true
    }

    /// Returns whether any axis of more than one element has stride zero
    pub fn has_broadcast_axes(&self) -> bool {
        (0..N).any(|axis| self.shape[axis] > 1 && self.strides[axis] == 0)
    }

    /// Reorders axes: result axis `i` is source axis `axes[i]`
    pub fn permute(&self, axes: [usize; N]) -> Result<Self> {
        let mut seen = [false; N];
        for &axis in &axes {
            self.shape.check_axis(axis, "permute")?;
            if seen[axis] {
                return Err(TensorError::invalid_argument(
                    "PERMUTE_REPEATED_AXIS",
                    format!("repeated axis {} in transpose", axis),
                    "permute",
                    "Provide each axis exactly once",
                ));
            }
            seen[axis] = true;
        }
        let mut shape = self.shape;
        let mut strides = self.strides;
        for (i, &axis) in axes.iter().enumerate() {
            shape[i] = self.shape[axis];
            strides[i] = self.strides[axis];
        }
        Ok(Self::new(shape, strides, self.offset))
    }

    /// Reverses the order of all axes
    pub fn reversed_axes(&self) -> Self {
        let mut shape = self.shape;
        let mut strides = self.strides;
        for i in 0..N {
            shape[i] = self.shape[N - 1 - i];
            strides[i] = self.strides[N - 1 - i];
        }
        Self::new(shape, strides, self.offset)
    }

    /// Exchanges two axes
    pub fn swap_axes(&self, a: usize, b: usize) -> Result<Self> {
        self.shape.check_axis(a, "swap axes")?;
        self.shape.check_axis(b, "swap axes")?;
        let mut shape = self.shape;
        let mut strides = self.strides;
        shape.dims_mut().swap(a, b);
        strides.swap(a, b);
        Ok(Self::new(shape, strides, self.offset))
    }

    /// Reverses the element order along `axis`
    pub fn flip(&self, axis: usize) -> Result<Self> {
        self.shape.check_axis(axis, "flip")?;
        let mut strides = self.strides;
        let mut offset = self.offset;
        let dim = self.shape[axis];
        if dim > 0 {
            offset = (offset as isize + strides[axis] * (dim as isize - 1)) as usize;
        }
        strides[axis] = -strides[axis];
        Ok(Self::new(self.shape, strides, offset))
    }

    /// Rotates by 90 degrees `k` times in the plane of `axes`, from the
    /// first axis towards the second
    pub fn rot90(&self, k: i32, axes: (usize, usize)) -> Result<Self> {
        let (a, b) = axes;
        self.shape.check_axis(a, "rot90")?;
        self.shape.check_axis(b, "rot90")?;
        if a == b {
            return Err(TensorError::invalid_argument(
                "ROT90_SAME_AXES",
                "rotation axes must be different",
                "rot90",
                "Pass two distinct axes",
            ));
        }
        match k.rem_euclid(4) {
            0 => Ok(*self),
            1 => self.flip(b)?.swap_axes(a, b),
            2 => self.flip(a)?.flip(b),
            _ => self.swap_axes(a, b)?.flip(b),
        }
    }

    /// Applies an integer/slice argument list.
    ///
    /// Integer arguments remove their axis; slice arguments keep it. Missing
    /// trailing arguments select whole axes. `M` must equal the number of
    /// kept axes.
    pub fn index<const M: usize>(&self, args: &[IndexArg]) -> Result<Layout<M>> {
        if args.len() > N {
            return Err(TensorError::invalid_argument(
                "TOO_MANY_INDICES",
                format!(
                    "too many indices for array: array is {}-dimensional, but {} were indexed",
                    N,
                    args.len()
                ),
                "indexing",
                "Pass at most one index argument per axis",
            ));
        }
        let kept = args.iter().filter(|a| a.is_span()).count() + (N - args.len());
        if kept != M {
            return Err(TensorError::invalid_argument(
                "INDEX_RANK_MISMATCH",
                format!("index arguments keep {} axes but a rank-{} view was requested", kept, M),
                "indexing",
                "Request a view whose rank equals the number of sliced axes",
            ));
        }

        let mut dims = [0usize; M];
        let mut strides = [0isize; M];
        let mut offset = self.offset as isize;
        let mut out = 0;
        for axis in 0..N {
            let dim = self.shape[axis];
            let stride = self.strides[axis];
            match args.get(axis).copied().unwrap_or(IndexArg::Span(Slice::all())) {
                IndexArg::At(i) => {
                    if i >= dim {
                        return Err(TensorError::out_of_range(
                            "INDEX_OUT_OF_RANGE",
                            format!("index {} is out of bounds for axis {} with size {}", i, axis, dim),
                            i,
                            axis,
                            dim,
                            "indexing",
                            "Use an index below the axis size",
                        ));
                    }
                    offset += i as isize * stride;
                }
                IndexArg::Span(slice) => {
                    let slice = slice.clip(dim)?;
                    if slice.size > 0 {
                        offset += slice.start as isize * stride;
                    }
                    dims[out] = slice.size;
                    strides[out] = stride * slice.stride as isize;
                    out += 1;
                }
            }
        }
        Ok(Layout::new(Shape::new(dims), Strides::new(strides), offset as usize))
    }

    /// Reinterprets the addressed elements under a new shape without
    /// copying; only possible for row-major contiguous layouts
    pub fn reshape<const M: usize>(&self, shape: Shape<M>) -> Result<Layout<M>> {
        check_reshape(self.shape.as_slice(), shape.as_slice())?;
        if !self.is_row_major_contiguous() {
            return Err(TensorError::invalid_argument(
                "RESHAPE_NOT_CONTIGUOUS",
                format!(
                    "cannot reshape a non-contiguous view of shape {} into {} without copying",
                    self.shape, shape
                ),
                "reshape",
                "Call copy() first to obtain a contiguous tensor",
            ));
        }
        Ok(Layout::new(shape, shape.row_major_strides(), self.offset))
    }

    /// Removes every axis of size one; `M` must equal the remaining rank
    pub fn squeeze<const M: usize>(&self) -> Result<Layout<M>> {
        let kept = (0..N).filter(|&axis| self.shape[axis] != 1).count();
        if kept != M {
            return Err(TensorError::invalid_argument(
                "SQUEEZE_RANK_MISMATCH",
                format!("squeezing {} leaves {} axes, not {}", self.shape, kept, M),
                "squeeze",
                "Request the rank that remains after dropping unit axes",
            ));
        }
        let mut dims = [0usize; M];
        let mut strides = [0isize; M];
        let mut out = 0;
        for axis in 0..N {
            if self.shape[axis] != 1 {
                dims[out] = self.shape[axis];
                strides[out] = self.strides[axis];
                out += 1;
            }
        }
        Ok(Layout::new(Shape::new(dims), Strides::new(strides), self.offset))
    }

    /// Inserts a new axis of size one at `axis`; `M` must equal `N + 1`
    pub fn expand_dims<const M: usize>(&self, axis: usize) -> Result<Layout<M>> {
        if M != N + 1 || axis > N {
            return Err(TensorError::invalid_argument(
                "EXPAND_DIMS_INVALID",
                format!("cannot insert axis {} into rank {} to get rank {}", axis, N, M),
                "expand_dims",
                "Insert at an axis no greater than the rank, into a rank one larger",
            ));
        }
        let mut dims = [1usize; M];
        let mut strides = [0isize; M];
        for src in 0..N {
            let dst = if src < axis { src } else { src + 1 };
            dims[dst] = self.shape[src];
            strides[dst] = self.strides[src];
        }
        Ok(Layout::new(Shape::new(dims), Strides::new(strides), self.offset))
    }

    /// Virtually expands this layout to `shape` using zero strides on
    /// broadcast axes. Shapes are right-aligned; `M` must be at least `N`.
    pub fn broadcast_to<const M: usize>(&self, shape: Shape<M>) -> Result<Layout<M>> {
        let fail = |axis: usize| {
            TensorError::broadcast(
                "BROADCAST_TO_INCOMPATIBLE",
                format!(
                    "could not broadcast input array from shape {} into shape {}",
                    self.shape, shape
                ),
                "broadcast_to",
                self.shape.as_slice(),
                shape.as_slice(),
                axis,
                "Source axes must equal the target size or be 1",
            )
        };
        if M < N {
            return Err(fail(0));
        }
        let lead = M - N;
        let mut strides = [0isize; M];
        for axis in 0..N {
            let src = self.shape[axis];
            let dst = shape[lead + axis];
            if src == dst {
                strides[lead + axis] = self.strides[axis];
            } else if src == 1 {
                strides[lead + axis] = 0;
            } else {
                return Err(fail(lead + axis));
            }
        }
        Ok(Layout::new(shape, Strides::new(strides), self.offset))
    }

    /// Broadcasts two same-rank layouts against each other
    pub fn broadcast_with(&self, other: &Layout<N>, operation: &str) -> Result<(Layout<N>, Layout<N>)> {
        let shape = broadcast::broadcast_pair(self.shape, other.shape, operation)?;
        Ok((self.broadcast_to(shape)?, other.broadcast_to(shape)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s;

    #[test]
    fn test_contiguous_layout() {
        let layout = Layout::contiguous(Shape::new([3, 4]));
        assert!(layout.is_row_major_contiguous());
        assert!(!layout.is_column_major_contiguous());
        assert_eq!(layout.offset_of(&[2, 1]), 9);
        assert_eq!(layout.required_len(), 12);
    }

    #[test]
    fn test_transpose_and_permute() {
        let layout = Layout::contiguous(Shape::new([2, 3, 4]));
        let t = layout.reversed_axes();
        assert_eq!(t.shape().dims(), &[4, 3, 2]);
        assert_eq!(t.strides().as_array(), &[1, 4, 12]);
        assert!(t.is_column_major_contiguous());
        let p = layout.permute([1, 0, 2]).unwrap();
        assert_eq!(p.shape().dims(), &[3, 2, 4]);
        assert!(layout.permute([0, 0, 1]).is_err());
    }

    #[test]
    fn test_flip() {
        let layout = Layout::contiguous(Shape::new([5]));
        let f = layout.flip(0).unwrap();
        assert_eq!(f.offset_of(&[0]), 4);
        assert_eq!(f.offset_of(&[4]), 0);
    }

    #[test]
    fn test_index_mixed() {
        let layout = Layout::contiguous(Shape::new([3, 4]));
        let row: Layout<1> = layout.index(&s![1, ..]).unwrap();
        assert_eq!(row.shape().dims(), &[4]);
        assert_eq!(row.offset_of(&[2]), 6);

        let col: Layout<1> = layout.index(&s![.., 2]).unwrap();
        assert_eq!(col.strides().as_array(), &[4]);
        assert_eq!(col.offset_of(&[2]), 10);

        let stepped: Layout<2> = layout.index(&s![Slice::new(0, 2, 2), Slice::new(1, 10, 2)]).unwrap();
        assert_eq!(stepped.shape().dims(), &[2, 2]);
        assert_eq!(stepped.offset_of(&[1, 1]), 11);

        assert!(layout.index::<1>(&s![3, ..]).is_err());
        assert!(layout.index::<2>(&s![1, ..]).is_err());
    }

    #[test]
    fn test_reshape_requires_contiguity() {
        let layout = Layout::contiguous(Shape::new([3, 4]));
        let r = layout.reshape(Shape::new([2, 6])).unwrap();
        assert_eq!(r.shape().dims(), &[2, 6]);
        assert!(layout.reversed_axes().reshape(Shape::new([12])).is_err());
        assert!(layout.reshape(Shape::new([5])).is_err());
    }

    #[test]
    fn test_empty_slice_is_contiguous() {
        let layout = Layout::contiguous(Shape::new([3, 4]));
        let empty: Layout<2> = layout.index(&s![.., Slice::range(4, 4, 2)]).unwrap();
        assert_eq!(empty.shape().dims(), &[3, 0]);
        assert!(empty.is_row_major_contiguous());
        assert!(empty.is_column_major_contiguous());
        let flat = empty.reshape(Shape::new([0])).unwrap();
        assert_eq!(flat.size(), 0);
    }

    #[test]
    fn test_broadcast_to_zero_strides() {
        let layout = Layout::contiguous(Shape::new([4, 1]));
        let b = layout.broadcast_to(Shape::new([2, 4, 3])).unwrap();
        assert_eq!(b.strides().as_array(), &[0, 1, 0]);
        assert_eq!(b.offset_of(&[1, 3, 2]), 3);
        assert!(b.has_broadcast_axes());
        assert!(layout.broadcast_to(Shape::new([4, 3, 5])).is_err());
    }

    #[test]
    fn test_squeeze_and_expand() {
        let layout = Layout::contiguous(Shape::new([1, 3, 1]));
        let sq: Layout<1> = layout.squeeze().unwrap();
        assert_eq!(sq.shape().dims(), &[3]);
        let ex: Layout<2> = sq.expand_dims(0).unwrap();
        assert_eq!(ex.shape().dims(), &[1, 3]);
        assert!(layout.squeeze::<2>().is_err());
    }

    #[test]
    fn test_rot90() {
        // [[0, 1], [2, 3]] rotated once counter-clockwise is [[1, 3], [0, 2]]
        let layout = Layout::contiguous(Shape::new([2, 2]));
        let r = layout.rot90(1, (0, 1)).unwrap();
        assert_eq!(r.offset_of(&[0, 0]), 1);
        assert_eq!(r.offset_of(&[0, 1]), 3);
        assert_eq!(r.offset_of(&[1, 0]), 0);
        assert_eq!(r.offset_of(&[1, 1]), 2);
        assert_eq!(layout.rot90(4, (0, 1)).unwrap(), layout);
    }
}
