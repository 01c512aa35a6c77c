//! Shape, index and stride types for tensor dimensions
//!
//! Every type here is parameterized by the tensor rank `N`, which is fixed at
//! compile time. A rank of zero is rejected when the type is first
//! constructed, so all tensors have at least one axis.

use std::fmt;
use std::ops::{Add, Index, IndexMut, Sub};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TensorError};

/// Traversal order of a multi-dimensional array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Order {
    /// Last axis varies fastest (C order)
    #[default]
    RowMajor,
    /// First axis varies fastest (Fortran order)
    ColumnMajor,
}

impl Order {
    /// Maps the NumPy-style `row_major` flag to an order
    pub fn from_row_major(row_major: bool) -> Self {
        if row_major {
            Order::RowMajor
        } else {
            Order::ColumnMajor
        }
    }
}

/// The extent of a tensor along each of its `N` axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape<const N: usize>([usize; N]);

impl<const N: usize> Shape<N> {
    const NONZERO_RANK: () = assert!(N >= 1, "tensor rank must be at least 1");

    /// Creates a new shape from per-axis sizes
    pub fn new(dims: [usize; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NONZERO_RANK;
        Self(dims)
    }

    /// Creates a shape from a slice whose length must equal `N`
    pub fn from_slice(dims: &[usize]) -> Result<Self> {
        let dims: [usize; N] = dims.try_into().map_err(|_| {
            TensorError::invalid_argument(
                "SHAPE_RANK_MISMATCH",
                format!("expected {} dimensions, got {}", N, dims.len()),
                "shape construction",
                "Provide exactly one size per axis",
            )
        })?;
        Ok(Self::new(dims))
    }

    /// Returns the number of axes
    pub const fn ndim(&self) -> usize {
        N
    }

    /// Returns the per-axis sizes
    pub fn dims(&self) -> &[usize; N] {
        &self.0
    }

    /// Returns the per-axis sizes as a slice
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub(crate) fn dims_mut(&mut self) -> &mut [usize; N] {
        &mut self.0
    }

    /// Returns the total number of elements
    pub fn size(&self) -> usize {
        size_of(&self.0)
    }

    /// Returns the total number of elements, or `None` if it overflows
    pub fn checked_size(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns whether the shape holds no elements
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Computes row-major (C order) strides for this shape
    pub fn row_major_strides(&self) -> Strides<N> {
        row_major_strides(self)
    }

    /// Computes column-major (Fortran order) strides for this shape
    pub fn column_major_strides(&self) -> Strides<N> {
        column_major_strides(self)
    }

    /// Returns whether `coords` addresses an element inside this shape
    pub fn contains(&self, coords: &[usize; N]) -> bool {
        coords.iter().zip(self.0.iter()).all(|(&c, &d)| c < d)
    }

    /// Validates `coords` against this shape
    pub fn check_index(&self, coords: &[usize; N], operation: &str) -> Result<()> {
        for (axis, (&c, &d)) in coords.iter().zip(self.0.iter()).enumerate() {
            if c >= d {
                return Err(TensorError::out_of_range(
                    "INDEX_OUT_OF_RANGE",
                    format!("index {} is out of bounds for axis {} with size {}", c, axis, d),
                    c,
                    axis,
                    d,
                    operation,
                    "Use coordinates below the size of each axis",
                ));
            }
        }
        Ok(())
    }

    /// Validates that `axis` names one of this shape's axes
    pub fn check_axis(&self, axis: usize, operation: &str) -> Result<()> {
        if axis >= N {
            return Err(TensorError::out_of_range(
                "AXIS_OUT_OF_RANGE",
                format!("axis {} is out of bounds for array of dimension {}", axis, N),
                axis,
                axis,
                N,
                operation,
                "Use an axis below the tensor rank",
            ));
        }
        Ok(())
    }
}

impl<const N: usize> fmt::Display for Shape<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tuple(f, &self.0)
    }
}

impl<const N: usize> Index<usize> for Shape<N> {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const N: usize> IndexMut<usize> for Shape<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const N: usize> From<[usize; N]> for Shape<N> {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims)
    }
}

impl<const N: usize> Serialize for Shape<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}

impl<'de, const N: usize> Deserialize<'de> for Shape<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let dims = Vec::<usize>::deserialize(deserializer)?;
        let len = dims.len();
        let dims: [usize; N] = dims
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"one size per tensor axis"))?;
        Ok(Self::new(dims))
    }
}

/// A position inside a rank-`N` tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NdIndex<const N: usize>([usize; N]);

impl<const N: usize> NdIndex<N> {
    /// Creates an index from per-axis coordinates
    pub fn new(coords: [usize; N]) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Shape::<N>::NONZERO_RANK;
        Self(coords)
    }

    /// The origin `(0, 0, ..)`
    pub fn zeros() -> Self {
        Self::new([0; N])
    }

    /// Returns the coordinates
    pub fn coords(&self) -> &[usize; N] {
        &self.0
    }

    /// Consumes the index, returning its coordinates
    pub fn into_array(self) -> [usize; N] {
        self.0
    }
}

impl<const N: usize> fmt::Display for NdIndex<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tuple(f, &self.0)
    }
}

impl<const N: usize> Index<usize> for NdIndex<N> {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const N: usize> IndexMut<usize> for NdIndex<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const N: usize> From<[usize; N]> for NdIndex<N> {
    fn from(coords: [usize; N]) -> Self {
        Self::new(coords)
    }
}

impl From<usize> for NdIndex<1> {
    fn from(coord: usize) -> Self {
        Self::new([coord])
    }
}

impl<const N: usize> Add for NdIndex<N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
        self
    }
}

impl<const N: usize> Sub for NdIndex<N> {
    type Output = Self;

    /// Component-wise difference; panics on underflow in debug builds
    fn sub(mut self, rhs: Self) -> Self::Output {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a -= b;
        }
        self
    }
}

impl<const N: usize> Serialize for NdIndex<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.as_slice().serialize(serializer)
    }
}

impl<'de, const N: usize> Deserialize<'de> for NdIndex<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let coords = Vec::<usize>::deserialize(deserializer)?;
        let len = coords.len();
        let coords: [usize; N] = coords
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"one coordinate per tensor axis"))?;
        Ok(Self::new(coords))
    }
}

/// Buffer elements skipped per unit step along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Strides<const N: usize>([isize; N]);

impl<const N: usize> Strides<N> {
    /// Creates strides from raw per-axis steps
    pub fn new(strides: [isize; N]) -> Self {
        Self(strides)
    }

    /// Returns the per-axis steps
    pub fn as_array(&self) -> &[isize; N] {
        &self.0
    }

    /// Returns the per-axis steps as a slice
    pub fn as_slice(&self) -> &[isize] {
        &self.0
    }

    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.0.swap(a, b);
    }

    /// Computes the (signed) buffer offset of `coords`
    pub fn offset(&self, coords: &[usize; N]) -> isize {
        ravel(coords, self)
    }
}

impl<const N: usize> Index<usize> for Strides<N> {
    type Output = isize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const N: usize> IndexMut<usize> for Strides<N> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const N: usize> fmt::Display for Strides<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, stride) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", stride)?;
        }
        write!(f, "]")
    }
}

fn write_tuple(f: &mut fmt::Formatter<'_>, items: &[usize]) -> fmt::Result {
    write!(f, "(")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    if items.len() == 1 {
        write!(f, ",")?;
    }
    write!(f, ")")
}

/// Formats a dynamic shape the way NumPy prints tuples
pub(crate) fn format_dims(dims: &[usize]) -> String {
    struct Dims<'a>(&'a [usize]);
    impl fmt::Display for Dims<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_tuple(f, self.0)
        }
    }
    Dims(dims).to_string()
}

/// Product of all sizes; zero if any axis is empty
pub fn size_of(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Row-major strides: axis `k` steps over the product of all later axes
pub fn row_major_strides<const N: usize>(shape: &Shape<N>) -> Strides<N> {
    let mut strides = [1isize; N];
    for i in (0..N.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as isize;
    }
    Strides(strides)
}

/// Column-major strides: axis `k` steps over the product of all earlier axes
pub fn column_major_strides<const N: usize>(shape: &Shape<N>) -> Strides<N> {
    let mut strides = [1isize; N];
    for i in 1..N {
        strides[i] = strides[i - 1] * shape[i - 1] as isize;
    }
    Strides(strides)
}

/// `Σ coords[i] * strides[i]`
pub fn ravel<const N: usize>(coords: &[usize; N], strides: &Strides<N>) -> isize {
    coords
        .iter()
        .zip(strides.0.iter())
        .map(|(&c, &s)| c as isize * s)
        .sum()
}

/// Decomposes a linear position into coordinates under `order`.
///
/// `linear` must be below `shape.size()`.
pub fn unravel<const N: usize>(linear: usize, shape: &Shape<N>, order: Order) -> NdIndex<N> {
    let mut coords = [0usize; N];
    let mut rest = linear;
    match order {
        Order::RowMajor => {
            for axis in (0..N).rev() {
                let dim = shape[axis].max(1);
                coords[axis] = rest % dim;
                rest /= dim;
            }
        }
        Order::ColumnMajor => {
            for axis in 0..N {
                let dim = shape[axis].max(1);
                coords[axis] = rest % dim;
                rest /= dim;
            }
        }
    }
    NdIndex(coords)
}

/// Linear position of `coords` under `order`; the inverse of [`unravel`]
pub fn ravel_index<const N: usize>(coords: &[usize; N], shape: &Shape<N>, order: Order) -> usize {
    let strides = match order {
        Order::RowMajor => row_major_strides(shape),
        Order::ColumnMajor => column_major_strides(shape),
    };
    ravel(coords, &strides) as usize
}

/// Checks that a reshape from `from` elements to `to` preserves the size
pub fn check_reshape(from: &[usize], to: &[usize]) -> Result<()> {
    if size_of(from) != size_of(to) {
        return Err(TensorError::invalid_argument(
            "RESHAPE_SIZE_MISMATCH",
            format!(
                "cannot reshape array of size {} into shape {}",
                size_of(from),
                format_dims(to)
            ),
            "reshape",
            "Ensure the new shape has the same total number of elements",
        ));
    }
    Ok(())
}
