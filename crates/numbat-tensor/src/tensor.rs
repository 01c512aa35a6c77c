//! The owning tensor type

use std::fmt;
use std::ops::{AddAssign, DivAssign, Index, IndexMut, MulAssign, RemAssign, SubAssign};

use num_traits::{Float, Num, NumCast, One, Zero};
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace};

use crate::array::{NdArray, NdArrayMut, StridedArray};
use crate::error::{Result, TensorError};
use crate::iter::{Indices, Mapping};
use crate::layout::Layout;
use crate::shape::{check_reshape, NdIndex, Order, Shape};

/// Allocates an empty vector able to hold `len` elements without growing
pub(crate) fn try_vec<T>(len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| {
        TensorError::allocation_failure(
            "ALLOCATION_FAILED",
            format!("unable to allocate {} elements of {} bytes", len, std::mem::size_of::<T>()),
            len,
            "Reduce the tensor size",
        )
    })?;
    trace!(elements = len, "allocated tensor buffer");
    Ok(data)
}

fn checked_size<const N: usize>(shape: &Shape<N>) -> Result<usize> {
    shape.checked_size().ok_or_else(|| {
        TensorError::allocation_failure(
            "SIZE_OVERFLOW",
            format!("the number of elements of shape {} overflows usize", shape),
            usize::MAX,
            "Reduce the tensor size",
        )
    })
}

/// A rank-`N` array owning a contiguous row-major buffer.
///
/// The buffer length always equals the product of the shape. Views and
/// indirect selections borrow the tensor, so it cannot be resized or
/// dropped while any of them is alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tensor<T, const N: usize> {
    data: Vec<T>,
    shape: Shape<N>,
}

impl<T, const N: usize> Tensor<T, N> {
    /// A tensor with no elements and every axis of size zero
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            shape: Shape::new([0; N]),
        }
    }

    /// Wraps `data` laid out row-major under `shape`
    pub fn from_vec(shape: impl Into<Shape<N>>, data: Vec<T>) -> Result<Self> {
        let shape = shape.into();
        let size = checked_size(&shape)?;
        if data.len() != size {
            return Err(TensorError::shape_mismatch(
                "DATA_LENGTH_MISMATCH",
                format!("cannot fit {} elements into shape {}", data.len(), shape),
                "tensor construction",
                format!("({},)", data.len()),
                shape.to_string(),
                "Provide exactly one element per position of the shape",
            ));
        }
        Ok(Self { data, shape })
    }

    /// Fills the tensor by calling `f` with each coordinate in row-major order
    pub fn from_fn<F>(shape: impl Into<Shape<N>>, mut f: F) -> Result<Self>
    where
        F: FnMut(NdIndex<N>) -> T,
    {
        let shape = shape.into();
        let mut data = try_vec(checked_size(&shape)?)?;
        data.extend(Indices::new(shape, Order::RowMajor).map(&mut f));
        Ok(Self { data, shape })
    }

    /// Collects exactly `shape.size()` elements from `iter`
    pub fn from_iter_shape<I>(shape: impl Into<Shape<N>>, iter: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let shape = shape.into();
        let size = checked_size(&shape)?;
        let mut data = try_vec(size)?;
        let mut iter = iter.into_iter();
        data.extend(iter.by_ref().take(size));
        if data.len() != size || iter.next().is_some() {
            return Err(TensorError::shape_mismatch(
                "DATA_LENGTH_MISMATCH",
                format!("iterator length does not match shape {}", shape),
                "tensor construction",
                "iterator",
                shape.to_string(),
                "Provide exactly one element per position of the shape",
            ));
        }
        Ok(Self { data, shape })
    }

    /// A tensor where every element equals `value`
    pub fn full(shape: impl Into<Shape<N>>, value: T) -> Result<Self>
    where
        T: Clone,
    {
        let shape = shape.into();
        let size = checked_size(&shape)?;
        let mut data = try_vec(size)?;
        data.resize(size, value);
        Ok(Self { data, shape })
    }

    /// A default-filled tensor
    pub fn new(shape: impl Into<Shape<N>>) -> Result<Self>
    where
        T: Default + Clone,
    {
        Self::full(shape, T::default())
    }

    /// A tensor of zeros
    pub fn zeros(shape: impl Into<Shape<N>>) -> Result<Self>
    where
        T: Zero + Clone,
    {
        Self::full(shape, T::zero())
    }

    /// A tensor of ones
    pub fn ones(shape: impl Into<Shape<N>>) -> Result<Self>
    where
        T: One + Clone,
    {
        Self::full(shape, T::one())
    }

    /// A zero-filled tensor with the shape of `other`
    pub fn zeros_like<A>(other: &A) -> Result<Self>
    where
        A: NdArray<N> + ?Sized,
        T: Zero + Clone,
    {
        Self::zeros(other.shape())
    }

    /// Shape
    pub fn shape(&self) -> Shape<N> {
        self.shape
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// The row-major buffer
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The row-major buffer, mutably
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consumes the tensor, returning its row-major buffer
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Mutable row-major iterator
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Changes the shape in place.
    ///
    /// When the size is unchanged the buffer is kept and reinterpreted in
    /// row-major order. Otherwise it is replaced by default values.
    pub fn resize(&mut self, shape: impl Into<Shape<N>>) -> Result<()>
    where
        T: Default + Clone,
    {
        let shape = shape.into();
        let size = checked_size(&shape)?;
        if size == self.data.len() {
            self.shape = shape;
            return Ok(());
        }
        debug!(from = %self.shape, to = %shape, "resize reallocates tensor buffer");
        let mut data = try_vec(size)?;
        data.resize(size, T::default());
        self.data = data;
        self.shape = shape;
        Ok(())
    }

    /// Reinterprets the buffer under a shape of any rank with the same size
    pub fn reshape<const M: usize>(self, shape: impl Into<Shape<M>>) -> Result<Tensor<T, M>> {
        let shape = shape.into();
        check_reshape(self.shape.as_slice(), shape.as_slice())?;
        debug!(from = %self.shape, to = %shape, "reshape");
        Ok(Tensor { data: self.data, shape })
    }

    /// Collapses into a rank-1 tensor
    pub fn flatten(self) -> Tensor<T, 1> {
        let len = self.data.len();
        Tensor {
            data: self.data,
            shape: Shape::new([len]),
        }
    }
}

impl<T> Tensor<T, 1> {
    /// `start, start + step, ..` below `stop`
    pub fn arange(start: T, stop: T, step: T) -> Result<Self>
    where
        T: Num + PartialOrd + Copy,
    {
        if step == T::zero() {
            return Err(TensorError::invalid_argument(
                "ARANGE_ZERO_STEP",
                "arange step cannot be zero",
                "arange",
                "Use a non-zero step",
            ));
        }
        let ascending = step > T::zero();
        let mut data = Vec::new();
        let mut value = start;
        while (ascending && value < stop) || (!ascending && value > stop) {
            data.try_reserve(1).map_err(|_| {
                TensorError::allocation_failure("ALLOCATION_FAILED", "arange ran out of memory", data.len() + 1, "Use a larger step")
            })?;
            data.push(value);
            value = value + step;
        }
        let len = data.len();
        Ok(Self {
            data,
            shape: Shape::new([len]),
        })
    }

    /// `num` evenly spaced values from `start` to `stop` inclusive
    pub fn linspace(start: T, stop: T, num: usize) -> Result<Self>
    where
        T: Float,
    {
        let step = if num > 1 {
            let intervals: T = NumCast::from(num - 1).unwrap_or_else(T::nan);
            (stop - start) / intervals
        } else {
            T::zero()
        };
        Self::from_fn([num], |i| {
            if num > 1 && i[0] == num - 1 {
                return stop;
            }
            let k: T = NumCast::from(i[0]).unwrap_or_else(T::nan);
            start + step * k
        })
    }
}

impl<T, const N: usize> Default for Tensor<T, N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T, const N: usize> NdArray<N> for Tensor<T, N> {
    type Elem = T;

    fn buffer(&self) -> &[T] {
        &self.data
    }

    fn mapping(&self) -> Mapping<'_, N> {
        Mapping::Strided(Layout::contiguous(self.shape))
    }

    fn shape(&self) -> Shape<N> {
        self.shape
    }
}

impl<T, const N: usize> NdArrayMut<N> for Tensor<T, N> {
    fn parts_mut(&mut self) -> (&mut [T], Mapping<'_, N>) {
        (&mut self.data, Mapping::Strided(Layout::contiguous(self.shape)))
    }
}

impl<T, const N: usize> StridedArray<N> for Tensor<T, N> {
    fn layout(&self) -> Layout<N> {
        Layout::contiguous(self.shape)
    }
}

impl<T, const N: usize> Index<[usize; N]> for Tensor<T, N> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!("index {} out of bounds for shape {}", NdIndex::new(index), self.shape),
        }
    }
}

impl<T, const N: usize> IndexMut<[usize; N]> for Tensor<T, N> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        let shape = self.shape;
        match self.get_mut(index) {
            Some(value) => value,
            None => panic!("index {} out of bounds for shape {}", NdIndex::new(index), shape),
        }
    }
}

impl<T, const N: usize> Index<NdIndex<N>> for Tensor<T, N> {
    type Output = T;

    fn index(&self, index: NdIndex<N>) -> &T {
        &self[index.into_array()]
    }
}

impl<T, const N: usize> IndexMut<NdIndex<N>> for Tensor<T, N> {
    fn index_mut(&mut self, index: NdIndex<N>) -> &mut T {
        &mut self[index.into_array()]
    }
}

macro_rules! impl_scalar_assign {
    ($($trait:ident :: $method:ident),*) => {
        $(
            impl<T: Copy + $trait, const N: usize> $trait<T> for Tensor<T, N> {
                fn $method(&mut self, rhs: T) {
                    for value in &mut self.data {
                        value.$method(rhs);
                    }
                }
            }
        )*
    };
}

impl_scalar_assign!(
    AddAssign::add_assign,
    SubAssign::sub_assign,
    MulAssign::mul_assign,
    DivAssign::div_assign,
    RemAssign::rem_assign
);

impl<T: Serialize, const N: usize> Serialize for Tensor<T, N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Tensor", 2)?;
        state.serialize_field("shape", &self.shape)?;
        state.serialize_field("data", &self.data)?;
        state.end()
    }
}

impl<'de, T: Deserialize<'de>, const N: usize> Deserialize<'de> for Tensor<T, N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Repr<T> {
            shape: Vec<usize>,
            data: Vec<T>,
        }

        let repr = Repr::<T>::deserialize(deserializer)?;
        let shape = Shape::<N>::from_slice(&repr.shape).map_err(D::Error::custom)?;
        Tensor::from_vec(shape, repr.data).map_err(D::Error::custom)
    }
}

impl<T: fmt::Display, const N: usize> fmt::Display for Tensor<T, N> {
    /// Flat rendering, `shape [e0, e1, ..]`; `numbat-io` provides the
    /// nested NumPy layout
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.shape)?;
        for (i, value) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_constructors() {
        let z = Tensor::<f32, 2>::zeros([2, 3]).unwrap();
        assert_eq!(z.size(), 6);
        assert!(z.iter().all(|&x| x == 0.0));

        let f = Tensor::full([2], 7u8).unwrap();
        assert_eq!(f.as_slice(), &[7, 7]);

        let e = Tensor::<i32, 3>::default();
        assert!(e.is_empty());
        assert_eq!(e.shape().dims(), &[0, 0, 0]);

        let g = Tensor::from_fn([2, 2], |i| i[0] * 10 + i[1]).unwrap();
        assert_eq!(g.as_slice(), &[0, 1, 10, 11]);
    }

    #[test]
    fn test_from_vec_length_checked() {
        let err = Tensor::from_vec([2, 2], vec![1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        assert!(Tensor::from_iter_shape([2], 0..3).is_err());
        assert!(Tensor::from_iter_shape([3], 0..2).is_err());
    }

    #[test]
    fn test_ranges() {
        let a = Tensor::arange(0, 10, 3).unwrap();
        assert_eq!(a.as_slice(), &[0, 3, 6, 9]);
        let d = Tensor::arange(5.0, 4.0, -0.5).unwrap();
        assert_eq!(d.as_slice(), &[5.0, 4.5]);
        assert!(Tensor::arange(0, 1, 0).is_err());

        let l = Tensor::linspace(0.0, 1.0, 5).unwrap();
        assert_eq!(l.as_slice(), &[0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_resize_keeps_buffer_when_size_matches() {
        let mut t = Tensor::from_iter_shape([3, 4], 0..12).unwrap();
        t.resize([2, 6]).unwrap();
        assert_eq!(t[[1, 0]], 6);
        assert_eq!(t.as_slice(), &(0..12).collect::<Vec<_>>()[..]);

        t.resize([5, 1]).unwrap();
        assert_eq!(t.as_slice(), &[0; 5]);
    }

    #[test]
    fn test_reshape_changes_rank() {
        let t = Tensor::from_iter_shape([2, 3, 4], 0..24).unwrap();
        let m: Tensor<i32, 2> = t.reshape([6, 4]).unwrap();
        assert_eq!(m[[5, 3]], 23);
        assert!(m.clone().reshape::<1>([25]).is_err());
        assert_eq!(m.flatten().shape().dims(), &[24]);
    }

    #[test]
    fn test_scalar_compound_assignment() {
        let mut t = Tensor::from_vec([3], vec![1, 2, 3]).unwrap();
        t += 1;
        t *= 10;
        assert_eq!(t.as_slice(), &[20, 30, 40]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_index_panics_out_of_range() {
        let t = Tensor::<i32, 2>::zeros([2, 2]).unwrap();
        let _ = t[[2, 0]];
    }

    #[test]
    fn test_serde_validates_length() {
        let t = Tensor::from_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"shape":[2,2],"data":[1,2,3,4]}"#);
        let back: Tensor<i32, 2> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<Tensor<i32, 2>>(r#"{"shape":[2,2],"data":[1]}"#).is_err());
        assert!(serde_json::from_str::<Tensor<i32, 1>>(&json).is_err());
    }

    #[test]
    fn test_contiguous_layout() {
        let t = Tensor::<u8, 3>::zeros([2, 3, 4]).unwrap();
        assert!(t.is_contiguous());
        assert_eq!(t.strides().as_array(), &[12, 4, 1]);
    }
}
