//! Selections described by an explicit list of buffer offsets
//!
//! These are the results of coordinate, integer and boolean-mask indexing.
//! Logical position `i` (row-major under the selection's shape) maps to
//! `offsets[i]`. Offsets may repeat; writes through repeated offsets land
//! once per occurrence, in order.

use std::fmt;

use crate::array::{NdArray, NdArrayMut};
use crate::error::{Result, TensorError};
use crate::iter::Mapping;
use crate::shape::{check_reshape, Shape};

fn check_offsets<const N: usize>(shape: &Shape<N>, offsets: &[usize], len: usize) -> Result<()> {
    if offsets.len() != shape.size() {
        return Err(TensorError::shape_mismatch(
            "OFFSET_COUNT_MISMATCH",
            format!("{} offsets cannot describe shape {}", offsets.len(), shape),
            "indirect selection",
            format!("({},)", offsets.len()),
            shape.to_string(),
            "Provide one offset per position of the shape",
        ));
    }
    if let Some((position, &offset)) = offsets.iter().enumerate().find(|&(_, &o)| o >= len) {
        return Err(TensorError::out_of_range(
            "OFFSET_OUT_OF_RANGE",
            format!("offset {} at position {} is outside a buffer of {} elements", offset, position, len),
            offset,
            0,
            len,
            "indirect selection",
            "Use offsets below the buffer length",
        ));
    }
    Ok(())
}

/// Read-only explicit selection
pub struct IndirectTensor<'a, T, const N: usize> {
    data: &'a [T],
    shape: Shape<N>,
    offsets: Vec<usize>,
}

impl<'a, T, const N: usize> IndirectTensor<'a, T, N> {
    /// Selects `offsets` of `data`, arranged under `shape`
    pub fn new(data: &'a [T], shape: impl Into<Shape<N>>, offsets: Vec<usize>) -> Result<Self> {
        let shape = shape.into();
        check_offsets(&shape, &offsets, data.len())?;
        Ok(Self::from_parts(data, shape, offsets))
    }

    pub(crate) fn from_parts(data: &'a [T], shape: Shape<N>, offsets: Vec<usize>) -> Self {
        Self { data, shape, offsets }
    }

    /// Buffer offsets in logical row-major order
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Rearranges the same selection under another shape of equal size
    pub fn reshape<const M: usize>(self, shape: impl Into<Shape<M>>) -> Result<IndirectTensor<'a, T, M>> {
        let shape = shape.into();
        check_reshape(self.shape.as_slice(), shape.as_slice())?;
        Ok(IndirectTensor::from_parts(self.data, shape, self.offsets))
    }
}

impl<T, const N: usize> Clone for IndirectTensor<'_, T, N> {
    fn clone(&self) -> Self {
        Self::from_parts(self.data, self.shape, self.offsets.clone())
    }
}

impl<T, const N: usize> fmt::Debug for IndirectTensor<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndirectTensor")
            .field("shape", &self.shape)
            .field("offsets", &self.offsets)
            .finish()
    }
}

impl<T, const N: usize> NdArray<N> for IndirectTensor<'_, T, N> {
    type Elem = T;

    fn buffer(&self) -> &[T] {
        self.data
    }

    fn mapping(&self) -> Mapping<'_, N> {
        Mapping::Indirect {
            shape: self.shape,
            offsets: &self.offsets,
        }
    }
}

/// Writable explicit selection
pub struct IndirectTensorMut<'a, T, const N: usize> {
    data: &'a mut [T],
    shape: Shape<N>,
    offsets: Vec<usize>,
}

impl<'a, T, const N: usize> IndirectTensorMut<'a, T, N> {
    /// Selects `offsets` of `data` for writing, arranged under `shape`
    pub fn new(data: &'a mut [T], shape: impl Into<Shape<N>>, offsets: Vec<usize>) -> Result<Self> {
        let shape = shape.into();
        check_offsets(&shape, &offsets, data.len())?;
        Ok(Self::from_parts(data, shape, offsets))
    }

    pub(crate) fn from_parts(data: &'a mut [T], shape: Shape<N>, offsets: Vec<usize>) -> Self {
        Self { data, shape, offsets }
    }

    /// Buffer offsets in logical row-major order
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Gives up write access
    pub fn into_readonly(self) -> IndirectTensor<'a, T, N> {
        IndirectTensor::from_parts(self.data, self.shape, self.offsets)
    }

    /// Rearranges the same selection under another shape of equal size
    pub fn reshape<const M: usize>(self, shape: impl Into<Shape<M>>) -> Result<IndirectTensorMut<'a, T, M>> {
        let shape = shape.into();
        check_reshape(self.shape.as_slice(), shape.as_slice())?;
        Ok(IndirectTensorMut::from_parts(self.data, shape, self.offsets))
    }
}

impl<T, const N: usize> fmt::Debug for IndirectTensorMut<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndirectTensorMut")
            .field("shape", &self.shape)
            .field("offsets", &self.offsets)
            .finish()
    }
}

impl<T, const N: usize> NdArray<N> for IndirectTensorMut<'_, T, N> {
    type Elem = T;

    fn buffer(&self) -> &[T] {
        &*self.data
    }

    fn mapping(&self) -> Mapping<'_, N> {
        Mapping::Indirect {
            shape: self.shape,
            offsets: &self.offsets,
        }
    }
}

impl<T, const N: usize> NdArrayMut<N> for IndirectTensorMut<'_, T, N> {
    fn parts_mut(&mut self) -> (&mut [T], Mapping<'_, N>) {
        (
            &mut *self.data,
            Mapping::Indirect {
                shape: self.shape,
                offsets: &self.offsets,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Order;
    use crate::tensor::Tensor;

    #[test]
    fn test_new_validates_offsets() {
        let data = [1, 2, 3];
        assert!(IndirectTensor::new(&data, [2], vec![0, 2]).is_ok());
        assert!(IndirectTensor::new(&data, [2], vec![0]).is_err());
        assert!(IndirectTensor::new(&data, [2], vec![0, 3]).is_err());
    }

    #[test]
    fn test_duplicate_offsets_apply_in_order() {
        let mut data = [0, 0, 0];
        let mut sel = IndirectTensorMut::new(&mut data, [4], vec![1, 1, 2, 1]).unwrap();
        let source = Tensor::from_vec([4], vec![5, 6, 7, 8]).unwrap();
        sel.assign(&source).unwrap();
        assert_eq!(data, [0, 8, 7]);
    }

    #[test]
    fn test_reshape_and_orders() {
        let data = [10, 20, 30, 40, 50, 60];
        let sel = IndirectTensor::new(&data, [6], vec![5, 4, 3, 2, 1, 0]).unwrap();
        let grid = sel.reshape([2, 3]).unwrap();
        assert_eq!(grid.get([1, 0]), Some(&30));
        let cols: Vec<i32> = grid.iter_order(Order::ColumnMajor).copied().collect();
        assert_eq!(cols, vec![60, 30, 50, 20, 40, 10]);
    }

    #[test]
    fn test_select_then_copy_is_independent() {
        let mut t = Tensor::from_vec([4], vec![1, 2, 3, 4]).unwrap();
        let picks = Tensor::from_vec([2], vec![3usize, 0]).unwrap();
        let copy = t.take_flat(&picks).unwrap();
        t.select_flat_mut(&picks).unwrap().fill(0);
        assert_eq!(copy.as_slice(), &[4, 1]);
        assert_eq!(t.as_slice(), &[0, 2, 3, 0]);
    }
}
