//! The uniform read and write surface shared by every storage kind
//!
//! Algorithms are written against these traits only: they see a shape, a
//! buffer and a [`Mapping`] from coordinates to buffer offsets, never the
//! concrete storage kind.

use crate::broadcast::source_coords;
use crate::error::{Result, TensorError};
use crate::expr::Expr;
use crate::indexing;
use crate::indirect::{IndirectTensor, IndirectTensorMut};
use crate::iter::{IndexedIter, Iter, Mapping};
use crate::layout::Layout;
use crate::shape::{NdIndex, Order, Shape, Strides};
use crate::slice::IndexArg;
use crate::tensor::Tensor;
use crate::view::{TensorView, TensorViewMut};

/// Read access to a rank-`N` array of elements
pub trait NdArray<const N: usize> {
    /// Element type
    type Elem;

    /// The buffer the elements live in
    fn buffer(&self) -> &[Self::Elem];

    /// How coordinates map onto [`NdArray::buffer`]
    fn mapping(&self) -> Mapping<'_, N>;

    /// Logical shape
    fn shape(&self) -> Shape<N> {
        self.mapping().shape()
    }

    /// Number of logical elements
    fn size(&self) -> usize {
        self.shape().size()
    }

    /// Number of axes
    fn ndim(&self) -> usize {
        N
    }

    /// Returns whether the array has no elements
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// The element at `index`, or `None` if it is out of bounds
    fn get<I: Into<NdIndex<N>>>(&self, index: I) -> Option<&Self::Elem> {
        let index = index.into();
        let mapping = self.mapping();
        if !mapping.shape().contains(index.coords()) {
            return None;
        }
        self.buffer().get(mapping.offset_of(index.coords()))
    }

    /// The element at `index`
    fn at<I: Into<NdIndex<N>>>(&self, index: I) -> Result<&Self::Elem> {
        let index = index.into();
        let mapping = self.mapping();
        mapping.shape().check_index(index.coords(), "element access")?;
        Ok(&self.buffer()[mapping.offset_of(index.coords())])
    }

    /// Row-major iterator
    fn iter(&self) -> Iter<'_, Self::Elem, N> {
        self.iter_order(Order::RowMajor)
    }

    /// Iterator in the given traversal order
    fn iter_order(&self, order: Order) -> Iter<'_, Self::Elem, N> {
        Iter::new(self.buffer(), self.mapping(), order)
    }

    /// Row-major iterator over `(coordinates, element)` pairs
    fn indexed_iter(&self) -> IndexedIter<'_, Self::Elem, N> {
        IndexedIter::new(self.iter())
    }

    /// Collects the elements in row-major order
    fn to_vec(&self) -> Vec<Self::Elem>
    where
        Self::Elem: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Deep-copies the elements into a new owning tensor
    fn copy(&self) -> Result<Tensor<Self::Elem, N>>
    where
        Self::Elem: Clone,
    {
        Tensor::from_iter_shape(self.shape(), self.iter().cloned())
    }

    /// Returns whether both arrays have the same shape and equal elements
    fn elements_eq<B>(&self, other: &B) -> bool
    where
        B: NdArray<N> + ?Sized,
        Self::Elem: PartialEq<B::Elem>,
    {
        self.shape() == other.shape() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }

    /// Copies the elements addressed by a tensor of coordinates; the result
    /// has the shape of `coords`
    fn take<const M: usize, C>(&self, coords: &C) -> Result<Tensor<Self::Elem, M>>
    where
        C: NdArray<M, Elem = NdIndex<N>> + ?Sized,
        Self::Elem: Clone,
    {
        self.select(coords)?.copy()
    }

    /// Read-only selection aliasing the elements addressed by `coords`
    fn select<const M: usize, C>(&self, coords: &C) -> Result<IndirectTensor<'_, Self::Elem, M>>
    where
        C: NdArray<M, Elem = NdIndex<N>> + ?Sized,
    {
        let (shape, offsets) = indexing::gather_coords(&self.mapping(), coords)?;
        Ok(IndirectTensor::from_parts(self.buffer(), shape, offsets))
    }

    /// Copies the elements at plain integer positions of a rank-1 array
    fn take_flat<const M: usize, C>(&self, indices: &C) -> Result<Tensor<Self::Elem, M>>
    where
        C: NdArray<M, Elem = usize> + ?Sized,
        Self::Elem: Clone,
    {
        self.select_flat(indices)?.copy()
    }

    /// Read-only selection of plain integer positions of a rank-1 array
    fn select_flat<const M: usize, C>(&self, indices: &C) -> Result<IndirectTensor<'_, Self::Elem, M>>
    where
        C: NdArray<M, Elem = usize> + ?Sized,
    {
        let (shape, offsets) = indexing::gather_flat(&self.mapping(), indices)?;
        Ok(IndirectTensor::from_parts(self.buffer(), shape, offsets))
    }

    /// Copies, in row-major order, every element where `mask` is `true`
    fn mask<B>(&self, mask: &B) -> Result<Tensor<Self::Elem, 1>>
    where
        B: NdArray<N, Elem = bool> + ?Sized,
        Self::Elem: Clone,
    {
        self.select_mask(mask)?.copy()
    }

    /// Read-only selection of every element where `mask` is `true`
    fn select_mask<B>(&self, mask: &B) -> Result<IndirectTensor<'_, Self::Elem, 1>>
    where
        B: NdArray<N, Elem = bool> + ?Sized,
    {
        let (shape, offsets) = indexing::gather_mask(&self.mapping(), mask)?;
        Ok(IndirectTensor::from_parts(self.buffer(), shape, offsets))
    }
}

/// Write access to a rank-`N` array.
///
/// Every bulk write validates shapes before touching the buffer, so a failed
/// call leaves the destination unchanged.
pub trait NdArrayMut<const N: usize>: NdArray<N> {
    /// The buffer and mapping, borrowed together
    fn parts_mut(&mut self) -> (&mut [Self::Elem], Mapping<'_, N>);

    /// Mutable element at `index`, or `None` if it is out of bounds
    fn get_mut<I: Into<NdIndex<N>>>(&mut self, index: I) -> Option<&mut Self::Elem> {
        let index = index.into();
        let (data, mapping) = self.parts_mut();
        if !mapping.shape().contains(index.coords()) {
            return None;
        }
        data.get_mut(mapping.offset_of(index.coords()))
    }

    /// Mutable element at `index`
    fn at_mut<I: Into<NdIndex<N>>>(&mut self, index: I) -> Result<&mut Self::Elem> {
        let index = index.into();
        let (data, mapping) = self.parts_mut();
        mapping.shape().check_index(index.coords(), "element access")?;
        Ok(&mut data[mapping.offset_of(index.coords())])
    }

    /// Writes `value` to every element
    fn fill(&mut self, value: Self::Elem)
    where
        Self::Elem: Clone,
    {
        let (data, mapping) = self.parts_mut();
        for offset in mapping.offsets(Order::RowMajor) {
            data[offset] = value.clone();
        }
    }

    /// Applies `f` to every element in row-major order.
    ///
    /// Duplicate positions of an indirect selection are visited once per
    /// occurrence.
    fn map_inplace<F: FnMut(&mut Self::Elem)>(&mut self, mut f: F) {
        let (data, mapping) = self.parts_mut();
        for offset in mapping.offsets(Order::RowMajor) {
            f(&mut data[offset]);
        }
    }

    /// Copies `source` into this array, stretching its size-1 axes
    fn assign<A>(&mut self, source: &A) -> Result<()>
    where
        A: NdArray<N, Elem = Self::Elem> + ?Sized,
        Self::Elem: Clone,
    {
        let source_shape = source.shape();
        check_assignable(source_shape, self.shape())?;
        let source_mapping = source.mapping();
        let source_data = source.buffer();
        let (data, mapping) = self.parts_mut();
        let mut offsets = mapping.offsets(Order::RowMajor);
        while let Some((coords, offset)) = offsets.next_indexed() {
            let from = source_mapping.offset_of(&source_coords(&coords, &source_shape));
            data[offset] = source_data[from].clone();
        }
        Ok(())
    }

    /// Evaluates `expr` directly into this array
    fn assign_expr(&mut self, expr: &Expr<'_, Self::Elem, N>) -> Result<()>
    where
        Self::Elem: Copy,
    {
        if let Some(shape) = expr.shape()? {
            check_assignable(shape, self.shape())?;
        }
        let (data, mapping) = self.parts_mut();
        let mut offsets = mapping.offsets(Order::RowMajor);
        while let Some((coords, offset)) = offsets.next_indexed() {
            data[offset] = expr.eval_at(&coords);
        }
        Ok(())
    }

    /// Writable selection aliasing the elements addressed by `coords`
    fn select_mut<const M: usize, C>(&mut self, coords: &C) -> Result<IndirectTensorMut<'_, Self::Elem, M>>
    where
        C: NdArray<M, Elem = NdIndex<N>> + ?Sized,
    {
        let (data, mapping) = self.parts_mut();
        let (shape, offsets) = indexing::gather_coords(&mapping, coords)?;
        Ok(IndirectTensorMut::from_parts(data, shape, offsets))
    }

    /// Writable selection of plain integer positions of a rank-1 array
    fn select_flat_mut<const M: usize, C>(&mut self, indices: &C) -> Result<IndirectTensorMut<'_, Self::Elem, M>>
    where
        C: NdArray<M, Elem = usize> + ?Sized,
    {
        let (data, mapping) = self.parts_mut();
        let (shape, offsets) = indexing::gather_flat(&mapping, indices)?;
        Ok(IndirectTensorMut::from_parts(data, shape, offsets))
    }

    /// Writable selection of every element where `mask` is `true`
    fn select_mask_mut<B>(&mut self, mask: &B) -> Result<IndirectTensorMut<'_, Self::Elem, 1>>
    where
        B: NdArray<N, Elem = bool> + ?Sized,
    {
        let (data, mapping) = self.parts_mut();
        let (shape, offsets) = indexing::gather_mask(&mapping, mask)?;
        Ok(IndirectTensorMut::from_parts(data, shape, offsets))
    }
}

/// Each source axis must match the destination or have size 1
fn check_assignable<const N: usize>(source: Shape<N>, target: Shape<N>) -> Result<()> {
    let fits = (0..N).all(|axis| source[axis] == target[axis] || source[axis] == 1);
    if !fits {
        return Err(TensorError::shape_mismatch(
            "ASSIGN_SHAPE_MISMATCH",
            format!("could not broadcast input array from shape {} into shape {}", source, target),
            "assignment",
            source.to_string(),
            target.to_string(),
            "Assign an operand whose axes equal the destination's or are 1",
        ));
    }
    Ok(())
}

/// Arrays described by a strided [`Layout`]; every layout transform yields
/// a view over the same buffer
pub trait StridedArray<const N: usize>: NdArray<N> {
    /// The strided layout
    fn layout(&self) -> Layout<N>;

    /// Per-axis strides
    fn strides(&self) -> Strides<N> {
        self.layout().strides()
    }

    /// Returns whether the elements are dense and row-major
    fn is_contiguous(&self) -> bool {
        self.layout().is_row_major_contiguous()
    }

    /// A view of the whole array
    fn view(&self) -> TensorView<'_, Self::Elem, N> {
        TensorView::from_layout(self.buffer(), self.layout())
    }

    /// Applies integer and slice arguments; see [`Layout::index`]
    fn slice<const M: usize>(&self, args: &[IndexArg]) -> Result<TensorView<'_, Self::Elem, M>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().index(args)?))
    }

    /// Reverses the order of the axes
    fn transpose(&self) -> TensorView<'_, Self::Elem, N> {
        TensorView::from_layout(self.buffer(), self.layout().reversed_axes())
    }

    /// Reorders the axes: result axis `i` is axis `axes[i]`
    fn permute(&self, axes: [usize; N]) -> Result<TensorView<'_, Self::Elem, N>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().permute(axes)?))
    }

    /// Exchanges two axes
    fn swap_axes(&self, a: usize, b: usize) -> Result<TensorView<'_, Self::Elem, N>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().swap_axes(a, b)?))
    }

    /// Reverses the element order along `axis`
    fn flip(&self, axis: usize) -> Result<TensorView<'_, Self::Elem, N>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().flip(axis)?))
    }

    /// Rotates by 90 degrees `k` times in the plane of `axes`
    fn rot90(&self, k: i32, axes: (usize, usize)) -> Result<TensorView<'_, Self::Elem, N>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().rot90(k, axes)?))
    }

    /// Views the elements under a new shape; requires row-major contiguity
    fn reshape_view<const M: usize>(&self, shape: impl Into<Shape<M>>) -> Result<TensorView<'_, Self::Elem, M>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().reshape(shape.into())?))
    }

    /// Drops every size-1 axis
    fn squeeze<const M: usize>(&self) -> Result<TensorView<'_, Self::Elem, M>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().squeeze()?))
    }

    /// Inserts a size-1 axis at `axis`
    fn expand_dims<const M: usize>(&self, axis: usize) -> Result<TensorView<'_, Self::Elem, M>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().expand_dims(axis)?))
    }

    /// Read-only view stretched to `shape` with zero strides
    fn broadcast_to<const M: usize>(&self, shape: impl Into<Shape<M>>) -> Result<TensorView<'_, Self::Elem, M>> {
        Ok(TensorView::from_layout(self.buffer(), self.layout().broadcast_to(shape.into())?))
    }

    /// Leaf of a lazy element-wise expression
    fn expr(&self) -> Expr<'_, Self::Elem, N> {
        Expr::Leaf(self.view())
    }
}

/// Strided arrays that can hand out writable views
pub trait StridedArrayMut<const N: usize>: StridedArray<N> + NdArrayMut<N> {
    /// A writable view of the whole array
    fn view_mut(&mut self) -> TensorViewMut<'_, Self::Elem, N> {
        let layout = self.layout();
        let (data, _) = self.parts_mut();
        TensorViewMut::from_layout(data, layout)
    }

    /// Writable counterpart of [`StridedArray::slice`]
    fn slice_mut<const M: usize>(&mut self, args: &[IndexArg]) -> Result<TensorViewMut<'_, Self::Elem, M>> {
        let layout = self.layout().index(args)?;
        let (data, _) = self.parts_mut();
        Ok(TensorViewMut::from_layout(data, layout))
    }

    /// Writable counterpart of [`StridedArray::transpose`]
    fn transpose_mut(&mut self) -> TensorViewMut<'_, Self::Elem, N> {
        let layout = self.layout().reversed_axes();
        let (data, _) = self.parts_mut();
        TensorViewMut::from_layout(data, layout)
    }

    /// Writable counterpart of [`StridedArray::permute`]
    fn permute_mut(&mut self, axes: [usize; N]) -> Result<TensorViewMut<'_, Self::Elem, N>> {
        let layout = self.layout().permute(axes)?;
        let (data, _) = self.parts_mut();
        Ok(TensorViewMut::from_layout(data, layout))
    }

    /// Writable counterpart of [`StridedArray::swap_axes`]
    fn swap_axes_mut(&mut self, a: usize, b: usize) -> Result<TensorViewMut<'_, Self::Elem, N>> {
        let layout = self.layout().swap_axes(a, b)?;
        let (data, _) = self.parts_mut();
        Ok(TensorViewMut::from_layout(data, layout))
    }

    /// Writable counterpart of [`StridedArray::flip`]
    fn flip_mut(&mut self, axis: usize) -> Result<TensorViewMut<'_, Self::Elem, N>> {
        let layout = self.layout().flip(axis)?;
        let (data, _) = self.parts_mut();
        Ok(TensorViewMut::from_layout(data, layout))
    }

    /// Writable counterpart of [`StridedArray::reshape_view`]
    fn reshape_view_mut<const M: usize>(
        &mut self,
        shape: impl Into<Shape<M>>,
    ) -> Result<TensorViewMut<'_, Self::Elem, M>> {
        let layout = self.layout().reshape(shape.into())?;
        let (data, _) = self.parts_mut();
        Ok(TensorViewMut::from_layout(data, layout))
    }
}

impl<A, const N: usize> StridedArrayMut<N> for A where A: StridedArray<N> + NdArrayMut<N> + ?Sized {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s;

    fn counting(shape: [usize; 2]) -> Tensor<i32, 2> {
        let len = (shape[0] * shape[1]) as i32;
        Tensor::from_iter_shape(Shape::new(shape), 0..len).unwrap()
    }

    #[test]
    fn test_checked_access() {
        let t = counting([3, 4]);
        assert_eq!(t.get([2, 3]), Some(&11));
        assert_eq!(t.get([3, 0]), None);
        let err = t.at([0, 4]).unwrap_err();
        assert_eq!(err.code(), "INDEX_OUT_OF_RANGE");
    }

    #[test]
    fn test_assign_broadcasts_source() {
        let mut t = Tensor::<i32, 2>::zeros(Shape::new([2, 3])).unwrap();
        let row = Tensor::from_vec(Shape::new([1, 3]), vec![1, 2, 3]).unwrap();
        t.assign(&row).unwrap();
        assert_eq!(t.as_slice(), &[1, 2, 3, 1, 2, 3]);

        let bad = Tensor::from_vec(Shape::new([1, 2]), vec![7, 8]).unwrap();
        let err = t.assign(&bad).unwrap_err();
        assert_eq!(err.code(), "ASSIGN_SHAPE_MISMATCH");
        assert_eq!(t.as_slice(), &[1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_writes_through_views() {
        let mut t = counting([3, 4]);
        t.slice_mut::<1>(&s![.., 1]).unwrap().fill(-1);
        assert_eq!(t.to_vec(), vec![0, -1, 2, 3, 4, -1, 6, 7, 8, -1, 10, 11]);

        t.transpose_mut().map_inplace(|x| *x *= 2);
        assert_eq!(t[[2, 3]], 22);
    }

    #[test]
    fn test_selection_modes() {
        let mut t = counting([2, 3]);
        let coords = Tensor::from_vec(Shape::new([2]), vec![NdIndex::new([1, 2]), NdIndex::new([0, 0])]).unwrap();
        assert_eq!(t.take(&coords).unwrap().to_vec(), vec![5, 0]);

        t.select_mut(&coords).unwrap().fill(9);
        assert_eq!(t.to_vec(), vec![9, 1, 2, 3, 4, 9]);

        let mask = Tensor::from_fn(Shape::new([2, 3]), |i| i[1] == 1).unwrap();
        assert_eq!(t.mask(&mask).unwrap().to_vec(), vec![1, 4]);
    }

    #[test]
    fn test_elements_eq_across_kinds() {
        let t = counting([2, 2]);
        assert!(t.view().elements_eq(&t));
        assert!(!t.transpose().elements_eq(&t));
    }
}
