//! Strided views borrowing another array's buffer
//!
//! [`TensorView`] is `Copy`, and its layout transforms consume the view and
//! return one with the same lifetime, so chains like
//! `t.slice::<2>(..)?.transpose().flip(0)?` keep borrowing `t`, not a
//! temporary. [`TensorViewMut`] offers the same transforms as `into_*`
//! methods.

use std::fmt;

use crate::array::{NdArray, NdArrayMut, StridedArray};
use crate::error::{Result, TensorError};
use crate::expr::Expr;
use crate::iter::Mapping;
use crate::layout::Layout;
use crate::shape::Shape;
use crate::slice::IndexArg;

/// Checks that every in-bounds coordinate of `layout` lands inside a buffer
/// of `len` elements
fn check_fits<const N: usize>(layout: &Layout<N>, len: usize) -> Result<()> {
    if layout.size() == 0 {
        return Ok(());
    }
    let mut low = layout.offset() as isize;
    let mut high = low;
    for axis in 0..N {
        let span = layout.strides()[axis] * (layout.shape()[axis] as isize - 1);
        if span < 0 {
            low += span;
        } else {
            high += span;
        }
    }
    if low < 0 || high >= len as isize {
        return Err(TensorError::invalid_argument(
            "VIEW_OUT_OF_BOUNDS",
            format!(
                "layout with shape {} and strides {} addresses offsets {}..={} of a buffer of {} elements",
                layout.shape(),
                layout.strides(),
                low,
                high,
                len
            ),
            "view construction",
            "Choose strides and offset that stay inside the buffer",
        ));
    }
    Ok(())
}

/// Read-only strided view
pub struct TensorView<'a, T, const N: usize> {
    data: &'a [T],
    layout: Layout<N>,
}

impl<'a, T, const N: usize> TensorView<'a, T, N> {
    /// Views `data` through an arbitrary layout
    pub fn new(data: &'a [T], layout: Layout<N>) -> Result<Self> {
        check_fits(&layout, data.len())?;
        Ok(Self::from_layout(data, layout))
    }

    /// Views `data` as a row-major array of `shape`
    pub fn from_shape(data: &'a [T], shape: impl Into<Shape<N>>) -> Result<Self> {
        Self::new(data, Layout::contiguous(shape.into()))
    }

    pub(crate) fn from_layout(data: &'a [T], layout: Layout<N>) -> Self {
        Self { data, layout }
    }

    /// Applies integer and slice arguments
    pub fn slice<const M: usize>(self, args: &[IndexArg]) -> Result<TensorView<'a, T, M>> {
        Ok(TensorView::from_layout(self.data, self.layout.index(args)?))
    }

    /// Reverses the order of the axes
    pub fn transpose(self) -> Self {
        Self::from_layout(self.data, self.layout.reversed_axes())
    }

    /// Reorders the axes
    pub fn permute(self, axes: [usize; N]) -> Result<Self> {
        Ok(Self::from_layout(self.data, self.layout.permute(axes)?))
    }

    /// Exchanges two axes
    pub fn swap_axes(self, a: usize, b: usize) -> Result<Self> {
        Ok(Self::from_layout(self.data, self.layout.swap_axes(a, b)?))
    }

    /// Reverses the element order along `axis`
    pub fn flip(self, axis: usize) -> Result<Self> {
        Ok(Self::from_layout(self.data, self.layout.flip(axis)?))
    }

    /// Rotates by 90 degrees `k` times in the plane of `axes`
    pub fn rot90(self, k: i32, axes: (usize, usize)) -> Result<Self> {
        Ok(Self::from_layout(self.data, self.layout.rot90(k, axes)?))
    }

    /// Views the elements under a new shape
    pub fn reshape_view<const M: usize>(self, shape: impl Into<Shape<M>>) -> Result<TensorView<'a, T, M>> {
        Ok(TensorView::from_layout(self.data, self.layout.reshape(shape.into())?))
    }

    /// Drops every size-1 axis
    pub fn squeeze<const M: usize>(self) -> Result<TensorView<'a, T, M>> {
        Ok(TensorView::from_layout(self.data, self.layout.squeeze()?))
    }

    /// Inserts a size-1 axis
    pub fn expand_dims<const M: usize>(self, axis: usize) -> Result<TensorView<'a, T, M>> {
        Ok(TensorView::from_layout(self.data, self.layout.expand_dims(axis)?))
    }

    /// Stretches size-1 axes to `shape` with zero strides
    pub fn broadcast_to<const M: usize>(self, shape: impl Into<Shape<M>>) -> Result<TensorView<'a, T, M>> {
        Ok(TensorView::from_layout(self.data, self.layout.broadcast_to(shape.into())?))
    }

    /// Leaf of a lazy element-wise expression
    pub fn expr(self) -> Expr<'a, T, N> {
        Expr::Leaf(self)
    }
}

impl<T, const N: usize> Clone for TensorView<'_, T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const N: usize> Copy for TensorView<'_, T, N> {}

impl<T, const N: usize> fmt::Debug for TensorView<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("shape", &self.layout.shape())
            .field("strides", &self.layout.strides())
            .field("offset", &self.layout.offset())
            .finish()
    }
}

impl<T, const N: usize> NdArray<N> for TensorView<'_, T, N> {
    type Elem = T;

    fn buffer(&self) -> &[T] {
        self.data
    }

    fn mapping(&self) -> Mapping<'_, N> {
        Mapping::Strided(self.layout)
    }
}

impl<T, const N: usize> StridedArray<N> for TensorView<'_, T, N> {
    fn layout(&self) -> Layout<N> {
        self.layout
    }
}

/// Writable strided view
pub struct TensorViewMut<'a, T, const N: usize> {
    data: &'a mut [T],
    layout: Layout<N>,
}

impl<'a, T, const N: usize> TensorViewMut<'a, T, N> {
    /// Views `data` mutably through an arbitrary layout.
    ///
    /// Layouts that visit one buffer element from several positions (zero
    /// strides on an axis longer than one) are rejected.
    pub fn new(data: &'a mut [T], layout: Layout<N>) -> Result<Self> {
        check_fits(&layout, data.len())?;
        if layout.has_broadcast_axes() {
            return Err(TensorError::invalid_argument(
                "BROADCAST_DESTINATION",
                format!("cannot write through broadcast strides {}", layout.strides()),
                "view construction",
                "Broadcast the source operand instead of the destination",
            ));
        }
        Ok(Self::from_layout(data, layout))
    }

    /// Views `data` mutably as a row-major array of `shape`
    pub fn from_shape(data: &'a mut [T], shape: impl Into<Shape<N>>) -> Result<Self> {
        Self::new(data, Layout::contiguous(shape.into()))
    }

    pub(crate) fn from_layout(data: &'a mut [T], layout: Layout<N>) -> Self {
        Self { data, layout }
    }

    /// A shorter-lived writable view of the same elements
    pub fn reborrow(&mut self) -> TensorViewMut<'_, T, N> {
        TensorViewMut::from_layout(&mut *self.data, self.layout)
    }

    /// Gives up write access
    pub fn into_view(self) -> TensorView<'a, T, N> {
        TensorView::from_layout(self.data, self.layout)
    }

    /// Applies integer and slice arguments, keeping write access
    pub fn into_slice<const M: usize>(self, args: &[IndexArg]) -> Result<TensorViewMut<'a, T, M>> {
        let layout = self.layout.index(args)?;
        Ok(TensorViewMut::from_layout(self.data, layout))
    }

    /// Reverses the order of the axes
    pub fn into_transposed(self) -> Self {
        let layout = self.layout.reversed_axes();
        Self::from_layout(self.data, layout)
    }

    /// Reorders the axes
    pub fn into_permuted(self, axes: [usize; N]) -> Result<Self> {
        let layout = self.layout.permute(axes)?;
        Ok(Self::from_layout(self.data, layout))
    }

    /// Reverses the element order along `axis`
    pub fn into_flipped(self, axis: usize) -> Result<Self> {
        let layout = self.layout.flip(axis)?;
        Ok(Self::from_layout(self.data, layout))
    }

    /// Views the elements under a new shape
    pub fn into_reshaped<const M: usize>(self, shape: impl Into<Shape<M>>) -> Result<TensorViewMut<'a, T, M>> {
        let layout = self.layout.reshape(shape.into())?;
        Ok(TensorViewMut::from_layout(self.data, layout))
    }
}

impl<T, const N: usize> fmt::Debug for TensorViewMut<'_, T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorViewMut")
            .field("shape", &self.layout.shape())
            .field("strides", &self.layout.strides())
            .field("offset", &self.layout.offset())
            .finish()
    }
}

impl<T, const N: usize> NdArray<N> for TensorViewMut<'_, T, N> {
    type Elem = T;

    fn buffer(&self) -> &[T] {
        &*self.data
    }

    fn mapping(&self) -> Mapping<'_, N> {
        Mapping::Strided(self.layout)
    }
}

impl<T, const N: usize> NdArrayMut<N> for TensorViewMut<'_, T, N> {
    fn parts_mut(&mut self) -> (&mut [T], Mapping<'_, N>) {
        (&mut *self.data, Mapping::Strided(self.layout))
    }
}

impl<T, const N: usize> StridedArray<N> for TensorViewMut<'_, T, N> {
    fn layout(&self) -> Layout<N> {
        self.layout
    }
}
