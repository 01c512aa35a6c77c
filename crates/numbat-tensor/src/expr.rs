//! Lazy element-wise expressions
//!
//! An [`Expr`] is a small tree over borrowed views. Building one with the
//! arithmetic operators allocates nothing but boxed nodes; the elements are
//! computed once, when the tree is evaluated into a new tensor with
//! [`Expr::eval`] or into an existing array with
//! [`crate::NdArrayMut::assign_expr`].
//!
//! ```
//! use numbat_tensor::prelude::*;
//!
//! let a = Tensor::from_vec([2, 1], vec![1.0, 2.0]).unwrap();
//! let b = Tensor::from_vec([1, 3], vec![10.0, 20.0, 30.0]).unwrap();
//! let e = a.expr() * Expr::scalar(2.0) + b.expr();
//! assert_eq!(e.eval().unwrap().as_slice(), &[12.0, 22.0, 32.0, 14.0, 24.0, 34.0]);
//! ```

use std::ops;

use tracing::debug;

use crate::array::{NdArray, StridedArray};
use crate::broadcast::{broadcast_pair, source_coords};
use crate::error::{Result, TensorError};
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::view::TensorView;

/// Node of a lazy element-wise expression
#[derive(Debug, Clone)]
pub enum Expr<'a, T, const N: usize> {
    /// Elements of a view; size-1 axes stretch to the surrounding shape
    Leaf(TensorView<'a, T, N>),
    /// The same value at every position
    Scalar(T),
    /// Explicit stretch of the inner expression to a shape
    Broadcast(Box<Expr<'a, T, N>>, Shape<N>),
    /// Function applied to each element
    Unary(fn(T) -> T, Box<Expr<'a, T, N>>),
    /// Function combining two broadcast operands
    Binary(fn(T, T) -> T, Box<Expr<'a, T, N>>, Box<Expr<'a, T, N>>),
}

impl<'a, T: Copy, const N: usize> Expr<'a, T, N> {
    /// Leaf over a view
    pub fn leaf(view: TensorView<'a, T, N>) -> Self {
        Expr::Leaf(view)
    }

    /// Constant leaf
    pub fn scalar(value: T) -> Self {
        Expr::Scalar(value)
    }

    /// Applies `f` to every element
    pub fn map(self, f: fn(T) -> T) -> Self {
        Expr::Unary(f, Box::new(self))
    }

    /// Combines two expressions element-wise with `f`
    pub fn zip_with(self, other: Self, f: fn(T, T) -> T) -> Self {
        Expr::Binary(f, Box::new(self), Box::new(other))
    }

    /// Stretches the expression to `shape`
    pub fn broadcast(self, shape: impl Into<Shape<N>>) -> Self {
        Expr::Broadcast(Box::new(self), shape.into())
    }

    /// Element-wise maximum
    pub fn maximum(self, other: Self) -> Self
    where
        T: PartialOrd,
    {
        self.zip_with(other, |a, b| if b > a { b } else { a })
    }

    /// Element-wise minimum
    pub fn minimum(self, other: Self) -> Self
    where
        T: PartialOrd,
    {
        self.zip_with(other, |a, b| if b < a { b } else { a })
    }

    /// The shape this expression evaluates to; `None` for a pure scalar.
    ///
    /// Broadcasting is validated here, so this is where incompatible
    /// operands are reported.
    pub fn shape(&self) -> Result<Option<Shape<N>>> {
        match self {
            Expr::Leaf(view) => Ok(Some(view.shape())),
            Expr::Scalar(_) => Ok(None),
            Expr::Broadcast(inner, shape) => {
                if let Some(inner_shape) = inner.shape()? {
                    if broadcast_pair(inner_shape, *shape, "broadcast")? != *shape {
                        return Err(TensorError::broadcast(
                            "BROADCAST_TO_INCOMPATIBLE",
                            format!(
                                "could not broadcast input array from shape {} into shape {}",
                                inner_shape, shape
                            ),
                            "broadcast",
                            inner_shape.as_slice(),
                            shape.as_slice(),
                            0,
                            "Only size-1 axes can be stretched",
                        ));
                    }
                }
                Ok(Some(*shape))
            }
            Expr::Unary(_, inner) => inner.shape(),
            Expr::Binary(_, lhs, rhs) => match (lhs.shape()?, rhs.shape()?) {
                (Some(l), Some(r)) => Ok(Some(broadcast_pair(l, r, "expression")?)),
                (l, r) => Ok(l.or(r)),
            },
        }
    }

    /// Value at `coords` of the broadcast result; shapes must already be
    /// validated by [`Expr::shape`]
    pub(crate) fn eval_at(&self, coords: &[usize; N]) -> T {
        match self {
            Expr::Leaf(view) => {
                let shape = view.shape();
                let at = source_coords(coords, &shape);
                view.buffer()[view.layout().offset_of(&at)]
            }
            Expr::Scalar(value) => *value,
            Expr::Broadcast(inner, _) => inner.eval_at(coords),
            Expr::Unary(f, inner) => f(inner.eval_at(coords)),
            Expr::Binary(f, lhs, rhs) => f(lhs.eval_at(coords), rhs.eval_at(coords)),
        }
    }

    /// Materializes the expression into a new tensor
    pub fn eval(&self) -> Result<Tensor<T, N>> {
        let shape = self.shape()?.ok_or_else(|| {
            TensorError::invalid_argument(
                "SCALAR_EXPRESSION",
                "a scalar-only expression has no shape to evaluate into",
                "expression evaluation",
                "Broadcast the scalar to a shape first",
            )
        })?;
        debug!(shape = %shape, "evaluating expression");
        Tensor::from_fn(shape, |index| self.eval_at(index.coords()))
    }
}

impl<'a, T, const N: usize> From<TensorView<'a, T, N>> for Expr<'a, T, N> {
    fn from(view: TensorView<'a, T, N>) -> Self {
        Expr::Leaf(view)
    }
}

impl<'a, T, const N: usize> From<&'a Tensor<T, N>> for Expr<'a, T, N> {
    fn from(tensor: &'a Tensor<T, N>) -> Self {
        Expr::Leaf(tensor.view())
    }
}

macro_rules! impl_expr_binary {
    ($($trait:ident :: $method:ident => $op:tt),* $(,)?) => {
        $(
            impl<'a, T, const N: usize> ops::$trait for Expr<'a, T, N>
            where
                T: Copy + ops::$trait<Output = T>,
            {
                type Output = Expr<'a, T, N>;

                fn $method(self, rhs: Self) -> Self::Output {
                    Expr::Binary(|a, b| a $op b, Box::new(self), Box::new(rhs))
                }
            }
        )*
    };
}

impl_expr_binary!(
    Add::add => +,
    Sub::sub => -,
    Mul::mul => *,
    Div::div => /,
    Rem::rem => %,
    BitAnd::bitand => &,
    BitOr::bitor => |,
    BitXor::bitxor => ^,
);

impl<'a, T, const N: usize> ops::Neg for Expr<'a, T, N>
where
    T: Copy + ops::Neg<Output = T>,
{
    type Output = Expr<'a, T, N>;

    fn neg(self) -> Self::Output {
        Expr::Unary(|a| -a, Box::new(self))
    }
}

impl<'a, T, const N: usize> ops::Not for Expr<'a, T, N>
where
    T: Copy + ops::Not<Output = T>,
{
    type Output = Expr<'a, T, N>;

    fn not(self) -> Self::Output {
        Expr::Unary(|a| !a, Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::NdArrayMut;
    use crate::error::ErrorKind;

    #[test]
    fn test_lazy_broadcast_maximum() {
        let a = Tensor::from_vec([4, 1], vec![1, 5, 3, 0]).unwrap();
        let b = Tensor::from_vec([1, 3], vec![2, 4, 6]).unwrap();
        let m = a.expr().maximum(b.expr());
        assert_eq!(m.shape().unwrap(), Some(Shape::new([4, 3])));
        let out = m.eval().unwrap();
        for i in 0..4 {
            for j in 0..3 {
                assert_eq!(out[[i, j]], a[[i, 0]].max(b[[0, j]]));
            }
        }
    }

    #[test]
    fn test_incompatible_shapes_reported_lazily() {
        let a = Tensor::<i32, 2>::zeros([4, 3]).unwrap();
        let b = Tensor::<i32, 2>::zeros([3, 4]).unwrap();
        let e = a.expr() + b.expr();
        assert_eq!(e.shape().unwrap_err().kind(), ErrorKind::Broadcast);
        assert!(e.eval().is_err());
    }

    #[test]
    fn test_assign_expr_into_view() {
        let src = Tensor::from_vec([3], vec![1.0, 2.0, 3.0]).unwrap();
        let mut dst = Tensor::<f64, 1>::zeros([3]).unwrap();
        let e = -src.expr() * Expr::scalar(2.0);
        dst.assign_expr(&e).unwrap();
        assert_eq!(dst.as_slice(), &[-2.0, -4.0, -6.0]);

        let wrong = Tensor::<f64, 1>::zeros([2]).unwrap();
        assert!(dst.assign_expr(&wrong.expr()).is_err());
        assert_eq!(dst.as_slice(), &[-2.0, -4.0, -6.0]);
    }

    #[test]
    fn test_scalar_only_expression() {
        let e: Expr<'_, i32, 2> = Expr::scalar(1) + Expr::scalar(2);
        assert_eq!(e.shape().unwrap(), None);
        assert!(e.eval().is_err());
        let b = e.broadcast([2, 2]).eval().unwrap();
        assert_eq!(b.as_slice(), &[3, 3, 3, 3]);
    }

    #[test]
    fn test_map_and_bitwise() {
        let a = Tensor::from_vec([4], vec![0b1100u8, 0b1010, 0b0110, 0b0001]).unwrap();
        let b = Tensor::from_vec([1], vec![0b1000u8]).unwrap();
        let e = (a.expr() & b.expr()).map(|x| x >> 3);
        assert_eq!(e.eval().unwrap().as_slice(), &[1, 1, 0, 0]);
    }
}
