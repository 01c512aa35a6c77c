//! Element-wise operations
//!
//! Binary operations broadcast operands of the same rank: each axis must be
//! equal or 1 in one of them. To combine different ranks, lift the smaller
//! operand with [`crate::StridedArray::broadcast_to`] or
//! [`crate::StridedArray::expand_dims`] first.

use std::cmp::Ordering;

use num_traits::{Float, Signed};

use crate::array::NdArray;
use crate::broadcast::{broadcast_pair, source_coords};
use crate::error::{Result, TensorError};
use crate::ops::Truthy;
use crate::tensor::Tensor;
use crate::view::TensorView;

/// Combines two same-rank operands under broadcasting
pub(crate) fn zip_map<const N: usize, A, B, U, F>(a: &A, b: &B, operation: &str, mut f: F) -> Result<Tensor<U, N>>
where
    A: NdArray<N> + ?Sized,
    B: NdArray<N> + ?Sized,
    F: FnMut(&A::Elem, &B::Elem) -> U,
{
    let (a_shape, b_shape) = (a.shape(), b.shape());
    let shape = broadcast_pair(a_shape, b_shape, operation)?;
    let (a_map, b_map) = (a.mapping(), b.mapping());
    let (a_data, b_data) = (a.buffer(), b.buffer());
    Tensor::from_fn(shape, |index| {
        let x = &a_data[a_map.offset_of(&source_coords(index.coords(), &a_shape))];
        let y = &b_data[b_map.offset_of(&source_coords(index.coords(), &b_shape))];
        f(x, y)
    })
}

/// Maps every element into a new tensor of the same shape
pub(crate) fn map_elements<const N: usize, A, U, F>(a: &A, f: F) -> Result<Tensor<U, N>>
where
    A: NdArray<N> + ?Sized,
    F: FnMut(&A::Elem) -> U,
{
    Tensor::from_iter_shape(a.shape(), a.iter().map(f))
}

/// Larger of two values; NaN-like (unordered) inputs propagate
pub(crate) fn max_propagating<T: PartialOrd + Copy>(x: T, y: T) -> T {
    match x.partial_cmp(&y) {
        Some(Ordering::Less) => y,
        Some(_) => x,
        None if x.partial_cmp(&x).is_none() => x,
        None => y,
    }
}

/// Smaller of two values; NaN-like (unordered) inputs propagate
pub(crate) fn min_propagating<T: PartialOrd + Copy>(x: T, y: T) -> T {
    match x.partial_cmp(&y) {
        Some(Ordering::Greater) => y,
        Some(_) => x,
        None if x.partial_cmp(&x).is_none() => x,
        None => y,
    }
}

macro_rules! arithmetic_op {
    ($(#[$doc:meta])* $name:ident, $bound:ident, $op:tt, $label:literal) => {
        $(#[$doc])*
        pub struct $name;

        impl $name {
            /// Applies the operation element-wise with broadcasting
            pub fn apply<T, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<T, N>>
            where
                A: NdArray<N, Elem = T> + ?Sized,
                B: NdArray<N, Elem = T> + ?Sized,
                T: Copy + std::ops::$bound<Output = T>,
            {
                zip_map(a, b, $label, |&x, &y| x $op y)
            }

            /// Applies the operation between every element and `scalar`
            pub fn apply_scalar<T, A, const N: usize>(a: &A, scalar: T) -> Result<Tensor<T, N>>
            where
                A: NdArray<N, Elem = T> + ?Sized,
                T: Copy + std::ops::$bound<Output = T>,
            {
                map_elements(a, |&x| x $op scalar)
            }
        }
    };
}

arithmetic_op!(
    /// Element-wise addition
    Add, Add, +, "add"
);
arithmetic_op!(
    /// Element-wise subtraction
    Sub, Sub, -, "subtract"
);
arithmetic_op!(
    /// Element-wise multiplication
    Mul, Mul, *, "multiply"
);
arithmetic_op!(
    /// Element-wise division; integer division by zero panics like the
    /// scalar operator
    Div, Div, /, "divide"
);
arithmetic_op!(
    /// Element-wise remainder
    Rem, Rem, %, "remainder"
);
arithmetic_op!(
    /// Element-wise bitwise and
    BitAnd, BitAnd, &, "bitwise_and"
);
arithmetic_op!(
    /// Element-wise bitwise or
    BitOr, BitOr, |, "bitwise_or"
);
arithmetic_op!(
    /// Element-wise bitwise xor
    BitXor, BitXor, ^, "bitwise_xor"
);

/// Element-wise maximum (`maximum`)
pub struct Max;

impl Max {
    /// Larger of each broadcast pair; NaN propagates
    pub fn apply<T, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        B: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        zip_map(a, b, "maximum", |&x, &y| max_propagating(x, y))
    }

    /// Larger of each element and `scalar`
    pub fn apply_scalar<T, A, const N: usize>(a: &A, scalar: T) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        map_elements(a, |&x| max_propagating(x, scalar))
    }
}

/// Element-wise minimum (`minimum`)
pub struct Min;

impl Min {
    /// Smaller of each broadcast pair; NaN propagates
    pub fn apply<T, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        B: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        zip_map(a, b, "minimum", |&x, &y| min_propagating(x, y))
    }

    /// Smaller of each element and `scalar`
    pub fn apply_scalar<T, A, const N: usize>(a: &A, scalar: T) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        map_elements(a, |&x| min_propagating(x, scalar))
    }
}

/// Element-wise power
pub struct Pow;

impl Pow {
    /// `a ** b` with broadcasting
    pub fn apply<T, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        B: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        zip_map(a, b, "power", |&x, &y| x.powf(y))
    }

    /// Raises every element to an integer power
    pub fn powi<T, A, const N: usize>(a: &A, exponent: i32) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        map_elements(a, |&x| x.powi(exponent))
    }
}

macro_rules! comparison_op {
    ($(#[$doc:meta])* $name:ident, $bound:ident, $op:tt, $label:literal) => {
        $(#[$doc])*
        pub struct $name;

        impl $name {
            /// Compares each broadcast pair
            pub fn apply<T, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<bool, N>>
            where
                A: NdArray<N, Elem = T> + ?Sized,
                B: NdArray<N, Elem = T> + ?Sized,
                T: $bound,
            {
                zip_map(a, b, $label, |x, y| x $op y)
            }

            /// Compares every element with `scalar`
            pub fn apply_scalar<T, A, const N: usize>(a: &A, scalar: T) -> Result<Tensor<bool, N>>
            where
                A: NdArray<N, Elem = T> + ?Sized,
                T: $bound,
            {
                map_elements(a, |x| *x $op scalar)
            }
        }
    };
}

comparison_op!(
    /// Element-wise `==`
    Equal, PartialEq, ==, "equal"
);
comparison_op!(
    /// Element-wise `!=`
    NotEqual, PartialEq, !=, "not_equal"
);
comparison_op!(
    /// Element-wise `<`
    Less, PartialOrd, <, "less"
);
comparison_op!(
    /// Element-wise `<=`
    LessEqual, PartialOrd, <=, "less_equal"
);
comparison_op!(
    /// Element-wise `>`
    Greater, PartialOrd, >, "greater"
);
comparison_op!(
    /// Element-wise `>=`
    GreaterEqual, PartialOrd, >=, "greater_equal"
);

/// Element-wise logical and
pub struct LogicalAnd;

impl LogicalAnd {
    /// Both truth values
    pub fn apply<T, U, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<bool, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        B: NdArray<N, Elem = U> + ?Sized,
        T: Truthy,
        U: Truthy,
    {
        zip_map(a, b, "logical_and", |x, y| x.is_truthy() && y.is_truthy())
    }
}

/// Element-wise logical or
pub struct LogicalOr;

impl LogicalOr {
    /// Either truth value
    pub fn apply<T, U, A, B, const N: usize>(a: &A, b: &B) -> Result<Tensor<bool, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        B: NdArray<N, Elem = U> + ?Sized,
        T: Truthy,
        U: Truthy,
    {
        zip_map(a, b, "logical_or", |x, y| x.is_truthy() || y.is_truthy())
    }
}

/// Element-wise logical not
pub struct LogicalNot;

impl LogicalNot {
    /// Negated truth value
    pub fn apply<T, A, const N: usize>(a: &A) -> Result<Tensor<bool, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        map_elements(a, |x| !x.is_truthy())
    }
}

/// Arbitrary binary function under broadcasting
pub struct ZipWith;

impl ZipWith {
    /// Calls `f` on each broadcast pair
    pub fn apply<A, B, U, F, const N: usize>(a: &A, b: &B, f: F) -> Result<Tensor<U, N>>
    where
        A: NdArray<N> + ?Sized,
        B: NdArray<N> + ?Sized,
        F: FnMut(&A::Elem, &B::Elem) -> U,
    {
        zip_map(a, b, "zip_with", f)
    }
}

/// Arbitrary unary function
pub struct Map;

impl Map {
    /// Calls `f` on every element
    pub fn apply<A, U, F, const N: usize>(a: &A, f: F) -> Result<Tensor<U, N>>
    where
        A: NdArray<N> + ?Sized,
        F: FnMut(&A::Elem) -> U,
    {
        map_elements(a, f)
    }
}

/// Three-way selection (`where`)
pub struct Where;

impl Where {
    /// Picks from `x` where `cond` holds and from `y` elsewhere, broadcasting
    /// all three operands
    pub fn select<T, C, X, Y, const N: usize>(cond: &C, x: &X, y: &Y) -> Result<Tensor<T, N>>
    where
        C: NdArray<N, Elem = bool> + ?Sized,
        X: NdArray<N, Elem = T> + ?Sized,
        Y: NdArray<N, Elem = T> + ?Sized,
        T: Clone,
    {
        let (c_shape, x_shape, y_shape) = (cond.shape(), x.shape(), y.shape());
        let shape = broadcast_pair(broadcast_pair(c_shape, x_shape, "where")?, y_shape, "where")?;
        let (c_map, x_map, y_map) = (cond.mapping(), x.mapping(), y.mapping());
        Tensor::from_fn(shape, |index| {
            let coords = index.coords();
            if cond.buffer()[c_map.offset_of(&source_coords(coords, &c_shape))] {
                x.buffer()[x_map.offset_of(&source_coords(coords, &x_shape))].clone()
            } else {
                y.buffer()[y_map.offset_of(&source_coords(coords, &y_shape))].clone()
            }
        })
    }
}

/// Element-wise negation
pub struct Neg;

impl Neg {
    /// `-x` for every element
    pub fn apply<T, A, const N: usize>(a: &A) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + std::ops::Neg<Output = T>,
    {
        map_elements(a, |&x| -x)
    }
}

/// Element-wise absolute value
pub struct Abs;

impl Abs {
    /// `|x|` for every element
    pub fn apply<T, A, const N: usize>(a: &A) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Signed,
    {
        map_elements(a, |x| x.abs())
    }
}

macro_rules! float_unary_op {
    ($(#[$doc:meta])* $name:ident, $method:ident) => {
        $(#[$doc])*
        pub struct $name;

        impl $name {
            /// Applies the function to every element
            pub fn apply<T, A, const N: usize>(a: &A) -> Result<Tensor<T, N>>
            where
                A: NdArray<N, Elem = T> + ?Sized,
                T: Float,
            {
                map_elements(a, |x| x.$method())
            }
        }
    };
}

float_unary_op!(
    /// Element-wise square root
    Sqrt, sqrt
);
float_unary_op!(
    /// Element-wise exponential
    Exp, exp
);
float_unary_op!(
    /// Element-wise natural logarithm
    Ln, ln
);
float_unary_op!(
    /// Element-wise sine
    Sin, sin
);
float_unary_op!(
    /// Element-wise cosine
    Cos, cos
);

/// Element-wise clamping to `[min, max]`
pub struct Clip;

impl Clip {
    /// Clamps every element; `min > max` is rejected
    pub fn apply<T, A, const N: usize>(a: &A, min: T, max: T) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        if min > max {
            return Err(TensorError::invalid_argument(
                "CLIP_INVERTED_BOUNDS",
                "clip lower bound is greater than the upper bound",
                "clip",
                "Pass min <= max",
            ));
        }
        map_elements(a, |&x| {
            if x < min {
                min
            } else if x > max {
                max
            } else {
                x
            }
        })
    }
}

macro_rules! impl_operator {
    ($lhs:ty, $($trait:ident :: $method:ident => $op:ident),*) => {
        $(
            impl<'r, T, R, const N: usize> std::ops::$trait<&'r R> for $lhs
            where
                R: NdArray<N, Elem = T>,
                T: Copy + std::ops::$trait<Output = T>,
            {
                type Output = Result<Tensor<T, N>>;

                fn $method(self, rhs: &'r R) -> Self::Output {
                    $op::apply(self, rhs)
                }
            }
        )*
    };
}

impl_operator!(
    &Tensor<T, N>,
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Rem,
    BitAnd::bitand => BitAnd,
    BitOr::bitor => BitOr,
    BitXor::bitxor => BitXor
);

impl_operator!(
    &TensorView<'_, T, N>,
    Add::add => Add,
    Sub::sub => Sub,
    Mul::mul => Mul,
    Div::div => Div,
    Rem::rem => Rem,
    BitAnd::bitand => BitAnd,
    BitOr::bitor => BitOr,
    BitXor::bitxor => BitXor
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::StridedArray;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_with_broadcasting() {
        let a = Tensor::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        let b = Tensor::from_vec([1, 3], vec![10, 20, 30]).unwrap();
        let c = Add::apply(&a, &b).unwrap();
        assert_eq!(c.as_slice(), &[11, 22, 33, 14, 25, 36]);

        let d = (&a - &b).unwrap();
        assert_eq!(d.as_slice(), &[-9, -18, -27, -6, -15, -24]);
    }

    #[test]
    fn test_incompatible_shapes() {
        let a = Tensor::<f32, 2>::zeros([4, 3]).unwrap();
        let b = Tensor::<f32, 2>::zeros([3, 4]).unwrap();
        let err = Mul::apply(&a, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Broadcast);
        assert!(err.to_string().contains("(4, 3) (3, 4)"));
    }

    #[test]
    fn test_maximum_outer_broadcast() {
        let a = Tensor::from_vec([4, 1], vec![1.0, 5.0, 3.0, f64::NAN]).unwrap();
        let b = Tensor::from_vec([1, 3], vec![2.0, 4.0, 6.0]).unwrap();
        let m = Max::apply(&a, &b).unwrap();
        assert_eq!(m.shape().dims(), &[4, 3]);
        assert_eq!(m[[0, 0]], 2.0);
        assert_eq!(m[[1, 1]], 5.0);
        assert_eq!(m[[2, 2]], 6.0);
        assert!(m[[3, 1]].is_nan());
    }

    #[test]
    fn test_comparisons_on_views() {
        let t = Tensor::from_iter_shape([2, 2], 0..4).unwrap();
        let gt = Greater::apply(&t.transpose(), &t).unwrap();
        assert_eq!(gt.as_slice(), &[false, true, false, false]);
        let eq = Equal::apply_scalar(&t, 3).unwrap();
        assert_eq!(eq.as_slice(), &[false, false, false, true]);
    }

    #[test]
    fn test_where_and_logical() {
        let cond = Tensor::from_vec([3], vec![true, false, true]).unwrap();
        let x = Tensor::from_vec([3], vec![1, 2, 3]).unwrap();
        let y = Tensor::from_vec([1], vec![0]).unwrap();
        assert_eq!(Where::select(&cond, &x, &y).unwrap().as_slice(), &[1, 0, 3]);

        let both = LogicalAnd::apply(&cond, &x).unwrap();
        assert_eq!(both.as_slice(), &[true, false, true]);
        assert_eq!(LogicalNot::apply(&y).unwrap().as_slice(), &[true]);
    }

    #[test]
    fn test_unary_functions() {
        let t = Tensor::from_vec([3], vec![1.0f64, 4.0, 9.0]).unwrap();
        let s = Sqrt::apply(&t).unwrap();
        assert_eq!(s.as_slice(), &[1.0, 2.0, 3.0]);
        let e = Exp::apply(&Ln::apply(&t).unwrap()).unwrap();
        for (a, b) in e.iter().zip(t.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
        assert_eq!(Abs::apply(&Neg::apply(&t).unwrap()).unwrap(), t);
    }

    #[test]
    fn test_clip_rejects_inverted_bounds() {
        let t = Tensor::from_vec([4], vec![-3, 0, 4, 9]).unwrap();
        assert_eq!(Clip::apply(&t, 0, 5).unwrap().as_slice(), &[0, 0, 4, 5]);
        let err = Clip::apply(&t, 5, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_scalar_variants() {
        let t = Tensor::from_vec([3], vec![1, 2, 3]).unwrap();
        assert_eq!(Mul::apply_scalar(&t, 3).unwrap().as_slice(), &[3, 6, 9]);
        assert_eq!(Min::apply_scalar(&t, 2).unwrap().as_slice(), &[1, 2, 2]);
        let p = Pow::powi(&Tensor::from_vec([2], vec![2.0f32, 3.0]).unwrap(), 2).unwrap();
        assert_eq!(p.as_slice(), &[4.0, 9.0]);
    }
}
