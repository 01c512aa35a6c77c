//! Reductions and running aggregates
//!
//! `reduce_all` folds every element. `reduce_axis` (and `along_axis`) fold
//! the lanes of one axis and return a tensor of rank `M = N - 1`; the target
//! rank is read from the annotated result type:
//!
//! ```
//! use numbat_tensor::ops::Sum;
//! use numbat_tensor::prelude::*;
//!
//! let t = Tensor::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
//! let cols: Tensor<i32, 1> = Sum::reduce_axis(&t, 0).unwrap();
//! assert_eq!(cols.as_slice(), &[5, 7, 9]);
//! ```

use num_traits::{Float, NumCast, One, Zero};

use crate::array::NdArray;
use crate::error::{Result, TensorError};
use crate::iter::{Indices, Mapping};
use crate::ops::elementwise::{max_propagating, min_propagating};
use crate::ops::Truthy;
use crate::shape::{ravel_index, NdIndex, Order, Shape};
use crate::tensor::{try_vec, Tensor};

/// Elements along one axis, walking from a base coordinate whose entry on
/// that axis is ignored
pub(crate) struct Lane<'a, T, const N: usize> {
    data: &'a [T],
    mapping: Mapping<'a, N>,
    coords: [usize; N],
    axis: usize,
    next: usize,
    len: usize,
}

impl<'a, T, const N: usize> Lane<'a, T, N> {
    fn new(data: &'a [T], mapping: Mapping<'a, N>, coords: [usize; N], axis: usize, len: usize) -> Self {
        Self {
            data,
            mapping,
            coords,
            axis,
            next: 0,
            len,
        }
    }
}

impl<'a, T, const N: usize> Iterator for Lane<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        self.coords[self.axis] = self.next;
        self.next += 1;
        Some(&self.data[self.mapping.offset_of(&self.coords)])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.len - self.next;
        (rest, Some(rest))
    }
}

impl<T, const N: usize> ExactSizeIterator for Lane<'_, T, N> {}

/// Folds each lane along `axis` into one value of a rank-`M` result
pub(crate) fn reduce_lanes<'a, const N: usize, const M: usize, A, U, F>(
    a: &'a A,
    axis: usize,
    operation: &str,
    mut f: F,
) -> Result<Tensor<U, M>>
where
    A: NdArray<N> + ?Sized,
    F: FnMut(Lane<'a, A::Elem, N>) -> Result<U>,
{
    let shape = a.shape();
    shape.check_axis(axis, operation)?;
    if M + 1 != N {
        return Err(TensorError::invalid_argument(
            "REDUCE_RANK_MISMATCH",
            format!(
                "reducing one axis of a {}-dimensional array gives {} dimensions, not {}",
                N,
                N - 1,
                M
            ),
            operation,
            "Annotate the result with rank N - 1, or use reduce_all",
        ));
    }
    let mut dims = [0usize; M];
    for (out, src) in (0..N).filter(|&k| k != axis).enumerate() {
        dims[out] = shape[src];
    }
    let out_shape = Shape::new(dims);
    let (data, mapping) = (a.buffer(), a.mapping());
    let len = shape[axis];
    let mut base_shape = shape;
    base_shape[axis] = 1;

    let mut values = try_vec(out_shape.size())?;
    for base in Indices::new(base_shape, Order::RowMajor) {
        values.push(f(Lane::new(data, mapping, base.into_array(), axis, len))?);
    }
    Tensor::from_vec(out_shape, values)
}

/// Replaces each lane along `axis` with `f`'s output of the same length
pub(crate) fn map_lanes<'a, const N: usize, A, U, F>(a: &'a A, axis: usize, operation: &str, mut f: F) -> Result<Tensor<U, N>>
where
    A: NdArray<N> + ?Sized,
    U: Clone,
    F: FnMut(Lane<'a, A::Elem, N>) -> Result<Vec<U>>,
{
    let shape = a.shape();
    shape.check_axis(axis, operation)?;
    let (data, mapping) = (a.buffer(), a.mapping());
    let len = shape[axis];
    let mut base_shape = shape;
    base_shape[axis] = 1;

    let mut lanes = try_vec(shape.size())?;
    for base in Indices::new(base_shape, Order::RowMajor) {
        let values = f(Lane::new(data, mapping, base.into_array(), axis, len))?;
        debug_assert_eq!(values.len(), len);
        lanes.extend(values);
    }
    Tensor::from_fn(shape, |index| {
        let mut base = index.into_array();
        let k = base[axis];
        base[axis] = 0;
        lanes[ravel_index(&base, &base_shape, Order::RowMajor) * len + k].clone()
    })
}

fn empty_reduction(operation: &str) -> TensorError {
    TensorError::invalid_argument(
        "EMPTY_REDUCTION",
        format!("zero-size array to reduction operation {} which has no identity", operation),
        operation,
        "Reduce over a non-empty axis",
    )
}

fn count_as<T: Float>(n: usize) -> T {
    <T as NumCast>::from(n).unwrap_or_else(T::nan)
}

/// Sum reduction
pub struct Sum;

impl Sum {
    /// Computes the sum of all elements; zero when empty
    pub fn reduce_all<T, A, const N: usize>(a: &A) -> T
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + Zero,
    {
        a.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Sums along `axis`
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + Zero,
    {
        reduce_lanes(a, axis, "sum", |lane| Ok(lane.fold(T::zero(), |acc, &x| acc + x)))
    }
}

/// Product reduction
pub struct Prod;

impl Prod {
    /// Computes the product of all elements; one when empty
    pub fn reduce_all<T, A, const N: usize>(a: &A) -> T
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + One,
    {
        a.iter().fold(T::one(), |acc, &x| acc * x)
    }

    /// Multiplies along `axis`
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + One,
    {
        reduce_lanes(a, axis, "prod", |lane| Ok(lane.fold(T::one(), |acc, &x| acc * x)))
    }
}

/// Arithmetic mean
pub struct Mean;

impl Mean {
    /// Mean of all elements; NaN when empty
    pub fn reduce_all<T, A, const N: usize>(a: &A) -> T
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        Sum::reduce_all(a) / count_as(a.size())
    }

    /// Mean along `axis`
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        reduce_lanes(a, axis, "mean", |lane| {
            let n = lane.len();
            Ok(lane.fold(T::zero(), |acc, &x| acc + x) / count_as(n))
        })
    }
}

fn variance_of<'a, T, I>(values: I, ddof: usize) -> T
where
    T: Float + 'a,
    I: Iterator<Item = &'a T> + Clone,
{
    let n = values.clone().count();
    if n <= ddof {
        return T::nan();
    }
    let mean = values.clone().fold(T::zero(), |acc, &x| acc + x) / count_as(n);
    let squares = values.fold(T::zero(), |acc, &x| acc + (x - mean) * (x - mean));
    squares / count_as(n - ddof)
}

/// Variance with `ddof` delta degrees of freedom
pub struct Variance;

impl Variance {
    /// Variance of all elements; NaN when there are at most `ddof` of them
    pub fn reduce_all<T, A, const N: usize>(a: &A, ddof: usize) -> T
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        variance_of(a.iter(), ddof)
    }

    /// Variance along `axis`
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize, ddof: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        reduce_lanes(a, axis, "var", |lane| {
            let values: Vec<&T> = lane.collect();
            Ok(variance_of(values.into_iter(), ddof))
        })
    }
}

/// Standard deviation with `ddof` delta degrees of freedom
pub struct StdDev;

impl StdDev {
    /// Standard deviation of all elements
    pub fn reduce_all<T, A, const N: usize>(a: &A, ddof: usize) -> T
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        Variance::reduce_all(a, ddof).sqrt()
    }

    /// Standard deviation along `axis`
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize, ddof: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Float,
    {
        let mut var: Tensor<T, M> = Variance::reduce_axis(a, axis, ddof)?;
        for x in var.iter_mut() {
            *x = x.sqrt();
        }
        Ok(var)
    }
}

/// Maximum reduction
pub struct MaxReduce;

impl MaxReduce {
    /// Largest element, or `None` when empty; NaN propagates
    pub fn reduce_all<T, A, const N: usize>(a: &A) -> Option<T>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        a.iter().copied().reduce(max_propagating)
    }

    /// Largest element along `axis`; empty lanes are rejected
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        reduce_lanes(a, axis, "maximum", |lane| {
            lane.copied().reduce(max_propagating).ok_or_else(|| empty_reduction("maximum"))
        })
    }
}

/// Minimum reduction
pub struct MinReduce;

impl MinReduce {
    /// Smallest element, or `None` when empty; NaN propagates
    pub fn reduce_all<T, A, const N: usize>(a: &A) -> Option<T>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        a.iter().copied().reduce(min_propagating)
    }

    /// Smallest element along `axis`; empty lanes are rejected
    pub fn reduce_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<T, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + PartialOrd,
    {
        reduce_lanes(a, axis, "minimum", |lane| {
            lane.copied().reduce(min_propagating).ok_or_else(|| empty_reduction("minimum"))
        })
    }
}

/// Position of the first element that `better` prefers over every earlier
/// one; an unordered (NaN-like) element wins immediately
fn arg_best<'a, T, I, F>(values: I, better: F) -> Option<(usize, &'a T)>
where
    T: PartialOrd + 'a,
    I: Iterator<Item = &'a T>,
    F: Fn(&T, &T) -> bool,
{
    let mut best: Option<(usize, &T)> = None;
    for (i, x) in values.enumerate() {
        if x.partial_cmp(x).is_none() {
            return Some((i, x));
        }
        match best {
            Some((_, b)) if !better(x, b) => {}
            _ => best = Some((i, x)),
        }
    }
    best
}

/// Coordinates of the largest element
pub struct ArgMax;

impl ArgMax {
    /// Row-major first occurrence of the maximum; `None` when empty
    pub fn compute<T, A, const N: usize>(a: &A) -> Option<NdIndex<N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        let shape = a.shape();
        arg_best(a.iter(), |x, b| x > b).map(|(i, _)| crate::shape::unravel(i, &shape, Order::RowMajor))
    }

    /// Position of the maximum within each lane along `axis`
    pub fn along_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<usize, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        reduce_lanes(a, axis, "argmax", |lane| {
            arg_best(lane, |x, b| x > b)
                .map(|(i, _)| i)
                .ok_or_else(|| empty_reduction("argmax"))
        })
    }
}

/// Coordinates of the smallest element
pub struct ArgMin;

impl ArgMin {
    /// Row-major first occurrence of the minimum; `None` when empty
    pub fn compute<T, A, const N: usize>(a: &A) -> Option<NdIndex<N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        let shape = a.shape();
        arg_best(a.iter(), |x, b| x < b).map(|(i, _)| crate::shape::unravel(i, &shape, Order::RowMajor))
    }

    /// Position of the minimum within each lane along `axis`
    pub fn along_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<usize, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        reduce_lanes(a, axis, "argmin", |lane| {
            arg_best(lane, |x, b| x < b)
                .map(|(i, _)| i)
                .ok_or_else(|| empty_reduction("argmin"))
        })
    }
}

/// Number of truthy elements
pub struct CountNonzero;

impl CountNonzero {
    /// Counts over the whole array
    pub fn compute<T, A, const N: usize>(a: &A) -> usize
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        a.iter().filter(|x| x.is_truthy()).count()
    }

    /// Counts within each lane along `axis`
    pub fn along_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<usize, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        reduce_lanes(a, axis, "count_nonzero", |lane| Ok(lane.filter(|x| x.is_truthy()).count()))
    }
}

/// Whether every element is truthy
pub struct All;

impl All {
    /// `true` for an empty array
    pub fn compute<T, A, const N: usize>(a: &A) -> bool
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        a.iter().all(Truthy::is_truthy)
    }

    /// Tests each lane along `axis`
    pub fn along_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<bool, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        reduce_lanes(a, axis, "all", |mut lane| Ok(lane.all(Truthy::is_truthy)))
    }
}

/// Whether any element is truthy
pub struct Any;

impl Any {
    /// `false` for an empty array
    pub fn compute<T, A, const N: usize>(a: &A) -> bool
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        a.iter().any(Truthy::is_truthy)
    }

    /// Tests each lane along `axis`
    pub fn along_axis<T, A, const N: usize, const M: usize>(a: &A, axis: usize) -> Result<Tensor<bool, M>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        reduce_lanes(a, axis, "any", |mut lane| Ok(lane.any(Truthy::is_truthy)))
    }
}

/// Running sum
pub struct CumSum;

impl CumSum {
    /// Running sum over the row-major flattening
    pub fn flat<T, A, const N: usize>(a: &A) -> Result<Tensor<T, 1>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + Zero,
    {
        let mut acc = T::zero();
        Tensor::from_iter_shape(
            [a.size()],
            a.iter().map(|&x| {
                acc = acc + x;
                acc
            }),
        )
    }

    /// Running sum within each lane along `axis`
    pub fn along_axis<T, A, const N: usize>(a: &A, axis: usize) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Copy + Zero,
    {
        map_lanes(a, axis, "cumsum", |lane| {
            let mut acc = T::zero();
            Ok(lane
                .map(|&x| {
                    acc = acc + x;
                    acc
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::StridedArray;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    fn grid() -> Tensor<i32, 2> {
        Tensor::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_sum_and_prod() {
        let t = grid();
        assert_eq!(Sum::reduce_all(&t), 21);
        assert_eq!(Prod::reduce_all(&t), 720);
        let rows: Tensor<i32, 1> = Sum::reduce_axis(&t, 1).unwrap();
        assert_eq!(rows.as_slice(), &[6, 15]);
        let cols: Tensor<i32, 1> = Prod::reduce_axis(&t, 0).unwrap();
        assert_eq!(cols.as_slice(), &[4, 10, 18]);
    }

    #[test]
    fn test_reduce_axis_on_view() {
        let t = grid();
        let rows: Tensor<i32, 1> = Sum::reduce_axis(&t.transpose(), 0).unwrap();
        assert_eq!(rows.as_slice(), &[6, 15]);
    }

    #[test]
    fn test_reduce_axis_validation() {
        let t = grid();
        assert_eq!(
            Sum::reduce_axis::<i32, _, 2, 1>(&t, 2).unwrap_err().kind(),
            ErrorKind::IndexOutOfRange
        );
        let cube = Tensor::<i32, 3>::zeros([2, 2, 2]).unwrap();
        assert!(Sum::reduce_axis::<i32, _, 3, 1>(&cube, 0).is_err());
    }

    #[test]
    fn test_statistics() {
        let t = Tensor::from_vec([4], vec![2.0f64, 4.0, 4.0, 6.0]).unwrap();
        assert_relative_eq!(Mean::reduce_all(&t), 4.0);
        assert_relative_eq!(Variance::reduce_all(&t, 0), 2.0);
        assert_relative_eq!(Variance::reduce_all(&t, 1), 8.0 / 3.0);
        assert_relative_eq!(StdDev::reduce_all(&t, 0), 2.0f64.sqrt());
        assert!(Mean::reduce_all(&Tensor::<f64, 1>::empty()).is_nan());
    }

    #[test]
    fn test_extrema() {
        let t = Tensor::from_vec([2, 3], vec![3, 9, 1, 9, 0, 7]).unwrap();
        assert_eq!(MaxReduce::reduce_all(&t), Some(9));
        assert_eq!(MinReduce::reduce_all(&t), Some(0));
        assert_eq!(ArgMax::compute(&t), Some(NdIndex::new([0, 1])));
        assert_eq!(ArgMin::compute(&t), Some(NdIndex::new([1, 1])));
        let per_row: Tensor<usize, 1> = ArgMax::along_axis(&t, 1).unwrap();
        assert_eq!(per_row.as_slice(), &[1, 0]);
        assert_eq!(MaxReduce::reduce_all(&Tensor::<i32, 1>::empty()), None);

        let empty = Tensor::<i32, 2>::zeros([0, 3]).unwrap();
        let err = MaxReduce::reduce_axis::<i32, _, 2, 1>(&empty, 0).unwrap_err();
        assert_eq!(err.code(), "EMPTY_REDUCTION");
    }

    #[test]
    fn test_nan_wins_argmax() {
        let t = Tensor::from_vec([3], vec![1.0, f64::NAN, 5.0]).unwrap();
        assert_eq!(ArgMax::compute(&t), Some(NdIndex::new([1])));
        assert!(MaxReduce::reduce_all(&t).unwrap().is_nan());
    }

    #[test]
    fn test_truthiness() {
        let t = Tensor::from_vec([2, 2], vec![0, 3, 0, 0]).unwrap();
        assert_eq!(CountNonzero::compute(&t), 1);
        assert!(Any::compute(&t));
        assert!(!All::compute(&t));
        let any_col: Tensor<bool, 1> = Any::along_axis(&t, 0).unwrap();
        assert_eq!(any_col.as_slice(), &[false, true]);
        assert!(All::compute(&Tensor::<bool, 1>::empty()));
    }

    #[test]
    fn test_cumsum() {
        let t = grid();
        assert_eq!(CumSum::flat(&t).unwrap().as_slice(), &[1, 3, 6, 10, 15, 21]);
        let down = CumSum::along_axis(&t, 0).unwrap();
        assert_eq!(down.as_slice(), &[1, 2, 3, 5, 7, 9]);
        let across = CumSum::along_axis(&t, 1).unwrap();
        assert_eq!(across.as_slice(), &[1, 3, 6, 4, 9, 15]);
    }
}
