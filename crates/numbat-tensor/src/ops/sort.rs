//! Sorting and searching
//!
//! Orderings are stable and place unordered values (NaN) after every
//! ordered one, matching NumPy.

use std::cmp::Ordering;

use crate::array::{NdArray, NdArrayMut};
use crate::error::Result;
use crate::ops::elementwise::map_elements;
use crate::ops::reduce::map_lanes;
use crate::ops::Truthy;
use crate::shape::{NdIndex, Order};
use crate::tensor::{try_vec, Tensor};

fn is_unordered<T: PartialOrd>(x: &T) -> bool {
    x.partial_cmp(x).is_none()
}

/// Total order over a partial one with unordered values last
pub(crate) fn nan_last<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    match a.partial_cmp(b) {
        Some(ordering) => ordering,
        None => match (is_unordered(a), is_unordered(b)) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        },
    }
}

fn same_value<T: PartialOrd>(a: &T, b: &T) -> bool {
    nan_last(a, b) == Ordering::Equal
}

fn argsort_values<T: PartialOrd>(values: &[&T]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| nan_last(values[i], values[j]));
    order
}

/// Sorted copies
pub struct Sort;

impl Sort {
    /// Sorted copy of a rank-1 array
    pub fn sorted<T, A>(a: &A) -> Result<Tensor<T, 1>>
    where
        A: NdArray<1, Elem = T> + ?Sized,
        T: Clone + PartialOrd,
    {
        let mut values = a.to_vec();
        values.sort_by(nan_last);
        Tensor::from_vec([values.len()], values)
    }

    /// Sorts every lane along `axis` independently
    pub fn along_axis<T, A, const N: usize>(a: &A, axis: usize) -> Result<Tensor<T, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Clone + PartialOrd,
    {
        map_lanes(a, axis, "sort", |lane| {
            let mut values: Vec<T> = lane.cloned().collect();
            values.sort_by(nan_last);
            Ok(values)
        })
    }

    /// Sorts a rank-1 array where it lives, including views and selections
    pub fn in_place<T, A>(a: &mut A)
    where
        A: NdArrayMut<1, Elem = T> + ?Sized,
        T: Clone + PartialOrd,
    {
        let mut values = a.to_vec();
        values.sort_by(nan_last);
        let (data, mapping) = a.parts_mut();
        for (offset, value) in mapping.offsets(Order::RowMajor).zip(values) {
            data[offset] = value;
        }
    }
}

/// Permutations that sort
pub struct ArgSort;

impl ArgSort {
    /// Positions that would sort a rank-1 array; ties keep their order
    pub fn compute<T, A>(a: &A) -> Result<Tensor<usize, 1>>
    where
        A: NdArray<1, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        let values: Vec<&T> = a.iter().collect();
        let order = argsort_values(&values);
        Tensor::from_vec([order.len()], order)
    }

    /// Positions within each lane along `axis` that would sort that lane
    pub fn along_axis<T, A, const N: usize>(a: &A, axis: usize) -> Result<Tensor<usize, N>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        map_lanes(a, axis, "argsort", |lane| {
            let values: Vec<&T> = lane.collect();
            Ok(argsort_values(&values))
        })
    }
}

/// Which end of a run of equal values an insertion point lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// Before every equal value
    #[default]
    Left,
    /// After every equal value
    Right,
}

/// Insertion points in a sorted rank-1 array
pub struct SearchSorted;

impl SearchSorted {
    /// First position whose value is not less than `value`
    pub fn left<T, A>(sorted: &A, value: &T) -> usize
    where
        A: NdArray<1, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        Self::insertion_point(sorted, value, Side::Left)
    }

    /// First position whose value is greater than `value`
    pub fn right<T, A>(sorted: &A, value: &T) -> usize
    where
        A: NdArray<1, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        Self::insertion_point(sorted, value, Side::Right)
    }

    /// Insertion point of `value` on `side`
    pub fn insertion_point<T, A>(sorted: &A, value: &T, side: Side) -> usize
    where
        A: NdArray<1, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        let (data, mapping) = (sorted.buffer(), sorted.mapping());
        let goes_before = |i: usize| {
            let candidate = &data[mapping.offset_of(&[i])];
            match side {
                Side::Left => nan_last(candidate, value) == Ordering::Less,
                Side::Right => nan_last(candidate, value) != Ordering::Greater,
            }
        };
        let (mut lo, mut hi) = (0, sorted.size());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if goes_before(mid) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Insertion point of every element of `values`, in their shape
    pub fn many<T, A, V, const M: usize>(sorted: &A, values: &V, side: Side) -> Result<Tensor<usize, M>>
    where
        A: NdArray<1, Elem = T> + ?Sized,
        V: NdArray<M, Elem = T> + ?Sized,
        T: PartialOrd,
    {
        map_elements(values, |v| Self::insertion_point(sorted, v, side))
    }
}

/// Distinct values
pub struct Unique;

impl Unique {
    /// Sorted distinct values of the whole array; NaNs collapse into one
    pub fn compute<T, A, const N: usize>(a: &A) -> Result<Tensor<T, 1>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Clone + PartialOrd,
    {
        Self::with_counts(a).map(|(values, _)| values)
    }

    /// Sorted distinct values together with how often each occurs
    pub fn with_counts<T, A, const N: usize>(a: &A) -> Result<(Tensor<T, 1>, Tensor<usize, 1>)>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Clone + PartialOrd,
    {
        let mut sorted: Vec<&T> = a.iter().collect();
        sorted.sort_by(|x, y| nan_last(*x, *y));

        let mut values: Vec<T> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for x in sorted {
            if let (Some(last), Some(count)) = (values.last(), counts.last_mut()) {
                if same_value(last, x) {
                    *count += 1;
                    continue;
                }
            }
            values.push(x.clone());
            counts.push(1);
        }
        let len = values.len();
        Ok((Tensor::from_vec([len], values)?, Tensor::from_vec([len], counts)?))
    }
}

/// Coordinates of truthy elements
pub struct Nonzero;

impl Nonzero {
    /// Coordinates in row-major order
    pub fn compute<T, A, const N: usize>(a: &A) -> Result<Tensor<NdIndex<N>, 1>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        let coords: Vec<NdIndex<N>> = a
            .indexed_iter()
            .filter(|(_, x)| x.is_truthy())
            .map(|(index, _)| index)
            .collect();
        Tensor::from_vec([coords.len()], coords)
    }
}

/// Coordinates of truthy elements as rows of a matrix
pub struct ArgWhere;

impl ArgWhere {
    /// One row per truthy element and one column per axis
    pub fn compute<T, A, const N: usize>(a: &A) -> Result<Tensor<usize, 2>>
    where
        A: NdArray<N, Elem = T> + ?Sized,
        T: Truthy,
    {
        let coords = Nonzero::compute(a)?;
        let rows = coords.size();
        let mut flat = try_vec(rows * N)?;
        for index in coords.into_vec() {
            flat.extend_from_slice(index.coords());
        }
        Tensor::from_vec([rows, N], flat)
    }
}
