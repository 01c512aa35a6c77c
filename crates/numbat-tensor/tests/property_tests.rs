//! Property-based tests for numbat-tensor
//!
//! These tests use proptest to generate random shapes and data and check
//! the layout, iteration and indexing invariants of the crate.

use numbat_tensor::ops::*;
use numbat_tensor::prelude::*;
use numbat_tensor::shape::{ravel_index, unravel};
use proptest::prelude::*;

const MAX_DIM: usize = 6;

// Property test strategies
prop_compose! {
    fn arb_shape3()(
        d0 in 1usize..=MAX_DIM,
        d1 in 1usize..=MAX_DIM,
        d2 in 1usize..=MAX_DIM
    ) -> [usize; 3] {
        [d0, d1, d2]
    }
}

prop_compose! {
    fn arb_tensor3()(dims in arb_shape3())(
        data in prop::collection::vec(-1000i32..1000, dims.iter().product::<usize>()),
        dims in Just(dims)
    ) -> Tensor<i32, 3> {
        Tensor::from_vec(dims, data).unwrap()
    }
}

prop_compose! {
    fn arb_matrix()(rows in 1usize..=8, cols in 1usize..=8)(
        data in prop::collection::vec(-50.0f64..50.0, rows * cols),
        rows in Just(rows),
        cols in Just(cols)
    ) -> Tensor<f64, 2> {
        Tensor::from_vec([rows, cols], data).unwrap()
    }
}

prop_compose! {
    fn arb_vector(max_len: usize)(
        data in prop::collection::vec(-100i64..100, 0..=max_len)
    ) -> Tensor<i64, 1> {
        let len = data.len();
        Tensor::from_vec([len], data).unwrap()
    }
}

fn order_strategy() -> impl Strategy<Value = Order> {
    prop_oneof![Just(Order::RowMajor), Just(Order::ColumnMajor)]
}

proptest! {
    /// Unravel then ravel returns the linear position in either order
    #[test]
    fn test_ravel_unravel_round_trip(dims in arb_shape3(), order in order_strategy(), seed in any::<usize>()) {
        let shape = Shape::new(dims);
        let linear = seed % shape.size();
        let coords = unravel(linear, &shape, order);
        prop_assert!(shape.contains(coords.coords()));
        prop_assert_eq!(ravel_index(coords.coords(), &shape, order), linear);
    }

    /// Size is the product of dimensions and matches the iteration length
    #[test]
    fn test_size_matches_iteration(t in arb_tensor3(), order in order_strategy()) {
        let expected: usize = t.shape().as_slice().iter().product();
        prop_assert_eq!(t.size(), expected);
        prop_assert_eq!(t.iter_order(order).count(), expected);
        prop_assert_eq!(t.iter_order(order).len(), expected);
    }

    /// Row-major iteration of an owning tensor walks the buffer in order
    #[test]
    fn test_row_major_iteration_is_contiguous(t in arb_tensor3()) {
        let walked: Vec<i32> = t.iter().copied().collect();
        prop_assert_eq!(walked.as_slice(), t.as_slice());
    }

    /// Column-major iteration visits every element exactly once
    #[test]
    fn test_column_major_visits_each_element_once(dims in arb_shape3()) {
        let t = Tensor::from_fn(dims, |i| ravel_index(i.coords(), &Shape::new(dims), Order::RowMajor)).unwrap();
        let mut seen: Vec<usize> = t.iter_order(Order::ColumnMajor).copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..t.size()).collect::<Vec<_>>());
    }

    /// Reversing all axes twice gives back the original
    #[test]
    fn test_double_transpose_is_identity(t in arb_tensor3()) {
        let once = t.transpose();
        let twice = once.transpose();
        prop_assert!(twice.elements_eq(&t));
        let once_shape = once.shape();
        prop_assert_eq!(once_shape.dims(), &[t.shape()[2], t.shape()[1], t.shape()[0]]);
    }

    /// A full slice of any view equals the view
    #[test]
    fn test_full_slice_equals_view(t in arb_tensor3()) {
        let flipped = t.flip(1).unwrap();
        let all = flipped.slice::<3>(&s![.., .., ..]).unwrap();
        prop_assert!(all.elements_eq(&flipped));
    }

    /// Broadcast addition commutes
    #[test]
    fn test_broadcast_add_commutes(m in arb_matrix(), seed in any::<u64>()) {
        let cols = m.shape()[1];
        let row = Tensor::from_fn([1, cols], |i| (seed.wrapping_add(i[1] as u64) % 17) as f64).unwrap();
        let left = (&m + &row).unwrap();
        let right = (&row + &m).unwrap();
        prop_assert_eq!(left.shape(), m.shape());
        prop_assert_eq!(left, right);
    }

    /// Sorting produces a non-decreasing permutation reproduced by argsort
    #[test]
    fn test_sort_matches_argsort(v in arb_vector(64)) {
        let sorted = Sort::sorted(&v).unwrap();
        prop_assert!(sorted.as_slice().windows(2).all(|w| w[0] <= w[1]));
        let order = ArgSort::compute(&v).unwrap();
        let taken: Tensor<i64, 1> = v.take_flat(&order).unwrap();
        prop_assert_eq!(taken, sorted);
    }

    /// Masked selection has exactly as many elements as the mask has `true`s
    #[test]
    fn test_mask_size_matches_count(t in arb_tensor3(), threshold in -1000i32..1000) {
        let mask = Greater::apply_scalar(&t, threshold).unwrap();
        let picked = t.mask(&mask).unwrap();
        prop_assert_eq!(picked.size(), CountNonzero::compute(&mask));
        prop_assert!(picked.iter().all(|&x| x > threshold));
    }

    /// Slicing matches stepping through the axis by hand
    #[test]
    fn test_slice_range_matches_manual_stepping(
        v in arb_vector(40),
        start in 0usize..45,
        stop in 0usize..45,
        step in 1usize..5
    ) {
        let picked = v.slice::<1>(&s![Slice::range(start, stop, step)]).unwrap();
        let manual: Vec<i64> = (start..stop.min(v.size()))
            .step_by(step)
            .map(|i| v.as_slice()[i])
            .collect();
        prop_assert_eq!(picked.to_vec(), manual);
    }

    /// Reshaping an owned tensor keeps its row-major sequence
    #[test]
    fn test_flatten_keeps_row_major_sequence(t in arb_tensor3()) {
        let expected = t.to_vec();
        let flat = t.flatten();
        prop_assert_eq!(flat.into_vec(), expected);
    }
}
