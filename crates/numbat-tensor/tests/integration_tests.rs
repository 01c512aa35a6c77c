//! Integration tests for numbat-tensor views, indexing and operations

use numbat_tensor::ops::*;
use numbat_tensor::prelude::*;
use numbat_tensor::{ErrorKind, Generator};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("numbat_tensor=debug")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_strided_slice_of_vector() -> Result<()> {
    let a = Tensor::from_vec([10], vec![5, 8, 16, 16, 17, 20, 4, 10, 1, 6])?;
    let picked = a.slice::<1>(&[Slice::new(1, 5, 2).into()])?;
    assert_eq!(picked.to_vec(), vec![8, 16, 20, 10, 6]);

    let same = a.slice::<1>(&s![Slice::range(1, 10, 2)])?;
    assert!(same.elements_eq(&picked));
    Ok(())
}

#[test]
fn test_column_major_iteration() -> Result<()> {
    // Three columns of four rows, filled row-major
    let a = Tensor::from_iter_shape([4, 3], 0..12)?;
    let order: Vec<i32> = a.iter_order(Order::ColumnMajor).copied().collect();
    assert_eq!(order, vec![0, 3, 6, 9, 1, 4, 7, 10, 2, 5, 8, 11]);

    let backwards: Vec<i32> = a.iter_order(Order::ColumnMajor).rev().copied().collect();
    assert_eq!(backwards[0], 11);
    assert_eq!(backwards[11], 0);
    Ok(())
}

#[test]
fn test_argsort_reproduces_sorted_sequence() -> Result<()> {
    let a = Tensor::from_vec([10], vec![12, -2, 19, 0, 4, 18, -3, -5, 3, 12])?;
    let order = ArgSort::compute(&a)?;
    assert_eq!(order.as_slice(), &[7, 6, 1, 3, 8, 4, 0, 9, 5, 2]);
    let sorted = a.take_flat(&order)?;
    assert_eq!(sorted.as_slice(), &[-5, -3, -2, 0, 3, 4, 12, 12, 18, 19]);
    Ok(())
}

#[test]
fn test_empty_slice_stays_reshapeable() -> Result<()> {
    let a = Tensor::from_iter_shape([3, 4], 0..12)?;
    let empty = a.slice::<2>(&s![.., Slice::range(4, 4, 2)])?;
    assert_eq!(empty.shape(), Shape::new([3, 0]));
    let flat = empty.reshape_view::<1>([0])?;
    assert_eq!(flat.size(), 0);
    assert!(flat.to_vec().is_empty());
    Ok(())
}

#[test]
fn test_mixed_rank_operands_broadcast_after_lifting() -> Result<()> {
    let m = Tensor::from_iter_shape([4, 3], 0..12)?;
    let v = Tensor::from_vec([3], vec![100, 200, 300])?;
    let sum = (&v.broadcast_to([4, 3])? + &m)?;
    assert_eq!(sum[[0, 0]], 100);
    assert_eq!(sum[[3, 2]], 311);

    let col = Tensor::from_vec([4], vec![1, 2, 3, 4])?;
    let scaled = (&m * &col.expand_dims::<2>(1)?)?;
    assert_eq!(scaled.shape(), Shape::new([4, 3]));
    assert_eq!(scaled[[3, 1]], 40);

    let lazy = (m.expr() + Expr::leaf(v.broadcast_to([4, 3])?)).eval()?;
    assert_eq!(lazy, sum);
    Ok(())
}

#[test]
fn test_reshape_and_resize_keep_buffer_order() -> Result<()> {
    let a = Tensor::from_iter_shape([3, 4], 0..12)?;
    let expected: Vec<i32> = (0..12).collect();

    let reshaped = a.clone().reshape::<2>([2, 6])?;
    assert_eq!(reshaped.as_slice(), expected.as_slice());
    assert_eq!(reshaped[[1, 0]], 6);

    let mut resized = a.clone();
    resized.resize([2, 6])?;
    assert_eq!(resized.as_slice(), expected.as_slice());
    assert_eq!(resized.shape(), Shape::new([2, 6]));

    assert!(a.reshape::<2>([5, 3]).is_err());
    Ok(())
}

#[test]
fn test_transpose_reverses_axes() -> Result<()> {
    let a = Tensor::from_fn([2, 3, 4], |i| i[0] * 100 + i[1] * 10 + i[2])?;
    let t = a.transpose();
    assert_eq!(t.shape(), Shape::new([4, 3, 2]));
    for i in 0..2 {
        for j in 0..3 {
            for k in 0..4 {
                assert_eq!(t.at([k, j, i])?, &a[[i, j, k]]);
            }
        }
    }
    assert!(!t.is_contiguous());
    assert_eq!(t.copy()?.transpose().copy()?, a);
    Ok(())
}

#[test]
fn test_broadcast_maximum() -> Result<()> {
    let a = Tensor::from_vec([4, 1], vec![1, 7, 3, 5])?;
    let b = Tensor::from_vec([1, 3], vec![4, 2, 6])?;
    let m = Max::apply(&a, &b)?;
    assert_eq!(m.shape(), Shape::new([4, 3]));
    for i in 0..4 {
        for j in 0..3 {
            assert_eq!(m[[i, j]], a[[i, 0]].max(b[[0, j]]));
        }
    }
    assert_eq!(a.expr().maximum(b.expr()).eval()?, m);
    Ok(())
}

#[test]
fn test_incompatible_broadcast_is_rejected() {
    let a = Tensor::<f64, 2>::zeros([4, 3]).unwrap();
    let b = Tensor::<f64, 2>::zeros([3, 4]).unwrap();
    let err = (&a + &b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Broadcast);
    assert!(err
        .to_string()
        .contains("operands could not be broadcast together with shapes (4, 3) (3, 4)"));
    assert!(Max::apply(&a, &b).is_err());
}

#[test]
fn test_mask_selection_order_and_size() -> Result<()> {
    let a = Tensor::from_iter_shape([3, 4], 0..12)?;
    let m = Greater::apply_scalar(&Rem::apply_scalar(&a, 3)?, 0)?;
    let picked = a.mask(&m)?;
    assert_eq!(picked.size(), CountNonzero::compute(&m));
    assert_eq!(picked.as_slice(), &[1, 2, 4, 5, 7, 8, 10, 11]);

    let mut b = a.clone();
    b.select_mask_mut(&m)?.fill(0);
    assert_eq!(b.as_slice(), &[0, 0, 0, 3, 0, 0, 6, 0, 0, 9, 0, 0]);
    Ok(())
}

#[test]
fn test_copy_is_independent() -> Result<()> {
    let mut a = Tensor::from_iter_shape([2, 3], 0..6)?;
    let copy = a.copy()?;
    for (x, y) in copy.iter().zip(a.iter()) {
        assert_eq!(x, y);
    }
    a.fill(-1);
    assert_eq!(copy.as_slice(), &[0, 1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_views_alias_the_owner() -> Result<()> {
    let mut a = Tensor::from_iter_shape([3, 3], 0..9)?;
    {
        let mut lower = a.slice_mut::<2>(&s![1.., ..2])?;
        *lower.at_mut([1, 1])? = 99;
    }
    assert_eq!(a[[2, 1]], 99);

    a[[1, 0]] = -5;
    let lower = a.slice::<2>(&s![1.., ..2])?;
    assert_eq!(lower.at([0, 0])?, &-5);

    let everything = a.slice::<2>(&s![..])?;
    assert!(everything.elements_eq(&a));
    Ok(())
}

#[test]
fn test_coordinate_indexing() -> Result<()> {
    let mut a = Tensor::from_iter_shape([3, 3], 0..9)?;
    let coords = Tensor::from_vec([3], vec![NdIndex::new([0, 0]), NdIndex::new([1, 1]), NdIndex::new([2, 2])])?;
    assert_eq!(a.take(&coords)?.as_slice(), &[0, 4, 8]);

    a.select_mut(&coords)?.fill(1);
    assert_eq!(Trace::compute(&a), 3);

    let out_of_range = Tensor::from_vec([1], vec![NdIndex::new([3, 0])])?;
    assert_eq!(a.take(&out_of_range).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
    Ok(())
}

#[test]
fn test_random_access_iterator() -> Result<()> {
    let a = Tensor::from_iter_shape([3, 4], 0..12)?;
    let begin = a.iter_order(Order::ColumnMajor);
    let later = begin.clone() + 5;
    assert_eq!(later.current(), Some(&9));
    assert_eq!(later.coords(), NdIndex::new([2, 1]));
    assert_eq!(&later - &begin, 5);
    assert!(begin < later);

    let end = begin.clone() + 12;
    assert!(end.is_end());
    assert_eq!(end.current(), None);
    Ok(())
}

#[test]
fn test_lazy_expression_into_view() -> Result<()> {
    init_tracing();
    let x = Tensor::from_vec([3], vec![1.0, 2.0, 3.0])?;
    let mut grid = Tensor::<f64, 2>::zeros([2, 3])?;
    let e = x.expr() * Expr::scalar(10.0) - Expr::scalar(1.0);
    grid.slice_mut::<1>(&s![1])?.assign_expr(&e)?;
    assert_eq!(grid.as_slice(), &[0.0, 0.0, 0.0, 9.0, 19.0, 29.0]);
    Ok(())
}

#[test]
fn test_reductions_over_views() -> Result<()> {
    let a = Tensor::from_iter_shape([2, 3], 1..7)?;
    let per_column: Tensor<i32, 1> = Sum::reduce_axis(&a.transpose(), 1)?;
    assert_eq!(per_column.as_slice(), &[5, 7, 9]);
    assert_eq!(ArgMax::compute(&a), Some(NdIndex::new([1, 2])));
    assert_eq!(MinReduce::reduce_all(&a.flip(1)?), Some(1));
    Ok(())
}

#[test]
fn test_linear_algebra_round_trip() -> Result<()> {
    let a: Tensor<f64, 2> = Tensor::from_vec([2, 2], vec![4.0, 3.0, 6.0, 3.0])?;
    let inv = Inverse::compute(&a)?;
    let identity = Gemm::compute(&a, &inv)?;
    for (x, y) in identity.iter().zip([1.0, 0.0, 0.0, 1.0].iter()) {
        assert!((x - y).abs() < 1e-12);
    }
    assert!((Det::compute(&a)? + 6.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_seeded_sampling_feeds_operations() -> Result<()> {
    init_tracing();
    let mut rng = Generator::seeded(2024);
    let samples: Tensor<f64, 2> = rng.uniform([16, 8], 0.0, 1.0)?;
    let clipped = Clip::apply(&samples, 0.25, 0.75)?;
    assert!(clipped.iter().all(|&x| (0.25..=0.75).contains(&x)));
    let sorted = Sort::along_axis(&samples, 1)?;
    for row in 0..16 {
        for col in 1..8 {
            assert!(sorted[[row, col - 1]] <= sorted[[row, col]]);
        }
    }
    Ok(())
}

#[test]
fn test_serde_round_trip() -> Result<()> {
    let a = Tensor::from_iter_shape([2, 2], 0..4)?;
    let json = serde_json::to_string(&a).unwrap();
    assert_eq!(json, r#"{"shape":[2,2],"data":[0,1,2,3]}"#);
    let back: Tensor<i32, 2> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, a);
    assert!(serde_json::from_str::<Tensor<i32, 2>>(r#"{"shape":[2,2],"data":[0,1]}"#).is_err());
    Ok(())
}
