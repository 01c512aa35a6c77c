//! Conversions to and from `ndarray` arrays

use ndarray::{ArrayBase, ArrayD, Data, Dimension, IxDyn};

use crate::array::NdArray;
use crate::error::{Result, TensorError};
use crate::shape::{format_dims, Shape};
use crate::tensor::Tensor;

/// Copies any array into a dynamic-rank `ndarray` array in logical order
pub fn to_ndarray<A, const N: usize>(a: &A) -> Result<ArrayD<A::Elem>>
where
    A: NdArray<N> + ?Sized,
    A::Elem: Clone,
{
    let shape = a.shape();
    ArrayD::from_shape_vec(IxDyn(shape.as_slice()), a.to_vec()).map_err(|e| {
        TensorError::invalid_argument(
            "NDARRAY_CONVERSION",
            format!("cannot build an ndarray of shape {}: {}", shape, e),
            "to_ndarray",
            "Shapes whose size overflows isize cannot be represented",
        )
    })
}

/// Copies an `ndarray` array of matching rank into a new tensor
pub fn from_ndarray<S, D, const N: usize>(array: &ArrayBase<S, D>) -> Result<Tensor<S::Elem, N>>
where
    S: Data,
    S::Elem: Clone,
    D: Dimension,
{
    if array.ndim() != N {
        return Err(TensorError::shape_mismatch(
            "NDARRAY_RANK_MISMATCH",
            format!("a {}-dimensional ndarray cannot fill a rank-{} tensor", array.ndim(), N),
            "from_ndarray",
            format_dims(array.shape()),
            format!("rank {}", N),
            "Convert into a tensor of the array's rank",
        ));
    }
    let shape = Shape::<N>::from_slice(array.shape())?;
    Tensor::from_iter_shape(shape, array.iter().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::StridedArray;
    use ndarray::array;

    #[test]
    fn test_views_convert_in_logical_order() {
        let t = Tensor::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        let a = to_ndarray(&t.transpose()).unwrap();
        assert_eq!(a.shape(), &[3, 2]);
        assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_from_ndarray_checks_rank() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let t: Tensor<f64, 2> = from_ndarray(&a).unwrap();
        assert_eq!(t.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        let transposed: Tensor<f64, 2> = from_ndarray(&a.t()).unwrap();
        assert_eq!(transposed.as_slice(), &[1.0, 3.0, 2.0, 4.0]);
        assert!(from_ndarray::<_, _, 3>(&a).is_err());
    }
}
