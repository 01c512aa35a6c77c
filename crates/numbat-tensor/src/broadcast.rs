//! Broadcasting rules
//!
//! Shapes are right-aligned, missing leading axes count as size 1, and each
//! aligned pair of sizes must be equal or contain a 1. A size-1 axis takes
//! the other operand's size, including zero.

use crate::error::{Result, TensorError};
use crate::shape::{format_dims, Shape};

/// Checks if two shapes of any rank are compatible for broadcasting
pub fn is_broadcast_compatible(left: &[usize], right: &[usize]) -> bool {
    mismatched_axis(left, right).is_none()
}

/// Returns the right-aligned position of the first incompatible axis pair
fn mismatched_axis(left: &[usize], right: &[usize]) -> Option<usize> {
    let ndim = left.len().max(right.len());
    (0..ndim).find(|&axis| {
        let l = aligned_dim(left, ndim, axis);
        let r = aligned_dim(right, ndim, axis);
        l != r && l != 1 && r != 1
    })
}

fn aligned_dim(dims: &[usize], ndim: usize, axis: usize) -> usize {
    let lead = ndim - dims.len();
    if axis < lead {
        1
    } else {
        dims[axis - lead]
    }
}

fn combine(left: &[usize], right: &[usize], operation: &str) -> Result<Vec<usize>> {
    if let Some(axis) = mismatched_axis(left, right) {
        return Err(TensorError::broadcast(
            "BROADCAST_INCOMPATIBLE",
            format!(
                "operands could not be broadcast together with shapes {} {}",
                format_dims(left),
                format_dims(right)
            ),
            operation,
            left,
            right,
            axis,
            "Ensure each aligned axis pair is equal or one of them is 1",
        ));
    }
    let ndim = left.len().max(right.len());
    Ok((0..ndim)
        .map(|axis| {
            let l = aligned_dim(left, ndim, axis);
            let r = aligned_dim(right, ndim, axis);
            if l == 1 {
                r
            } else {
                l
            }
        })
        .collect())
}

/// Computes the common broadcast shape of any number of shapes
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    let mut iter = shapes.iter();
    let mut result = match iter.next() {
        Some(first) => first.to_vec(),
        None => return Ok(Vec::new()),
    };
    for shape in iter {
        result = combine(&result, shape, "broadcast shapes")?;
    }
    Ok(result)
}

/// Computes the broadcast shape of two same-rank shapes
pub fn broadcast_pair<const N: usize>(left: Shape<N>, right: Shape<N>, operation: &str) -> Result<Shape<N>> {
    if left == right {
        return Ok(left);
    }
    let dims = combine(left.as_slice(), right.as_slice(), operation)?;
    Shape::from_slice(&dims)
}

/// Maps coordinates in a broadcast result back onto an operand whose
/// size-1 axes were stretched
#[inline]
pub(crate) fn source_coords<const N: usize>(coords: &[usize; N], source: &Shape<N>) -> [usize; N] {
    let mut out = *coords;
    for (axis, c) in out.iter_mut().enumerate() {
        if source[axis] == 1 {
            *c = 0;
        }
    }
    out
}

/// Error for matrix products whose inner dimensions disagree
pub(crate) fn not_aligned(left: &[usize], right: &[usize], left_axis: usize, right_axis: usize) -> TensorError {
    TensorError::broadcast(
        "MATMUL_NOT_ALIGNED",
        format!(
            "shapes {} and {} not aligned: {} (dim {}) != {} (dim {})",
            format_dims(left),
            format_dims(right),
            left[left_axis],
            left_axis,
            right[right_axis],
            right_axis
        ),
        "matmul",
        left,
        right,
        left_axis,
        "The last axis of the left operand must match the first axis of the right operand",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_broadcast_shapes() {
        let shape = broadcast_shapes(&[&[1, 3, 1], &[5, 1, 4]]).unwrap();
        assert_eq!(shape, vec![5, 3, 4]);

        let shape = broadcast_shapes(&[&[4, 1], &[3], &[2, 1, 1]]).unwrap();
        assert_eq!(shape, vec![2, 4, 3]);

        let shape = broadcast_shapes(&[&[0, 1], &[1, 5]]).unwrap();
        assert_eq!(shape, vec![0, 5]);
    }

    #[test]
    fn test_broadcast_error_reports_shapes() {
        let err = broadcast_shapes(&[&[4, 3], &[3, 4]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Broadcast);
        assert!(err
            .to_string()
            .contains("operands could not be broadcast together with shapes (4, 3) (3, 4)"));
        match err {
            TensorError::Broadcast { axis, left_shape, right_shape, .. } => {
                assert_eq!(axis, 0);
                assert_eq!(left_shape, vec![4, 3]);
                assert_eq!(right_shape, vec![3, 4]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_broadcast_pair() {
        let shape = broadcast_pair(Shape::new([4, 1]), Shape::new([1, 3]), "maximum").unwrap();
        assert_eq!(shape.dims(), &[4, 3]);
        assert!(!is_broadcast_compatible(&[2, 3], &[3, 3]));
        assert!(is_broadcast_compatible(&[3], &[7, 3]));
    }

    #[test]
    fn test_not_aligned_message() {
        let err = not_aligned(&[4, 3], &[4, 3], 1, 0);
        assert!(err.to_string().contains("shapes (4, 3) and (4, 3) not aligned: 3 (dim 1) != 4 (dim 0)"));
    }

    #[test]
    fn test_source_coords() {
        let coords = source_coords(&[3, 2], &Shape::new([4, 1]));
        assert_eq!(coords, [3, 0]);
    }
}
