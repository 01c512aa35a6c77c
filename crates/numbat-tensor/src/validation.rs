//! Shape validation for the linear-algebra operations
//!
//! These checks run before any output is allocated so that a failing call
//! never leaves a destination half-written.

use crate::broadcast::{is_broadcast_compatible, not_aligned};
use crate::error::{Result, TensorError};
use crate::shape::{format_dims, Shape};

/// Shape checks shared by the matrix operations
pub struct TensorValidator;

impl TensorValidator {
    /// Validate matrix multiplication shapes, including leading batch axes,
    /// and return the output dims
    pub fn validate_matmul_shapes(left: &[usize], right: &[usize]) -> Result<Vec<usize>> {
        for (dims, side) in [(left, "left"), (right, "right")] {
            if dims.len() < 2 {
                return Err(TensorError::invalid_argument(
                    "MATMUL_TOO_FEW_DIMS",
                    format!(
                        "{} operand {} needs at least 2 dimensions for matrix multiplication",
                        side,
                        format_dims(dims)
                    ),
                    "matmul",
                    "Use a shape [M, K] or batch axes followed by [M, K]",
                ));
            }
        }

        let (l, r) = (left.len(), right.len());
        if left[l - 1] != right[r - 2] {
            return Err(not_aligned(left, right, l - 1, r - 2));
        }

        let left_batch = &left[..l - 2];
        let right_batch = &right[..r - 2];
        if !is_broadcast_compatible(left_batch, right_batch) {
            return Err(TensorError::broadcast(
                "MATMUL_BATCH_MISMATCH",
                format!(
                    "batch axes {} and {} are not broadcastable for matrix multiplication",
                    format_dims(left_batch),
                    format_dims(right_batch)
                ),
                "matmul",
                left,
                right,
                0,
                "Ensure batch dimensions follow broadcasting rules",
            ));
        }

        let batch = l.max(r) - 2;
        let mut output = Vec::with_capacity(batch + 2);
        for i in 0..batch {
            let dim = |dims: &[usize]| {
                let pad = batch - dims.len();
                if i < pad {
                    1
                } else {
                    dims[i - pad]
                }
            };
            let (a, b) = (dim(left_batch), dim(right_batch));
            output.push(if a == 1 { b } else { a });
        }
        output.push(left[l - 2]);
        output.push(right[r - 1]);
        Ok(output)
    }

    /// Validate that a matrix is square and return its order
    pub fn validate_square(shape: &Shape<2>, operation: &str) -> Result<usize> {
        if shape[0] != shape[1] {
            return Err(TensorError::invalid_argument(
                "MATRIX_NOT_SQUARE",
                format!("Last 2 dimensions of the array must be square, got {}", shape),
                operation,
                "Pass an (n, n) matrix",
            ));
        }
        Ok(shape[0])
    }

    /// Validate the right-hand side of a square system of order `n`
    pub fn validate_system_rhs(n: usize, rhs: &[usize], operation: &str) -> Result<()> {
        if rhs.first() != Some(&n) {
            return Err(TensorError::shape_mismatch(
                "SOLVE_RHS_MISMATCH",
                format!(
                    "right-hand side {} does not match a system of order {}",
                    format_dims(rhs),
                    n
                ),
                operation,
                format_dims(&[n, n]),
                format_dims(rhs),
                "The first axis of the right-hand side must equal the matrix order",
            ));
        }
        Ok(())
    }
}
