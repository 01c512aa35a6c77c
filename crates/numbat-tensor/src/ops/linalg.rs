//! Linear algebra
//!
//! Products read their operands through the array mapping, so transposed
//! and sliced views multiply without being copied first. The factorizations
//! work on a row-major copy of the input.

use std::ops::Mul;

use num_traits::{Float, One, Zero};
use tracing::debug;

use crate::array::{NdArray, NdArrayMut};
use crate::broadcast::not_aligned;
use crate::error::{Result, TensorError};
use crate::shape::{Order, Shape};
use crate::tensor::{try_vec, Tensor};
use crate::validation::TensorValidator;

/// Matrix multiplication configuration: `C = alpha * op(A) @ op(B) + beta * C`
#[derive(Debug, Clone, Copy)]
pub struct MatMulConfig<T> {
    /// Whether to transpose the left matrix
    pub transpose_a: bool,
    /// Whether to transpose the right matrix
    pub transpose_b: bool,
    /// Scale of the product
    pub alpha: T,
    /// Scale of the existing destination; zero ignores its contents
    pub beta: T,
}

impl<T: Zero + One> Default for MatMulConfig<T> {
    fn default() -> Self {
        Self {
            transpose_a: false,
            transpose_b: false,
            alpha: T::one(),
            beta: T::zero(),
        }
    }
}

/// Inner product of two rank-1 arrays
pub struct Dot;

impl Dot {
    /// Sum of element-wise products
    pub fn compute<T, A, B>(a: &A, b: &B) -> Result<T>
    where
        A: NdArray<1, Elem = T> + ?Sized,
        B: NdArray<1, Elem = T> + ?Sized,
        T: Copy + Zero + Mul<Output = T>,
    {
        let (a_shape, b_shape) = (a.shape(), b.shape());
        if a_shape != b_shape {
            return Err(not_aligned(a_shape.as_slice(), b_shape.as_slice(), 0, 0));
        }
        Ok(a.iter().zip(b.iter()).fold(T::zero(), |acc, (&x, &y)| acc + x * y))
    }
}

/// General matrix multiplication (GEMM)
pub struct Gemm;

impl Gemm {
    /// Block sizes along the output rows, the shared axis and output columns
    const MC: usize = 64;
    const KC: usize = 256;
    const NC: usize = 512;

    /// Validates shapes for matrix multiplication and returns the output shape
    pub fn validate_shapes(a_shape: Shape<2>, b_shape: Shape<2>, transpose_a: bool, transpose_b: bool) -> Result<Shape<2>> {
        let (m, k1, a_axis) = if transpose_a {
            (a_shape[1], a_shape[0], 0)
        } else {
            (a_shape[0], a_shape[1], 1)
        };
        let (k2, n, b_axis) = if transpose_b {
            (b_shape[1], b_shape[0], 1)
        } else {
            (b_shape[0], b_shape[1], 0)
        };
        if k1 != k2 {
            return Err(not_aligned(a_shape.as_slice(), b_shape.as_slice(), a_axis, b_axis));
        }
        Ok(Shape::new([m, n]))
    }

    /// Matrix product `a @ b`
    pub fn compute<T, A, B>(a: &A, b: &B) -> Result<Tensor<T, 2>>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        B: NdArray<2, Elem = T> + ?Sized,
        T: Copy + Zero + One + Mul<Output = T>,
    {
        let shape = Self::validate_shapes(a.shape(), b.shape(), false, false)?;
        let mut c = Tensor::zeros(shape)?;
        Self::compute_into(a, b, &mut c, &MatMulConfig::default())?;
        Ok(c)
    }

    /// Performs `c = alpha * op(a) @ op(b) + beta * c`; `c` may be any
    /// writable 2-D array of the output shape
    pub fn compute_into<T, A, B, C>(a: &A, b: &B, c: &mut C, config: &MatMulConfig<T>) -> Result<()>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        B: NdArray<2, Elem = T> + ?Sized,
        C: NdArrayMut<2, Elem = T> + ?Sized,
        T: Copy + Zero + Mul<Output = T>,
    {
        let shape = Self::validate_shapes(a.shape(), b.shape(), config.transpose_a, config.transpose_b)?;
        if c.shape() != shape {
            return Err(TensorError::shape_mismatch(
                "GEMM_OUTPUT_SHAPE",
                format!("output array of shape {} cannot hold a product of shape {}", c.shape(), shape),
                "matmul",
                c.shape().to_string(),
                shape.to_string(),
                "Allocate the destination with the product's shape",
            ));
        }
        let (m, n) = (shape[0], shape[1]);
        let k = if config.transpose_a { a.shape()[0] } else { a.shape()[1] };
        debug!(m, n, k, "gemm");

        let product = Self::compute_blocked(a, b, m, n, k, config)?;
        let (data, mapping) = c.parts_mut();
        for (offset, value) in mapping.offsets(Order::RowMajor).zip(product) {
            data[offset] = if config.beta.is_zero() {
                config.alpha * value
            } else {
                config.alpha * value + config.beta * data[offset]
            };
        }
        Ok(())
    }

    /// Row-major `op(a) @ op(b)`, accumulated block by block
    fn compute_blocked<T, A, B>(a: &A, b: &B, m: usize, n: usize, k: usize, config: &MatMulConfig<T>) -> Result<Vec<T>>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        B: NdArray<2, Elem = T> + ?Sized,
        T: Copy + Zero + Mul<Output = T>,
    {
        let (a_data, a_map) = (a.buffer(), a.mapping());
        let (b_data, b_map) = (b.buffer(), b.mapping());
        let a_at = |i: usize, p: usize| {
            let coords = if config.transpose_a { [p, i] } else { [i, p] };
            a_data[a_map.offset_of(&coords)]
        };
        let b_at = |p: usize, j: usize| {
            let coords = if config.transpose_b { [j, p] } else { [p, j] };
            b_data[b_map.offset_of(&coords)]
        };

        let mut c = try_vec(m * n)?;
        c.resize(m * n, T::zero());
        for jc in (0..n).step_by(Self::NC) {
            let j_end = (jc + Self::NC).min(n);
            for pc in (0..k).step_by(Self::KC) {
                let p_end = (pc + Self::KC).min(k);
                for ic in (0..m).step_by(Self::MC) {
                    let i_end = (ic + Self::MC).min(m);
                    for i in ic..i_end {
                        for p in pc..p_end {
                            let x = a_at(i, p);
                            let row = &mut c[i * n + jc..i * n + j_end];
                            for (j, out) in (jc..j_end).zip(row.iter_mut()) {
                                *out = *out + x * b_at(p, j);
                            }
                        }
                    }
                }
            }
        }
        Ok(c)
    }
}

/// Matrix multiplication over a leading batch axis, which broadcasts
pub struct BatchedMatMul;

impl BatchedMatMul {
    /// Multiplies `a[i] @ b[i]` for every batch entry `i`
    pub fn compute<T, A, B>(a: &A, b: &B) -> Result<Tensor<T, 3>>
    where
        A: NdArray<3, Elem = T> + ?Sized,
        B: NdArray<3, Elem = T> + ?Sized,
        T: Copy + Zero + Mul<Output = T>,
    {
        let (a_shape, b_shape) = (a.shape(), b.shape());
        let dims = TensorValidator::validate_matmul_shapes(a_shape.as_slice(), b_shape.as_slice())?;
        let shape = Shape::<3>::from_slice(&dims)?;
        let k = a_shape[2];
        let (a_data, a_map) = (a.buffer(), a.mapping());
        let (b_data, b_map) = (b.buffer(), b.mapping());
        Tensor::from_fn(shape, |index| {
            let [batch, i, j] = index.into_array();
            let a_batch = if a_shape[0] == 1 { 0 } else { batch };
            let b_batch = if b_shape[0] == 1 { 0 } else { batch };
            (0..k).fold(T::zero(), |acc, p| {
                acc + a_data[a_map.offset_of(&[a_batch, i, p])] * b_data[b_map.offset_of(&[b_batch, p, j])]
            })
        })
    }
}

/// Matrix-vector product
pub struct MatVec;

impl MatVec {
    /// Computes `a @ x` for an (m, k) matrix and a length-k vector
    pub fn compute<T, A, X>(a: &A, x: &X) -> Result<Tensor<T, 1>>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        X: NdArray<1, Elem = T> + ?Sized,
        T: Copy + Zero + Mul<Output = T>,
    {
        let (a_shape, x_shape) = (a.shape(), x.shape());
        if a_shape[1] != x_shape[0] {
            return Err(not_aligned(a_shape.as_slice(), x_shape.as_slice(), 1, 0));
        }
        let x_values: Vec<T> = x.iter().copied().collect();
        let (data, mapping) = (a.buffer(), a.mapping());
        Tensor::from_fn([a_shape[0]], |index| {
            let i = index[0];
            x_values
                .iter()
                .enumerate()
                .fold(T::zero(), |acc, (p, &v)| acc + data[mapping.offset_of(&[i, p])] * v)
        })
    }
}

/// Outer product
pub struct Outer;

impl Outer {
    /// `out[i, j] = a[i] * b[j]`
    pub fn compute<T, A, B>(a: &A, b: &B) -> Result<Tensor<T, 2>>
    where
        A: NdArray<1, Elem = T> + ?Sized,
        B: NdArray<1, Elem = T> + ?Sized,
        T: Copy + Mul<Output = T>,
    {
        let (a_data, a_map) = (a.buffer(), a.mapping());
        let (b_data, b_map) = (b.buffer(), b.mapping());
        Tensor::from_fn([a.size(), b.size()], |index| {
            a_data[a_map.offset_of(&[index[0]])] * b_data[b_map.offset_of(&[index[1]])]
        })
    }
}

/// Sum along a diagonal
pub struct Trace;

impl Trace {
    /// Sum of the main diagonal of a possibly non-square matrix
    pub fn compute<T, A>(a: &A) -> T
    where
        A: NdArray<2, Elem = T> + ?Sized,
        T: Copy + Zero,
    {
        Self::with_offset(a, 0)
    }

    /// Sum of the diagonal `offset` places above (positive) or below
    /// (negative) the main one
    pub fn with_offset<T, A>(a: &A, offset: isize) -> T
    where
        A: NdArray<2, Elem = T> + ?Sized,
        T: Copy + Zero,
    {
        let shape = a.shape();
        let (row0, col0) = if offset >= 0 {
            (0, offset.unsigned_abs())
        } else {
            (offset.unsigned_abs(), 0)
        };
        let len = shape[0].saturating_sub(row0).min(shape[1].saturating_sub(col0));
        (0..len).fold(T::zero(), |acc, d| match a.get([row0 + d, col0 + d]) {
            Some(&x) => acc + x,
            None => acc,
        })
    }
}

/// Identity-like matrices
pub struct Eye;

impl Eye {
    /// The n x n identity
    pub fn identity<T: Zero + One>(n: usize) -> Result<Tensor<T, 2>> {
        Self::new(n, n, 0)
    }

    /// A `rows` x `cols` matrix with ones on diagonal `k` and zeros elsewhere
    pub fn new<T: Zero + One>(rows: usize, cols: usize, k: isize) -> Result<Tensor<T, 2>> {
        Tensor::from_fn([rows, cols], |index| {
            if index[1] as isize - index[0] as isize == k {
                T::one()
            } else {
                T::zero()
            }
        })
    }
}

/// Row-major LU factorization with partial pivoting, `P A = L U`
struct Lu<T> {
    lu: Vec<T>,
    perm: Vec<usize>,
    n: usize,
    swaps: usize,
    singular: bool,
}

impl<T: Float> Lu<T> {
    fn factor<A>(a: &A, operation: &str) -> Result<Self>
    where
        A: NdArray<2, Elem = T> + ?Sized,
    {
        let n = TensorValidator::validate_square(&a.shape(), operation)?;
        let mut lu = a.to_vec();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut swaps = 0;
        let mut singular = false;

        for col in 0..n {
            let mut pivot = col;
            for row in col + 1..n {
                if lu[row * n + col].abs() > lu[pivot * n + col].abs() {
                    pivot = row;
                }
            }
            if lu[pivot * n + col].is_zero() {
                singular = true;
                continue;
            }
            if pivot != col {
                for j in 0..n {
                    lu.swap(pivot * n + j, col * n + j);
                }
                perm.swap(pivot, col);
                swaps += 1;
            }
            for row in col + 1..n {
                let factor = lu[row * n + col] / lu[col * n + col];
                lu[row * n + col] = factor;
                for j in col + 1..n {
                    let upper = lu[col * n + j];
                    lu[row * n + j] = lu[row * n + j] - factor * upper;
                }
            }
        }
        Ok(Self {
            lu,
            perm,
            n,
            swaps,
            singular,
        })
    }

    fn det(&self) -> T {
        if self.singular {
            return T::zero();
        }
        let diagonal = (0..self.n).fold(T::one(), |acc, i| acc * self.lu[i * self.n + i]);
        if self.swaps % 2 == 1 {
            -diagonal
        } else {
            diagonal
        }
    }

    fn require_regular(&self, operation: &str) -> Result<()> {
        if self.singular {
            return Err(TensorError::invalid_argument(
                "SINGULAR_MATRIX",
                "Singular matrix",
                operation,
                "The matrix has no inverse; check for linearly dependent rows",
            ));
        }
        Ok(())
    }

    /// Solves in place for one right-hand side column laid out with `stride`
    fn solve_column(&self, rhs: &[T], column: usize, stride: usize) -> Vec<T> {
        let n = self.n;
        let mut x: Vec<T> = self.perm.iter().map(|&p| rhs[p * stride + column]).collect();
        for i in 0..n {
            for j in 0..i {
                x[i] = x[i] - self.lu[i * n + j] * x[j];
            }
        }
        for i in (0..n).rev() {
            for j in i + 1..n {
                x[i] = x[i] - self.lu[i * n + j] * x[j];
            }
            x[i] = x[i] / self.lu[i * n + i];
        }
        x
    }
}

/// Determinant
pub struct Det;

impl Det {
    /// Determinant of a square matrix; exactly zero when singular
    pub fn compute<T, A>(a: &A) -> Result<T>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        T: Float,
    {
        Ok(Lu::factor(a, "det")?.det())
    }
}

/// Matrix inverse
pub struct Inverse;

impl Inverse {
    /// Inverse of a square, non-singular matrix
    pub fn compute<T, A>(a: &A) -> Result<Tensor<T, 2>>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        T: Float,
    {
        let lu = Lu::factor(a, "inv")?;
        lu.require_regular("inv")?;
        let n = lu.n;
        let identity: Tensor<T, 2> = Eye::identity(n)?;
        let columns: Vec<Vec<T>> = (0..n).map(|j| lu.solve_column(identity.as_slice(), j, n)).collect();
        Tensor::from_fn([n, n], |index| columns[index[1]][index[0]])
    }
}

/// Linear system solver
pub struct Solve;

impl Solve {
    /// Solves `a @ x = b` for a vector `b`
    pub fn compute<T, A, B>(a: &A, b: &B) -> Result<Tensor<T, 1>>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        B: NdArray<1, Elem = T> + ?Sized,
        T: Float,
    {
        let lu = Lu::factor(a, "solve")?;
        TensorValidator::validate_system_rhs(lu.n, b.shape().as_slice(), "solve")?;
        lu.require_regular("solve")?;
        let x = lu.solve_column(&b.to_vec(), 0, 1);
        Tensor::from_vec([lu.n], x)
    }

    /// Solves `a @ x = b` for every column of a matrix `b`
    pub fn matrix<T, A, B>(a: &A, b: &B) -> Result<Tensor<T, 2>>
    where
        A: NdArray<2, Elem = T> + ?Sized,
        B: NdArray<2, Elem = T> + ?Sized,
        T: Float,
    {
        let lu = Lu::factor(a, "solve")?;
        let b_shape = b.shape();
        TensorValidator::validate_system_rhs(lu.n, b_shape.as_slice(), "solve")?;
        lu.require_regular("solve")?;
        let rhs = b.to_vec();
        let columns: Vec<Vec<T>> = (0..b_shape[1]).map(|j| lu.solve_column(&rhs, j, b_shape[1])).collect();
        Tensor::from_fn(b_shape, |index| columns[index[1]][index[0]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::StridedArray;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    fn matrix(rows: usize, cols: usize, values: Vec<f64>) -> Tensor<f64, 2> {
        Tensor::from_vec([rows, cols], values).unwrap()
    }

    #[test]
    fn test_gemm_basic() {
        let a = matrix(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = matrix(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let c = Gemm::compute(&a, &b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2]);
        assert_eq!(c.as_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_gemm_not_aligned() {
        let a = matrix(4, 3, vec![0.0; 12]);
        let err = Gemm::compute(&a, &a).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Broadcast);
        assert!(err.to_string().contains("shapes (4, 3) and (4, 3) not aligned"));
    }

    #[test]
    fn test_gemm_through_views_and_config() {
        let a = matrix(3, 2, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let b = matrix(3, 2, vec![7.0, 8.0, 9.0, 10.0, 11.0, 12.0]);
        let viewed = Gemm::compute(&a.transpose(), &b).unwrap();
        assert_eq!(viewed.as_slice(), &[58.0, 64.0, 139.0, 154.0]);

        let mut c = matrix(2, 2, vec![1.0; 4]);
        let config = MatMulConfig {
            transpose_a: true,
            alpha: 2.0,
            beta: 1.0,
            ..MatMulConfig::default()
        };
        Gemm::compute_into(&a, &b, &mut c, &config).unwrap();
        assert_eq!(c.as_slice(), &[117.0, 129.0, 279.0, 309.0]);
    }

    #[test]
    fn test_gemm_oversized_product_reports_allocation_failure() {
        let one = matrix(1, 1, vec![1.0]);
        let huge = 1usize << 40;
        let a = one.broadcast_to([huge, 1]).unwrap();
        let b = one.broadcast_to([1, huge]).unwrap();
        let err = Gemm::compute(&a, &b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AllocationFailure);
    }

    #[test]
    fn test_gemm_large_blocks() {
        let n = 300;
        let a = Tensor::<f64, 2>::from_fn([n, n], |i| (i[0] + i[1]) as f64).unwrap();
        let eye: Tensor<f64, 2> = Eye::identity(n).unwrap();
        let c = Gemm::compute(&a, &eye).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_batched_matmul_broadcasts_batch() {
        let a = Tensor::from_vec([1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Tensor::from_vec([2, 2, 1], vec![1.0, 1.0, 2.0, 0.0]).unwrap();
        let c = BatchedMatMul::compute(&a, &b).unwrap();
        assert_eq!(c.shape().dims(), &[2, 2, 1]);
        assert_eq!(c.as_slice(), &[3.0, 7.0, 2.0, 6.0]);
    }

    #[test]
    fn test_vector_products() {
        let x = Tensor::from_vec([3], vec![1.0, 2.0, 3.0]).unwrap();
        let y = Tensor::from_vec([3], vec![4.0, 5.0, 6.0]).unwrap();
        assert_eq!(Dot::compute(&x, &y).unwrap(), 32.0);
        let short = Tensor::from_vec([2], vec![1.0, 2.0]).unwrap();
        assert!(Dot::compute(&x, &short).is_err());

        let outer = Outer::compute(&short, &x).unwrap();
        assert_eq!(outer.as_slice(), &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0]);

        let a = matrix(2, 3, vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(MatVec::compute(&a, &x).unwrap().as_slice(), &[4.0, 2.0]);
        assert!(MatVec::compute(&a, &short).is_err());
    }

    #[test]
    fn test_trace_and_eye() {
        let e: Tensor<i32, 2> = Eye::new(3, 4, 1).unwrap();
        assert_eq!(e.as_slice(), &[0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(Trace::compute(&e), 0);
        assert_eq!(Trace::with_offset(&e, 1), 3);
        let a = Tensor::from_vec([2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(Trace::compute(&a), 6);
        assert_eq!(Trace::with_offset(&a, -1), 4);
    }

    #[test]
    fn test_determinant() {
        let a = matrix(3, 3, vec![2.0, 0.0, 1.0, 1.0, 3.0, 2.0, 1.0, 1.0, 2.0]);
        assert_relative_eq!(Det::compute(&a).unwrap(), 6.0, epsilon = 1e-12);
        let swapped = matrix(2, 2, vec![0.0, 1.0, 1.0, 0.0]);
        assert_relative_eq!(Det::compute(&swapped).unwrap(), -1.0);
        let singular = matrix(2, 2, vec![1.0, 2.0, 2.0, 4.0]);
        assert_eq!(Det::compute(&singular).unwrap(), 0.0);
        assert!(Det::compute(&matrix(2, 3, vec![0.0; 6])).is_err());
    }

    #[test]
    fn test_inverse_round_trips_to_identity() {
        let a = matrix(3, 3, vec![4.0, 7.0, 2.0, 3.0, 6.0, 1.0, 2.0, 5.0, 3.0]);
        let inv = Inverse::compute(&a).unwrap();
        let product = Gemm::compute(&a, &inv).unwrap();
        let eye: Tensor<f64, 2> = Eye::identity(3).unwrap();
        for (x, y) in product.as_slice().iter().zip(eye.as_slice()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-10);
        }
        let singular = matrix(2, 2, vec![1.0, 2.0, 2.0, 4.0]);
        let err = Inverse::compute(&singular).unwrap_err();
        assert_eq!(err.code(), "SINGULAR_MATRIX");
    }

    #[test]
    fn test_solve() {
        let a = matrix(2, 2, vec![3.0, 1.0, 1.0, 2.0]);
        let b = Tensor::from_vec([2], vec![9.0, 8.0]).unwrap();
        let x = Solve::compute(&a, &b).unwrap();
        assert_relative_eq!(x.as_slice()[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(x.as_slice()[1], 3.0, epsilon = 1e-12);

        let rhs = matrix(2, 2, vec![9.0, 3.0, 8.0, 1.0]);
        let xs = Solve::matrix(&a, &rhs).unwrap();
        assert_relative_eq!(xs[[0, 0]], 2.0, epsilon = 1e-12);
        assert_relative_eq!(xs[[1, 0]], 3.0, epsilon = 1e-12);
        assert_relative_eq!(xs[[0, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(xs[[1, 1]], 0.0, epsilon = 1e-12);

        let wrong = Tensor::from_vec([3], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(Solve::compute(&a, &wrong).unwrap_err().is_shape_mismatch());
    }
}
