//! Numbat Tensor: rank-generic n-dimensional arrays with NumPy semantics
//!
//! The rank of every array is a const generic, so shapes, coordinates and
//! strides are fixed-size arrays and rank mismatches are compile errors.
//!
//! # Features
//!
//! - **Three storage kinds**: owning [`Tensor`], strided borrows
//!   ([`TensorView`], [`TensorViewMut`]) and explicit-offset selections
//!   ([`IndirectTensor`], [`IndirectTensorMut`])
//! - **Zero-copy views**: slicing, transposition, axis permutation, flips,
//!   reshapes of contiguous data and broadcasting only rewrite the layout
//! - **Advanced indexing**: coordinate tensors, flat integer tensors and
//!   boolean masks, each as a copy or as an aliasing selection
//! - **Both traversal orders**: every array iterates in row-major or
//!   column-major order through the same random-access iterator
//! - **Lazy expressions**: [`Expr`] trees evaluate broadcast arithmetic in a
//!   single pass
//! - **Numeric layers**: element-wise math, reductions, sorting, linear
//!   algebra and random sampling in [`ops`] and [`random`]
//!
//! # Example
//!
//! ```rust
//! use numbat_tensor::prelude::*;
//!
//! let mut a = Tensor::from_vec([3, 4], (0..12).collect()).unwrap();
//!
//! // Every second column of the last two rows
//! let v = a.slice::<2>(&s![1.., Slice::range(0, 4, 2)]).unwrap();
//! assert_eq!(v.to_vec(), vec![4, 6, 8, 10]);
//!
//! // Writes through a view land in the owner
//! a.slice_mut::<1>(&s![0]).unwrap().fill(-1);
//! assert_eq!(&a.as_slice()[..4], &[-1, -1, -1, -1]);
//!
//! let column_major: Vec<i32> = a.iter_order(Order::ColumnMajor).copied().collect();
//! assert_eq!(&column_major[..3], &[-1, 4, 8]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod broadcast;
pub mod error;
pub mod expr;
pub mod indexing;
pub mod indirect;
#[cfg(feature = "ndarray")]
pub mod interop;
pub mod iter;
pub mod layout;
pub mod ops;
pub mod random;
pub mod shape;
pub mod slice;
pub mod tensor;
pub mod validation;
pub mod view;

// Re-export main types
pub use array::{NdArray, NdArrayMut, StridedArray, StridedArrayMut};
pub use broadcast::{broadcast_pair, broadcast_shapes, is_broadcast_compatible};
pub use error::{ErrorKind, Result, TensorError};
pub use expr::Expr;
pub use indirect::{IndirectTensor, IndirectTensorMut};
pub use iter::{IndexedIter, Indices, Iter, Mapping, Offsets};
pub use layout::Layout;
pub use random::Generator;
pub use shape::{NdIndex, Order, Shape, Strides};
pub use slice::{IndexArg, Slice};
pub use tensor::Tensor;
pub use view::{TensorView, TensorViewMut};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        s, Expr, IndexArg, IndirectTensor, IndirectTensorMut, NdArray, NdArrayMut, NdIndex, Order, Result, Shape, Slice,
        StridedArray, StridedArrayMut, Tensor, TensorError, TensorView, TensorViewMut,
    };
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
