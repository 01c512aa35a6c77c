//! Numeric operations built on the array traits
//!
//! Every operation is a unit struct with associated functions, e.g.
//! `Add::apply(&a, &b)` or `Sum::reduce_all(&a)`. They read their
//! operands only through [`crate::NdArray`], so views and indirect
//! selections work as well as owning tensors.

pub mod elementwise;
pub mod linalg;
pub mod reduce;
pub mod sort;

pub use elementwise::*;
pub use linalg::*;
pub use reduce::*;
pub use sort::*;

/// Elements with a truth value: `false` and zero are falsy, everything else
/// (including NaN) is truthy
pub trait Truthy {
    /// Returns the truth value
    fn is_truthy(&self) -> bool;
}

impl Truthy for bool {
    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! impl_truthy_int {
    ($($t:ty),*) => {
        $(
            impl Truthy for $t {
                fn is_truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

impl_truthy_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

impl Truthy for f32 {
    fn is_truthy(&self) -> bool {
        *self != 0.0
    }
}

impl Truthy for f64 {
    fn is_truthy(&self) -> bool {
        *self != 0.0
    }
}
