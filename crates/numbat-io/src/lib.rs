//! File formats and pretty-printing for numbat tensors
//!
//! This crate reads and writes NumPy's `.npy` binary format and delimited
//! text, and renders any array in NumPy's nested-bracket layout. Everything
//! here goes through the public `NdArray` surface, so views and indirect
//! selections can be saved or printed without copying them first.

pub mod error;
pub mod format;
pub mod npy;
pub mod text;

pub use error::{Error, Result};
pub use format::{format_tensor, FormatElement, PrintOptions, Printed, Sign};
pub use npy::{load_npy, read_npy, save_npy, write_npy, Dtype, Endianness, NpyElement, NpyHeader};
pub use text::{load_txt, read_txt, save_txt, write_txt, TextOptions};
