//! Advanced indexing: resolving coordinate tensors, integer tensors and
//! boolean masks into explicit offset lists
//!
//! The offset lists back [`crate::IndirectTensor`] and
//! [`crate::IndirectTensorMut`]. Every entry is validated before any
//! selection is handed out.

use crate::array::NdArray;
use crate::error::{Result, TensorError};
use crate::iter::Mapping;
use crate::shape::{NdIndex, Shape};
use crate::tensor::try_vec;

/// Resolves a tensor of coordinates against `mapping`
pub(crate) fn gather_coords<const N: usize, const M: usize, C>(
    mapping: &Mapping<'_, N>,
    coords: &C,
) -> Result<(Shape<M>, Vec<usize>)>
where
    C: NdArray<M, Elem = NdIndex<N>> + ?Sized,
{
    let shape = mapping.shape();
    let mut offsets = try_vec(coords.size())?;
    for index in coords.iter() {
        shape.check_index(index.coords(), "coordinate indexing")?;
        offsets.push(mapping.offset_of(index.coords()));
    }
    Ok((coords.shape(), offsets))
}

/// Resolves plain integer positions against a rank-1 `mapping`
pub(crate) fn gather_flat<const N: usize, const M: usize, C>(
    mapping: &Mapping<'_, N>,
    indices: &C,
) -> Result<(Shape<M>, Vec<usize>)>
where
    C: NdArray<M, Elem = usize> + ?Sized,
{
    if N != 1 {
        return Err(TensorError::invalid_argument(
            "FLAT_INDEX_RANK",
            format!("integer-array indexing needs a 1-dimensional array, got {} dimensions", N),
            "integer indexing",
            "Index higher-rank arrays with a tensor of coordinates instead",
        ));
    }
    let len = mapping.shape()[0];
    let mut offsets = try_vec(indices.size())?;
    for &i in indices.iter() {
        if i >= len {
            return Err(TensorError::out_of_range(
                "INDEX_OUT_OF_RANGE",
                format!("index {} is out of bounds for axis 0 with size {}", i, len),
                i,
                0,
                len,
                "integer indexing",
                "Use positions below the array length",
            ));
        }
        let mut coords = [0usize; N];
        coords[0] = i;
        offsets.push(mapping.offset_of(&coords));
    }
    Ok((indices.shape(), offsets))
}

/// Resolves a boolean mask of the same shape into row-major offsets of its
/// `true` positions
pub(crate) fn gather_mask<const N: usize, B>(mapping: &Mapping<'_, N>, mask: &B) -> Result<(Shape<1>, Vec<usize>)>
where
    B: NdArray<N, Elem = bool> + ?Sized,
{
    let shape = mapping.shape();
    let mask_shape = mask.shape();
    if mask_shape != shape {
        return Err(TensorError::shape_mismatch(
            "MASK_SHAPE_MISMATCH",
            format!(
                "boolean index did not match indexed array; array shape is {} but mask shape is {}",
                shape, mask_shape
            ),
            "boolean indexing",
            shape.to_string(),
            mask_shape.to_string(),
            "Use a mask with exactly the shape of the indexed array",
        ));
    }
    let count = mask.iter().filter(|&&selected| selected).count();
    let mut offsets = try_vec(count)?;
    for (index, &selected) in mask.indexed_iter() {
        if selected {
            offsets.push(mapping.offset_of(index.coords()));
        }
    }
    Ok((Shape::new([count]), offsets))
}
