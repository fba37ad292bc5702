//! Validation run before every bulk transfer.
//!
//! Each check fetches fresh metadata from the storage handle: nothing is
//! cached between calls. A failed check returns before the transfer is
//! issued, so the storage library never sees an invalid request from the
//! bulk accessors. Element-at-coordinate access skips these checks and
//! relies on the library's own.
//!
//! On success each function returns the number of elements the transfer
//! touches.

use crate::consts::NcType;
use crate::error::{NetCdfError, NetCdfResult};
use crate::index::product;

/// Anything with a declared element type and a total element count.
pub trait TypedArray {
    /// Declared element type.
    fn nc_type(&self) -> NetCdfResult<NcType>;

    /// Total number of elements.
    fn len(&self) -> NetCdfResult<u64>;
}

/// A [`TypedArray`] laid out over dimensions.
pub trait ShapedArray: TypedArray {
    /// Length of each dimension, outermost first.
    fn len_dims(&self) -> NetCdfResult<Vec<u64>>;
}

pub(crate) fn check_type(found: NcType, expected: NcType) -> NetCdfResult<()> {
    if found != expected {
        return Err(NetCdfError::TypeMismatch { found, expected });
    }
    Ok(())
}

pub(crate) fn check_buffer(len: usize, required: u64) -> NetCdfResult<()> {
    if (len as u64) < required {
        return Err(NetCdfError::BufferTooSmall { len, required });
    }
    Ok(())
}

fn check_rank(what: &'static str, len: usize, ndims: usize) -> NetCdfResult<()> {
    if len != ndims {
        return Err(NetCdfError::DimensionMismatch { what, len, ndims });
    }
    Ok(())
}

/// Bounds of a contiguous hyperslab against `dims`; returns `product(count)`.
pub(crate) fn slice_extent(dims: &[u64], start: &[u64], count: &[u64]) -> NetCdfResult<u64> {
    check_rank("start", start.len(), dims.len())?;
    check_rank("count", count.len(), dims.len())?;
    for (dim, ((&s, &c), &len)) in start.iter().zip(count).zip(dims).enumerate() {
        let end = s.checked_add(c);
        if s >= len || !matches!(end, Some(end) if end > 0 && end <= len) {
            return Err(NetCdfError::OutOfRange {
                dim,
                start: s,
                count: c,
                stride: 1,
                len,
            });
        }
    }
    Ok(product(count))
}

/// Bounds of a strided hyperslab against `dims`; returns `product(count)`.
///
/// The last touched position along each dimension is
/// `start + (count - 1) * stride`. A zero count addresses nothing and is
/// rejected like an empty contiguous slab.
pub(crate) fn strided_extent(
    dims: &[u64],
    start: &[u64],
    count: &[u64],
    stride: &[i64],
) -> NetCdfResult<u64> {
    check_rank("start", start.len(), dims.len())?;
    check_rank("count", count.len(), dims.len())?;
    check_rank("stride", stride.len(), dims.len())?;
    for dim in 0..dims.len() {
        let (s, c, d, len) = (start[dim], count[dim], stride[dim], dims[dim]);
        let in_range = c > 0 && s < len && {
            let last = i128::from(s) + (i128::from(c) - 1) * i128::from(d);
            last + 1 > 0 && last + 1 <= i128::from(len)
        };
        if !in_range {
            return Err(NetCdfError::OutOfRange {
                dim,
                start: s,
                count: c,
                stride: d,
                len,
            });
        }
    }
    Ok(product(count))
}

/// Check a whole-array transfer of `buffer_len` elements of `expected`.
pub fn validate_whole<A>(array: &A, expected: NcType, buffer_len: usize) -> NetCdfResult<u64>
where
    A: TypedArray + ?Sized,
{
    check_type(array.nc_type()?, expected)?;
    let required = array.len()?;
    check_buffer(buffer_len, required)?;
    Ok(required)
}

/// Check a contiguous hyperslab transfer.
///
/// Requires one `start` and `count` entry per dimension,
/// `start[i] < dim_len[i]`, `0 < start[i] + count[i] <= dim_len[i]`, and a
/// buffer of at least `product(count)` elements.
pub fn validate_slice<A>(
    array: &A,
    expected: NcType,
    buffer_len: usize,
    start: &[u64],
    count: &[u64],
) -> NetCdfResult<u64>
where
    A: ShapedArray + ?Sized,
{
    check_type(array.nc_type()?, expected)?;
    let required = slice_extent(&array.len_dims()?, start, count)?;
    check_buffer(buffer_len, required)?;
    Ok(required)
}

/// Check a strided hyperslab transfer.
///
/// As [`validate_slice`], with the upper bound
/// `start[i] + (count[i] - 1) * stride[i] + 1 <= dim_len[i]` and one
/// `stride` entry per dimension.
pub fn validate_strided_slice<A>(
    array: &A,
    expected: NcType,
    buffer_len: usize,
    start: &[u64],
    count: &[u64],
    stride: &[i64],
) -> NetCdfResult<u64>
where
    A: ShapedArray + ?Sized,
{
    check_type(array.nc_type()?, expected)?;
    let required = strided_extent(&array.len_dims()?, start, count, stride)?;
    check_buffer(buffer_len, required)?;
    Ok(required)
}
