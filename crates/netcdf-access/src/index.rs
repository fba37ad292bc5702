//! Coordinate mapping between flat element offsets and N-dimensional
//! coordinates.
//!
//! Arrays are flattened row-major: dimension 0 varies slowest and the last
//! dimension varies fastest. All functions are pure and never touch the
//! caller's shape.

use crate::error::{NetCdfError, NetCdfResult};

/// Total number of elements described by `shape`.
///
/// An empty shape is a scalar and holds one element. The accumulator is a
/// `u64` that saturates instead of wrapping.
pub fn product(shape: &[u64]) -> u64 {
    shape.iter().fold(1u64, |acc, &n| acc.saturating_mul(n))
}

/// Convert a flat row-major index into a coordinate for `shape`.
///
/// Fails with [`NetCdfError::InvalidShape`] when any dimension is zero and
/// with [`NetCdfError::IndexOutOfRange`] when `index > product(shape)`.
/// `index == product(shape)` is accepted and yields the one-past-the-end
/// coordinate (first component equal to `shape[0]`).
///
/// # Example
///
/// ```
/// use netcdf_access::unravel_index;
///
/// assert_eq!(unravel_index(4, &[1, 5, 3]).unwrap(), vec![0, 1, 1]);
/// assert_eq!(unravel_index(12, &[12, 5]).unwrap(), vec![2, 2]);
/// ```
pub fn unravel_index(index: u64, shape: &[u64]) -> NetCdfResult<Vec<u64>> {
    if shape.contains(&0) {
        return Err(NetCdfError::InvalidShape(shape.to_vec()));
    }

    let size = product(shape);
    if index > size {
        return Err(NetCdfError::IndexOutOfRange {
            index,
            size,
            shape: shape.to_vec(),
        });
    }

    // Dimensions already consumed are collapsed to 1 so that the product of
    // the working shape is the stride of the current dimension.
    let mut working = shape.to_vec();
    let mut remaining = index;
    let mut coord = vec![0u64; shape.len()];
    for i in 0..working.len() {
        working[i] = 1;
        let divisor = product(&working);
        coord[i] = remaining / divisor;
        remaining -= coord[i] * divisor;
    }
    Ok(coord)
}

/// Convert a coordinate into its flat row-major index for `shape`.
///
/// The coordinate must have one entry per dimension. Components are not
/// bounds-checked, so the one-past-the-end coordinate produced by
/// [`unravel_index`] maps back to `product(shape)`. A coordinate whose flat
/// index does not fit in a `u64` fails with [`NetCdfError::IndexOutOfRange`]
/// carrying `index == u64::MAX`.
pub fn ravel_index(coord: &[u64], shape: &[u64]) -> NetCdfResult<u64> {
    if coord.len() != shape.len() {
        return Err(NetCdfError::DimensionMismatch {
            what: "coordinate",
            len: coord.len(),
            ndims: shape.len(),
        });
    }
    coord
        .iter()
        .zip(shape)
        .try_fold(0u64, |flat, (&c, &n)| flat.checked_mul(n)?.checked_add(c))
        .ok_or_else(|| NetCdfError::IndexOutOfRange {
            index: u64::MAX,
            size: product(shape),
            shape: shape.to_vec(),
        })
}

/// Row-major positions covered by a regular hyperslab, in transfer order.
///
/// `start`, `count` and `stride` must all have one entry per dimension of
/// `shape`; the caller is responsible for bounds.
pub(crate) fn hyperslab_offsets(
    shape: &[u64],
    start: &[u64],
    count: &[u64],
    stride: &[i64],
) -> Vec<u64> {
    let total = product(count);
    let mut offsets = Vec::with_capacity(total as usize);
    if total == 0 {
        return offsets;
    }

    let mut step = vec![0u64; count.len()];
    loop {
        let flat = step
            .iter()
            .enumerate()
            .fold(0u64, |flat, (i, &k)| {
                let pos = start[i] as i64 + k as i64 * stride[i];
                flat * shape[i] + pos as u64
            });
        offsets.push(flat);

        // Odometer increment, last dimension fastest.
        let mut dim = count.len();
        loop {
            if dim == 0 {
                return offsets;
            }
            dim -= 1;
            step[dim] += 1;
            if step[dim] < count[dim] {
                break;
            }
            step[dim] = 0;
        }
    }
}
