//! Test data generators.
//!
//! Element `i` of every generated buffer holds `i + 10` converted to the
//! element type, wrapping for the 8-bit types. This makes it easy to verify
//! that data landed at the right position after a round trip.

use netcdf_access::NcElement;

/// An element type with a predictable value for every position.
pub trait Pattern: NcElement {
    /// The value expected at position `i`.
    fn at(i: u64) -> Self;
}

macro_rules! impl_pattern {
    ($($ty:ty),*) => {
        $(
            impl Pattern for $ty {
                fn at(i: u64) -> Self {
                    (i + 10) as $ty
                }
            }
        )*
    };
}

impl_pattern!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// `n` elements following the `i + 10` pattern.
///
/// # Example
///
/// ```
/// use test_utils::pattern;
///
/// assert_eq!(pattern::<i32>(3), vec![10, 11, 12]);
/// assert_eq!(pattern::<i8>(120)[119], -127);
/// ```
pub fn pattern<T: Pattern>(n: u64) -> Vec<T> {
    (0..n).map(T::at).collect()
}

/// `n` text bytes following the `i + 10` pattern.
pub fn text_pattern(n: u64) -> Vec<u8> {
    pattern::<u8>(n)
}

/// A hyperslab over the upper half of every dimension: `start = count = n / 2`.
pub fn slice_case(shape: &[u64]) -> (Vec<u64>, Vec<u64>) {
    let half: Vec<u64> = shape.iter().map(|n| n / 2).collect();
    (half.clone(), half)
}

/// Every other element starting at 1: `start = 1`, `count = (n - 1) / 2`,
/// `stride = 2`.
pub fn strided_case(shape: &[u64]) -> (Vec<u64>, Vec<u64>, Vec<i64>) {
    (
        vec![1; shape.len()],
        shape.iter().map(|n| (n - 1) / 2).collect(),
        vec![2; shape.len()],
    )
}

/// Coordinates on the main diagonal, `[i, i, .., i]` for `i` in `0..ndim`.
pub fn diagonal(ndim: usize) -> Vec<Vec<u64>> {
    (0..ndim).map(|i| vec![i as u64; ndim]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcdf_access::product;

    #[test]
    fn test_pattern_wraps_bytes() {
        let data = pattern::<i8>(130);
        assert_eq!(data[0], 10);
        assert_eq!(data[117], 127);
        assert_eq!(data[118], -128);
        assert_eq!(pattern::<u8>(250)[246], 0);
    }

    #[test]
    fn test_pattern_floats() {
        assert_eq!(pattern::<f64>(2), vec![10.0, 11.0]);
    }

    #[test]
    fn test_slice_case_fits_gopher_shapes() {
        let (start, count) = slice_case(&[7, 3]);
        assert_eq!(start, vec![3, 1]);
        assert_eq!(count, vec![3, 1]);
    }

    #[test]
    fn test_strided_case() {
        let (start, count, stride) = strided_case(&[12, 7, 3]);
        assert_eq!(start, vec![1, 1, 1]);
        assert_eq!(count, vec![5, 3, 1]);
        assert_eq!(stride, vec![2, 2, 2]);
        assert_eq!(product(&count), 15);
    }

    #[test]
    fn test_diagonal() {
        assert_eq!(diagonal(2), vec![vec![0, 0], vec![1, 1]]);
        assert!(diagonal(0).is_empty());
    }
}
