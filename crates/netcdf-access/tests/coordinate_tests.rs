//! Coordinate mapping tests.
//!
//! Covers `product`, `unravel_index` and `ravel_index`: known cases, the
//! error paths, and the round-trip property over every index of a set of
//! small shapes.

use netcdf_access::{product, ravel_index, unravel_index, NetCdfError};

// ============================================================================
// product
// ============================================================================

#[test]
fn test_product_known_shapes() {
    let cases: [(u64, &[u64]); 4] = [
        (24, &[4, 6]),
        (0, &[0, 2, 6]),
        (8064, &[4, 2, 4, 21, 12]),
        (1, &[]),
    ];
    for (expected, shape) in cases {
        assert_eq!(product(shape), expected, "product({:?})", shape);
    }
}

#[test]
fn test_product_with_zero_dimension_is_zero() {
    for n in [1u64, 7, 1000] {
        assert_eq!(product(&[0, n]), 0);
    }
}

// ============================================================================
// unravel_index
// ============================================================================

#[test]
fn test_unravel_known_indices() {
    let cases: [(u64, &[u64], &[u64]); 6] = [
        (4, &[1, 5, 3], &[0, 1, 1]),
        (1021, &[12, 421, 25], &[0, 40, 21]),
        (211, &[24, 11, 5], &[3, 9, 1]),
        (12, &[12, 5], &[2, 2]),
        (1412, &[125231], &[1412]),
        (122, &[1321, 123, 12], &[0, 10, 2]),
    ];
    for (index, shape, expected) in cases {
        let coord = unravel_index(index, shape).unwrap();
        assert_eq!(coord, expected, "unravel_index({}, {:?})", index, shape);
    }
}

#[test]
fn test_unravel_rejects_zero_dimension() {
    for (index, shape) in [(12u64, [3u64, 0]), (2, [0, 3])] {
        let err = unravel_index(index, &shape).unwrap_err();
        assert!(matches!(err, NetCdfError::InvalidShape(_)));
        assert!(err.to_string().contains("0 encountered"), "{}", err);
    }
}

#[test]
fn test_unravel_zero_dimension_checked_before_size() {
    let err = unravel_index(u64::MAX, &[4, 0]).unwrap_err();
    assert!(matches!(err, NetCdfError::InvalidShape(_)));
}

#[test]
fn test_unravel_rejects_index_past_size() {
    for (index, shape) in [(241u64, [3u64, 5]), (221, [2, 3])] {
        let err = unravel_index(index, &shape).unwrap_err();
        assert!(matches!(err, NetCdfError::IndexOutOfRange { .. }));
        assert!(err.to_string().contains("> size"), "{}", err);
    }
}

#[test]
fn test_unravel_accepts_index_equal_to_size() {
    // Only indices strictly greater than the size are rejected.
    assert_eq!(unravel_index(15, &[3, 5]).unwrap(), vec![3, 0]);
    assert!(unravel_index(16, &[3, 5]).is_err());
}

#[test]
fn test_unravel_leaves_shape_untouched() {
    let shape = vec![12u64, 7, 3];
    let before = shape.clone();
    unravel_index(100, &shape).unwrap();
    assert_eq!(shape, before);
}

// ============================================================================
// Round trip
// ============================================================================

/// Row-major flattening written out longhand.
fn flatten(coord: &[u64], shape: &[u64]) -> u64 {
    (0..coord.len())
        .map(|k| coord[k] * product(&shape[k + 1..]))
        .sum()
}

#[test]
fn test_unravel_then_flatten_round_trips() {
    let shapes: [&[u64]; 5] = [&[1], &[9], &[7, 3], &[12, 7, 3], &[2, 1, 4, 3]];
    for shape in shapes {
        for index in 0..=product(shape) {
            let coord = unravel_index(index, shape).unwrap();
            assert_eq!(coord.len(), shape.len());
            assert_eq!(flatten(&coord, shape), index, "{} in {:?}", index, shape);
            assert_eq!(ravel_index(&coord, shape).unwrap(), index);
        }
    }
}

#[test]
fn test_unravel_coordinates_within_shape() {
    let shape = [4u64, 5, 6];
    for index in 0..product(&shape) {
        let coord = unravel_index(index, &shape).unwrap();
        assert!(coord.iter().zip(&shape).all(|(c, n)| c < n), "{:?}", coord);
    }
}

#[test]
fn test_last_dimension_varies_fastest() {
    assert_eq!(unravel_index(0, &[2, 3]).unwrap(), vec![0, 0]);
    assert_eq!(unravel_index(1, &[2, 3]).unwrap(), vec![0, 1]);
    assert_eq!(unravel_index(3, &[2, 3]).unwrap(), vec![1, 0]);
}

#[test]
fn test_ravel_rejects_wrong_rank() {
    let err = ravel_index(&[1], &[2, 3]).unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::DimensionMismatch {
            what: "coordinate",
            len: 1,
            ndims: 2
        }
    ));
}
