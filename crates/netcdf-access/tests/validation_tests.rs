//! Accessor validation tests.
//!
//! Invalid requests must be rejected before the storage library sees them,
//! so besides the error itself each test checks the transfer counters of
//! `MemoryStorage` and, for writes, that stored data kept its fill value.

use anyhow::Result;
use netcdf_access::{Dataset, FileMode, MemoryStorage, NcType, NetCdfError, Storage, Var};
use test_utils::assert_storage_code;

const INT_FILL: i32 = -2147483647;

/// A netCDF-4 dataset with `NC_INT` variables `grid` over `[7, 3]` and
/// `row` over `[5]`.
fn setup(storage: &MemoryStorage) -> Result<Dataset<'_, MemoryStorage>> {
    let ds = Dataset::create(storage, "validation.nc", FileMode::CLOBBER | FileMode::NETCDF4)?;
    let height = ds.add_dim("height", 7)?;
    let width = ds.add_dim("width", 3)?;
    let n = ds.add_dim("n", 5)?;
    ds.add_var("grid", NcType::Int, &[height, width])?;
    ds.add_var("row", NcType::Int, &[n])?;
    Ok(ds)
}

fn all_fill<S: Storage + ?Sized>(var: &Var<'_, S>) -> Result<bool> {
    Ok(var.get_values::<i32>()?.iter().all(|&v| v == INT_FILL))
}

// ============================================================================
// Type
// ============================================================================

#[test]
fn test_type_mismatch_issues_no_transfer() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    let err = grid.write_values(&[0.5f64; 21]).unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::TypeMismatch {
            found: NcType::Int,
            expected: NcType::Double
        }
    ));
    assert_eq!(storage.stats().writes, 0);

    let mut out = [0f32; 21];
    assert!(grid.read_values(&mut out).unwrap_err().is_validation());
    assert!(grid.get_values::<i64>().unwrap_err().is_validation());
    assert!(grid.read_text(&mut [0u8; 21]).unwrap_err().is_validation());
    assert_eq!(storage.stats().reads, 0);
    Ok(())
}

#[test]
fn test_type_checked_before_everything_else() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    // Wrong rank, out of range and no buffer at all: the type still wins.
    let err = grid.write_slice::<u16>(&[], &[9], &[9]).unwrap_err();
    assert!(matches!(err, NetCdfError::TypeMismatch { .. }));
    let err = grid
        .read_strided_slice::<f32>(&mut [], &[9], &[9], &[0])
        .unwrap_err();
    assert!(matches!(err, NetCdfError::TypeMismatch { .. }));
    Ok(())
}

// ============================================================================
// Buffer length
// ============================================================================

#[test]
fn test_short_buffer_leaves_data_untouched() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    let err = grid.write_values(&[1i32; 20]).unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::BufferTooSmall {
            len: 20,
            required: 21
        }
    ));
    assert_eq!(storage.stats().writes, 0);
    assert!(all_fill(&grid)?);

    let mut out = [0i32; 20];
    let reads = storage.stats().reads;
    assert!(matches!(
        grid.read_values(&mut out).unwrap_err(),
        NetCdfError::BufferTooSmall { .. }
    ));
    assert_eq!(storage.stats().reads, reads);
    Ok(())
}

#[test]
fn test_longer_buffer_is_accepted() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let row = ds.var("row")?;

    row.write_values(&[1i32, 2, 3, 4, 5, 6, 7])?;
    let mut out = [0i32; 8];
    row.read_values(&mut out)?;
    assert_eq!(out, [1, 2, 3, 4, 5, 0, 0, 0]);
    Ok(())
}

#[test]
fn test_short_slice_buffer() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    let err = grid.write_slice(&[1i32; 5], &[2, 1], &[3, 2]).unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::BufferTooSmall {
            len: 5,
            required: 6
        }
    ));
    assert!(all_fill(&grid)?);
    Ok(())
}

// ============================================================================
// Hyperslab bounds
// ============================================================================

#[test]
fn test_slice_within_bounds_round_trips() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    grid.write_slice(&[1i32, 2, 3, 4, 5, 6], &[2, 1], &[3, 2])?;
    assert_eq!(grid.get_slice::<i32>(&[2, 1], &[3, 2])?, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(grid.get_slice::<i32>(&[0, 0], &[7, 3])?.len(), 21);
    Ok(())
}

#[test]
fn test_slice_past_end_is_rejected() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    let err = grid.write_slice(&[0i32; 12], &[2, 1], &[6, 2]).unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::OutOfRange {
            dim: 0,
            start: 2,
            count: 6,
            stride: 1,
            len: 7
        }
    ));
    assert!(err.to_string().contains("dimension 0 of length 7"), "{}", err);
    assert_eq!(storage.stats().writes, 0);

    let err = grid.get_slice::<i32>(&[0, 3], &[1, 0]).unwrap_err();
    assert!(matches!(err, NetCdfError::OutOfRange { dim: 1, .. }));
    Ok(())
}

#[test]
fn test_empty_slice_at_origin_is_rejected() {
    let storage = MemoryStorage::new();
    let ds = setup(&storage).unwrap();
    let grid = ds.var("grid").unwrap();
    let err = grid.get_slice::<i32>(&[0, 0], &[0, 3]).unwrap_err();
    assert!(matches!(err, NetCdfError::OutOfRange { dim: 0, .. }));
}

#[test]
fn test_bounds_checked_before_buffer() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    let err = grid.read_slice::<i32>(&mut [], &[6, 0], &[2, 1]).unwrap_err();
    assert!(matches!(err, NetCdfError::OutOfRange { .. }));
    Ok(())
}

#[test]
fn test_rank_mismatch() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    let err = grid.get_slice::<i32>(&[0], &[1, 1]).unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::DimensionMismatch {
            what: "start",
            len: 1,
            ndims: 2
        }
    ));
    // Rank is checked before bounds.
    let err = grid.get_slice::<i32>(&[0, 0], &[99, 1, 1]).unwrap_err();
    assert!(matches!(err, NetCdfError::DimensionMismatch { what: "count", .. }));
    let err = grid
        .get_strided_slice::<i32>(&[0, 0], &[1, 1], &[1])
        .unwrap_err();
    assert!(matches!(err, NetCdfError::DimensionMismatch { what: "stride", .. }));
    assert_eq!(storage.stats().reads, 0);
    Ok(())
}

// ============================================================================
// Strided hyperslabs
// ============================================================================

#[test]
fn test_strided_write_touches_every_other_element() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let row = ds.var("row")?;

    row.write_strided_slice(&[10i32, 20], &[1], &[2], &[2])?;
    assert_eq!(row.get_strided_slice::<i32>(&[1], &[2], &[2])?, vec![10, 20]);
    assert_eq!(
        row.get_values::<i32>()?,
        vec![INT_FILL, 10, INT_FILL, 20, INT_FILL]
    );
    Ok(())
}

#[test]
fn test_strided_past_end_is_rejected() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let row = ds.var("row")?;

    // Positions 1, 3, 5: the last one is past a length of 5.
    let err = row
        .write_strided_slice(&[1i32, 2, 3], &[1], &[3], &[2])
        .unwrap_err();
    assert!(matches!(
        err,
        NetCdfError::OutOfRange {
            dim: 0,
            start: 1,
            count: 3,
            stride: 2,
            len: 5
        }
    ));
    assert!(all_fill(&row)?);
    Ok(())
}

#[test]
fn test_strided_zero_count_is_rejected() {
    let storage = MemoryStorage::new();
    let ds = setup(&storage).unwrap();
    let row = ds.var("row").unwrap();
    let err = row.get_strided_slice::<i32>(&[2], &[0], &[1]).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_stride_sign_left_to_library() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let row = ds.var("row")?;

    // Positions 4 and 3 are in range, so local checks pass and the
    // library's own stride check decides.
    let result = row.get_strided_slice::<i32>(&[4], &[2], &[-1]);
    assert_storage_code!(result, -58);
    Ok(())
}

// ============================================================================
// Element access
// ============================================================================

#[test]
fn test_element_access_is_checked_by_library() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let grid = ds.var("grid")?;

    assert_storage_code!(grid.read_at::<i32>(&[7, 0]), -40);
    assert_storage_code!(grid.write_at(&[1], 5i32), -40);
    assert_storage_code!(grid.read_text_at(&[0, 0]), -56);

    grid.write_at(&[6, 2], 42i32)?;
    assert_eq!(grid.read_at::<i32>(&[6, 2])?, 42);
    assert_eq!(grid.get_values::<i32>()?[20], 42);
    Ok(())
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_attribute_reads_are_validated() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let attr = ds.var("grid")?.attr("valid_range")?;
    attr.write_values(&[0i32, 100])?;

    let mut short = [0i32; 1];
    assert!(matches!(
        attr.read_values(&mut short).unwrap_err(),
        NetCdfError::BufferTooSmall {
            len: 1,
            required: 2
        }
    ));
    assert!(matches!(
        attr.get_values::<f64>().unwrap_err(),
        NetCdfError::TypeMismatch { .. }
    ));
    assert!(attr.get_text().unwrap_err().is_validation());
    assert_eq!(attr.get_values::<i32>()?, vec![0, 100]);
    Ok(())
}

#[test]
fn test_attribute_rewrite_changes_type() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = setup(&storage)?;
    let attr = ds.attr("history")?;
    attr.write_values(&[1u8, 2])?;
    attr.write_text(b"created")?;
    assert_eq!(attr.nc_type()?, NcType::Char);
    assert_eq!(attr.get_text()?, b"created");
    Ok(())
}
