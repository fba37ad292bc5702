//! Write/read round trips over the `gopher` fixture matrix.
//!
//! Every case creates a dataset, defines the variable and its attributes,
//! writes data through one addressing mode, closes, reopens read-only and
//! checks everything that was written.

use anyhow::Result;
use netcdf_access::{unravel_index, Dataset, FileMode, MemoryStorage, NcType, Storage};
use test_utils::{
    diagonal, file_tests, for_element_type, pattern, slice_case, strided_case, text_pattern,
    FileTest, Pattern, VAR_NAME,
};

const PATH: &str = "gopher.nc";

/// Create the dataset for `ft` and hand its variable to `write`.
fn create_file<S, F>(storage: &S, ft: &FileTest, write: F) -> Result<()>
where
    S: Storage + ?Sized,
    F: FnOnce(&netcdf_access::Var<'_, S>, &FileTest) -> Result<()>,
{
    let ds = Dataset::create(storage, PATH, FileMode::CLOBBER | FileMode::NETCDF4)?;
    let var = ft.define(&ds)?;
    ft.put_attrs(&var)?;
    write(&var, ft)?;
    ds.close()?;
    Ok(())
}

/// Reopen read-only, check metadata and hand the variable to `check`.
fn read_file<S, F>(storage: &S, ft: &FileTest, check: F) -> Result<()>
where
    S: Storage + ?Sized,
    F: FnOnce(&netcdf_access::Var<'_, S>, &FileTest) -> Result<()>,
{
    let ds = Dataset::open(storage, PATH, FileMode::NOWRITE)?;
    ft.check_dims(&ds)?;
    let var = ds.var(VAR_NAME)?;
    assert_eq!(var.nc_type()?, ft.data_type);
    assert_eq!(var.len_dims()?, ft.dim_lens);
    ft.check_attrs(&var)?;
    check(&var, ft)?;
    ds.close()?;
    Ok(())
}

// ============================================================================
// Whole variable
// ============================================================================

#[test]
fn test_create_and_read_whole_variable() -> Result<()> {
    for ft in file_tests() {
        let storage = MemoryStorage::new();
        create_file(&storage, &ft, |var, ft| {
            let n = var.len()?;
            for_element_type!(ft.data_type,
                T => var.write_values(&pattern::<T>(n))?,
                char => var.write_text(&text_pattern(n))?);
            Ok(())
        })?;
        read_file(&storage, &ft, |var, ft| {
            let n = var.len()?;
            for_element_type!(ft.data_type,
                T => {
                    let mut data = vec![T::default(); n as usize];
                    var.read_values(&mut data)?;
                    assert_eq!(data, pattern::<T>(n), "{} {:?}", ft.data_type, ft.dim_lens);
                },
                char => {
                    assert_eq!(var.get_text()?, text_pattern(n), "{:?}", ft.dim_lens);
                });
            Ok(())
        })?;
        assert_eq!(storage.open_count(), 0);
    }
    Ok(())
}

// ============================================================================
// Hyperslabs
// ============================================================================

fn check_slice<T: Pattern>(var: &netcdf_access::Var<'_, MemoryStorage>, shape: &[u64]) -> Result<()> {
    let (start, count) = slice_case(shape);
    let n = netcdf_access::product(&count);
    let written = pattern::<T>(n);
    var.write_slice(&written, &start, &count)?;

    let mut read = vec![T::default(); n as usize];
    var.read_slice(&mut read, &start, &count)?;
    assert_eq!(read, written);
    assert_eq!(var.get_slice::<T>(&start, &count)?, written);
    Ok(())
}

fn check_strided_slice<T: Pattern>(
    var: &netcdf_access::Var<'_, MemoryStorage>,
    shape: &[u64],
) -> Result<()> {
    let (start, count, stride) = strided_case(shape);
    let n = netcdf_access::product(&count);
    let written = pattern::<T>(n);
    var.write_strided_slice(&written, &start, &count, &stride)?;

    let mut read = vec![T::default(); n as usize];
    var.read_strided_slice(&mut read, &start, &count, &stride)?;
    assert_eq!(read, written);
    assert_eq!(var.get_strided_slice::<T>(&start, &count, &stride)?, written);
    Ok(())
}

#[test]
fn test_slices_round_trip_for_every_numeric_type() -> Result<()> {
    let tests = file_tests()
        .into_iter()
        .filter(|ft| !ft.dim_lens.is_empty() && ft.data_type != NcType::Char);
    for ft in tests {
        let storage = MemoryStorage::new();
        let ds = Dataset::create(&storage, PATH, FileMode::NETCDF4)?;
        let var = ft.define(&ds)?;
        for_element_type!(ft.data_type,
            T => {
                check_slice::<T>(&var, &ft.dim_lens)?;
                check_strided_slice::<T>(&var, &ft.dim_lens)?;
            },
            char => unreachable!());
    }
    Ok(())
}

#[test]
fn test_slice_leaves_rest_of_variable_untouched() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = Dataset::create(&storage, PATH, FileMode::NETCDF4)?;
    let height = ds.add_dim("height", 7)?;
    let width = ds.add_dim("width", 3)?;
    let var = ds.add_var(VAR_NAME, NcType::Int, &[height, width])?;
    var.write_values(&[0i32; 21])?;

    var.write_slice(&[1i32, 2, 3, 4, 5, 6], &[2, 1], &[3, 2])?;
    let all = var.get_values::<i32>()?;
    let expected = [
        0, 0, 0, //
        0, 0, 0, //
        0, 1, 2, //
        0, 3, 4, //
        0, 5, 6, //
        0, 0, 0, //
        0, 0, 0,
    ];
    assert_eq!(all, expected);
    Ok(())
}

// ============================================================================
// Single elements
// ============================================================================

#[test]
fn test_element_access_via_unravelled_coordinates() -> Result<()> {
    for ft in file_tests() {
        let storage = MemoryStorage::new();
        create_file(&storage, &ft, |var, ft| {
            let n = var.len()?;
            for_element_type!(ft.data_type,
                T => var.write_values(&pattern::<T>(n))?,
                char => var.write_text(&text_pattern(n))?);
            Ok(())
        })?;
        read_file(&storage, &ft, |var, ft| {
            let shape = var.len_dims()?;
            let n = var.len()?;
            for i in 0..n {
                let coord = unravel_index(i, &shape)?;
                for_element_type!(ft.data_type,
                    T => assert_eq!(var.read_at::<T>(&coord)?, T::at(i)),
                    char => assert_eq!(var.read_text_at(&coord)?, text_pattern(n)[i as usize]));
            }
            Ok(())
        })?;
    }
    Ok(())
}

#[test]
fn test_write_diagonal_elements() -> Result<()> {
    for ft in file_tests() {
        let storage = MemoryStorage::new();
        create_file(&storage, &ft, |var, ft| {
            for (i, coord) in diagonal(ft.dim_lens.len()).iter().enumerate() {
                for_element_type!(ft.data_type,
                    T => var.write_at(coord, T::at(i as u64))?,
                    char => var.write_text_at(coord, b'a' + i as u8)?);
            }
            Ok(())
        })?;
        read_file(&storage, &ft, |var, ft| {
            for (i, coord) in diagonal(ft.dim_lens.len()).iter().enumerate() {
                for_element_type!(ft.data_type,
                    T => assert_eq!(var.read_at::<T>(coord)?, T::at(i as u64)),
                    char => assert_eq!(var.read_text_at(coord)?, b'a' + i as u8));
            }
            Ok(())
        })?;
    }
    Ok(())
}

#[test]
fn test_element_access_converts_between_numeric_types() -> Result<()> {
    let storage = MemoryStorage::new();
    let ds = Dataset::create(&storage, PATH, FileMode::NETCDF4)?;
    let n = ds.add_dim("n", 2)?;
    let var = ds.add_var(VAR_NAME, NcType::Short, &[n])?;
    var.write_values(&[-5i16, 300])?;

    assert_eq!(var.read_at::<f64>(&[1])?, 300.0);
    assert_eq!(var.read_at::<i64>(&[0])?, -5);
    let err = var.read_at::<u8>(&[1]).unwrap_err();
    assert_eq!(err.storage_code(), Some(-60));
    Ok(())
}
