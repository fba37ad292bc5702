//! Tests against the system netCDF library.
//!
//! Run with `cargo test --features native`; requires libnetcdf.

#![cfg(feature = "native")]

use anyhow::Result;
use netcdf_access::{unravel_index, Dataset, FileMode, MemioFlags, NativeStorage, NcType};
use test_utils::{
    assert_storage_code, file_tests, for_element_type, pattern, slice_case, strided_case,
    text_pattern, Pattern, Scratch, VAR_NAME,
};

#[test]
fn test_native_round_trip_matrix() -> Result<()> {
    let storage = NativeStorage;
    let scratch = Scratch::new()?;
    for (i, ft) in file_tests().into_iter().enumerate() {
        let path = scratch.path(&format!("gopher_{i}.nc"));
        {
            let ds = Dataset::create(&storage, &path, FileMode::CLOBBER | FileMode::NETCDF4)?;
            let var = ft.define(&ds)?;
            ft.put_attrs(&var)?;
            let n = var.len()?;
            for_element_type!(ft.data_type,
                T => var.write_values(&pattern::<T>(n))?,
                char => var.write_text(&text_pattern(n))?);
            ds.close()?;
        }

        let ds = Dataset::open(&storage, &path, FileMode::NOWRITE)?;
        ft.check_dims(&ds)?;
        let var = ds.var(VAR_NAME)?;
        ft.check_attrs(&var)?;
        let shape = var.len_dims()?;
        let n = var.len()?;
        for_element_type!(ft.data_type,
            T => {
                assert_eq!(var.get_values::<T>()?, pattern::<T>(n));
                let last = unravel_index(n - 1, &shape)?;
                assert_eq!(var.read_at::<T>(&last)?, T::at(n - 1));
            },
            char => assert_eq!(var.get_text()?, text_pattern(n)));
        ds.close()?;
    }
    Ok(())
}

#[test]
fn test_native_hyperslabs() -> Result<()> {
    let storage = NativeStorage;
    let scratch = Scratch::new()?;
    let path = scratch.path("slabs.nc");
    let ds = Dataset::create(&storage, &path, FileMode::CLOBBER | FileMode::NETCDF4)?;
    let t = ds.add_dim("time", 12)?;
    let y = ds.add_dim("height", 7)?;
    let x = ds.add_dim("width", 3)?;
    let var = ds.add_var(VAR_NAME, NcType::Double, &[t, y, x])?;

    let shape = [12, 7, 3];
    let (start, count) = slice_case(&shape);
    let data = pattern::<f64>(netcdf_access::product(&count));
    var.write_slice(&data, &start, &count)?;
    assert_eq!(var.get_slice::<f64>(&start, &count)?, data);

    let (start, count, stride) = strided_case(&shape);
    let data = pattern::<f64>(netcdf_access::product(&count));
    var.write_strided_slice(&data, &start, &count, &stride)?;
    assert_eq!(var.get_strided_slice::<f64>(&start, &count, &stride)?, data);
    ds.close()?;
    Ok(())
}

#[test]
fn test_native_compression() -> Result<()> {
    let storage = NativeStorage;
    let scratch = Scratch::new()?;
    for (i, (shuffle, deflate, level)) in [(true, true, 1), (true, true, 9), (false, true, 0)]
        .into_iter()
        .enumerate()
    {
        let path = scratch.path(&format!("deflate_{i}.nc"));
        let ds = Dataset::create(&storage, &path, FileMode::CLOBBER | FileMode::NETCDF4)?;
        let x = ds.add_dim("x", 100)?;
        let var = ds.add_var("v", NcType::Int, &[x])?;
        var.set_compression(shuffle, deflate, level)?;
        var.write_values(&pattern::<i32>(100))?;
        ds.close()?;

        let ds = Dataset::open(&storage, &path, FileMode::NOWRITE)?;
        let var = ds.var("v")?;
        assert_eq!(var.compression()?, (shuffle, deflate, level));
        assert_eq!(var.get_values::<i32>()?, pattern::<i32>(100));
    }
    Ok(())
}

#[test]
fn test_native_library_errors() -> Result<()> {
    let storage = NativeStorage;
    let scratch = Scratch::new()?;
    assert_storage_code!(
        Dataset::open(&storage, &scratch.path("missing.nc"), FileMode::NOWRITE),
        2
    );

    let path = scratch.path("classic.nc");
    let ds = Dataset::create(&storage, &path, FileMode::CLOBBER)?;
    let n = ds.add_dim("n", 2)?;
    let var = ds.add_var("v", NcType::Int, &[n])?;
    assert_storage_code!(var.write_values(&[1i32, 2]), -39);
    ds.end_def()?;
    var.write_values(&[1i32, 2])?;
    assert_storage_code!(var.read_at::<i32>(&[2]), -40);
    assert_storage_code!(ds.var("nope"), -49);
    ds.close()?;

    assert_storage_code!(Dataset::create(&storage, &path, FileMode::NOCLOBBER), -35);
    assert!(!Dataset::open(&storage, &path, FileMode::NOWRITE)?
        .library_version()
        .is_empty());
    Ok(())
}

#[test]
fn test_native_in_memory_dataset() -> Result<()> {
    let storage = NativeStorage;
    let image = {
        let ds = Dataset::create_mem(&storage, "gopher.nc", FileMode::NETCDF4, 8192)?;
        let dims = [ds.add_dim("height", 5)?, ds.add_dim("width", 4)?];
        let var = ds.add_var("gopher", NcType::UByte, &dims)?;
        let data: Vec<u8> = (0..5u8).flat_map(|y| (0..4u8).map(move |x| x + y)).collect();
        var.write_values(&data)?;
        ds.close_bytes()?
    };
    assert!(image.starts_with(b"\x89HDF"));

    for flags in [MemioFlags::NONE, MemioFlags::LOCKED] {
        let ds = Dataset::open_bytes(&storage, "gopher.nc", FileMode::NOWRITE, flags, &image)?;
        let var = ds.var("gopher")?;
        assert_eq!(var.len_dims()?, vec![5, 4]);
        assert_eq!(var.read_at::<u8>(&[4, 3])?, 7);
        ds.close()?;
    }

    let ds = Dataset::open_reader(
        &storage,
        "gopher.nc",
        FileMode::NOWRITE,
        MemioFlags::NONE,
        std::io::Cursor::new(image),
    )?;
    assert_eq!(ds.var("gopher")?.get_values::<u8>()?.len(), 20);
    Ok(())
}

#[test]
fn test_native_record_dimension() -> Result<()> {
    let storage = NativeStorage;
    let scratch = Scratch::new()?;
    let path = scratch.path("records.nc");
    let ds = Dataset::create(&storage, &path, FileMode::CLOBBER | FileMode::NETCDF4)?;
    let time = ds.add_unlimited_dim("time")?;
    let x = ds.add_dim("x", 3)?;
    let var = ds.add_var("v", NcType::Int, &[time, x])?;
    assert!(time.is_unlimited()?);
    assert!(!x.is_unlimited()?);

    var.write_at(&[2, 1], 42i32)?;
    assert_eq!(time.len()?, 3);
    assert_eq!(var.read_at::<i32>(&[2, 1])?, 42);
    ds.close()?;
    Ok(())
}
