//! Write a small `gopher` dataset with the system netCDF library and print
//! it back.
//!
//! ```text
//! cargo run -p netcdf-access --features native --example gopher -- --height 5 --width 4
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use netcdf_access::{Dataset, FileMode, NativeStorage, NcType, Storage};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gopher")]
#[command(about = "Create and read back an example netCDF file")]
struct Args {
    /// Output file
    #[arg(long, default_value = "gopher.nc")]
    output: PathBuf,

    /// Number of rows
    #[arg(long, default_value = "5")]
    height: u64,

    /// Number of columns
    #[arg(long, default_value = "4")]
    width: u64,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Create the dataset with one `NC_UBYTE` variable where `gopher[y][x] = x + y`.
fn create_example_file<S: Storage + ?Sized>(storage: &S, path: &str, height: u64, width: u64) -> Result<()> {
    let ds = Dataset::create(storage, path, FileMode::CLOBBER | FileMode::NETCDF4)?;
    let dims = [ds.add_dim("height", height)?, ds.add_dim("width", width)?];
    let var = ds.add_var("gopher", NcType::UByte, &dims)?;

    let gopher: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x + y) as u8))
        .collect();
    var.write_values(&gopher)?;
    ds.close()?;
    Ok(())
}

/// Read the variable back and print one row per line.
fn read_example_file<S: Storage + ?Sized>(storage: &S, path: &str) -> Result<()> {
    let ds = Dataset::open(storage, path, FileMode::NOWRITE)?;
    let var = ds.var("gopher")?;
    let gopher = var.get_values::<u8>()?;
    let dims = var.len_dims()?;

    for row in gopher.chunks(dims[1].max(1) as usize) {
        let line: Vec<String> = row.iter().map(u8::to_string).collect();
        println!(" {}", line.join(" "));
    }
    ds.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let storage = NativeStorage;
    let path = args.output.to_string_lossy().into_owned();
    info!(version = %storage.library_version(), path = %path, "Writing example dataset");

    create_example_file(&storage, &path, args.height, args.width)?;
    read_example_file(&storage, &path)?;
    Ok(())
}
