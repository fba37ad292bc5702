//! Typed access to netCDF datasets.
//!
//! This crate is a thin layer over the netCDF C library. The library owns
//! the file format, chunking and compression; this crate adds the parts a
//! raw call-through does not give you:
//!
//! - coordinate mapping between flat row-major offsets and N-dimensional
//!   coordinates ([`product`], [`unravel_index`], [`ravel_index`])
//! - typed accessors that check element type, rank, hyperslab bounds and
//!   buffer length against the dataset's metadata before any data moves
//! - handle types ([`Dataset`], [`Dim`], [`Var`], [`Attr`]) that tie the
//!   library's integer ids to the dataset they belong to
//! - in-memory datasets that are created or opened from a byte image and
//!   hand their image back on close ([`Dataset::create_mem`],
//!   [`Dataset::open_bytes`], [`Dataset::close_bytes`])
//!
//! # Storage backends
//!
//! All library calls go through the [`Storage`] trait. [`MemoryStorage`]
//! is an in-process stand-in that follows the library's contract and needs
//! no system libraries. With the `native` feature, `NativeStorage` calls
//! libnetcdf (system requirement: libnetcdf-dev).
//!
//! # Example
//!
//! ```
//! use netcdf_access::{Dataset, FileMode, MemoryStorage, NcType};
//!
//! let storage = MemoryStorage::new();
//! let ds = Dataset::create(&storage, "grid.nc", FileMode::NETCDF4)?;
//! let y = ds.add_dim("y", 7)?;
//! let x = ds.add_dim("x", 3)?;
//! let v = ds.add_var("height", NcType::Int, &[y, x])?;
//!
//! v.write_slice(&[1, 2, 3, 4, 5, 6], &[2, 1], &[3, 2])?;
//! assert_eq!(v.get_slice::<i32>(&[2, 1], &[3, 2])?, vec![1, 2, 3, 4, 5, 6]);
//! assert_eq!(v.read_at::<i32>(&[3, 2])?, 4);
//! ds.close()?;
//! # Ok::<(), netcdf_access::NetCdfError>(())
//! ```

pub mod access;
pub mod attribute;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod dimension;
pub mod element;
pub mod error;
pub mod index;
pub mod storage;
pub mod variable;

pub use access::{validate_slice, validate_strided_slice, validate_whole, ShapedArray, TypedArray};
pub use attribute::Attr;
pub use config::{DatasetConfig, OpenAction};
pub use consts::{FileMode, MemioFlags, NcType, NC_GLOBAL, NC_MAX_NAME, NC_UNLIMITED};
pub use dataset::Dataset;
pub use dimension::Dim;
pub use element::{NcElement, Values, ValuesMut};
pub use error::{NetCdfError, NetCdfResult, StorageError};
pub use index::{product, ravel_index, unravel_index};
pub use storage::{IoStats, MemoryStorage, Selection, Storage, StorageResult};
pub use variable::Var;

#[cfg(feature = "native")]
pub use storage::NativeStorage;
