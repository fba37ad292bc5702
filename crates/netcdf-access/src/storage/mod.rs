//! The storage library boundary.
//!
//! [`Storage`] mirrors the C entry points this crate calls, one method per
//! function family, with raw integer handles and a [`StorageError`] for
//! every non-zero status. Two implementations exist:
//!
//! - [`MemoryStorage`]: an in-process stand-in that follows the library's
//!   observable contract; always available.
//! - `NativeStorage`: FFI onto libnetcdf, behind the `native` feature.

mod memory;
#[cfg(feature = "native")]
mod native;

pub use memory::{IoStats, MemoryStorage};
#[cfg(feature = "native")]
pub use native::NativeStorage;

use crate::consts::{FileMode, MemioFlags, NcType};
use crate::element::{Values, ValuesMut};
use crate::error::StorageError;

/// Result type for storage calls.
pub type StorageResult<T> = Result<T, StorageError>;

/// Which part of a variable a transfer addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// The whole variable (`nc_*_var_*`).
    All,
    /// A contiguous hyperslab (`nc_*_vara_*`).
    Slab { start: &'a [u64], count: &'a [u64] },
    /// A strided hyperslab (`nc_*_vars_*`).
    Strided {
        start: &'a [u64],
        count: &'a [u64],
        stride: &'a [i64],
    },
    /// A single element (`nc_*_var1_*`).
    Point(&'a [u64]),
}

impl Selection<'_> {
    /// Short name of the addressing mode, used in trace events.
    pub fn mode(&self) -> &'static str {
        match self {
            Selection::All => "var",
            Selection::Slab { .. } => "vara",
            Selection::Strided { .. } => "vars",
            Selection::Point(_) => "var1",
        }
    }
}

/// Calls into the netCDF storage library.
///
/// `ncid`, `dimid` and `varid` are the library's own handles; `varid` may be
/// [`NC_GLOBAL`](crate::consts::NC_GLOBAL) for attribute calls. Metadata
/// calls take `&self`; callers sharing a dataset across threads must supply
/// their own mutual exclusion.
pub trait Storage {
    /// Library version string (`nc_inq_libvers`).
    fn library_version(&self) -> String;

    // === Dataset lifecycle ===
    fn create(&self, path: &str, mode: FileMode) -> StorageResult<i32>;
    fn open(&self, path: &str, mode: FileMode) -> StorageResult<i32>;
    fn close(&self, ncid: i32) -> StorageResult<()>;
    fn enddef(&self, ncid: i32) -> StorageResult<()>;
    fn redef(&self, ncid: i32) -> StorageResult<()>;
    fn sync(&self, ncid: i32) -> StorageResult<()>;

    // === In-memory datasets ===
    /// Create a dataset held in memory (`nc_create_mem`). `initial_size` is
    /// a hint for the first allocation.
    fn create_mem(&self, path: &str, mode: FileMode, initial_size: usize) -> StorageResult<i32>;
    /// Open a dataset from a memory image (`nc_open_memio`). `path` only
    /// names the dataset.
    fn open_memio(&self, path: &str, mode: FileMode, flags: MemioFlags, image: &[u8]) -> StorageResult<i32>;
    /// Close a dataset and hand back its final memory image
    /// (`nc_close_memio`). A dataset not held in memory is closed normally
    /// and yields an empty image.
    fn close_memio(&self, ncid: i32) -> StorageResult<Vec<u8>>;

    // === Dimensions ===
    /// Define a dimension; a `len` of [`NC_UNLIMITED`](crate::consts::NC_UNLIMITED)
    /// makes it a record dimension.
    fn def_dim(&self, ncid: i32, name: &str, len: u64) -> StorageResult<i32>;
    fn inq_dimid(&self, ncid: i32, name: &str) -> StorageResult<i32>;
    fn inq_dimname(&self, ncid: i32, dimid: i32) -> StorageResult<String>;
    fn inq_dimlen(&self, ncid: i32, dimid: i32) -> StorageResult<u64>;
    fn inq_ndims(&self, ncid: i32) -> StorageResult<i32>;
    /// Ids of the record dimensions (`nc_inq_unlimdims`).
    fn inq_unlimdims(&self, ncid: i32) -> StorageResult<Vec<i32>>;

    // === Variables ===
    fn def_var(&self, ncid: i32, name: &str, xtype: NcType, dimids: &[i32]) -> StorageResult<i32>;
    fn inq_varid(&self, ncid: i32, name: &str) -> StorageResult<i32>;
    fn inq_varname(&self, ncid: i32, varid: i32) -> StorageResult<String>;
    fn inq_vartype(&self, ncid: i32, varid: i32) -> StorageResult<i32>;
    fn inq_varndims(&self, ncid: i32, varid: i32) -> StorageResult<i32>;
    fn inq_vardimid(&self, ncid: i32, varid: i32) -> StorageResult<Vec<i32>>;
    fn inq_nvars(&self, ncid: i32) -> StorageResult<i32>;
    fn inq_varnatts(&self, ncid: i32, varid: i32) -> StorageResult<i32>;
    fn def_var_deflate(
        &self,
        ncid: i32,
        varid: i32,
        shuffle: bool,
        deflate: bool,
        level: i32,
    ) -> StorageResult<()>;
    fn inq_var_deflate(&self, ncid: i32, varid: i32) -> StorageResult<(bool, bool, i32)>;

    // === Attributes ===
    fn inq_atttype(&self, ncid: i32, varid: i32, name: &str) -> StorageResult<i32>;
    fn inq_attlen(&self, ncid: i32, varid: i32, name: &str) -> StorageResult<u64>;
    fn inq_attname(&self, ncid: i32, varid: i32, attnum: i32) -> StorageResult<String>;
    /// Create or replace an attribute; its type is the type of `values`.
    fn put_att(&self, ncid: i32, varid: i32, name: &str, values: Values<'_>) -> StorageResult<()>;
    fn get_att(&self, ncid: i32, varid: i32, name: &str, out: ValuesMut<'_>) -> StorageResult<()>;

    // === Data ===
    fn get_var(
        &self,
        ncid: i32,
        varid: i32,
        selection: Selection<'_>,
        out: ValuesMut<'_>,
    ) -> StorageResult<()>;
    fn put_var(
        &self,
        ncid: i32,
        varid: i32,
        selection: Selection<'_>,
        values: Values<'_>,
    ) -> StorageResult<()>;
}
