//! Open datasets and the lookups rooted at them.

use std::fmt;
use std::io::Read;

use tracing::debug;

use crate::attribute::Attr;
use crate::config::{DatasetConfig, OpenAction};
use crate::consts::{FileMode, MemioFlags, NcType, NC_GLOBAL, NC_UNLIMITED};
use crate::dimension::Dim;
use crate::error::{NetCdfError, NetCdfResult};
use crate::storage::Storage;
use crate::variable::Var;

/// Reject names that cannot be handed to the library as C strings.
pub(crate) fn check_name(name: &str) -> NetCdfResult<()> {
    if name.contains('\0') {
        return Err(NetCdfError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// An open dataset.
///
/// Wraps the library's dataset id together with the storage it was opened
/// through. Dimension, variable and attribute handles borrow the dataset,
/// so none of them can outlive it. Dropping an open dataset closes it and
/// discards any close error; call [`Dataset::close`] to observe one.
///
/// Datasets made by [`Dataset::create_mem`], [`Dataset::open_bytes`] and
/// [`Dataset::open_reader`] live in memory; [`Dataset::close_bytes`] hands
/// back their final image, and `close` or drop releases it.
pub struct Dataset<'s, S: Storage + ?Sized> {
    storage: &'s S,
    ncid: i32,
    open: bool,
    in_memory: bool,
}

impl<'s, S: Storage + ?Sized> Dataset<'s, S> {
    /// Create a new dataset at `path`.
    ///
    /// The dataset starts in define mode.
    pub fn create(storage: &'s S, path: &str, mode: FileMode) -> NetCdfResult<Self> {
        check_name(path)?;
        let ncid = storage.create(path, mode)?;
        debug!(path = %path, mode = %mode, ncid, "Created dataset");
        Ok(Self::opened(storage, ncid, false))
    }

    /// Open an existing dataset at `path`.
    pub fn open(storage: &'s S, path: &str, mode: FileMode) -> NetCdfResult<Self> {
        check_name(path)?;
        let ncid = storage.open(path, mode)?;
        debug!(path = %path, mode = %mode, ncid, "Opened dataset");
        Ok(Self::opened(storage, ncid, false))
    }

    /// Create a dataset held in memory. `path` only names it; nothing is
    /// written to disk. `initial_size` is a hint, in bytes, for the first
    /// allocation.
    pub fn create_mem(storage: &'s S, path: &str, mode: FileMode, initial_size: usize) -> NetCdfResult<Self> {
        check_name(path)?;
        let ncid = storage.create_mem(path, mode, initial_size)?;
        debug!(path = %path, mode = %mode, initial_size, ncid, "Created in-memory dataset");
        Ok(Self::opened(storage, ncid, true))
    }

    /// Open a dataset from a copy of the memory image `data`.
    pub fn open_bytes(
        storage: &'s S,
        path: &str,
        mode: FileMode,
        flags: MemioFlags,
        data: &[u8],
    ) -> NetCdfResult<Self> {
        check_name(path)?;
        let ncid = storage.open_memio(path, mode, flags, data)?;
        debug!(path = %path, mode = %mode, bytes = data.len(), ncid, "Opened in-memory dataset");
        Ok(Self::opened(storage, ncid, true))
    }

    /// Read `reader` to the end and open the image it yields.
    pub fn open_reader<R: Read>(
        storage: &'s S,
        path: &str,
        mode: FileMode,
        flags: MemioFlags,
        mut reader: R,
    ) -> NetCdfResult<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::open_bytes(storage, path, mode, flags, &data)
    }

    fn opened(storage: &'s S, ncid: i32, in_memory: bool) -> Self {
        Self {
            storage,
            ncid,
            open: true,
            in_memory,
        }
    }

    /// Open or create the dataset described by `config`.
    pub fn from_config(storage: &'s S, config: &DatasetConfig) -> NetCdfResult<Self> {
        match config.action {
            OpenAction::Open => Self::open(storage, &config.path, config.mode),
            OpenAction::Create => Self::create(storage, &config.path, config.mode),
        }
    }

    /// Close the dataset, flushing pending writes.
    pub fn close(mut self) -> NetCdfResult<()> {
        self.open = false;
        if self.in_memory {
            self.storage.close_memio(self.ncid)?;
        } else {
            self.storage.close(self.ncid)?;
        }
        debug!(ncid = self.ncid, "Closed dataset");
        Ok(())
    }

    /// Close the dataset and return its final memory image.
    ///
    /// The image can be handed to [`Dataset::open_bytes`] again. A dataset
    /// that is not held in memory is closed normally and yields an empty
    /// image.
    pub fn close_bytes(mut self) -> NetCdfResult<Vec<u8>> {
        self.open = false;
        let image = self.storage.close_memio(self.ncid)?;
        debug!(ncid = self.ncid, bytes = image.len(), "Closed in-memory dataset");
        Ok(image)
    }

    /// True if the dataset lives in memory rather than in a file.
    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    /// The library's id for this dataset.
    pub fn id(&self) -> i32 {
        self.ncid
    }

    /// The storage this dataset was opened through.
    pub fn storage(&self) -> &'s S {
        self.storage
    }

    /// Version string of the storage library.
    pub fn library_version(&self) -> String {
        self.storage.library_version()
    }

    /// Leave define mode.
    pub fn end_def(&self) -> NetCdfResult<()> {
        self.storage.enddef(self.ncid)?;
        debug!(ncid = self.ncid, "Left define mode");
        Ok(())
    }

    /// Re-enter define mode.
    pub fn redef(&self) -> NetCdfResult<()> {
        self.storage.redef(self.ncid)?;
        debug!(ncid = self.ncid, "Entered define mode");
        Ok(())
    }

    /// Flush buffered data to storage.
    pub fn sync(&self) -> NetCdfResult<()> {
        self.storage.sync(self.ncid)?;
        debug!(ncid = self.ncid, "Synced dataset");
        Ok(())
    }

    // === Dimensions ===

    /// Define a dimension.
    pub fn add_dim(&self, name: &str, len: u64) -> NetCdfResult<Dim<'_, S>> {
        check_name(name)?;
        let id = self.storage.def_dim(self.ncid, name, len)?;
        debug!(ncid = self.ncid, name = %name, len, "Defined dimension");
        Ok(Dim::new(self, id))
    }

    /// Define a record dimension. Its length starts at zero and grows as
    /// records are written.
    pub fn add_unlimited_dim(&self, name: &str) -> NetCdfResult<Dim<'_, S>> {
        self.add_dim(name, NC_UNLIMITED)
    }

    /// Look up a dimension by name.
    pub fn dim(&self, name: &str) -> NetCdfResult<Dim<'_, S>> {
        check_name(name)?;
        let id = self.storage.inq_dimid(self.ncid, name)?;
        Ok(Dim::new(self, id))
    }

    /// All dimensions, in definition order.
    pub fn dims(&self) -> NetCdfResult<Vec<Dim<'_, S>>> {
        Ok((0..self.n_dims()?).map(|id| Dim::new(self, id)).collect())
    }

    /// Number of dimensions.
    pub fn n_dims(&self) -> NetCdfResult<i32> {
        Ok(self.storage.inq_ndims(self.ncid)?)
    }

    // === Variables ===

    /// Define a variable over `dims`, outermost first. An empty `dims` makes
    /// a scalar.
    pub fn add_var(&self, name: &str, xtype: NcType, dims: &[Dim<'_, S>]) -> NetCdfResult<Var<'_, S>> {
        check_name(name)?;
        let dimids: Vec<i32> = dims.iter().map(Dim::id).collect();
        let id = self.storage.def_var(self.ncid, name, xtype, &dimids)?;
        debug!(ncid = self.ncid, name = %name, xtype = %xtype, ?dimids, "Defined variable");
        Ok(Var::new(self, id))
    }

    /// Look up a variable by name.
    pub fn var(&self, name: &str) -> NetCdfResult<Var<'_, S>> {
        check_name(name)?;
        let id = self.storage.inq_varid(self.ncid, name)?;
        Ok(Var::new(self, id))
    }

    /// All variables, in definition order.
    pub fn vars(&self) -> NetCdfResult<Vec<Var<'_, S>>> {
        Ok((0..self.n_vars()?).map(|id| Var::new(self, id)).collect())
    }

    /// Number of variables.
    pub fn n_vars(&self) -> NetCdfResult<i32> {
        Ok(self.storage.inq_nvars(self.ncid)?)
    }

    // === Global attributes ===

    /// Global attribute `name`. It need not exist yet; writing creates it.
    pub fn attr(&self, name: &str) -> NetCdfResult<Attr<'_, S>> {
        check_name(name)?;
        Ok(Attr::new(self, NC_GLOBAL, name))
    }

    /// The `n`-th global attribute.
    pub fn attr_n(&self, n: i32) -> NetCdfResult<Attr<'_, S>> {
        let name = self.storage.inq_attname(self.ncid, NC_GLOBAL, n)?;
        Ok(Attr::new(self, NC_GLOBAL, &name))
    }

    /// Number of global attributes.
    pub fn n_attrs(&self) -> NetCdfResult<i32> {
        Ok(self.storage.inq_varnatts(self.ncid, NC_GLOBAL)?)
    }
}

impl<S: Storage + ?Sized> Drop for Dataset<'_, S> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if self.in_memory {
            let _ = self.storage.close_memio(self.ncid);
        } else {
            let _ = self.storage.close(self.ncid);
        }
    }
}

impl<S: Storage + ?Sized> fmt::Debug for Dataset<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("ncid", &self.ncid)
            .field("open", &self.open)
            .field("in_memory", &self.in_memory)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_drop_closes_dataset() {
        let storage = MemoryStorage::new();
        {
            let _ds = Dataset::create(&storage, "dropped.nc", FileMode::NETCDF4).unwrap();
            assert_eq!(storage.open_count(), 1);
        }
        assert_eq!(storage.open_count(), 0);
        assert!(storage.exists("dropped.nc"));
    }

    #[test]
    fn test_drop_releases_in_memory_dataset() {
        let storage = MemoryStorage::new();
        {
            let ds = Dataset::create_mem(&storage, "scratch.nc", FileMode::NETCDF4, 0).unwrap();
            assert!(ds.is_in_memory());
            assert_eq!(storage.open_count(), 1);
        }
        assert_eq!(storage.open_count(), 0);
        assert!(!storage.exists("scratch.nc"));
    }

    #[test]
    fn test_names_with_nul_are_rejected() {
        let storage = MemoryStorage::new();
        let ds = Dataset::create(&storage, "names.nc", FileMode::NETCDF4).unwrap();
        let err = ds.add_dim("bad\0name", 3).unwrap_err();
        assert!(matches!(err, NetCdfError::InvalidName(_)));
        assert_eq!(ds.n_dims().unwrap(), 0);
    }

    #[test]
    fn test_lookup_by_name() {
        let storage = MemoryStorage::new();
        let ds = Dataset::create(&storage, "lookup.nc", FileMode::NETCDF4).unwrap();
        let x = ds.add_dim("x", 4).unwrap();
        ds.add_var("v", NcType::Double, &[x]).unwrap();
        assert_eq!(ds.dim("x").unwrap().id(), x.id());
        assert_eq!(ds.var("v").unwrap().name().unwrap(), "v");
        assert_eq!(ds.var("missing").unwrap_err().storage_code(), Some(-49));
        ds.close().unwrap();
    }
}
