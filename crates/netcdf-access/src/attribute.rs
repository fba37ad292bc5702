//! Attributes of variables and of the dataset as a whole.
//!
//! An [`Attr`] is only a `(variable, name)` pair: the attribute itself is
//! created by the first write, which is why writes are passed straight to
//! the library. Reads are validated like whole-variable reads.

use std::fmt;

use tracing::trace;

use crate::access::{check_type, validate_whole, TypedArray};
use crate::consts::{NcType, NC_GLOBAL};
use crate::dataset::Dataset;
use crate::element::{NcElement, Values, ValuesMut};
use crate::error::NetCdfResult;
use crate::storage::Storage;
use crate::variable::buffer;

/// A named attribute of a variable, or a global attribute.
pub struct Attr<'a, S: Storage + ?Sized> {
    ds: &'a Dataset<'a, S>,
    varid: i32,
    name: String,
}

impl<'a, S: Storage + ?Sized> Attr<'a, S> {
    pub(crate) fn new(ds: &'a Dataset<'a, S>, varid: i32, name: &str) -> Self {
        Self {
            ds,
            varid,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for a dataset-level attribute.
    pub fn is_global(&self) -> bool {
        self.varid == NC_GLOBAL
    }

    pub fn nc_type(&self) -> NetCdfResult<NcType> {
        let code = self
            .ds
            .storage()
            .inq_atttype(self.ds.id(), self.varid, &self.name)?;
        NcType::try_from(code)
    }

    /// Number of stored values.
    pub fn len(&self) -> NetCdfResult<u64> {
        Ok(self
            .ds
            .storage()
            .inq_attlen(self.ds.id(), self.varid, &self.name)?)
    }

    fn put(&self, values: Values<'_>) -> NetCdfResult<()> {
        trace!(
            ncid = self.ds.id(),
            varid = self.varid,
            name = %self.name,
            xtype = %values.nc_type(),
            elements = values.len(),
            "Writing attribute"
        );
        self.ds
            .storage()
            .put_att(self.ds.id(), self.varid, &self.name, values)?;
        Ok(())
    }

    fn get(&self, out: ValuesMut<'_>) -> NetCdfResult<()> {
        trace!(
            ncid = self.ds.id(),
            varid = self.varid,
            name = %self.name,
            xtype = %out.nc_type(),
            "Reading attribute"
        );
        self.ds
            .storage()
            .get_att(self.ds.id(), self.varid, &self.name, out)?;
        Ok(())
    }

    /// Create or replace the attribute with `values`; its type becomes the
    /// type of `T`.
    pub fn write_values<T: NcElement>(&self, values: &[T]) -> NetCdfResult<()> {
        self.put(T::values(values))
    }

    /// Read the attribute into `out`, which must hold at least
    /// [`len`](Self::len) values.
    pub fn read_values<T: NcElement>(&self, out: &mut [T]) -> NetCdfResult<()> {
        validate_whole(self, T::NC_TYPE, out.len())?;
        self.get(T::values_mut(out))
    }

    /// Read the attribute into a new vector.
    pub fn get_values<T: NcElement>(&self) -> NetCdfResult<Vec<T>> {
        check_type(self.nc_type()?, T::NC_TYPE)?;
        let mut out = buffer(self.len()?)?;
        self.get(T::values_mut(&mut out))?;
        Ok(out)
    }

    /// Create or replace the attribute as `NC_CHAR` text.
    pub fn write_text(&self, text: &[u8]) -> NetCdfResult<()> {
        self.put(Values::Char(text))
    }

    /// Read an `NC_CHAR` attribute into `out`.
    pub fn read_text(&self, out: &mut [u8]) -> NetCdfResult<()> {
        validate_whole(self, NcType::Char, out.len())?;
        self.get(ValuesMut::Char(out))
    }

    /// Read an `NC_CHAR` attribute into a new vector.
    pub fn get_text(&self) -> NetCdfResult<Vec<u8>> {
        check_type(self.nc_type()?, NcType::Char)?;
        let mut out = buffer(self.len()?)?;
        self.get(ValuesMut::Char(&mut out))?;
        Ok(out)
    }
}

impl<S: Storage + ?Sized> TypedArray for Attr<'_, S> {
    fn nc_type(&self) -> NetCdfResult<NcType> {
        Attr::nc_type(self)
    }

    fn len(&self) -> NetCdfResult<u64> {
        Attr::len(self)
    }
}

impl<S: Storage + ?Sized> fmt::Debug for Attr<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr")
            .field("ncid", &self.ds.id())
            .field("varid", &self.varid)
            .field("name", &self.name)
            .finish()
    }
}
