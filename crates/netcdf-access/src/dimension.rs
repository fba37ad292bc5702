use std::fmt;

use crate::dataset::Dataset;
use crate::error::NetCdfResult;
use crate::storage::Storage;

/// A dimension of an open dataset.
pub struct Dim<'a, S: Storage + ?Sized> {
    ds: &'a Dataset<'a, S>,
    id: i32,
}

impl<'a, S: Storage + ?Sized> Dim<'a, S> {
    pub(crate) fn new(ds: &'a Dataset<'a, S>, id: i32) -> Self {
        Self { ds, id }
    }

    /// The library's id for this dimension.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> NetCdfResult<String> {
        Ok(self.ds.storage().inq_dimname(self.ds.id(), self.id)?)
    }

    /// Current length; for a record dimension, the number of records written.
    pub fn len(&self) -> NetCdfResult<u64> {
        Ok(self.ds.storage().inq_dimlen(self.ds.id(), self.id)?)
    }

    /// True for a record (unlimited) dimension.
    pub fn is_unlimited(&self) -> NetCdfResult<bool> {
        Ok(self.ds.storage().inq_unlimdims(self.ds.id())?.contains(&self.id))
    }
}

impl<S: Storage + ?Sized> Clone for Dim<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Storage + ?Sized> Copy for Dim<'_, S> {}

impl<S: Storage + ?Sized> fmt::Debug for Dim<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dim")
            .field("ncid", &self.ds.id())
            .field("id", &self.id)
            .finish()
    }
}
