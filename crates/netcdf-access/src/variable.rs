//! Variables and their typed data accessors.
//!
//! Every bulk accessor validates against freshly fetched metadata before
//! issuing exactly one storage call. The `*_at` accessors go straight to the
//! library with the given coordinate.

use std::fmt;

use tracing::{debug, trace};

use crate::access::{
    check_type, slice_extent, strided_extent, validate_slice, validate_strided_slice,
    validate_whole, ShapedArray, TypedArray,
};
use crate::attribute::Attr;
use crate::consts::NcType;
use crate::dataset::{check_name, Dataset};
use crate::dimension::Dim;
use crate::element::{NcElement, Values, ValuesMut};
use crate::error::{NetCdfError, NetCdfResult};
use crate::index::product;
use crate::storage::{Selection, Storage};

/// Allocate a zeroed buffer of `n` elements.
pub(crate) fn buffer<T: Default + Clone>(n: u64) -> NetCdfResult<Vec<T>> {
    let len = usize::try_from(n).map_err(|_| NetCdfError::BufferTooSmall {
        len: usize::MAX,
        required: n,
    })?;
    Ok(vec![T::default(); len])
}

/// A variable of an open dataset.
pub struct Var<'a, S: Storage + ?Sized> {
    ds: &'a Dataset<'a, S>,
    id: i32,
}

impl<'a, S: Storage + ?Sized> Var<'a, S> {
    pub(crate) fn new(ds: &'a Dataset<'a, S>, id: i32) -> Self {
        Self { ds, id }
    }

    fn storage(&self) -> &'a S {
        self.ds.storage()
    }

    /// The library's id for this variable.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> NetCdfResult<String> {
        Ok(self.storage().inq_varname(self.ds.id(), self.id)?)
    }

    /// Declared element type.
    pub fn nc_type(&self) -> NetCdfResult<NcType> {
        NcType::try_from(self.storage().inq_vartype(self.ds.id(), self.id)?)
    }

    /// Dimensions, outermost first.
    pub fn dims(&self) -> NetCdfResult<Vec<Dim<'a, S>>> {
        let dimids = self.storage().inq_vardimid(self.ds.id(), self.id)?;
        Ok(dimids.into_iter().map(|id| Dim::new(self.ds, id)).collect())
    }

    /// Length of each dimension, outermost first.
    pub fn len_dims(&self) -> NetCdfResult<Vec<u64>> {
        self.dims()?.iter().map(Dim::len).collect()
    }

    /// Total number of elements; 1 for a scalar.
    pub fn len(&self) -> NetCdfResult<u64> {
        Ok(product(&self.len_dims()?))
    }

    pub fn n_attrs(&self) -> NetCdfResult<i32> {
        Ok(self.storage().inq_varnatts(self.ds.id(), self.id)?)
    }

    /// Attribute `name` of this variable. It need not exist yet; writing
    /// creates it.
    pub fn attr(&self, name: &str) -> NetCdfResult<Attr<'a, S>> {
        check_name(name)?;
        Ok(Attr::new(self.ds, self.id, name))
    }

    /// The `n`-th attribute of this variable.
    pub fn attr_n(&self, n: i32) -> NetCdfResult<Attr<'a, S>> {
        let name = self.storage().inq_attname(self.ds.id(), self.id, n)?;
        Ok(Attr::new(self.ds, self.id, &name))
    }

    /// Set chunk compression. Only netCDF-4 datasets support it, and only
    /// in define mode; `level` runs from 0 to 9.
    pub fn set_compression(&self, shuffle: bool, deflate: bool, level: i32) -> NetCdfResult<()> {
        self.storage()
            .def_var_deflate(self.ds.id(), self.id, shuffle, deflate, level)?;
        debug!(
            ncid = self.ds.id(),
            varid = self.id,
            shuffle,
            deflate,
            level,
            "Set variable compression"
        );
        Ok(())
    }

    /// Current `(shuffle, deflate, level)` settings.
    pub fn compression(&self) -> NetCdfResult<(bool, bool, i32)> {
        Ok(self.storage().inq_var_deflate(self.ds.id(), self.id)?)
    }

    fn put(&self, selection: Selection<'_>, values: Values<'_>, elements: u64) -> NetCdfResult<()> {
        trace!(
            ncid = self.ds.id(),
            varid = self.id,
            mode = selection.mode(),
            xtype = %values.nc_type(),
            elements,
            "Writing variable data"
        );
        self.storage()
            .put_var(self.ds.id(), self.id, selection, values)?;
        Ok(())
    }

    fn get(&self, selection: Selection<'_>, out: ValuesMut<'_>, elements: u64) -> NetCdfResult<()> {
        trace!(
            ncid = self.ds.id(),
            varid = self.id,
            mode = selection.mode(),
            xtype = %out.nc_type(),
            elements,
            "Reading variable data"
        );
        self.storage().get_var(self.ds.id(), self.id, selection, out)?;
        Ok(())
    }

    // === Whole variable ===

    /// Write the whole variable from `data`, which must hold at least
    /// [`len`](Self::len) elements; extra elements are ignored.
    pub fn write_values<T: NcElement>(&self, data: &[T]) -> NetCdfResult<()> {
        let n = validate_whole(self, T::NC_TYPE, data.len())?;
        self.put(Selection::All, T::values(data), n)
    }

    /// Read the whole variable into `out`.
    pub fn read_values<T: NcElement>(&self, out: &mut [T]) -> NetCdfResult<()> {
        let n = validate_whole(self, T::NC_TYPE, out.len())?;
        self.get(Selection::All, T::values_mut(out), n)
    }

    /// Read the whole variable into a new vector.
    pub fn get_values<T: NcElement>(&self) -> NetCdfResult<Vec<T>> {
        check_type(self.nc_type()?, T::NC_TYPE)?;
        let n = self.len()?;
        let mut out = buffer(n)?;
        self.get(Selection::All, T::values_mut(&mut out), n)?;
        Ok(out)
    }

    /// Write a whole `NC_CHAR` variable.
    pub fn write_text(&self, text: &[u8]) -> NetCdfResult<()> {
        let n = validate_whole(self, NcType::Char, text.len())?;
        self.put(Selection::All, Values::Char(text), n)
    }

    /// Read a whole `NC_CHAR` variable into `out`.
    pub fn read_text(&self, out: &mut [u8]) -> NetCdfResult<()> {
        let n = validate_whole(self, NcType::Char, out.len())?;
        self.get(Selection::All, ValuesMut::Char(out), n)
    }

    /// Read a whole `NC_CHAR` variable into a new vector.
    pub fn get_text(&self) -> NetCdfResult<Vec<u8>> {
        check_type(self.nc_type()?, NcType::Char)?;
        let n = self.len()?;
        let mut out = buffer(n)?;
        self.get(Selection::All, ValuesMut::Char(&mut out), n)?;
        Ok(out)
    }

    // === Hyperslabs ===

    /// Write the hyperslab `start`/`count` from `data` in row-major order.
    pub fn write_slice<T: NcElement>(&self, data: &[T], start: &[u64], count: &[u64]) -> NetCdfResult<()> {
        let n = validate_slice(self, T::NC_TYPE, data.len(), start, count)?;
        self.put(Selection::Slab { start, count }, T::values(data), n)
    }

    /// Read the hyperslab `start`/`count` into `out`.
    pub fn read_slice<T: NcElement>(&self, out: &mut [T], start: &[u64], count: &[u64]) -> NetCdfResult<()> {
        let n = validate_slice(self, T::NC_TYPE, out.len(), start, count)?;
        self.get(Selection::Slab { start, count }, T::values_mut(out), n)
    }

    /// Read the hyperslab `start`/`count` into a new vector.
    pub fn get_slice<T: NcElement>(&self, start: &[u64], count: &[u64]) -> NetCdfResult<Vec<T>> {
        check_type(self.nc_type()?, T::NC_TYPE)?;
        let n = slice_extent(&self.len_dims()?, start, count)?;
        let mut out = buffer(n)?;
        self.get(Selection::Slab { start, count }, T::values_mut(&mut out), n)?;
        Ok(out)
    }

    /// Write the strided hyperslab `start`/`count`/`stride` from `data`.
    pub fn write_strided_slice<T: NcElement>(
        &self,
        data: &[T],
        start: &[u64],
        count: &[u64],
        stride: &[i64],
    ) -> NetCdfResult<()> {
        let n = validate_strided_slice(self, T::NC_TYPE, data.len(), start, count, stride)?;
        let selection = Selection::Strided {
            start,
            count,
            stride,
        };
        self.put(selection, T::values(data), n)
    }

    /// Read the strided hyperslab `start`/`count`/`stride` into `out`.
    pub fn read_strided_slice<T: NcElement>(
        &self,
        out: &mut [T],
        start: &[u64],
        count: &[u64],
        stride: &[i64],
    ) -> NetCdfResult<()> {
        let n = validate_strided_slice(self, T::NC_TYPE, out.len(), start, count, stride)?;
        let selection = Selection::Strided {
            start,
            count,
            stride,
        };
        self.get(selection, T::values_mut(out), n)
    }

    /// Read the strided hyperslab `start`/`count`/`stride` into a new vector.
    pub fn get_strided_slice<T: NcElement>(
        &self,
        start: &[u64],
        count: &[u64],
        stride: &[i64],
    ) -> NetCdfResult<Vec<T>> {
        check_type(self.nc_type()?, T::NC_TYPE)?;
        let n = strided_extent(&self.len_dims()?, start, count, stride)?;
        let mut out = buffer(n)?;
        let selection = Selection::Strided {
            start,
            count,
            stride,
        };
        self.get(selection, T::values_mut(&mut out), n)?;
        Ok(out)
    }

    // === Single elements ===

    /// Read the element at `coord`.
    ///
    /// Not validated locally: the library checks the coordinate and converts
    /// the stored value to `T`. The native backend still looks up the
    /// variable's rank on every call, because libnetcdf reads one index per
    /// dimension from `coord`; element-wise loops over large variables pay
    /// that lookup per element and are better served by the slice accessors.
    /// A write at a coordinate past the end of a record dimension extends it.
    pub fn read_at<T: NcElement>(&self, coord: &[u64]) -> NetCdfResult<T> {
        let mut value = [T::default()];
        self.get(Selection::Point(coord), T::values_mut(&mut value), 1)?;
        Ok(value[0])
    }

    /// Write `value` at `coord`. Not validated locally; see [`Var::read_at`]
    /// for the per-call rank lookup.
    pub fn write_at<T: NcElement>(&self, coord: &[u64], value: T) -> NetCdfResult<()> {
        self.put(Selection::Point(coord), T::values(&[value]), 1)
    }

    /// Read the `NC_CHAR` element at `coord`.
    pub fn read_text_at(&self, coord: &[u64]) -> NetCdfResult<u8> {
        let mut value = [0u8];
        self.get(Selection::Point(coord), ValuesMut::Char(&mut value), 1)?;
        Ok(value[0])
    }

    /// Write the `NC_CHAR` element at `coord`.
    pub fn write_text_at(&self, coord: &[u64], value: u8) -> NetCdfResult<()> {
        self.put(Selection::Point(coord), Values::Char(&[value]), 1)
    }
}

impl<S: Storage + ?Sized> TypedArray for Var<'_, S> {
    fn nc_type(&self) -> NetCdfResult<NcType> {
        Var::nc_type(self)
    }

    fn len(&self) -> NetCdfResult<u64> {
        Var::len(self)
    }
}

impl<S: Storage + ?Sized> ShapedArray for Var<'_, S> {
    fn len_dims(&self) -> NetCdfResult<Vec<u64>> {
        Var::len_dims(self)
    }
}

impl<S: Storage + ?Sized> Clone for Var<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Storage + ?Sized> Copy for Var<'_, S> {}

impl<S: Storage + ?Sized> fmt::Debug for Var<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("ncid", &self.ds.id())
            .field("id", &self.id)
            .finish()
    }
}
