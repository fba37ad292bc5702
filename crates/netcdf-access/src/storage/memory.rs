//! In-process stand-in for the netCDF library.
//!
//! Datasets live in a registry keyed by path, so a dataset written and
//! closed through one `MemoryStorage` can be reopened through it. Handles,
//! status codes, define/data mode rules, default fill values, numeric
//! conversion and record dimensions follow the C library closely enough for
//! the accessor layer to be exercised end to end without libnetcdf.
//!
//! Memory images (`create_mem`, `open_memio`, `close_memio`) use this
//! backend's own encoding, a YAML dump of the dataset behind a magic
//! header; they are not netCDF files and cannot be exchanged with
//! libnetcdf. `MemioFlags::LOCKED` is accepted and has no effect here.
//! Variables larger than `MAX_VAR_BYTES` fail with `NC_ENOMEM` instead of
//! being allocated.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Selection, Storage, StorageResult};
use crate::consts::status::*;
use crate::consts::{FileMode, MemioFlags, NcType, NC_GLOBAL, NC_MAX_NAME, NC_UNLIMITED};
use crate::element::{Values, ValuesMut};
use crate::error::StorageError;
use crate::index::{hyperslab_offsets, product, ravel_index};

/// Distance between consecutive dataset ids, as libnetcdf hands them out.
const NCID_STEP: i32 = 0x10000;

/// Largest variable, in bytes, this backend will hold.
const MAX_VAR_BYTES: u64 = 1 << 32;

/// Leading bytes of a memory image.
const IMAGE_MAGIC: &[u8] = b"\x89MEMCDF\n";

/// Number of data transfers performed, for tests that must prove a
/// transfer did or did not happen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoStats {
    /// Successful variable reads
    pub reads: u64,
    /// Successful variable writes
    pub writes: u64,
}

/// In-memory implementation of [`Storage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    registry: RefCell<Registry>,
    stats: Cell<IoStats>,
}

#[derive(Debug, Default)]
struct Registry {
    files: HashMap<String, Image>,
    open: HashMap<i32, Handle>,
    opened: i32,
}

#[derive(Debug)]
struct Handle {
    path: String,
    image: Image,
    writable: bool,
    persist: bool,
    in_memory: bool,
    define_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Image {
    netcdf4: bool,
    dims: Vec<DimEntry>,
    vars: Vec<VarEntry>,
    atts: Vec<AttEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DimEntry {
    name: String,
    len: u64,
    #[serde(default)]
    unlimited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VarEntry {
    name: String,
    xtype: NcType,
    dimids: Vec<i32>,
    data: Array,
    atts: Vec<AttEntry>,
    deflate: (bool, bool, i32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttEntry {
    name: String,
    data: Array,
}

fn status(code: i32) -> StorageError {
    StorageError::new(code, strerror(code))
}

fn check_name(name: &str) -> Result<(), i32> {
    if name.is_empty() || name.len() > NC_MAX_NAME || name.contains('/') || name.contains('\0') {
        return Err(NC_EBADNAME);
    }
    Ok(())
}

fn is_classic_type(xtype: NcType) -> bool {
    matches!(
        xtype,
        NcType::Byte | NcType::Char | NcType::Short | NcType::Int | NcType::Float | NcType::Double
    )
}

/// Element count of a variable of `shape`, or `NC_ENOMEM` past the size limit.
fn allocation(xtype: NcType, shape: &[u64]) -> Result<usize, i32> {
    let total = product(shape);
    total
        .checked_mul(xtype.size() as u64)
        .filter(|&bytes| bytes <= MAX_VAR_BYTES)
        .and_then(|_| usize::try_from(total).ok())
        .ok_or(NC_ENOMEM)
}

impl Image {
    fn new(mode: FileMode) -> Image {
        Image {
            netcdf4: mode.contains(FileMode::NETCDF4),
            ..Image::default()
        }
    }

    fn to_bytes(&self) -> Result<Vec<u8>, i32> {
        let body = serde_yaml::to_string(self).map_err(|_| NC_EINVAL)?;
        let mut bytes = Vec::with_capacity(IMAGE_MAGIC.len() + body.len());
        bytes.extend_from_slice(IMAGE_MAGIC);
        bytes.extend_from_slice(body.as_bytes());
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Image, i32> {
        let body = bytes.strip_prefix(IMAGE_MAGIC).ok_or(NC_ENOTNC)?;
        serde_yaml::from_slice(body).map_err(|_| NC_ENOTNC)
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfer counters since construction.
    pub fn stats(&self) -> IoStats {
        self.stats.get()
    }

    /// True if a dataset has been created at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.registry.borrow().files.contains_key(path)
    }

    /// Number of datasets currently open.
    pub fn open_count(&self) -> usize {
        self.registry.borrow().open.len()
    }

    fn with<R>(&self, ncid: i32, f: impl FnOnce(&mut Handle) -> Result<R, i32>) -> StorageResult<R> {
        let mut registry = self.registry.borrow_mut();
        let handle = registry.open.get_mut(&ncid).ok_or_else(|| status(NC_EBADID))?;
        f(handle).map_err(status)
    }

    fn count(&self, update: impl FnOnce(&mut IoStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    fn register(&self, handle: Handle) -> i32 {
        let mut registry = self.registry.borrow_mut();
        registry.opened += 1;
        let ncid = registry.opened * NCID_STEP;
        registry.open.insert(ncid, handle);
        ncid
    }
}

impl Handle {
    fn writable(&self) -> Result<(), i32> {
        if self.writable {
            Ok(())
        } else {
            Err(NC_EPERM)
        }
    }

    /// Enter define mode for a definition call; netCDF-4 does so implicitly.
    fn to_define_mode(&mut self) -> Result<(), i32> {
        self.writable()?;
        if !self.define_mode {
            if !self.image.netcdf4 {
                return Err(NC_ENOTINDEFINE);
            }
            self.define_mode = true;
        }
        Ok(())
    }

    /// Leave define mode for a data call; netCDF-4 does so implicitly.
    fn to_data_mode(&mut self) -> Result<(), i32> {
        if self.define_mode {
            if !self.image.netcdf4 {
                return Err(NC_EINDEFINE);
            }
            self.define_mode = false;
        }
        Ok(())
    }

    fn check_type(&self, xtype: NcType) -> Result<(), i32> {
        if !self.image.netcdf4 && !is_classic_type(xtype) {
            return Err(NC_EBADTYPE);
        }
        Ok(())
    }

    fn var(&self, varid: i32) -> Result<&VarEntry, i32> {
        usize::try_from(varid)
            .ok()
            .and_then(|i| self.image.vars.get(i))
            .ok_or(NC_ENOTVAR)
    }

    fn var_mut(&mut self, varid: i32) -> Result<&mut VarEntry, i32> {
        usize::try_from(varid)
            .ok()
            .and_then(|i| self.image.vars.get_mut(i))
            .ok_or(NC_ENOTVAR)
    }

    fn dim(&self, dimid: i32) -> Result<&DimEntry, i32> {
        usize::try_from(dimid)
            .ok()
            .and_then(|i| self.image.dims.get(i))
            .ok_or(NC_EBADDIM)
    }

    fn shape(&self, var: &VarEntry) -> Result<Vec<u64>, i32> {
        self.shape_with(var, &[])
    }

    /// Shape of `var` once the record dimensions in `grown` reach their new
    /// lengths.
    fn shape_with(&self, var: &VarEntry, grown: &[(i32, u64)]) -> Result<Vec<u64>, i32> {
        var.dimids
            .iter()
            .map(|&id| match grown.iter().find(|(g, _)| *g == id) {
                Some(&(_, len)) => Ok(len),
                None => self.dim(id).map(|d| d.len),
            })
            .collect()
    }

    /// Shape a write through `selection` needs: record dimensions stretch to
    /// cover the last position written, fixed ones stay as they are.
    fn record_extent(&self, var: &VarEntry, shape: &[u64], selection: Selection<'_>) -> Result<Vec<u64>, i32> {
        let rank = shape.len();
        let mut target = shape.to_vec();
        for (i, &id) in var.dimids.iter().enumerate() {
            if !self.dim(id)?.unlimited {
                continue;
            }
            let end = match selection {
                Selection::Point(index) if index.len() == rank => index[i].checked_add(1),
                Selection::Slab { start, count }
                    if start.len() == rank && count.len() == rank && count[i] > 0 =>
                {
                    start[i].checked_add(count[i])
                }
                Selection::Strided {
                    start,
                    count,
                    stride,
                } if start.len() == rank
                    && count.len() == rank
                    && stride.len() == rank
                    && count[i] > 0
                    && stride[i] > 0 =>
                {
                    (count[i] - 1)
                        .checked_mul(stride[i] as u64)
                        .and_then(|span| span.checked_add(start[i]))
                        .and_then(|last| last.checked_add(1))
                }
                _ => None,
            };
            if let Some(end) = end {
                target[i] = target[i].max(end);
            }
        }
        Ok(target)
    }

    /// Stretch the record dimensions of `dimids` to `target`, moving the
    /// data of every variable that uses them and filling the new records.
    fn grow(&mut self, dimids: &[i32], target: &[u64]) -> Result<(), i32> {
        let mut grown = Vec::new();
        for (&id, &len) in dimids.iter().zip(target) {
            if self.dim(id)?.len < len {
                grown.push((id, len));
            }
        }
        if grown.is_empty() {
            return Ok(());
        }

        let mut moved = Vec::new();
        for (i, var) in self.image.vars.iter().enumerate() {
            let old = self.shape(var)?;
            let new = self.shape_with(var, &grown)?;
            if old != new {
                moved.push((i, var.data.relayout(var.xtype, &old, &new)?));
            }
        }
        for (i, data) in moved {
            self.image.vars[i].data = data;
        }
        for (id, len) in grown {
            self.image.dims[id as usize].len = len;
        }
        Ok(())
    }

    fn atts(&self, varid: i32) -> Result<&Vec<AttEntry>, i32> {
        if varid == NC_GLOBAL {
            Ok(&self.image.atts)
        } else {
            self.var(varid).map(|v| &v.atts)
        }
    }

    fn atts_mut(&mut self, varid: i32) -> Result<&mut Vec<AttEntry>, i32> {
        if varid == NC_GLOBAL {
            Ok(&mut self.image.atts)
        } else {
            self.var_mut(varid).map(|v| &mut v.atts)
        }
    }

    fn att(&self, varid: i32, name: &str) -> Result<&AttEntry, i32> {
        self.atts(varid)?
            .iter()
            .find(|a| a.name == name)
            .ok_or(NC_ENOTATT)
    }
}

/// Flat positions addressed by a selection, checked the way the C library
/// checks them.
fn positions(shape: &[u64], selection: Selection<'_>) -> Result<Vec<u64>, i32> {
    let rank = shape.len();
    match selection {
        Selection::All => Ok((0..product(shape)).collect()),
        Selection::Point(index) => {
            if index.len() != rank || index.iter().zip(shape).any(|(&i, &n)| i >= n) {
                return Err(NC_EINVALCOORDS);
            }
            ravel_index(index, shape)
                .map(|flat| vec![flat])
                .map_err(|_| NC_EINVALCOORDS)
        }
        Selection::Slab { start, count } => {
            if start.len() != rank || count.len() != rank {
                return Err(NC_EINVALCOORDS);
            }
            for i in 0..rank {
                if start[i] > shape[i] {
                    return Err(NC_EINVALCOORDS);
                }
                if start[i].saturating_add(count[i]) > shape[i] {
                    return Err(NC_EEDGE);
                }
            }
            Ok(hyperslab_offsets(shape, start, count, &vec![1; rank]))
        }
        Selection::Strided {
            start,
            count,
            stride,
        } => {
            if start.len() != rank || count.len() != rank || stride.len() != rank {
                return Err(NC_EINVALCOORDS);
            }
            for i in 0..rank {
                if stride[i] < 1 {
                    return Err(NC_ESTRIDE);
                }
                if start[i] > shape[i] {
                    return Err(NC_EINVALCOORDS);
                }
                if count[i] > 0 {
                    let last = i128::from(start[i]) + i128::from(count[i] - 1) * i128::from(stride[i]);
                    if last >= i128::from(shape[i]) {
                        return Err(NC_EEDGE);
                    }
                }
            }
            Ok(hyperslab_offsets(shape, start, count, stride))
        }
    }
}

// =============================================================================
// Element storage and conversion
// =============================================================================

/// One element in transit between a buffer and stored data.
#[derive(Debug, Clone, Copy)]
enum Scalar {
    Signed(i64),
    Unsigned(u64),
    Real(f64),
    Text(u8),
}

impl Scalar {
    fn to_number<T: num_traits::NumCast>(self) -> Result<T, i32> {
        let converted = match self {
            Scalar::Signed(v) => <T as num_traits::NumCast>::from(v),
            Scalar::Unsigned(v) => <T as num_traits::NumCast>::from(v),
            Scalar::Real(v) => <T as num_traits::NumCast>::from(v),
            Scalar::Text(_) => return Err(NC_ECHAR),
        };
        converted.ok_or(NC_ERANGE)
    }

    fn to_text(self) -> Result<u8, i32> {
        match self {
            Scalar::Text(c) => Ok(c),
            _ => Err(NC_ECHAR),
        }
    }
}

macro_rules! read_scalar {
    ($kind:ident, $buf:expr, $i:expr $(, $pat:pat => $arm:expr)*) => {
        match $buf {
            $kind::Byte(v) => Scalar::Signed(i64::from(v[$i])),
            $kind::Short(v) => Scalar::Signed(i64::from(v[$i])),
            $kind::Int(v) => Scalar::Signed(i64::from(v[$i])),
            $kind::Int64(v) => Scalar::Signed(v[$i]),
            $kind::UByte(v) => Scalar::Unsigned(u64::from(v[$i])),
            $kind::UShort(v) => Scalar::Unsigned(u64::from(v[$i])),
            $kind::UInt(v) => Scalar::Unsigned(u64::from(v[$i])),
            $kind::UInt64(v) => Scalar::Unsigned(v[$i]),
            $kind::Float(v) => Scalar::Real(f64::from(v[$i])),
            $kind::Double(v) => Scalar::Real(v[$i]),
            $kind::Char(v) => Scalar::Text(v[$i]),
            $($pat => $arm,)*
        }
    };
}

macro_rules! write_scalar {
    ($kind:ident, $buf:expr, $i:expr, $s:expr $(, $pat:pat => $arm:expr)*) => {
        match $buf {
            $kind::Byte(v) => v[$i] = $s.to_number()?,
            $kind::Short(v) => v[$i] = $s.to_number()?,
            $kind::Int(v) => v[$i] = $s.to_number()?,
            $kind::Int64(v) => v[$i] = $s.to_number()?,
            $kind::UByte(v) => v[$i] = $s.to_number()?,
            $kind::UShort(v) => v[$i] = $s.to_number()?,
            $kind::UInt(v) => v[$i] = $s.to_number()?,
            $kind::UInt64(v) => v[$i] = $s.to_number()?,
            $kind::Float(v) => v[$i] = $s.to_number()?,
            $kind::Double(v) => v[$i] = $s.to_number()?,
            $kind::Char(v) => v[$i] = $s.to_text()?,
            $($pat => $arm,)*
        }
    };
}

/// Stored data of one variable or attribute, in its declared type.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Array {
    Byte(Vec<i8>),
    Char(Vec<u8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    UByte(Vec<u8>),
    UShort(Vec<u16>),
    UInt(Vec<u32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Str(Vec<String>),
}

impl Array {
    /// `n` default fill values of `xtype`.
    fn filled(xtype: NcType, n: usize) -> Array {
        match xtype {
            NcType::Byte => Array::Byte(vec![-127; n]),
            NcType::Char => Array::Char(vec![0; n]),
            NcType::Short => Array::Short(vec![-32767; n]),
            NcType::Int => Array::Int(vec![-2147483647; n]),
            NcType::Float => Array::Float(vec![9.969_21e36; n]),
            NcType::Double => Array::Double(vec![9.969_209_968_386_869e36; n]),
            NcType::UByte => Array::UByte(vec![u8::MAX; n]),
            NcType::UShort => Array::UShort(vec![u16::MAX; n]),
            NcType::UInt => Array::UInt(vec![u32::MAX; n]),
            NcType::Int64 => Array::Int64(vec![-9223372036854775806; n]),
            NcType::UInt64 => Array::UInt64(vec![u64::MAX - 1; n]),
            NcType::String => Array::Str(vec![String::new(); n]),
        }
    }

    fn from_values(values: Values<'_>) -> Array {
        match values {
            Values::Byte(v) => Array::Byte(v.to_vec()),
            Values::Char(v) => Array::Char(v.to_vec()),
            Values::Short(v) => Array::Short(v.to_vec()),
            Values::Int(v) => Array::Int(v.to_vec()),
            Values::Float(v) => Array::Float(v.to_vec()),
            Values::Double(v) => Array::Double(v.to_vec()),
            Values::UByte(v) => Array::UByte(v.to_vec()),
            Values::UShort(v) => Array::UShort(v.to_vec()),
            Values::UInt(v) => Array::UInt(v.to_vec()),
            Values::Int64(v) => Array::Int64(v.to_vec()),
            Values::UInt64(v) => Array::UInt64(v.to_vec()),
        }
    }

    fn nc_type(&self) -> NcType {
        match self {
            Array::Byte(_) => NcType::Byte,
            Array::Char(_) => NcType::Char,
            Array::Short(_) => NcType::Short,
            Array::Int(_) => NcType::Int,
            Array::Float(_) => NcType::Float,
            Array::Double(_) => NcType::Double,
            Array::UByte(_) => NcType::UByte,
            Array::UShort(_) => NcType::UShort,
            Array::UInt(_) => NcType::UInt,
            Array::Int64(_) => NcType::Int64,
            Array::UInt64(_) => NcType::UInt64,
            Array::Str(_) => NcType::String,
        }
    }

    fn len(&self) -> usize {
        match self {
            Array::Byte(v) => v.len(),
            Array::Char(v) => v.len(),
            Array::Short(v) => v.len(),
            Array::Int(v) => v.len(),
            Array::Float(v) => v.len(),
            Array::Double(v) => v.len(),
            Array::UByte(v) => v.len(),
            Array::UShort(v) => v.len(),
            Array::UInt(v) => v.len(),
            Array::Int64(v) => v.len(),
            Array::UInt64(v) => v.len(),
            Array::Str(v) => v.len(),
        }
    }

    /// Copy of the data laid out for `new`, a shape no smaller than `old` in
    /// any dimension; new positions hold fill values.
    fn relayout(&self, xtype: NcType, old: &[u64], new: &[u64]) -> Result<Array, i32> {
        let mut out = Array::filled(xtype, allocation(xtype, new)?);
        if product(old) == 0 {
            return Ok(out);
        }
        let rank = old.len();
        let targets = hyperslab_offsets(new, &vec![0; rank], old, &vec![1; rank]);

        macro_rules! spread {
            ($($variant:ident),*) => {
                match (self, &mut out) {
                    $((Array::$variant(src), Array::$variant(dst)) => {
                        for (x, &to) in src.iter().zip(&targets) {
                            dst[to as usize] = x.clone();
                        }
                    })*
                    _ => return Err(NC_EBADTYPE),
                }
            };
        }
        spread!(Byte, Char, Short, Int, Float, Double, UByte, UShort, UInt, Int64, UInt64, Str);
        Ok(out)
    }

    fn get(&self, i: usize) -> Result<Scalar, i32> {
        Ok(read_scalar!(Array, self, i, Array::Str(_) => return Err(NC_EBADTYPE)))
    }

    fn set(&mut self, i: usize, value: Scalar) -> Result<(), i32> {
        write_scalar!(Array, self, i, value, Array::Str(_) => return Err(NC_EBADTYPE));
        Ok(())
    }
}

fn load(values: &Values<'_>, i: usize) -> Scalar {
    read_scalar!(Values, values, i)
}

fn store(out: &mut ValuesMut<'_>, i: usize, value: Scalar) -> Result<(), i32> {
    write_scalar!(ValuesMut, out, i, value);
    Ok(())
}

// =============================================================================
// Storage implementation
// =============================================================================

impl Storage for MemoryStorage {
    fn library_version(&self) -> String {
        format!("memory storage (netcdf-access {})", env!("CARGO_PKG_VERSION"))
    }

    fn create(&self, path: &str, mode: FileMode) -> StorageResult<i32> {
        {
            let mut registry = self.registry.borrow_mut();
            if mode.contains(FileMode::NOCLOBBER) && registry.files.contains_key(path) {
                return Err(status(NC_EEXIST));
            }
            if !mode.contains(FileMode::DISKLESS) {
                registry.files.insert(path.to_string(), Image::new(mode));
            }
        }
        Ok(self.register(Handle {
            path: path.to_string(),
            image: Image::new(mode),
            writable: true,
            persist: !mode.contains(FileMode::DISKLESS),
            in_memory: false,
            define_mode: true,
        }))
    }

    fn open(&self, path: &str, mode: FileMode) -> StorageResult<i32> {
        let image = self
            .registry
            .borrow()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| status(ENOENT))?;
        Ok(self.register(Handle {
            path: path.to_string(),
            image,
            writable: mode.contains(FileMode::WRITE),
            persist: !mode.contains(FileMode::DISKLESS),
            in_memory: false,
            define_mode: false,
        }))
    }

    fn close(&self, ncid: i32) -> StorageResult<()> {
        self.close_memio(ncid).map(drop)
    }

    fn create_mem(&self, path: &str, mode: FileMode, _initial_size: usize) -> StorageResult<i32> {
        Ok(self.register(Handle {
            path: path.to_string(),
            image: Image::new(mode),
            writable: true,
            persist: false,
            in_memory: true,
            define_mode: true,
        }))
    }

    fn open_memio(&self, path: &str, mode: FileMode, _flags: MemioFlags, image: &[u8]) -> StorageResult<i32> {
        let image = Image::from_bytes(image).map_err(status)?;
        Ok(self.register(Handle {
            path: path.to_string(),
            image,
            writable: mode.contains(FileMode::WRITE),
            persist: false,
            in_memory: true,
            define_mode: false,
        }))
    }

    fn close_memio(&self, ncid: i32) -> StorageResult<Vec<u8>> {
        let mut registry = self.registry.borrow_mut();
        let handle = registry.open.remove(&ncid).ok_or_else(|| status(NC_EBADID))?;
        if handle.in_memory {
            return handle.image.to_bytes().map_err(status);
        }
        if handle.writable && handle.persist {
            registry.files.insert(handle.path, handle.image);
        }
        Ok(Vec::new())
    }

    fn enddef(&self, ncid: i32) -> StorageResult<()> {
        self.with(ncid, |h| {
            if !h.define_mode {
                return Err(NC_ENOTINDEFINE);
            }
            h.define_mode = false;
            Ok(())
        })
    }

    fn redef(&self, ncid: i32) -> StorageResult<()> {
        self.with(ncid, |h| {
            h.writable()?;
            if h.define_mode {
                return Err(NC_EINDEFINE);
            }
            h.define_mode = true;
            Ok(())
        })
    }

    fn sync(&self, ncid: i32) -> StorageResult<()> {
        let (path, image) = self.with(ncid, |h| {
            h.to_data_mode()?;
            Ok((h.path.clone(), (h.writable && h.persist).then(|| h.image.clone())))
        })?;
        if let Some(image) = image {
            self.registry.borrow_mut().files.insert(path, image);
        }
        Ok(())
    }

    fn def_dim(&self, ncid: i32, name: &str, len: u64) -> StorageResult<i32> {
        self.with(ncid, |h| {
            h.to_define_mode()?;
            check_name(name)?;
            if h.image.dims.iter().any(|d| d.name == name) {
                return Err(NC_ENAMEINUSE);
            }
            let unlimited = len == NC_UNLIMITED;
            if unlimited && !h.image.netcdf4 && h.image.dims.iter().any(|d| d.unlimited) {
                return Err(NC_EUNLIMIT);
            }
            h.image.dims.push(DimEntry {
                name: name.to_string(),
                len,
                unlimited,
            });
            Ok(h.image.dims.len() as i32 - 1)
        })
    }

    fn inq_dimid(&self, ncid: i32, name: &str) -> StorageResult<i32> {
        self.with(ncid, |h| {
            h.image
                .dims
                .iter()
                .position(|d| d.name == name)
                .map(|i| i as i32)
                .ok_or(NC_EBADDIM)
        })
    }

    fn inq_dimname(&self, ncid: i32, dimid: i32) -> StorageResult<String> {
        self.with(ncid, |h| h.dim(dimid).map(|d| d.name.clone()))
    }

    fn inq_dimlen(&self, ncid: i32, dimid: i32) -> StorageResult<u64> {
        self.with(ncid, |h| h.dim(dimid).map(|d| d.len))
    }

    fn inq_ndims(&self, ncid: i32) -> StorageResult<i32> {
        self.with(ncid, |h| Ok(h.image.dims.len() as i32))
    }

    fn inq_unlimdims(&self, ncid: i32) -> StorageResult<Vec<i32>> {
        self.with(ncid, |h| {
            Ok(h.image
                .dims
                .iter()
                .enumerate()
                .filter(|(_, d)| d.unlimited)
                .map(|(i, _)| i as i32)
                .collect())
        })
    }

    fn def_var(&self, ncid: i32, name: &str, xtype: NcType, dimids: &[i32]) -> StorageResult<i32> {
        self.with(ncid, |h| {
            h.to_define_mode()?;
            check_name(name)?;
            h.check_type(xtype)?;
            if h.image.vars.iter().any(|v| v.name == name) {
                return Err(NC_ENAMEINUSE);
            }
            let shape = dimids
                .iter()
                .map(|&id| h.dim(id).map(|d| d.len))
                .collect::<Result<Vec<_>, _>>()?;
            if !h.image.netcdf4 {
                // Classic files allow a record dimension only in first place.
                for &id in dimids.iter().skip(1) {
                    if h.dim(id)?.unlimited {
                        return Err(NC_EUNLIMPOS);
                    }
                }
            }
            let total = allocation(xtype, &shape)?;
            h.image.vars.push(VarEntry {
                name: name.to_string(),
                xtype,
                dimids: dimids.to_vec(),
                data: Array::filled(xtype, total),
                atts: Vec::new(),
                deflate: (false, false, 0),
            });
            Ok(h.image.vars.len() as i32 - 1)
        })
    }

    fn inq_varid(&self, ncid: i32, name: &str) -> StorageResult<i32> {
        self.with(ncid, |h| {
            h.image
                .vars
                .iter()
                .position(|v| v.name == name)
                .map(|i| i as i32)
                .ok_or(NC_ENOTVAR)
        })
    }

    fn inq_varname(&self, ncid: i32, varid: i32) -> StorageResult<String> {
        self.with(ncid, |h| h.var(varid).map(|v| v.name.clone()))
    }

    fn inq_vartype(&self, ncid: i32, varid: i32) -> StorageResult<i32> {
        self.with(ncid, |h| h.var(varid).map(|v| v.xtype.code()))
    }

    fn inq_varndims(&self, ncid: i32, varid: i32) -> StorageResult<i32> {
        self.with(ncid, |h| h.var(varid).map(|v| v.dimids.len() as i32))
    }

    fn inq_vardimid(&self, ncid: i32, varid: i32) -> StorageResult<Vec<i32>> {
        self.with(ncid, |h| h.var(varid).map(|v| v.dimids.clone()))
    }

    fn inq_nvars(&self, ncid: i32) -> StorageResult<i32> {
        self.with(ncid, |h| Ok(h.image.vars.len() as i32))
    }

    fn inq_varnatts(&self, ncid: i32, varid: i32) -> StorageResult<i32> {
        self.with(ncid, |h| h.atts(varid).map(|a| a.len() as i32))
    }

    fn def_var_deflate(
        &self,
        ncid: i32,
        varid: i32,
        shuffle: bool,
        deflate: bool,
        level: i32,
    ) -> StorageResult<()> {
        self.with(ncid, |h| {
            if !h.image.netcdf4 {
                return Err(NC_ENOTNC4);
            }
            if !(0..=9).contains(&level) {
                return Err(NC_EINVAL);
            }
            h.to_define_mode()?;
            h.var_mut(varid)?.deflate = (shuffle, deflate, level);
            Ok(())
        })
    }

    fn inq_var_deflate(&self, ncid: i32, varid: i32) -> StorageResult<(bool, bool, i32)> {
        self.with(ncid, |h| h.var(varid).map(|v| v.deflate))
    }

    fn inq_atttype(&self, ncid: i32, varid: i32, name: &str) -> StorageResult<i32> {
        self.with(ncid, |h| h.att(varid, name).map(|a| a.data.nc_type().code()))
    }

    fn inq_attlen(&self, ncid: i32, varid: i32, name: &str) -> StorageResult<u64> {
        self.with(ncid, |h| h.att(varid, name).map(|a| a.data.len() as u64))
    }

    fn inq_attname(&self, ncid: i32, varid: i32, attnum: i32) -> StorageResult<String> {
        self.with(ncid, |h| {
            let atts = h.atts(varid)?;
            usize::try_from(attnum)
                .ok()
                .and_then(|i| atts.get(i))
                .map(|a| a.name.clone())
                .ok_or(NC_ENOTATT)
        })
    }

    fn put_att(&self, ncid: i32, varid: i32, name: &str, values: Values<'_>) -> StorageResult<()> {
        self.with(ncid, |h| {
            h.writable()?;
            check_name(name)?;
            h.check_type(values.nc_type())?;
            let existing = h.atts(varid)?.iter().position(|a| a.name == name);
            if !h.define_mode && !h.image.netcdf4 {
                // Classic files only allow in-place rewrites outside define mode.
                let fits = existing
                    .map(|i| h.atts(varid).map(|a| a[i].data.len() >= values.len()))
                    .transpose()?
                    .unwrap_or(false);
                if !fits {
                    return Err(NC_ENOTINDEFINE);
                }
            }
            let entry = AttEntry {
                name: name.to_string(),
                data: Array::from_values(values),
            };
            let atts = h.atts_mut(varid)?;
            match existing {
                Some(i) => atts[i] = entry,
                None => atts.push(entry),
            }
            Ok(())
        })
    }

    fn get_att(&self, ncid: i32, varid: i32, name: &str, mut out: ValuesMut<'_>) -> StorageResult<()> {
        self.with(ncid, |h| {
            let att = h.att(varid, name)?;
            if out.len() < att.data.len() {
                return Err(NC_EINVAL);
            }
            for i in 0..att.data.len() {
                store(&mut out, i, att.data.get(i)?)?;
            }
            Ok(())
        })
    }

    fn get_var(
        &self,
        ncid: i32,
        varid: i32,
        selection: Selection<'_>,
        mut out: ValuesMut<'_>,
    ) -> StorageResult<()> {
        self.with(ncid, |h| {
            h.to_data_mode()?;
            let var = h.var(varid)?;
            let offsets = positions(&h.shape(var)?, selection)?;
            if out.len() < offsets.len() {
                return Err(NC_EINVAL);
            }
            for (i, &flat) in offsets.iter().enumerate() {
                store(&mut out, i, var.data.get(flat as usize)?)?;
            }
            Ok(())
        })?;
        self.count(|s| s.reads += 1);
        Ok(())
    }

    fn put_var(
        &self,
        ncid: i32,
        varid: i32,
        selection: Selection<'_>,
        values: Values<'_>,
    ) -> StorageResult<()> {
        self.with(ncid, |h| {
            h.writable()?;
            h.to_data_mode()?;
            let var = h.var(varid)?;
            let shape = h.shape(var)?;
            let target = h.record_extent(var, &shape, selection)?;
            let dimids = var.dimids.clone();
            let offsets = positions(&target, selection)?;
            if values.len() < offsets.len() {
                return Err(NC_EINVAL);
            }
            h.grow(&dimids, &target)?;
            let var = h.var_mut(varid)?;
            for (i, &flat) in offsets.iter().enumerate() {
                var.data.set(flat as usize, load(&values, i))?;
            }
            Ok(())
        })?;
        self.count(|s| s.writes += 1);
        Ok(())
    }
}
