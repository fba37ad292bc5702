//! FFI calls into libnetcdf through `netcdf-sys`.
//!
//! Each method is a single call-through plus the marshalling it needs:
//! names become scoped `CString`s, name queries use a buffer of
//! `NC_MAX_NAME + 1` bytes, and any non-zero status becomes a
//! [`StorageError`] carrying `nc_strerror`'s text.
//!
//! libnetcdf reads start/count/stride/index arrays of the variable's rank
//! and writes as many elements as the selection covers, so data calls check
//! both against the variable before crossing the boundary. libnetcdf is not
//! thread-safe; all calls are serialized on one process-wide lock.
//!
//! Memory images cross the boundary as `malloc` blocks, since the library
//! may reallocate or free what it is given: images are copied into a fresh
//! block on open and copied out (then freed) on `close_memio`.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::{Mutex, PoisonError};

use netcdf_sys as ffi;

use super::{Selection, Storage, StorageResult};
use crate::consts::status::{
    strerror, NC_EBADNAME, NC_EINVAL, NC_EINVALCOORDS, NC_ENOMEM, NC_NOERR,
};
use crate::consts::{FileMode, MemioFlags, NcType, NC_MAX_NAME};
use crate::element::{Values, ValuesMut};
use crate::error::StorageError;
use crate::index::product;

static LIBNETCDF: Mutex<()> = Mutex::new(());

extern "C" {
    fn malloc(size: usize) -> *mut c_void;
    fn free(ptr: *mut c_void);
}

/// Storage backed by the system netCDF C library.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeStorage;

fn locked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = LIBNETCDF.lock().unwrap_or_else(PoisonError::into_inner);
    f()
}

/// Turn a library status into a result.
fn check(status: c_int) -> StorageResult<()> {
    if status == NC_NOERR {
        return Ok(());
    }
    // SAFETY: nc_strerror returns a pointer to a static NUL-terminated string.
    let message = unsafe { CStr::from_ptr(ffi::nc_strerror(status)) };
    Err(StorageError::new(status, message.to_string_lossy().into_owned()))
}

fn local(code: i32) -> StorageError {
    StorageError::new(code, strerror(code))
}

fn c_name(name: &str) -> StorageResult<CString> {
    CString::new(name).map_err(|_| local(NC_EBADNAME))
}

fn sizes(values: &[u64]) -> StorageResult<Vec<usize>> {
    values
        .iter()
        .map(|&v| usize::try_from(v).map_err(|_| local(NC_EINVALCOORDS)))
        .collect()
}

fn strides(values: &[i64]) -> StorageResult<Vec<isize>> {
    values
        .iter()
        .map(|&v| isize::try_from(v).map_err(|_| local(NC_EINVALCOORDS)))
        .collect()
}

/// Fetch a name into a buffer of the library's maximum name length.
fn read_name(fill: impl FnOnce(*mut c_char) -> c_int) -> StorageResult<String> {
    let mut buf = vec![0 as c_char; NC_MAX_NAME + 1];
    check(locked(|| fill(buf.as_mut_ptr())))?;
    // SAFETY: the library NUL-terminates names within NC_MAX_NAME + 1 bytes.
    let name = unsafe { CStr::from_ptr(buf.as_ptr()) };
    Ok(name.to_string_lossy().into_owned())
}

macro_rules! typed_get {
    ($out:expr; ($($arg:expr),*); $byte:ident, $text:ident, $short:ident, $int:ident,
     $float:ident, $double:ident, $ubyte:ident, $ushort:ident, $uint:ident,
     $int64:ident, $uint64:ident) => {
        match $out {
            ValuesMut::Byte(b) => ffi::$byte($($arg,)* b.as_mut_ptr()),
            ValuesMut::Char(b) => ffi::$text($($arg,)* b.as_mut_ptr().cast()),
            ValuesMut::Short(b) => ffi::$short($($arg,)* b.as_mut_ptr()),
            ValuesMut::Int(b) => ffi::$int($($arg,)* b.as_mut_ptr()),
            ValuesMut::Float(b) => ffi::$float($($arg,)* b.as_mut_ptr()),
            ValuesMut::Double(b) => ffi::$double($($arg,)* b.as_mut_ptr()),
            ValuesMut::UByte(b) => ffi::$ubyte($($arg,)* b.as_mut_ptr()),
            ValuesMut::UShort(b) => ffi::$ushort($($arg,)* b.as_mut_ptr()),
            ValuesMut::UInt(b) => ffi::$uint($($arg,)* b.as_mut_ptr()),
            ValuesMut::Int64(b) => ffi::$int64($($arg,)* b.as_mut_ptr()),
            ValuesMut::UInt64(b) => ffi::$uint64($($arg,)* b.as_mut_ptr()),
        }
    };
}

macro_rules! typed_put {
    ($values:expr; ($($arg:expr),*); $byte:ident, $text:ident, $short:ident, $int:ident,
     $float:ident, $double:ident, $ubyte:ident, $ushort:ident, $uint:ident,
     $int64:ident, $uint64:ident) => {
        match $values {
            Values::Byte(b) => ffi::$byte($($arg,)* b.as_ptr()),
            Values::Char(b) => ffi::$text($($arg,)* b.as_ptr().cast()),
            Values::Short(b) => ffi::$short($($arg,)* b.as_ptr()),
            Values::Int(b) => ffi::$int($($arg,)* b.as_ptr()),
            Values::Float(b) => ffi::$float($($arg,)* b.as_ptr()),
            Values::Double(b) => ffi::$double($($arg,)* b.as_ptr()),
            Values::UByte(b) => ffi::$ubyte($($arg,)* b.as_ptr()),
            Values::UShort(b) => ffi::$ushort($($arg,)* b.as_ptr()),
            Values::UInt(b) => ffi::$uint($($arg,)* b.as_ptr()),
            Values::Int64(b) => ffi::$int64($($arg,)* b.as_ptr()),
            Values::UInt64(b) => ffi::$uint64($($arg,)* b.as_ptr()),
        }
    };
}

impl NativeStorage {
    /// Check a selection against the variable's rank and return the number
    /// of elements it transfers.
    fn extent(&self, ncid: i32, varid: i32, selection: Selection<'_>) -> StorageResult<u64> {
        let rank = self.inq_varndims(ncid, varid)? as usize;
        let ranked = |parts: &[usize]| {
            if parts.iter().all(|&n| n == rank) {
                Ok(())
            } else {
                Err(local(NC_EINVALCOORDS))
            }
        };
        match selection {
            Selection::All => {
                let shape = self
                    .inq_vardimid(ncid, varid)?
                    .into_iter()
                    .map(|dimid| self.inq_dimlen(ncid, dimid))
                    .collect::<StorageResult<Vec<_>>>()?;
                Ok(product(&shape))
            }
            Selection::Slab { start, count } => {
                ranked(&[start.len(), count.len()])?;
                Ok(product(count))
            }
            Selection::Strided {
                start,
                count,
                stride,
            } => {
                ranked(&[start.len(), count.len(), stride.len()])?;
                Ok(product(count))
            }
            Selection::Point(index) => {
                ranked(&[index.len()])?;
                Ok(1)
            }
        }
    }

    fn guard(&self, ncid: i32, varid: i32, selection: Selection<'_>, available: usize) -> StorageResult<()> {
        if (available as u64) < self.extent(ncid, varid, selection)? {
            return Err(local(NC_EINVAL));
        }
        Ok(())
    }
}

impl Storage for NativeStorage {
    fn library_version(&self) -> String {
        // SAFETY: nc_inq_libvers returns a pointer to a static string.
        let version = locked(|| unsafe { CStr::from_ptr(ffi::nc_inq_libvers()) });
        version.to_string_lossy().into_owned()
    }

    fn create(&self, path: &str, mode: FileMode) -> StorageResult<i32> {
        let cpath = c_name(path)?;
        let mut ncid: c_int = 0;
        check(locked(|| unsafe { ffi::nc_create(cpath.as_ptr(), mode.bits(), &mut ncid) }))?;
        Ok(ncid)
    }

    fn open(&self, path: &str, mode: FileMode) -> StorageResult<i32> {
        let cpath = c_name(path)?;
        let mut ncid: c_int = 0;
        check(locked(|| unsafe { ffi::nc_open(cpath.as_ptr(), mode.bits(), &mut ncid) }))?;
        Ok(ncid)
    }

    fn close(&self, ncid: i32) -> StorageResult<()> {
        check(locked(|| unsafe { ffi::nc_close(ncid) }))
    }

    fn enddef(&self, ncid: i32) -> StorageResult<()> {
        check(locked(|| unsafe { ffi::nc_enddef(ncid) }))
    }

    fn redef(&self, ncid: i32) -> StorageResult<()> {
        check(locked(|| unsafe { ffi::nc_redef(ncid) }))
    }

    fn sync(&self, ncid: i32) -> StorageResult<()> {
        check(locked(|| unsafe { ffi::nc_sync(ncid) }))
    }

    fn create_mem(&self, path: &str, mode: FileMode, initial_size: usize) -> StorageResult<i32> {
        let cpath = c_name(path)?;
        let mut ncid: c_int = 0;
        check(locked(|| unsafe {
            ffi::nc_create_mem(cpath.as_ptr(), mode.bits(), initial_size, &mut ncid)
        }))?;
        Ok(ncid)
    }

    fn open_memio(&self, path: &str, mode: FileMode, flags: MemioFlags, image: &[u8]) -> StorageResult<i32> {
        let cpath = c_name(path)?;
        // SAFETY: a non-null block of at least image.len() bytes is written
        // from a slice of that length.
        let memory = unsafe { malloc(image.len().max(1)) };
        if memory.is_null() {
            return Err(local(NC_ENOMEM));
        }
        unsafe { ptr::copy_nonoverlapping(image.as_ptr(), memory.cast::<u8>(), image.len()) };

        let mut memio = ffi::NC_memio {
            size: image.len(),
            memory,
            flags: flags.bits(),
        };
        let mut ncid: c_int = 0;
        let status = locked(|| unsafe {
            ffi::nc_open_memio(cpath.as_ptr(), mode.bits(), &mut memio, &mut ncid)
        });
        if status != NC_NOERR {
            // SAFETY: a failed open leaves the block with the caller.
            unsafe { free(memio.memory) };
        }
        check(status)?;
        Ok(ncid)
    }

    fn close_memio(&self, ncid: i32) -> StorageResult<Vec<u8>> {
        let mut memio = ffi::NC_memio {
            size: 0,
            memory: ptr::null_mut(),
            flags: 0,
        };
        let status = locked(|| unsafe { ffi::nc_close_memio(ncid, &mut memio) });
        let image = if memio.memory.is_null() {
            Vec::new()
        } else {
            // SAFETY: the library returns a malloc block of `size` bytes that
            // the caller owns from here on.
            let bytes = unsafe { std::slice::from_raw_parts(memio.memory.cast::<u8>(), memio.size) }.to_vec();
            unsafe { free(memio.memory) };
            bytes
        };
        check(status)?;
        Ok(image)
    }

    fn def_dim(&self, ncid: i32, name: &str, len: u64) -> StorageResult<i32> {
        let cname = c_name(name)?;
        let len = usize::try_from(len).map_err(|_| local(NC_EINVAL))?;
        let mut dimid: c_int = 0;
        check(locked(|| unsafe {
            ffi::nc_def_dim(ncid, cname.as_ptr(), len, &mut dimid)
        }))?;
        Ok(dimid)
    }

    fn inq_dimid(&self, ncid: i32, name: &str) -> StorageResult<i32> {
        let cname = c_name(name)?;
        let mut dimid: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_dimid(ncid, cname.as_ptr(), &mut dimid) }))?;
        Ok(dimid)
    }

    fn inq_dimname(&self, ncid: i32, dimid: i32) -> StorageResult<String> {
        read_name(|buf| unsafe { ffi::nc_inq_dimname(ncid, dimid, buf) })
    }

    fn inq_dimlen(&self, ncid: i32, dimid: i32) -> StorageResult<u64> {
        let mut len: usize = 0;
        check(locked(|| unsafe { ffi::nc_inq_dimlen(ncid, dimid, &mut len) }))?;
        Ok(len as u64)
    }

    fn inq_ndims(&self, ncid: i32) -> StorageResult<i32> {
        let mut ndims: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_ndims(ncid, &mut ndims) }))?;
        Ok(ndims)
    }

    fn inq_unlimdims(&self, ncid: i32) -> StorageResult<Vec<i32>> {
        let mut n: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_unlimdims(ncid, &mut n, ptr::null_mut()) }))?;
        let mut dimids = vec![0 as c_int; n.max(0) as usize];
        check(locked(|| unsafe {
            ffi::nc_inq_unlimdims(ncid, &mut n, dimids.as_mut_ptr())
        }))?;
        dimids.truncate(n.max(0) as usize);
        Ok(dimids)
    }

    fn def_var(&self, ncid: i32, name: &str, xtype: NcType, dimids: &[i32]) -> StorageResult<i32> {
        let cname = c_name(name)?;
        let mut varid: c_int = 0;
        check(locked(|| unsafe {
            ffi::nc_def_var(
                ncid,
                cname.as_ptr(),
                xtype.code(),
                dimids.len() as c_int,
                dimids.as_ptr(),
                &mut varid,
            )
        }))?;
        Ok(varid)
    }

    fn inq_varid(&self, ncid: i32, name: &str) -> StorageResult<i32> {
        let cname = c_name(name)?;
        let mut varid: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_varid(ncid, cname.as_ptr(), &mut varid) }))?;
        Ok(varid)
    }

    fn inq_varname(&self, ncid: i32, varid: i32) -> StorageResult<String> {
        read_name(|buf| unsafe { ffi::nc_inq_varname(ncid, varid, buf) })
    }

    fn inq_vartype(&self, ncid: i32, varid: i32) -> StorageResult<i32> {
        let mut xtype: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_vartype(ncid, varid, &mut xtype) }))?;
        Ok(xtype)
    }

    fn inq_varndims(&self, ncid: i32, varid: i32) -> StorageResult<i32> {
        let mut ndims: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_varndims(ncid, varid, &mut ndims) }))?;
        Ok(ndims)
    }

    fn inq_vardimid(&self, ncid: i32, varid: i32) -> StorageResult<Vec<i32>> {
        let ndims = self.inq_varndims(ncid, varid)?;
        let mut dimids = vec![0 as c_int; ndims.max(0) as usize];
        check(locked(|| unsafe { ffi::nc_inq_vardimid(ncid, varid, dimids.as_mut_ptr()) }))?;
        Ok(dimids)
    }

    fn inq_nvars(&self, ncid: i32) -> StorageResult<i32> {
        let mut nvars: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_nvars(ncid, &mut nvars) }))?;
        Ok(nvars)
    }

    fn inq_varnatts(&self, ncid: i32, varid: i32) -> StorageResult<i32> {
        let mut natts: c_int = 0;
        check(locked(|| unsafe { ffi::nc_inq_varnatts(ncid, varid, &mut natts) }))?;
        Ok(natts)
    }

    fn def_var_deflate(
        &self,
        ncid: i32,
        varid: i32,
        shuffle: bool,
        deflate: bool,
        level: i32,
    ) -> StorageResult<()> {
        check(locked(|| unsafe {
            ffi::nc_def_var_deflate(ncid, varid, c_int::from(shuffle), c_int::from(deflate), level)
        }))
    }

    fn inq_var_deflate(&self, ncid: i32, varid: i32) -> StorageResult<(bool, bool, i32)> {
        let (mut shuffle, mut deflate, mut level): (c_int, c_int, c_int) = (0, 0, 0);
        check(locked(|| unsafe {
            ffi::nc_inq_var_deflate(ncid, varid, &mut shuffle, &mut deflate, &mut level)
        }))?;
        Ok((shuffle != 0, deflate != 0, level))
    }

    fn inq_atttype(&self, ncid: i32, varid: i32, name: &str) -> StorageResult<i32> {
        let cname = c_name(name)?;
        let mut xtype: c_int = 0;
        check(locked(|| unsafe {
            ffi::nc_inq_atttype(ncid, varid, cname.as_ptr(), &mut xtype)
        }))?;
        Ok(xtype)
    }

    fn inq_attlen(&self, ncid: i32, varid: i32, name: &str) -> StorageResult<u64> {
        let cname = c_name(name)?;
        let mut len: usize = 0;
        check(locked(|| unsafe { ffi::nc_inq_attlen(ncid, varid, cname.as_ptr(), &mut len) }))?;
        Ok(len as u64)
    }

    fn inq_attname(&self, ncid: i32, varid: i32, attnum: i32) -> StorageResult<String> {
        read_name(|buf| unsafe { ffi::nc_inq_attname(ncid, varid, attnum, buf) })
    }

    fn put_att(&self, ncid: i32, varid: i32, name: &str, values: Values<'_>) -> StorageResult<()> {
        let cname = c_name(name)?;
        let n = cname.as_ptr();
        let len = values.len();
        let xtype = values.nc_type().code();
        check(locked(|| unsafe {
            match values {
                Values::Char(b) => ffi::nc_put_att_text(ncid, varid, n, len, b.as_ptr().cast()),
                Values::Byte(b) => ffi::nc_put_att_schar(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::Short(b) => ffi::nc_put_att_short(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::Int(b) => ffi::nc_put_att_int(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::Float(b) => ffi::nc_put_att_float(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::Double(b) => ffi::nc_put_att_double(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::UByte(b) => ffi::nc_put_att_uchar(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::UShort(b) => ffi::nc_put_att_ushort(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::UInt(b) => ffi::nc_put_att_uint(ncid, varid, n, xtype, len, b.as_ptr()),
                Values::Int64(b) => {
                    ffi::nc_put_att_longlong(ncid, varid, n, xtype, len, b.as_ptr())
                }
                Values::UInt64(b) => {
                    ffi::nc_put_att_ulonglong(ncid, varid, n, xtype, len, b.as_ptr())
                }
            }
        }))
    }

    fn get_att(&self, ncid: i32, varid: i32, name: &str, out: ValuesMut<'_>) -> StorageResult<()> {
        if (out.len() as u64) < self.inq_attlen(ncid, varid, name)? {
            return Err(local(NC_EINVAL));
        }
        let cname = c_name(name)?;
        let n = cname.as_ptr();
        check(locked(|| unsafe {
            typed_get!(out; (ncid, varid, n);
                nc_get_att_schar, nc_get_att_text, nc_get_att_short, nc_get_att_int,
                nc_get_att_float, nc_get_att_double, nc_get_att_uchar, nc_get_att_ushort,
                nc_get_att_uint, nc_get_att_longlong, nc_get_att_ulonglong)
        }))
    }

    fn get_var(
        &self,
        ncid: i32,
        varid: i32,
        selection: Selection<'_>,
        out: ValuesMut<'_>,
    ) -> StorageResult<()> {
        self.guard(ncid, varid, selection, out.len())?;
        let status = match selection {
            Selection::All => locked(|| unsafe {
                typed_get!(out; (ncid, varid);
                    nc_get_var_schar, nc_get_var_text, nc_get_var_short, nc_get_var_int,
                    nc_get_var_float, nc_get_var_double, nc_get_var_uchar, nc_get_var_ushort,
                    nc_get_var_uint, nc_get_var_longlong, nc_get_var_ulonglong)
            }),
            Selection::Slab { start, count } => {
                let (start, count) = (sizes(start)?, sizes(count)?);
                let (s, c) = (start.as_ptr(), count.as_ptr());
                locked(|| unsafe {
                    typed_get!(out; (ncid, varid, s, c);
                        nc_get_vara_schar, nc_get_vara_text, nc_get_vara_short, nc_get_vara_int,
                        nc_get_vara_float, nc_get_vara_double, nc_get_vara_uchar,
                        nc_get_vara_ushort, nc_get_vara_uint, nc_get_vara_longlong,
                        nc_get_vara_ulonglong)
                })
            }
            Selection::Strided {
                start,
                count,
                stride,
            } => {
                let (start, count, stride) = (sizes(start)?, sizes(count)?, strides(stride)?);
                let (s, c, d) = (start.as_ptr(), count.as_ptr(), stride.as_ptr());
                locked(|| unsafe {
                    typed_get!(out; (ncid, varid, s, c, d);
                        nc_get_vars_schar, nc_get_vars_text, nc_get_vars_short, nc_get_vars_int,
                        nc_get_vars_float, nc_get_vars_double, nc_get_vars_uchar,
                        nc_get_vars_ushort, nc_get_vars_uint, nc_get_vars_longlong,
                        nc_get_vars_ulonglong)
                })
            }
            Selection::Point(index) => {
                let index = sizes(index)?;
                let i = index.as_ptr();
                locked(|| unsafe {
                    typed_get!(out; (ncid, varid, i);
                        nc_get_var1_schar, nc_get_var1_text, nc_get_var1_short, nc_get_var1_int,
                        nc_get_var1_float, nc_get_var1_double, nc_get_var1_uchar,
                        nc_get_var1_ushort, nc_get_var1_uint, nc_get_var1_longlong,
                        nc_get_var1_ulonglong)
                })
            }
        };
        check(status)
    }

    fn put_var(
        &self,
        ncid: i32,
        varid: i32,
        selection: Selection<'_>,
        values: Values<'_>,
    ) -> StorageResult<()> {
        self.guard(ncid, varid, selection, values.len())?;
        let status = match selection {
            Selection::All => locked(|| unsafe {
                typed_put!(values; (ncid, varid);
                    nc_put_var_schar, nc_put_var_text, nc_put_var_short, nc_put_var_int,
                    nc_put_var_float, nc_put_var_double, nc_put_var_uchar, nc_put_var_ushort,
                    nc_put_var_uint, nc_put_var_longlong, nc_put_var_ulonglong)
            }),
            Selection::Slab { start, count } => {
                let (start, count) = (sizes(start)?, sizes(count)?);
                let (s, c) = (start.as_ptr(), count.as_ptr());
                locked(|| unsafe {
                    typed_put!(values; (ncid, varid, s, c);
                        nc_put_vara_schar, nc_put_vara_text, nc_put_vara_short, nc_put_vara_int,
                        nc_put_vara_float, nc_put_vara_double, nc_put_vara_uchar,
                        nc_put_vara_ushort, nc_put_vara_uint, nc_put_vara_longlong,
                        nc_put_vara_ulonglong)
                })
            }
            Selection::Strided {
                start,
                count,
                stride,
            } => {
                let (start, count, stride) = (sizes(start)?, sizes(count)?, strides(stride)?);
                let (s, c, d) = (start.as_ptr(), count.as_ptr(), stride.as_ptr());
                locked(|| unsafe {
                    typed_put!(values; (ncid, varid, s, c, d);
                        nc_put_vars_schar, nc_put_vars_text, nc_put_vars_short, nc_put_vars_int,
                        nc_put_vars_float, nc_put_vars_double, nc_put_vars_uchar,
                        nc_put_vars_ushort, nc_put_vars_uint, nc_put_vars_longlong,
                        nc_put_vars_ulonglong)
                })
            }
            Selection::Point(index) => {
                let index = sizes(index)?;
                let i = index.as_ptr();
                locked(|| unsafe {
                    typed_put!(values; (ncid, varid, i);
                        nc_put_var1_schar, nc_put_var1_text, nc_put_var1_short, nc_put_var1_int,
                        nc_put_var1_float, nc_put_var1_double, nc_put_var1_uchar,
                        nc_put_var1_ushort, nc_put_var1_uint, nc_put_var1_longlong,
                        nc_put_var1_ulonglong)
                })
            }
        };
        check(status)
    }
}
