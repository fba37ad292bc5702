//! Type tags, file mode flags and status codes of the netCDF C ABI.
//!
//! The numeric values here are part of the library's stable ABI and are
//! passed through to it unchanged.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NetCdfError;

/// Variable id addressing the dataset itself (global attributes).
pub const NC_GLOBAL: i32 = -1;

/// Maximum length of a dimension, variable or attribute name.
pub const NC_MAX_NAME: usize = 256;

/// Dimension length that defines a record (unlimited) dimension.
pub const NC_UNLIMITED: u64 = 0;

/// External data type of a variable or attribute (`nc_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i32)]
pub enum NcType {
    /// Signed 1 byte integer
    Byte = 1,
    /// ISO/ASCII character
    Char = 2,
    /// Signed 2 byte integer
    Short = 3,
    /// Signed 4 byte integer
    Int = 4,
    /// Single precision floating point number
    Float = 5,
    /// Double precision floating point number
    Double = 6,
    /// Unsigned 1 byte integer
    UByte = 7,
    /// Unsigned 2 byte integer
    UShort = 8,
    /// Unsigned 4 byte integer
    UInt = 9,
    /// Signed 8 byte integer
    Int64 = 10,
    /// Unsigned 8 byte integer
    UInt64 = 11,
    /// Variable length string
    String = 12,
}

impl NcType {
    /// Deprecated `NC_LONG`, kept for backward compatibility; same tag as `NC_INT`.
    pub const LONG: NcType = NcType::Int;

    /// Every atomic type, in tag order.
    pub const ALL: [NcType; 12] = [
        NcType::Byte,
        NcType::Char,
        NcType::Short,
        NcType::Int,
        NcType::Float,
        NcType::Double,
        NcType::UByte,
        NcType::UShort,
        NcType::UInt,
        NcType::Int64,
        NcType::UInt64,
        NcType::String,
    ];

    /// The raw `nc_type` value.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Display name of the type tag, e.g. `"NC_DOUBLE"`.
    pub fn name(self) -> &'static str {
        match self {
            NcType::Byte => "NC_BYTE",
            NcType::Char => "NC_CHAR",
            NcType::Short => "NC_SHORT",
            NcType::Int => "NC_INT",
            NcType::Float => "NC_FLOAT",
            NcType::Double => "NC_DOUBLE",
            NcType::UByte => "NC_UBYTE",
            NcType::UShort => "NC_USHORT",
            NcType::UInt => "NC_UINT",
            NcType::Int64 => "NC_INT64",
            NcType::UInt64 => "NC_UINT64",
            NcType::String => "NC_STRING",
        }
    }

    /// Size in bytes of one element in memory.
    pub fn size(self) -> usize {
        match self {
            NcType::Byte | NcType::Char | NcType::UByte => 1,
            NcType::Short | NcType::UShort => 2,
            NcType::Int | NcType::UInt | NcType::Float => 4,
            NcType::Double | NcType::Int64 | NcType::UInt64 => 8,
            NcType::String => std::mem::size_of::<*const u8>(),
        }
    }

    /// True for the integer and floating point types.
    pub fn is_numeric(self) -> bool {
        !matches!(self, NcType::Char | NcType::String)
    }
}

impl fmt::Display for NcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<i32> for NcType {
    type Error = NetCdfError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        NcType::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or(NetCdfError::UnknownType(code))
    }
}

/// Open/create mode: a bitwise-or of the library's mode flags.
///
/// The value is opaque to this crate and handed to the library as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct FileMode(i32);

impl FileMode {
    /// Read-only access
    pub const NOWRITE: FileMode = FileMode(0x0000);
    /// Read-write access
    pub const WRITE: FileMode = FileMode(0x0001);
    /// Destroy an existing file on create
    pub const CLOBBER: FileMode = FileMode(0x0000);
    /// Fail create if the file exists
    pub const NOCLOBBER: FileMode = FileMode(0x0004);
    /// Keep the dataset in memory, no file I/O
    pub const DISKLESS: FileMode = FileMode(0x0008);
    /// Enforce the classic data model on a netCDF-4 file
    pub const CLASSIC_MODEL: FileMode = FileMode(0x0100);
    /// Large (64-bit) file offsets
    pub const OFFSET_64BIT: FileMode = FileMode(0x0200);
    /// Share updates, limit caching
    pub const SHARE: FileMode = FileMode(0x0800);
    /// netCDF-4/HDF5 format
    pub const NETCDF4: FileMode = FileMode(0x1000);

    const NAMED: [(&'static str, FileMode); 7] = [
        ("write", FileMode::WRITE),
        ("noclobber", FileMode::NOCLOBBER),
        ("diskless", FileMode::DISKLESS),
        ("classic_model", FileMode::CLASSIC_MODEL),
        ("64bit_offset", FileMode::OFFSET_64BIT),
        ("share", FileMode::SHARE),
        ("netcdf4", FileMode::NETCDF4),
    ];

    /// Wrap raw flag bits.
    pub const fn from_bits(bits: i32) -> Self {
        FileMode(bits)
    }

    /// The raw flag bits.
    pub const fn bits(self) -> i32 {
        self.0
    }

    /// True when every bit of `other` is set in `self`.
    pub const fn contains(self, other: FileMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FileMode {
    type Output = FileMode;

    fn bitor(self, rhs: FileMode) -> FileMode {
        FileMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for FileMode {
    fn bitor_assign(&mut self, rhs: FileMode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = Self::NAMED
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| name.to_string())
            .collect();
        let known = Self::NAMED.iter().fold(0, |acc, (_, flag)| acc | flag.0);
        let unknown = self.0 & !known;
        if unknown != 0 {
            names.push(format!("{:#x}", unknown));
        }
        if names.is_empty() {
            f.write_str("nowrite")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

impl FromStr for FileMode {
    type Err = NetCdfError;

    /// Parse a `|`-separated flag list such as `"write|netcdf4"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mode = FileMode::NOWRITE;
        for token in s.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            let lower = token.to_ascii_lowercase();
            let flag = match lower.as_str() {
                "nowrite" | "clobber" => FileMode::NOWRITE,
                "classic" => FileMode::CLASSIC_MODEL,
                "offset_64bit" => FileMode::OFFSET_64BIT,
                _ => match Self::NAMED.iter().find(|(name, _)| *name == lower) {
                    Some((_, flag)) => *flag,
                    None => match lower.strip_prefix("0x") {
                        Some(hex) => i32::from_str_radix(hex, 16)
                            .map(FileMode)
                            .map_err(|_| NetCdfError::InvalidMode(token.to_string()))?,
                        None => return Err(NetCdfError::InvalidMode(token.to_string())),
                    },
                },
            };
            mode |= flag;
        }
        Ok(mode)
    }
}

impl TryFrom<String> for FileMode {
    type Error = NetCdfError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<FileMode> for String {
    fn from(mode: FileMode) -> String {
        mode.to_string()
    }
}

/// Flags for opening a dataset from a memory image (`NC_memio.flags`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct MemioFlags(i32);

impl MemioFlags {
    /// The library takes over the image and may reallocate it.
    pub const NONE: MemioFlags = MemioFlags(0x00);
    /// The library never reallocates or frees the image (`NC_MEMIO_LOCKED`).
    pub const LOCKED: MemioFlags = MemioFlags(0x01);

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, other: MemioFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MemioFlags {
    type Output = MemioFlags;

    fn bitor(self, rhs: MemioFlags) -> MemioFlags {
        MemioFlags(self.0 | rhs.0)
    }
}

/// Status codes returned by the library and their `nc_strerror` texts.
pub mod status {
    pub const NC_NOERR: i32 = 0;
    /// System errno for a missing file.
    pub const ENOENT: i32 = 2;
    pub const NC_EBADID: i32 = -33;
    pub const NC_EEXIST: i32 = -35;
    pub const NC_EINVAL: i32 = -36;
    pub const NC_EPERM: i32 = -37;
    pub const NC_ENOTINDEFINE: i32 = -38;
    pub const NC_EINDEFINE: i32 = -39;
    pub const NC_EINVALCOORDS: i32 = -40;
    pub const NC_ENAMEINUSE: i32 = -42;
    pub const NC_ENOTATT: i32 = -43;
    pub const NC_EBADTYPE: i32 = -45;
    pub const NC_EBADDIM: i32 = -46;
    pub const NC_EUNLIMPOS: i32 = -47;
    pub const NC_ENOTVAR: i32 = -49;
    pub const NC_ENOTNC: i32 = -51;
    pub const NC_EUNLIMIT: i32 = -54;
    pub const NC_ECHAR: i32 = -56;
    pub const NC_EEDGE: i32 = -57;
    pub const NC_ESTRIDE: i32 = -58;
    pub const NC_EBADNAME: i32 = -59;
    pub const NC_ERANGE: i32 = -60;
    pub const NC_ENOMEM: i32 = -61;
    pub const NC_ENOTNC4: i32 = -111;

    /// Message for a status code, as the C library words it.
    pub fn strerror(code: i32) -> &'static str {
        match code {
            NC_NOERR => "No error",
            ENOENT => "No such file or directory",
            NC_EBADID => "NetCDF: Not a valid ID",
            NC_EEXIST => "NetCDF: File exists && NC_NOCLOBBER",
            NC_EINVAL => "NetCDF: Invalid argument",
            NC_EPERM => "NetCDF: Write to read only",
            NC_ENOTINDEFINE => "NetCDF: Operation not allowed in data mode",
            NC_EINDEFINE => "NetCDF: Operation not allowed in define mode",
            NC_EINVALCOORDS => "NetCDF: Index exceeds dimension bound",
            NC_ENAMEINUSE => "NetCDF: String match to name in use",
            NC_ENOTATT => "NetCDF: Attribute not found",
            NC_EBADTYPE => "NetCDF: Not a valid data type or _FillValue type mismatch",
            NC_EBADDIM => "NetCDF: Invalid dimension ID or name",
            NC_EUNLIMPOS => "NetCDF: NC_UNLIMITED in the wrong index",
            NC_ENOTVAR => "NetCDF: Variable not found",
            NC_ENOTNC => "NetCDF: Unknown file format",
            NC_EUNLIMIT => "NetCDF: NC_UNLIMITED size already in use",
            NC_ECHAR => "NetCDF: Attempt to convert between text & numbers",
            NC_EEDGE => "NetCDF: Start+count exceeds dimension bound",
            NC_ESTRIDE => "NetCDF: Illegal stride",
            NC_EBADNAME => "NetCDF: Name contains illegal characters",
            NC_ERANGE => "NetCDF: Numeric conversion not representable",
            NC_ENOMEM => "NetCDF: Memory allocation (malloc) failure",
            NC_ENOTNC4 => "NetCDF: Attempting netcdf-4 operation on netcdf-3 file",
            _ => "Unknown Error",
        }
    }
}
