//! Error types for netCDF access operations.

use thiserror::Error;

use crate::consts::NcType;

/// Result type for netCDF access operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// A non-zero status returned by the storage library.
///
/// The message is the library's own text for the code (`nc_strerror`), kept
/// verbatim so callers see exactly what the library reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (status {code})")]
pub struct StorageError {
    code: i32,
    message: String,
}

impl StorageError {
    /// Create an error from a status code and its message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The raw status code returned by the library.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The library's description of the status code.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error types for netCDF access.
#[derive(Error, Debug)]
pub enum NetCdfError {
    // === Storage library errors ===
    /// Non-zero status from the storage library, surfaced unchanged
    #[error("NetCDF storage error: {0}")]
    Storage(#[from] StorageError),

    // === Validation errors, raised before any transfer ===
    /// Declared element type differs from the type of the accessor used
    #[error("wrong data type {found}; expected {expected}")]
    TypeMismatch { found: NcType, expected: NcType },

    /// Caller buffer holds fewer elements than the transfer needs
    #[error("data length {len} is smaller than {required}")]
    BufferTooSmall { len: usize, required: u64 },

    /// Start/count/stride/coordinate length disagrees with the rank
    #[error("{what} has {len} entries but the target has {ndims} dimensions")]
    DimensionMismatch {
        what: &'static str,
        len: usize,
        ndims: usize,
    },

    /// Hyperslab addresses elements outside a dimension
    #[error(
        "hyperslab start={start} count={count} stride={stride} is out of range for dimension {dim} of length {len}"
    )]
    OutOfRange {
        dim: usize,
        start: u64,
        count: u64,
        stride: i64,
        len: u64,
    },

    // === Coordinate mapping errors ===
    /// A zero-length dimension makes unravelling undefined
    #[error("invalid shape, 0 encountered in shape {0:?}")]
    InvalidShape(Vec<u64>),

    /// Flat index beyond the addressable space of a shape
    #[error("index {index} > size {size} of shape {shape:?}")]
    IndexOutOfRange {
        index: u64,
        size: u64,
        shape: Vec<u64>,
    },

    // === Boundary errors ===
    /// Name cannot be passed to the library (interior NUL or not UTF-8)
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Type tag outside the set of atomic netCDF types
    #[error("unknown netCDF type code {0}")]
    UnknownType(i32),

    /// Unknown flag in a textual file mode
    #[error("invalid file mode flag: {0:?}")]
    InvalidMode(String),

    /// Dataset configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetCdfError {
    /// Storage status code, if this error came from the storage library.
    pub fn storage_code(&self) -> Option<i32> {
        match self {
            NetCdfError::Storage(err) => Some(err.code()),
            _ => None,
        }
    }

    /// True for errors raised by local validation, before any transfer.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NetCdfError::TypeMismatch { .. }
                | NetCdfError::BufferTooSmall { .. }
                | NetCdfError::DimensionMismatch { .. }
                | NetCdfError::OutOfRange { .. }
        )
    }
}

impl From<serde_yaml::Error> for NetCdfError {
    fn from(err: serde_yaml::Error) -> Self {
        NetCdfError::Config(format!("YAML error: {}", err))
    }
}
