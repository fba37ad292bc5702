//! Element types that can cross the storage boundary.
//!
//! [`Values`] and [`ValuesMut`] are the typed buffers handed to a
//! [`Storage`](crate::storage::Storage) backend. [`NcElement`] ties each Rust
//! scalar to its netCDF type tag so the accessors can be written once,
//! generically, instead of once per type.

use std::fmt;

use crate::consts::NcType;

/// Borrowed typed data going to storage.
#[derive(Debug, Clone, Copy)]
pub enum Values<'a> {
    Byte(&'a [i8]),
    Char(&'a [u8]),
    Short(&'a [i16]),
    Int(&'a [i32]),
    Float(&'a [f32]),
    Double(&'a [f64]),
    UByte(&'a [u8]),
    UShort(&'a [u16]),
    UInt(&'a [u32]),
    Int64(&'a [i64]),
    UInt64(&'a [u64]),
}

/// Borrowed typed buffer filled by storage.
#[derive(Debug)]
pub enum ValuesMut<'a> {
    Byte(&'a mut [i8]),
    Char(&'a mut [u8]),
    Short(&'a mut [i16]),
    Int(&'a mut [i32]),
    Float(&'a mut [f32]),
    Double(&'a mut [f64]),
    UByte(&'a mut [u8]),
    UShort(&'a mut [u16]),
    UInt(&'a mut [u32]),
    Int64(&'a mut [i64]),
    UInt64(&'a mut [u64]),
}

macro_rules! each_variant {
    ($value:expr, $buf:ident => $body:expr) => {
        match $value {
            Self::Byte($buf) => $body,
            Self::Char($buf) => $body,
            Self::Short($buf) => $body,
            Self::Int($buf) => $body,
            Self::Float($buf) => $body,
            Self::Double($buf) => $body,
            Self::UByte($buf) => $body,
            Self::UShort($buf) => $body,
            Self::UInt($buf) => $body,
            Self::Int64($buf) => $body,
            Self::UInt64($buf) => $body,
        }
    };
}

macro_rules! buffer_type {
    ($value:expr) => {
        match $value {
            Self::Byte(_) => NcType::Byte,
            Self::Char(_) => NcType::Char,
            Self::Short(_) => NcType::Short,
            Self::Int(_) => NcType::Int,
            Self::Float(_) => NcType::Float,
            Self::Double(_) => NcType::Double,
            Self::UByte(_) => NcType::UByte,
            Self::UShort(_) => NcType::UShort,
            Self::UInt(_) => NcType::UInt,
            Self::Int64(_) => NcType::Int64,
            Self::UInt64(_) => NcType::UInt64,
        }
    };
}

impl Values<'_> {
    /// Type tag of the elements.
    pub fn nc_type(&self) -> NcType {
        buffer_type!(self)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        each_variant!(self, buf => buf.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ValuesMut<'_> {
    /// Type tag of the elements.
    pub fn nc_type(&self) -> NcType {
        buffer_type!(self)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        each_variant!(self, buf => buf.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust scalar with a fixed netCDF external type.
///
/// Implemented for the numeric types only; `NC_CHAR` data uses the text
/// accessors since `u8` already stands for `NC_UBYTE`.
pub trait NcElement: sealed::Sealed + Copy + Default + PartialEq + fmt::Debug + 'static {
    /// The type tag a variable or attribute must declare to be accessed as `Self`.
    const NC_TYPE: NcType;

    /// Wrap a slice for a write.
    fn values(buf: &[Self]) -> Values<'_>;

    /// Wrap a slice for a read.
    fn values_mut(buf: &mut [Self]) -> ValuesMut<'_>;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {}

        impl NcElement for $ty {
            const NC_TYPE: NcType = NcType::$variant;

            fn values(buf: &[Self]) -> Values<'_> {
                Values::$variant(buf)
            }

            fn values_mut(buf: &mut [Self]) -> ValuesMut<'_> {
                ValuesMut::$variant(buf)
            }
        }
    };
}

impl_element!(i8, Byte);
impl_element!(i16, Short);
impl_element!(i32, Int);
impl_element!(i64, Int64);
impl_element!(u8, UByte);
impl_element!(u16, UShort);
impl_element!(u32, UInt);
impl_element!(u64, UInt64);
impl_element!(f32, Float);
impl_element!(f64, Double);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_tags() {
        assert_eq!(<i8 as NcElement>::NC_TYPE, NcType::Byte);
        assert_eq!(<u8 as NcElement>::NC_TYPE, NcType::UByte);
        assert_eq!(<f64 as NcElement>::NC_TYPE, NcType::Double);
        assert_eq!(<u64 as NcElement>::NC_TYPE, NcType::UInt64);
    }

    fn check_layout<T: NcElement>() {
        assert_eq!(T::NC_TYPE.size(), std::mem::size_of::<T>(), "{}", T::NC_TYPE);
        assert!(T::NC_TYPE.is_numeric());
    }

    #[test]
    fn test_element_sizes_match_types() {
        check_layout::<i8>();
        check_layout::<i16>();
        check_layout::<i32>();
        check_layout::<i64>();
        check_layout::<u8>();
        check_layout::<u16>();
        check_layout::<u32>();
        check_layout::<u64>();
        check_layout::<f32>();
        check_layout::<f64>();
        assert!(!NcType::Char.is_numeric());
    }

    #[test]
    fn test_buffer_type_and_len() {
        let data = [1i16, 2, 3];
        let values = i16::values(&data);
        assert_eq!(values.nc_type(), NcType::Short);
        assert_eq!(values.len(), 3);

        let mut text = [0u8; 4];
        let out = ValuesMut::Char(&mut text);
        assert_eq!(out.nc_type(), NcType::Char);
        assert!(!out.is_empty());
    }
}
