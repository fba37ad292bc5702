//! Shared test utilities for the netcdf-access workspace.
//!
//! This crate provides common testing infrastructure including:
//! - The `gopher` dataset fixtures (shapes, element types, attribute set)
//! - Data pattern generators for every element type
//! - Scratch directories for tests that touch the filesystem
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{file_tests, pattern, Scratch};
//! ```

pub mod fixtures;
pub mod generators;
pub mod scratch;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use scratch::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

#[doc(hidden)]
pub use netcdf_access as __netcdf;

/// Run a block with `$t` bound to the Rust element type of an `NcType`.
///
/// `NC_CHAR` has no numeric element type and runs the `char` block instead.
///
/// # Usage
///
/// ```ignore
/// use test_utils::{for_element_type, pattern, text_pattern};
///
/// for_element_type!(data_type, T => var.write_values(&pattern::<T>(n))?,
///                   char => var.write_text(&text_pattern(n))?);
/// ```
#[macro_export]
macro_rules! for_element_type {
    ($nc_type:expr, $t:ident => $body:expr, char => $text:expr) => {{
        use $crate::__netcdf::NcType;
        match $nc_type {
            NcType::Byte => {
                type $t = i8;
                $body
            }
            NcType::Short => {
                type $t = i16;
                $body
            }
            NcType::Int => {
                type $t = i32;
                $body
            }
            NcType::Int64 => {
                type $t = i64;
                $body
            }
            NcType::UByte => {
                type $t = u8;
                $body
            }
            NcType::UShort => {
                type $t = u16;
                $body
            }
            NcType::UInt => {
                type $t = u32;
                $body
            }
            NcType::UInt64 => {
                type $t = u64;
                $body
            }
            NcType::Float => {
                type $t = f32;
                $body
            }
            NcType::Double => {
                type $t = f64;
                $body
            }
            NcType::Char => $text,
            other => panic!("no element type for {}", other),
        }
    }};
}

/// Assert that a result failed with the given storage status code.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_storage_code;
///
/// assert_storage_code!(ds.var("missing"), -49);
/// ```
#[macro_export]
macro_rules! assert_storage_code {
    ($result:expr, $code:expr) => {{
        match $result {
            Ok(_) => panic!("expected storage status {}, got Ok", $code),
            Err(err) => assert_eq!(
                err.storage_code(),
                Some($code),
                "expected storage status {}, got: {}",
                $code,
                err
            ),
        }
    }};
}
