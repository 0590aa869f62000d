#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Host array values
//!
//! A host numerical environment hands every argument over as a generic,
//! dynamically typed array. This crate models those values as [`Value`]
//! and provides the conversions a binding needs to turn them into native
//! numeric types (matrices, points, flags, strings) and back.
//!
//! ```rust
//! use pnpbind_array::{Array, Value};
//!
//! let k = Value::from(Array::from_rows(&[
//!     [800.0, 0.0, 320.0],
//!     [0.0, 800.0, 240.0],
//!     [0.0, 0.0, 1.0],
//! ]));
//! assert!(k.is_numeric());
//! assert_eq!(k.to_mat3()?[0][2], 320.0);
//! # Ok::<(), pnpbind_array::ConversionError>(())
//! ```

/// Dense two-dimensional column-major storage.
pub mod array;

/// Errors raised while converting host values.
pub mod error;

/// Tagged host value and its conversions.
pub mod value;

pub use array::Array;
pub use error::ConversionError;
pub use value::Value;
