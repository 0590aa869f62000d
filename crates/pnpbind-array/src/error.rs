use thiserror::Error;

/// An error type for host value conversions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The value has a different class than the one requested.
    #[error("Expected a {expected} value, got {actual}")]
    ClassMismatch {
        /// Class required by the conversion.
        expected: &'static str,
        /// Class of the value that was supplied.
        actual: &'static str,
    },

    /// The value has the right class but the wrong shape.
    #[error("Expected {expected}, got a {rows}x{cols} array")]
    ShapeMismatch {
        /// Human readable description of the accepted shape.
        expected: &'static str,
        /// Number of rows of the supplied value.
        rows: usize,
        /// Number of columns of the supplied value.
        cols: usize,
    },

    /// The number of elements does not match the declared shape.
    #[error("Array data length {len} does not match shape {rows}x{cols}")]
    InvalidShape {
        /// Declared number of rows.
        rows: usize,
        /// Declared number of columns.
        cols: usize,
        /// Number of elements supplied.
        len: usize,
    },
}
