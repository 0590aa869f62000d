use serde::{Deserialize, Serialize};

use crate::array::Array;
use crate::error::ConversionError;

/// A dynamically typed host value.
///
/// Every argument crossing the binding boundary is one of these variants.
/// Conversions to native types check the class first and the shape second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Real double precision matrix.
    Numeric(Array<f64>),
    /// Logical matrix.
    Logical(Array<bool>),
    /// Character row vector.
    Char(String),
    /// Container of arbitrary values.
    Cell(Array<Value>),
}

impl Value {
    /// An empty `0x0` numeric value.
    pub fn empty() -> Self {
        Value::Numeric(Array::empty())
    }

    /// A `1xN` cell holding `items`.
    pub fn cell_row(items: Vec<Value>) -> Self {
        Value::Cell(Array::row(items))
    }

    /// A numeric matrix built from row-major rows.
    pub fn matrix<const N: usize>(rows: &[[f64; N]]) -> Self {
        Value::Numeric(Array::from_rows(rows))
    }

    /// Name of the value class as reported in error messages.
    pub fn class_name(&self) -> &'static str {
        match self {
            Value::Numeric(_) => "double",
            Value::Logical(_) => "logical",
            Value::Char(_) => "char",
            Value::Cell(_) => "cell",
        }
    }

    /// Whether the value is a numeric matrix.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Numeric(_))
    }

    /// Whether the value is a logical matrix.
    pub fn is_logical(&self) -> bool {
        matches!(self, Value::Logical(_))
    }

    /// Whether the value is a character vector.
    pub fn is_char(&self) -> bool {
        matches!(self, Value::Char(_))
    }

    /// Whether the value is a cell container.
    pub fn is_cell(&self) -> bool {
        matches!(self, Value::Cell(_))
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        match self {
            Value::Numeric(a) => a.rows(),
            Value::Logical(a) => a.rows(),
            Value::Char(s) => usize::from(!s.is_empty()),
            Value::Cell(a) => a.rows(),
        }
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        match self {
            Value::Numeric(a) => a.cols(),
            Value::Logical(a) => a.cols(),
            Value::Char(s) => s.chars().count(),
            Value::Cell(a) => a.cols(),
        }
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Whether the value has no elements.
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// Convert to a real matrix. Logical values become `0.0` / `1.0`.
    pub fn to_mat(&self) -> Result<Array<f64>, ConversionError> {
        match self {
            Value::Numeric(a) => Ok(a.clone()),
            Value::Logical(a) => Ok(a.map(|&b| if b { 1.0 } else { 0.0 })),
            other => Err(ConversionError::ClassMismatch {
                expected: "numeric",
                actual: other.class_name(),
            }),
        }
    }

    /// All elements as `f64` in column-major order.
    pub fn to_vec_f64(&self) -> Result<Vec<f64>, ConversionError> {
        Ok(self.to_mat()?.into_vec())
    }

    /// Convert a `3x3` numeric value to a row-major matrix.
    pub fn to_mat3(&self) -> Result<[[f64; 3]; 3], ConversionError> {
        let m = self.to_mat()?;
        if m.rows() != 3 || m.cols() != 3 {
            return Err(ConversionError::ShapeMismatch {
                expected: "a 3x3 matrix",
                rows: m.rows(),
                cols: m.cols(),
            });
        }
        let data = m.as_slice();
        Ok(std::array::from_fn(|r| {
            std::array::from_fn(|c| data[c * 3 + r])
        }))
    }

    /// Convert a value with exactly three elements to a 3-vector.
    pub fn to_vec3(&self) -> Result<[f64; 3], ConversionError> {
        let m = self.to_mat()?;
        match m.as_slice() {
            &[x, y, z] => Ok([x, y, z]),
            _ => Err(ConversionError::ShapeMismatch {
                expected: "a 3-element vector",
                rows: m.rows(),
                cols: m.cols(),
            }),
        }
    }

    /// Convert a logical or numeric scalar to a flag. Non-zero is `true`.
    pub fn to_bool(&self) -> Result<bool, ConversionError> {
        let (rows, cols, flag) = match self {
            Value::Logical(a) => (a.rows(), a.cols(), a.as_slice().first().copied()),
            Value::Numeric(a) => (a.rows(), a.cols(), a.as_slice().first().map(|&v| v != 0.0)),
            other => {
                return Err(ConversionError::ClassMismatch {
                    expected: "logical",
                    actual: other.class_name(),
                })
            }
        };
        match flag {
            Some(flag) if rows * cols == 1 => Ok(flag),
            _ => Err(ConversionError::ShapeMismatch {
                expected: "a scalar",
                rows,
                cols,
            }),
        }
    }

    /// Convert a character value to a string.
    pub fn to_string(&self) -> Result<String, ConversionError> {
        match self {
            Value::Char(s) => Ok(s.clone()),
            other => Err(ConversionError::ClassMismatch {
                expected: "char",
                actual: other.class_name(),
            }),
        }
    }

    /// Convert a 2-element numeric vector to a point.
    pub fn to_point2(&self) -> Result<[f64; 2], ConversionError> {
        let m = self.to_mat()?;
        match m.as_slice() {
            &[x, y] => Ok([x, y]),
            _ => Err(ConversionError::ShapeMismatch {
                expected: "a 2-element point",
                rows: m.rows(),
                cols: m.cols(),
            }),
        }
    }

    /// Convert a 3-element numeric vector to a point.
    pub fn to_point3(&self) -> Result<[f64; 3], ConversionError> {
        let m = self.to_mat()?;
        match m.as_slice() {
            &[x, y, z] => Ok([x, y, z]),
            _ => Err(ConversionError::ShapeMismatch {
                expected: "a 3-element point",
                rows: m.rows(),
                cols: m.cols(),
            }),
        }
    }

    /// The elements of a cell in column-major order.
    pub fn to_vec(&self) -> Result<Vec<Value>, ConversionError> {
        match self {
            Value::Cell(a) => Ok(a.as_slice().to_vec()),
            other => Err(ConversionError::ClassMismatch {
                expected: "cell",
                actual: other.class_name(),
            }),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Numeric(Array::row(vec![v]))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Logical(Array::row(vec![v]))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Char(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Char(v)
    }
}

impl From<Array<f64>> for Value {
    fn from(v: Array<f64>) -> Self {
        Value::Numeric(v)
    }
}

impl From<Array<bool>> for Value {
    fn from(v: Array<bool>) -> Self {
        Value::Logical(v)
    }
}

impl From<Array<Value>> for Value {
    fn from(v: Array<Value>) -> Self {
        Value::Cell(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::cell_row(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_predicates() {
        assert!(Value::from(1.0).is_numeric());
        assert!(Value::from(true).is_logical());
        assert!(Value::from("Rvec").is_char());
        assert!(Value::cell_row(vec![]).is_cell());
        assert!(!Value::from(true).is_numeric());
    }

    #[test]
    fn test_to_mat3_row_major() -> Result<(), ConversionError> {
        let k = Value::matrix(&[[800.0, 0.0, 320.0], [0.0, 810.0, 240.0], [0.0, 0.0, 1.0]]);
        let m = k.to_mat3()?;
        assert_eq!(m[0], [800.0, 0.0, 320.0]);
        assert_eq!(m[1], [0.0, 810.0, 240.0]);
        assert_eq!(m[2], [0.0, 0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_to_mat3_wrong_shape() {
        let k = Value::matrix(&[[1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(
            k.to_mat3(),
            Err(ConversionError::ShapeMismatch {
                expected: "a 3x3 matrix",
                rows: 2,
                cols: 2
            })
        );
    }

    #[test]
    fn test_to_bool() -> Result<(), ConversionError> {
        assert!(Value::from(true).to_bool()?);
        assert!(Value::from(2.0).to_bool()?);
        assert!(!Value::from(0.0).to_bool()?);
        assert!(Value::from("true").to_bool().is_err());
        assert!(Value::matrix(&[[1.0, 1.0]]).to_bool().is_err());
        assert!(Value::empty().to_bool().is_err());
        Ok(())
    }

    #[test]
    fn test_to_string_requires_char() {
        assert_eq!(Value::from("Tvec").to_string(), Ok("Tvec".to_string()));
        assert_eq!(
            Value::from(3.0).to_string(),
            Err(ConversionError::ClassMismatch {
                expected: "char",
                actual: "double"
            })
        );
    }

    #[test]
    fn test_points_accept_rows_and_columns() -> Result<(), ConversionError> {
        assert_eq!(Value::matrix(&[[1.0, 2.0]]).to_point2()?, [1.0, 2.0]);
        assert_eq!(Value::matrix(&[[1.0], [2.0], [3.0]]).to_point3()?, [1.0, 2.0, 3.0]);
        assert!(Value::matrix(&[[1.0, 2.0, 3.0]]).to_point2().is_err());
        assert!(Value::from("xy").to_point2().is_err());
        Ok(())
    }

    #[test]
    fn test_cell_elements_column_major() -> Result<(), ConversionError> {
        let cell = Array::new(
            2,
            2,
            vec![
                Value::from(1.0),
                Value::from(2.0),
                Value::from(3.0),
                Value::from(4.0),
            ],
        )?;
        let items = Value::from(cell).to_vec()?;
        assert_eq!(items.len(), 4);
        assert_eq!(items[1], Value::from(2.0));
        assert!(Value::from(1.0).to_vec().is_err());
        Ok(())
    }

    #[test]
    fn test_char_shape() {
        let v = Value::from("UseExtrinsicGuess");
        assert_eq!((v.rows(), v.cols()), (1, 17));
        assert!(Value::from("").is_empty());
    }

    #[test]
    fn test_json_roundtrip_and_validation() {
        let v = Value::cell_row(vec![Value::matrix(&[[1.0, 2.0]]), Value::from("Rvec")]);
        let json = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let bad = r#"{"numeric": {"rows": 2, "cols": 2, "data": [1.0]}}"#;
        assert!(serde_json::from_str::<Value>(bad).is_err());
    }
}
