use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// A two-dimensional array stored in column-major order.
///
/// This is the storage layout used by host numerical environments: element
/// `(r, c)` lives at index `c * rows + r` of the data buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArrayRepr<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Array<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

#[derive(Deserialize)]
struct ArrayRepr<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> TryFrom<ArrayRepr<T>> for Array<T> {
    type Error = ConversionError;

    fn try_from(repr: ArrayRepr<T>) -> Result<Self, Self::Error> {
        Array::new(repr.rows, repr.cols, repr.data)
    }
}

impl<T> Array<T> {
    /// Create an array from column-major data.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::InvalidShape`] if `data.len() != rows * cols`
    /// or the product overflows.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self, ConversionError> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(ConversionError::InvalidShape {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a `0x0` array.
    pub fn empty() -> Self {
        Self {
            rows: 0,
            cols: 0,
            data: Vec::new(),
        }
    }

    /// Create a `1xN` row array.
    pub fn row(data: Vec<T>) -> Self {
        Self {
            rows: 1,
            cols: data.len(),
            data,
        }
    }

    /// Create an `Nx1` column array.
    pub fn column(data: Vec<T>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the array is a row or column vector.
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.cols == 1
    }

    /// Element at `(row, col)`, if in bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(col * self.rows + row)
    }

    /// The column-major data buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the array and return its column-major data buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Apply `f` to every element, keeping the shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Array<U> {
        Array {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl<T: Copy> Array<T> {
    /// Build an array from row-major rows of fixed width.
    ///
    /// ```rust
    /// use pnpbind_array::Array;
    ///
    /// let a = Array::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    /// assert_eq!((a.rows(), a.cols()), (3, 2));
    /// assert_eq!(a.get(2, 1), Some(&6.0));
    /// ```
    pub fn from_rows<const N: usize>(rows: &[[T; N]]) -> Self {
        let mut data = Vec::with_capacity(rows.len() * N);
        for c in 0..N {
            data.extend(rows.iter().map(|row| row[c]));
        }
        Self {
            rows: rows.len(),
            cols: N,
            data,
        }
    }

    /// Read the array back as row-major rows of fixed width.
    ///
    /// Returns `None` if the number of columns is not `N`.
    pub fn to_rows<const N: usize>(&self) -> Option<Vec<[T; N]>> {
        if self.cols != N {
            return None;
        }
        let rows = (0..self.rows)
            .map(|r| std::array::from_fn(|c| self.data[c * self.rows + r]))
            .collect();
        Some(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_length() {
        let res = Array::new(2, 2, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            res,
            Err(ConversionError::InvalidShape {
                rows: 2,
                cols: 2,
                len: 3
            })
        );
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let res = Array::<f64>::new(usize::MAX / 2 + 1, 2, Vec::new());
        assert!(matches!(res, Err(ConversionError::InvalidShape { len: 0, .. })));

        let json = r#"{"rows": 9223372036854775808, "cols": 2, "data": []}"#;
        assert!(serde_json::from_str::<Array<f64>>(json).is_err());
    }

    #[test]
    fn test_column_major_layout() -> Result<(), ConversionError> {
        let a = Array::new(2, 3, vec![1, 2, 3, 4, 5, 6])?;
        assert_eq!(a.get(0, 0), Some(&1));
        assert_eq!(a.get(1, 0), Some(&2));
        assert_eq!(a.get(0, 2), Some(&5));
        assert_eq!(a.get(2, 0), None);
        Ok(())
    }

    #[test]
    fn test_from_rows_to_rows() {
        let rows = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let a = Array::from_rows(&rows);
        assert_eq!(a.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(a.to_rows::<3>(), Some(rows.to_vec()));
        assert_eq!(a.to_rows::<2>(), None);
    }

    #[test]
    fn test_vector_shapes() {
        assert!(Array::row(vec![1, 2, 3]).is_vector());
        assert!(Array::column(vec![1, 2, 3]).is_vector());
        assert!(!Array::from_rows(&[[1, 2], [3, 4]]).is_vector());
        assert!(Array::<f64>::empty().is_empty());
    }
}
