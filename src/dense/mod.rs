//! # Dense Matrices
//!
//! [`Matrix<T>`] is an immutable, row-major `m x n` grid backed by an
//! [`ndarray::Array2`]. The shape is fixed at construction and every algebraic
//! operation returns a new matrix. Element arithmetic goes through the
//! [`Ring`] contract, so the same code serves real, complex and dynamically
//! typed elements.

use std::ops::Index;

use ndarray::{Array2, ArrayView1, Axis};

use crate::algebra::Ring;
use crate::error::{MatrixError, MatrixResult};

pub mod factory;
mod ops;
mod real;
pub mod vector;

pub use factory::MatrixFactory;
pub use vector::Vector;

#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Array2<T>,
}

impl<T: Ring> Matrix<T> {
    /// Builds a matrix from row data.
    ///
    /// # Errors
    /// - [`MatrixError::EmptyMatrix`] when there are no rows or no columns
    /// - [`MatrixError::RaggedRows`] when rows differ in length
    /// - [`MatrixError::TypeMismatch`] when elements of different kinds are mixed
    pub fn from_rows(rows: Vec<Vec<T>>) -> MatrixResult<Self> {
        let m = rows.len();
        let n = rows.first().map_or(0, Vec::len);
        if m == 0 || n == 0 {
            return Err(MatrixError::EmptyMatrix);
        }

        let mut values = Vec::with_capacity(m * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(MatrixError::RaggedRows {
                    row: i,
                    expected: n,
                    found: row.len(),
                });
            }
            values.extend(row);
        }

        let data = Array2::from_shape_vec((m, n), values)
            .map_err(|_| MatrixError::mismatch("from_rows", (m, n), (m, n)))?;
        Self::from_array(data)
    }

    /// Wraps an existing array, validating shape and element homogeneity.
    pub fn from_array(data: Array2<T>) -> MatrixResult<Self> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(MatrixError::EmptyMatrix);
        }
        let expected = data[[0, 0]].kind();
        if let Some(other) = data.iter().find(|value| value.kind() != expected) {
            return Err(MatrixError::TypeMismatch {
                expected,
                found: other.kind(),
            });
        }
        Ok(Matrix { data })
    }

    /// Kind of the stored elements; uniform across the matrix.
    pub fn element_kind(&self) -> &'static str {
        self.data[[0, 0]].kind()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    pub fn get(&self, i: usize, j: usize) -> MatrixResult<&T> {
        self.data.get((i, j)).ok_or_else(|| self.out_of_range(i, j))
    }

    pub fn row(&self, i: usize) -> MatrixResult<ArrayView1<'_, T>> {
        if i >= self.rows() {
            return Err(self.out_of_range(i, 0));
        }
        Ok(self.data.index_axis(Axis(0), i))
    }

    pub fn column(&self, j: usize) -> MatrixResult<ArrayView1<'_, T>> {
        if j >= self.cols() {
            return Err(self.out_of_range(0, j));
        }
        Ok(self.data.index_axis(Axis(1), j))
    }

    /// Copies the contents out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.data.outer_iter().map(|row| row.to_vec()).collect()
    }

    pub fn as_array(&self) -> &Array2<T> {
        &self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    pub(crate) fn out_of_range(&self, row: usize, col: usize) -> MatrixError {
        MatrixError::IndexOutOfRange {
            row,
            col,
            rows: self.rows(),
            cols: self.cols(),
        }
    }

    pub(crate) fn check_kind(&self, other: &Matrix<T>) -> MatrixResult<()> {
        let (expected, found) = (self.element_kind(), other.element_kind());
        if expected != found {
            return Err(MatrixError::TypeMismatch { expected, found });
        }
        Ok(())
    }

    /// Reassembles a row-major value buffer produced by an operation on `self`.
    pub(crate) fn with_values(shape: (usize, usize), values: Vec<T>) -> MatrixResult<Self> {
        Array2::from_shape_vec(shape, values)
            .map(|data| Matrix { data })
            .map_err(|_| MatrixError::mismatch("reshape", shape, shape))
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &T {
        &self.data[[index.0, index.1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Number, ObjectMatrix};

    #[test]
    fn test_construction_and_access() {
        let a = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(a.shape(), (2, 3));
        assert!(!a.is_square());
        assert_eq!(*a.get(1, 2).unwrap(), 6.0);
        assert_eq!(a.row(0).unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(a.column(1).unwrap().to_vec(), vec![2.0, 5.0]);
        assert_eq!(a[(1, 0)], 4.0);
        assert_eq!(a.to_rows(), vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_bounds_checks() {
        let a = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(
            a.get(2, 0).unwrap_err(),
            MatrixError::IndexOutOfRange {
                row: 2,
                col: 0,
                rows: 2,
                cols: 2
            }
        );
        assert!(a.get(0, 2).is_err());
        assert!(a.row(2).is_err());
        assert!(a.column(5).is_err());
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            Matrix::<f64>::from_rows(vec![]).unwrap_err(),
            MatrixError::EmptyMatrix
        );
        assert_eq!(
            Matrix::<f64>::from_rows(vec![vec![]]).unwrap_err(),
            MatrixError::EmptyMatrix
        );
        assert_eq!(
            Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err(),
            MatrixError::RaggedRows {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_object_matrix_rejects_mixed_kinds() {
        let err = ObjectMatrix::from_rows(vec![
            vec![Number::complex(1.0, 2.0), Number::Real(3.0)],
            vec![Number::complex(0.0, 1.0), Number::complex(1.0, 1.0)],
        ])
        .unwrap_err();
        assert_eq!(
            err,
            MatrixError::TypeMismatch {
                expected: "complex",
                found: "real"
            }
        );

        let ok = ObjectMatrix::from_rows(vec![vec![Number::Integer(1), Number::Integer(2)]]).unwrap();
        assert_eq!(ok.element_kind(), "integer");
    }
}
