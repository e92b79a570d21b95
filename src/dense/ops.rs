use ndarray::{concatenate, s, Array2, Axis};
use rayon::prelude::*;

use super::Matrix;
use crate::algebra::Ring;
use crate::error::{MatrixError, MatrixResult};

impl<T: Ring> Matrix<T> {
    fn zip_with(
        &self,
        other: &Matrix<T>,
        operation: &'static str,
        op: impl Fn(&T, &T) -> MatrixResult<T>,
    ) -> MatrixResult<Self> {
        if self.shape() != other.shape() {
            return Err(MatrixError::mismatch(operation, self.shape(), other.shape()));
        }
        self.check_kind(other)?;

        let values = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| op(a, b))
            .collect::<MatrixResult<Vec<T>>>()?;
        Self::with_values(self.shape(), values)
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Matrix<T>) -> MatrixResult<Self> {
        self.zip_with(other, "add", T::add)
    }

    /// Element-wise difference.
    pub fn subtract(&self, other: &Matrix<T>) -> MatrixResult<Self> {
        self.zip_with(other, "subtract", T::subtract)
    }

    /// Matrix product `self * other`. Rows of the result are computed in
    /// parallel.
    ///
    /// # Errors
    /// - [`MatrixError::DimensionMismatch`] when `self.cols() != other.rows()`
    /// - [`MatrixError::TypeMismatch`] when the element kinds differ
    pub fn multiply(&self, other: &Matrix<T>) -> MatrixResult<Self> {
        if self.cols() != other.rows() {
            return Err(MatrixError::mismatch("multiply", self.shape(), other.shape()));
        }
        self.check_kind(other)?;

        let (m, k) = self.shape();
        let n = other.cols();
        let rows = (0..m)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| -> MatrixResult<T> {
                        let mut acc = self.data[[i, 0]].multiply(&other.data[[0, j]])?;
                        for l in 1..k {
                            acc = acc.add(&self.data[[i, l]].multiply(&other.data[[l, j]])?)?;
                        }
                        Ok(acc)
                    })
                    .collect::<MatrixResult<Vec<T>>>()
            })
            .collect::<MatrixResult<Vec<Vec<T>>>>()?;

        Self::with_values((m, n), rows.into_iter().flatten().collect())
    }

    /// Product `self * v` for a vector of `self.cols()` elements. Rows are
    /// computed in parallel.
    ///
    /// # Errors
    /// - [`MatrixError::DimensionMismatch`] when `v.len() != self.cols()`
    /// - [`MatrixError::TypeMismatch`] when an element of `v` has another kind
    pub fn multiply_vector(&self, v: &[T]) -> MatrixResult<Vec<T>> {
        if v.len() != self.cols() {
            return Err(MatrixError::mismatch("multiply_vector", self.shape(), (v.len(), 1)));
        }
        let expected = self.element_kind();
        if let Some(other) = v.iter().find(|value| value.kind() != expected) {
            return Err(MatrixError::TypeMismatch {
                expected,
                found: other.kind(),
            });
        }

        self.data
            .outer_iter()
            .into_par_iter()
            .map(|row| -> MatrixResult<T> {
                let mut acc = row[0].multiply(&v[0])?;
                for (a, b) in row.iter().zip(v.iter()).skip(1) {
                    acc = acc.add(&a.multiply(b)?)?;
                }
                Ok(acc)
            })
            .collect()
    }

    /// Determinant by cofactor expansion along the first row. Only ring
    /// operations are used, so integer and complex elements stay exact; the
    /// cost grows factorially with the order.
    pub fn det(&self) -> MatrixResult<T> {
        self.require_square("det")?;
        cofactor_expansion(&self.data)
    }

    /// Multiplies every element by `scalar`, which must share the element kind.
    pub fn scalar_multiply(&self, scalar: &T) -> MatrixResult<Self> {
        let expected = self.element_kind();
        if scalar.kind() != expected {
            return Err(MatrixError::TypeMismatch {
                expected,
                found: scalar.kind(),
            });
        }
        let values = self
            .data
            .iter()
            .map(|value| value.multiply(scalar))
            .collect::<MatrixResult<Vec<T>>>()?;
        Self::with_values(self.shape(), values)
    }

    /// Applies `f` to every element. The result is revalidated for homogeneity.
    pub fn map<U: Ring>(&self, f: impl Fn(&T) -> U) -> MatrixResult<Matrix<U>> {
        Matrix::from_array(self.data.map(f))
    }

    pub fn transpose(&self) -> Self {
        Matrix {
            data: self.data.t().to_owned(),
        }
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> MatrixResult<T> {
        let diagonal = self.diagonal_elements_for("trace")?;
        let mut iter = diagonal.iter();
        let mut sum = match iter.next() {
            Some(first) => first.clone(),
            None => return Err(MatrixError::EmptyMatrix),
        };
        for value in iter {
            sum = sum.add(value)?;
        }
        Ok(sum)
    }

    fn require_square(&self, operation: &'static str) -> MatrixResult<usize> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare {
                operation,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self.rows())
    }

    fn diagonal_elements_for(&self, operation: &'static str) -> MatrixResult<Vec<T>> {
        self.require_square(operation)?;
        Ok(self.data.diag().to_vec())
    }

    /// Main diagonal of a square matrix.
    pub fn diagonal_elements(&self) -> MatrixResult<Vec<T>> {
        self.diagonal_elements_for("diagonal_elements")
    }

    /// Elements directly above the main diagonal.
    pub fn superdiagonal_elements(&self) -> MatrixResult<Vec<T>> {
        let m = self.require_square("superdiagonal_elements")?;
        Ok((0..m - 1).map(|i| self.data[[i, i + 1]].clone()).collect())
    }

    /// Elements directly below the main diagonal.
    pub fn subdiagonal_elements(&self) -> MatrixResult<Vec<T>> {
        let m = self.require_square("subdiagonal_elements")?;
        Ok((1..m).map(|i| self.data[[i, i - 1]].clone()).collect())
    }

    /// Extracts the block spanning rows `row_start..=row_end` and columns
    /// `col_start..=col_end`.
    pub fn submatrix(
        &self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> MatrixResult<Self> {
        if row_end >= self.rows() || col_end >= self.cols() {
            return Err(self.out_of_range(row_end, col_end));
        }
        if row_start > row_end || col_start > col_end {
            return Err(self.out_of_range(row_start, col_start));
        }
        Ok(Matrix {
            data: self
                .data
                .slice(s![row_start..=row_end, col_start..=col_end])
                .to_owned(),
        })
    }

    /// Appends the columns of `other` to the right of `self`.
    pub fn augment_right(&self, other: &Matrix<T>) -> MatrixResult<Self> {
        if self.rows() != other.rows() {
            return Err(MatrixError::mismatch("augment_right", self.shape(), other.shape()));
        }
        self.check_kind(other)?;
        concatenate(Axis(1), &[self.data.view(), other.data.view()])
            .map(|data| Matrix { data })
            .map_err(|_| MatrixError::mismatch("augment_right", self.shape(), other.shape()))
    }

    /// Appends the rows of `other` below `self`.
    pub fn augment_below(&self, other: &Matrix<T>) -> MatrixResult<Self> {
        if self.cols() != other.cols() {
            return Err(MatrixError::mismatch("augment_below", self.shape(), other.shape()));
        }
        self.check_kind(other)?;
        concatenate(Axis(0), &[self.data.view(), other.data.view()])
            .map(|data| Matrix { data })
            .map_err(|_| MatrixError::mismatch("augment_below", self.shape(), other.shape()))
    }
}

fn cofactor_expansion<T: Ring>(a: &Array2<T>) -> MatrixResult<T> {
    let n = a.nrows();
    match n {
        1 => return Ok(a[[0, 0]].clone()),
        2 => {
            let main = a[[0, 0]].multiply(&a[[1, 1]])?;
            return main.subtract(&a[[0, 1]].multiply(&a[[1, 0]])?);
        }
        _ => {}
    }

    let lower = a.slice(s![1.., ..]);
    let mut det: Option<T> = None;
    for j in 0..n {
        let keep: Vec<usize> = (0..n).filter(|&c| c != j).collect();
        let minor = lower.select(Axis(1), &keep);
        let term = a[[0, j]].multiply(&cofactor_expansion(&minor)?)?;
        det = Some(match det {
            None => term,
            Some(acc) if j % 2 == 0 => acc.add(&term)?,
            Some(acc) => acc.subtract(&term)?,
        });
    }
    det.ok_or(MatrixError::EmptyMatrix)
}
