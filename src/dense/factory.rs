use ndarray::Array2;
use num_traits::{One, Zero};

use super::{Matrix, Vector};
use crate::algebra::Ring;
use crate::error::{MatrixError, MatrixResult};
use crate::utils::{FloatOps, RandomVectorSource};

/// Construction helpers for [`Matrix`].
pub struct MatrixFactory;

impl MatrixFactory {
    pub fn create<T: Ring>(rows: Vec<Vec<T>>) -> MatrixResult<Matrix<T>> {
        Matrix::from_rows(rows)
    }

    pub fn identity<T: Ring + Zero + One>(n: usize) -> MatrixResult<Matrix<T>> {
        Matrix::from_array(Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                T::one()
            } else {
                T::zero()
            }
        }))
    }

    pub fn zeros<T: Ring + Zero>(m: usize, n: usize) -> MatrixResult<Matrix<T>> {
        Matrix::from_array(Array2::from_shape_fn((m, n), |_| T::zero()))
    }

    pub fn ones<T: Ring + One>(m: usize, n: usize) -> MatrixResult<Matrix<T>> {
        Matrix::from_array(Array2::from_shape_fn((m, n), |_| T::one()))
    }

    /// `m x n` matrix of values drawn uniformly from `[-1, 1)`.
    pub fn random<F, S>(m: usize, n: usize, source: &mut S) -> MatrixResult<Matrix<F>>
    where
        F: FloatOps,
        S: RandomVectorSource + ?Sized,
    {
        let values = source.draw(m * n).into_iter().map(F::lit).collect();
        Matrix::from_array(
            Array2::from_shape_vec((m, n), values)
                .map_err(|_| MatrixError::mismatch("random", (m, n), (m, n)))?,
        )
    }

    /// Square matrix with `values` on the diagonal.
    pub fn diagonal<F: FloatOps>(values: &Vector<F>) -> MatrixResult<Matrix<F>> {
        let n = values.len();
        Matrix::from_array(Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                values[i]
            } else {
                F::zero()
            }
        }))
    }

    /// `n x 1` column matrix.
    pub fn column<F: FloatOps>(values: &Vector<F>) -> MatrixResult<Matrix<F>> {
        let n = values.len();
        Matrix::from_array(Array2::from_shape_fn((n, 1), |(i, _)| values[i]))
    }
}
