use ndarray::{Array2, Axis, Zip};
use rayon::prelude::*;

use super::{Matrix, Vector};
use crate::error::{MatrixError, MatrixResult};
use crate::utils::{Direction, FloatOps};

impl<F: FloatOps> Matrix<F> {
    pub fn frobenius_norm(&self) -> F {
        self.data.iter().map(|&v| v * v).sum::<F>().sqrt()
    }

    /// Maximum absolute column sum.
    pub fn one_norm(&self) -> F {
        self.data
            .columns()
            .into_iter()
            .map(|col| col.iter().map(|v| v.abs()).sum::<F>())
            .fold(F::zero(), F::max)
    }

    pub fn scalar_divide(&self, scalar: F) -> Self {
        Matrix {
            data: &self.data / scalar,
        }
    }

    pub fn mapv(&self, f: impl Fn(F) -> F) -> Self {
        Matrix {
            data: self.data.mapv(f),
        }
    }

    /// Column `j` copied out as a [`Vector`].
    pub fn column_vector(&self, j: usize) -> MatrixResult<Vector<F>> {
        Ok(Vector::from_array(self.column(j)?.to_owned()))
    }

    pub fn is_symmetric(&self, tolerance: F) -> bool {
        self.is_square()
            && Zip::from(&self.data)
                .and(&self.data.t())
                .all(|&a, &b| (a - b).abs() <= tolerance)
    }

    /// Element-wise comparison with an absolute tolerance.
    pub fn approx_eq(&self, other: &Matrix<F>, tolerance: F) -> bool {
        self.shape() == other.shape()
            && Zip::from(&self.data)
                .and(&other.data)
                .all(|&a, &b| (a - b).abs() <= tolerance)
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    ///
    /// # Errors
    /// - [`MatrixError::NotSquare`] for rectangular input
    /// - [`MatrixError::Singular`] when a pivot vanishes
    pub fn inverse(&self) -> MatrixResult<Self> {
        if !self.is_square() {
            return Err(MatrixError::NotSquare {
                operation: "inverse",
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        let n = self.rows();
        let threshold = F::epsilon() * self.one_norm().max(F::one()) * F::lit(n as f64);
        let mut a = self.data.clone();
        let mut inv = Array2::<F>::eye(n);

        for col in 0..n {
            let mut pivot = col;
            for r in col + 1..n {
                if a[[r, col]].abs() > a[[pivot, col]].abs() {
                    pivot = r;
                }
            }
            if a[[pivot, col]].abs() <= threshold {
                return Err(MatrixError::Singular);
            }
            if pivot != col {
                for k in 0..n {
                    a.swap([pivot, k], [col, k]);
                    inv.swap([pivot, k], [col, k]);
                }
            }

            let p = a[[col, col]];
            for k in 0..n {
                a[[col, k]] /= p;
                inv[[col, k]] /= p;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a[[r, col]];
                if factor == F::zero() {
                    continue;
                }
                for k in 0..n {
                    let (ack, ick) = (a[[col, k]], inv[[col, k]]);
                    a[[r, k]] -= factor * ack;
                    inv[[r, k]] -= factor * ick;
                }
            }
        }

        Ok(Matrix { data: inv })
    }

    /// Arithmetic mean along `direction`.
    pub fn means(&self, direction: Direction) -> Vector<F> {
        let axis = match direction {
            Direction::Row => Axis(1),
            Direction::Column => Axis(0),
        };
        let count = F::lit(self.data.len_of(axis) as f64);
        Vector::from_array(self.data.sum_axis(axis) / count)
    }

    /// Sample standard deviation (`n - 1` denominator) along `direction`.
    /// A single observation yields zero.
    pub fn std_devs(&self, direction: Direction) -> Vector<F> {
        let axis = match direction {
            Direction::Row => Axis(1),
            Direction::Column => Axis(0),
        };
        let ddof = if self.data.len_of(axis) > 1 {
            F::one()
        } else {
            F::zero()
        };
        Vector::from_array(self.data.std_axis(axis, ddof))
    }

    pub fn column_means(&self) -> Vector<F> {
        self.means(Direction::Column)
    }

    pub fn column_std_devs(&self) -> Vector<F> {
        self.std_devs(Direction::Column)
    }

    /// Returns `(self - center) / scale` column by column.
    ///
    /// # Errors
    /// [`MatrixError::DimensionMismatch`] when `center` or `scale` do not have
    /// one entry per column.
    pub fn standardize(&self, center: &Vector<F>, scale: &Vector<F>) -> MatrixResult<Self> {
        let n = self.cols();
        if center.len() != n || scale.len() != n {
            return Err(MatrixError::mismatch(
                "standardize",
                self.shape(),
                (center.len(), scale.len()),
            ));
        }
        let mut data = self.data.clone();
        let (mu, sigma) = (center.as_array(), scale.as_array());
        data.axis_iter_mut(Axis(0))
            .into_par_iter()
            .for_each(|mut row| {
                row -= mu;
                row /= sigma;
            });
        Ok(Matrix { data })
    }
}
