use std::ops::Index;

use ndarray::Array1;

use crate::error::{MatrixError, MatrixResult};
use crate::utils::FloatOps;

/// Immutable sequence of reals: eigenvalue containers, column statistics and
/// power-iteration iterates.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector<F> {
    data: Array1<F>,
}

impl<F: FloatOps> Vector<F> {
    pub fn new(values: Vec<F>) -> Self {
        Vector {
            data: Array1::from(values),
        }
    }

    pub fn from_array(data: Array1<F>) -> Self {
        Vector { data }
    }

    pub fn zeros(len: usize) -> Self {
        Vector {
            data: Array1::zeros(len),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, i: usize) -> MatrixResult<F> {
        self.data.get(i).copied().ok_or(MatrixError::IndexOutOfRange {
            row: i,
            col: 0,
            rows: self.len(),
            cols: 1,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &F> {
        self.data.iter()
    }

    pub fn to_vec(&self) -> Vec<F> {
        self.data.to_vec()
    }

    pub fn as_array(&self) -> &Array1<F> {
        &self.data
    }

    pub fn into_array(self) -> Array1<F> {
        self.data
    }

    pub fn sum(&self) -> F {
        self.data.sum()
    }

    /// Euclidean length.
    pub fn norm(&self) -> F {
        self.data.dot(&self.data).sqrt()
    }

    pub fn dot(&self, other: &Vector<F>) -> MatrixResult<F> {
        if self.len() != other.len() {
            return Err(MatrixError::mismatch(
                "dot",
                (1, self.len()),
                (other.len(), 1),
            ));
        }
        Ok(self.data.dot(&other.data))
    }

    pub fn scalar_multiply(&self, scalar: F) -> Self {
        Vector {
            data: &self.data * scalar,
        }
    }

    pub fn scalar_divide(&self, scalar: F) -> Self {
        Vector {
            data: &self.data / scalar,
        }
    }

    /// Unit vector in the same direction, or `None` for the zero vector.
    pub fn normalize(&self) -> Option<Self> {
        let norm = self.norm();
        if norm > F::zero() && norm.is_finite() {
            Some(self.scalar_divide(norm))
        } else {
            None
        }
    }

    pub fn mapv(&self, f: impl Fn(F) -> F) -> Self {
        Vector {
            data: self.data.mapv(f),
        }
    }
}

impl<F> Index<usize> for Vector<F> {
    type Output = F;

    fn index(&self, index: usize) -> &F {
        &self.data[index]
    }
}

impl<F: FloatOps> From<Vec<F>> for Vector<F> {
    fn from(values: Vec<F>) -> Self {
        Vector::new(values)
    }
}
