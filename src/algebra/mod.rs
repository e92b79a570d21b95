//! # Element Algebra
//!
//! The capability contract every matrix element must satisfy. A single
//! [`Matrix`](crate::Matrix) implementation runs over any [`Ring`] element:
//! primitive reals and integers, `num_complex::Complex`, or the dynamically
//! typed [`Number`] used by [`ObjectMatrix`].

use std::fmt::{self, Debug, Display};

use num_complex::Complex;
use num_traits::Num;

use crate::dense::Matrix;
use crate::error::{MatrixError, MatrixResult};

/// Arithmetic required of a matrix element.
///
/// Operations are fallible so that dynamically typed elements can reject
/// operands of a different concrete type with [`MatrixError::TypeMismatch`].
pub trait Ring: Clone + Debug + PartialEq + Send + Sync {
    /// Name of the concrete element type. Two elements may only be combined
    /// when their kinds agree.
    fn kind(&self) -> &'static str;

    fn add(&self, rhs: &Self) -> MatrixResult<Self>;

    fn subtract(&self, rhs: &Self) -> MatrixResult<Self>;

    fn multiply(&self, rhs: &Self) -> MatrixResult<Self>;
}

impl<T> Ring for T
where
    T: Num + Clone + Debug + PartialEq + Send + Sync + 'static,
{
    fn kind(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn add(&self, rhs: &Self) -> MatrixResult<Self> {
        Ok(self.clone() + rhs.clone())
    }

    fn subtract(&self, rhs: &Self) -> MatrixResult<Self> {
        Ok(self.clone() - rhs.clone())
    }

    fn multiply(&self, rhs: &Self) -> MatrixResult<Self> {
        Ok(self.clone() * rhs.clone())
    }
}

/// An algebraic object whose concrete type is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Integer(i64),
    Real(f64),
    Complex(Complex<f64>),
}

/// A matrix of dynamically typed algebraic objects. Construction rejects
/// mixed element types and arithmetic rejects operands of another type.
pub type ObjectMatrix = Matrix<Number>;

impl Number {
    pub fn complex(re: f64, im: f64) -> Self {
        Number::Complex(Complex::new(re, im))
    }

    fn combine(
        &self,
        rhs: &Self,
        op: &'static str,
        int: fn(i64, i64) -> Option<i64>,
        real: fn(f64, f64) -> f64,
        cplx: fn(Complex<f64>, Complex<f64>) -> Complex<f64>,
    ) -> MatrixResult<Self> {
        match (self, rhs) {
            (Number::Integer(a), Number::Integer(b)) => int(*a, *b)
                .map(Number::Integer)
                .ok_or(MatrixError::Overflow(op)),
            (Number::Real(a), Number::Real(b)) => Ok(Number::Real(real(*a, *b))),
            (Number::Complex(a), Number::Complex(b)) => Ok(Number::Complex(cplx(*a, *b))),
            _ => Err(MatrixError::TypeMismatch {
                expected: self.kind(),
                found: rhs.kind(),
            }),
        }
    }
}

impl Ring for Number {
    fn kind(&self) -> &'static str {
        match self {
            Number::Integer(_) => "integer",
            Number::Real(_) => "real",
            Number::Complex(_) => "complex",
        }
    }

    fn add(&self, rhs: &Self) -> MatrixResult<Self> {
        self.combine(rhs, "add", i64::checked_add, |a, b| a + b, |a, b| a + b)
    }

    fn subtract(&self, rhs: &Self) -> MatrixResult<Self> {
        self.combine(rhs, "subtract", i64::checked_sub, |a, b| a - b, |a, b| a - b)
    }

    fn multiply(&self, rhs: &Self) -> MatrixResult<Self> {
        self.combine(rhs, "multiply", i64::checked_mul, |a, b| a * b, |a, b| a * b)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Real(value)
    }
}

impl From<Complex<f64>> for Number {
    fn from(value: Complex<f64>) -> Self {
        Number::Complex(value)
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(v) => write!(f, "{}", v),
            Number::Real(v) => write!(f, "{}", v),
            Number::Complex(v) => write!(f, "{}", v),
        }
    }
}
