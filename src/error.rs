use thiserror::Error;

/// Failures raised by the matrix core and the decomposition engines.
///
/// Every variant is a local precondition or convergence failure. Nothing is
/// retried internally, and a failed call leaves no partial state behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("Dimension mismatch in {operation}: left is {left_rows}x{left_cols}, right is {right_rows}x{right_cols}")]
    DimensionMismatch {
        operation: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("Index out of range: ({row}, {col}) in a {rows}x{cols} matrix")]
    IndexOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("{operation} requires a square matrix, got {rows}x{cols}")]
    NotSquare {
        operation: &'static str,
        rows: usize,
        cols: usize,
    },

    #[error("Matrix is not diagonalizable: {0}")]
    NotDiagonalizable(String),

    #[error("Power iteration failed to converge after {iterations} iterations (last change {last_change:e})")]
    ConvergenceFailure { iterations: usize, last_change: f64 },

    #[error("Element type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Matrix must have at least one row and one column")]
    EmptyMatrix,

    #[error("Row {row} has {found} elements, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Matrix is singular")]
    Singular,

    #[error("Integer overflow in {0}")]
    Overflow(&'static str),
}

impl MatrixError {
    pub(crate) fn mismatch(
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    ) -> Self {
        MatrixError::DimensionMismatch {
            operation,
            left_rows: left.0,
            left_cols: left.1,
            right_rows: right.0,
            right_cols: right.1,
        }
    }
}

pub type MatrixResult<T> = Result<T, MatrixError>;
