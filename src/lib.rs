//! Dense matrices over a pluggable element algebra, with eigendecomposition by
//! power iteration and deflation, an SVD built from two eigendecompositions,
//! and the PCA and PLS routines that consume them.
//!
//! ```ignore
//! use single_decomp::Matrix;
//!
//! let a = Matrix::from_rows(vec![vec![2.0, 1.0], vec![1.0, 3.0]])?;
//! let eigen = a.eigen_decomposition()?;
//! assert!(eigen.reconstruct()?.approx_eq(&a, 1e-6));
//! ```

pub mod algebra;
pub mod dense;
pub mod eigen;
pub mod error;
pub mod pca;
pub mod pls;
pub mod svd;
mod utils;

pub use algebra::{Number, ObjectMatrix, Ring};
pub use dense::{Matrix, MatrixFactory, Vector};
pub use eigen::{DegenerateSpectrumWarning, Eigen, EigenConfig, EigenDecomposition};
pub use error::{MatrixError, MatrixResult};
pub use pca::{Pca, PcaBuilder, PcaMethod};
pub use pls::{Pls, PlsBuilder};
pub use svd::{Svd, SvdConfig, SvdDecomposition};
pub use utils::Direction;
pub use utils::FloatOps;
pub use utils::RandomVectorSource;
