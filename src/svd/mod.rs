//! # Singular Value Decomposition
//!
//! `M = U · S · Vᵗ` assembled from two eigendecompositions: `U` holds the
//! eigenvectors of `M·Mᵗ` and `V` those of `Mᵗ·M`. The two calls share no
//! state and run on separate rayon tasks. `S = Uᵗ·M·V` is kept as a full
//! `m x n` matrix, so the reconstruction only depends on `U` and `V` being
//! orthogonal.
//!
//! Eigenvectors are only defined up to sign, which can leave negative entries
//! on the diagonal of `S`. Those columns of `U` and rows of `S` are flipped
//! before the result is returned.

use log::debug;
use ndarray::Array1;

use crate::dense::{Matrix, Vector};
use crate::eigen::{power, Eigen, EigenConfig, EigenDecomposition};
use crate::error::MatrixResult;
use crate::utils::{FloatOps, RandomVectorSource};

#[derive(Debug, Clone, PartialEq)]
pub struct SvdConfig {
    pub eigen: EigenConfig,
    /// Run the two Gram-matrix decompositions concurrently.
    pub parallel: bool,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            eigen: EigenConfig::default(),
            parallel: true,
        }
    }
}

impl SvdConfig {
    pub fn builder() -> SvdConfigBuilder {
        SvdConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct SvdConfigBuilder {
    config: SvdConfig,
}

impl SvdConfigBuilder {
    pub fn eigen(mut self, eigen: EigenConfig) -> Self {
        self.config.eigen = eigen;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn build(self) -> SvdConfig {
        self.config
    }
}

/// Orthogonal factors `U` (`m x m`), `V` (`n x n`) and the `m x n` matrix `S`.
#[derive(Debug, Clone)]
pub struct SvdDecomposition<F> {
    u: Matrix<F>,
    s: Matrix<F>,
    v: Matrix<F>,
}

impl<F: FloatOps> SvdDecomposition<F> {
    pub fn u(&self) -> &Matrix<F> {
        &self.u
    }

    pub fn s(&self) -> &Matrix<F> {
        &self.s
    }

    pub fn v(&self) -> &Matrix<F> {
        &self.v
    }

    pub fn vt(&self) -> Matrix<F> {
        self.v.transpose()
    }

    /// Diagonal of `S`, `min(m, n)` non-negative values in the order the
    /// eigen engine produced them.
    pub fn singular_values(&self) -> Vector<F> {
        let k = self.s.rows().min(self.s.cols());
        Vector::new((0..k).map(|i| self.s[(i, i)]).collect())
    }

    pub fn into_parts(self) -> (Matrix<F>, Matrix<F>, Matrix<F>) {
        (self.u, self.s, self.v)
    }

    pub fn reconstruct(&self) -> MatrixResult<Matrix<F>> {
        self.u.multiply(&self.s)?.multiply(&self.v.transpose())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Svd {
    config: SvdConfig,
}

impl Svd {
    pub fn new(config: SvdConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SvdConfig {
        &self.config
    }

    /// Decomposes `m`, drawing each eigen call's randomness from its own
    /// stream of the configured seed.
    ///
    /// # Errors
    /// Whatever the eigen engine reports for the Gram matrices, unchanged:
    /// [`crate::MatrixError::NotDiagonalizable`] for a zero matrix and
    /// [`crate::MatrixError::ConvergenceFailure`] when an iteration runs out.
    pub fn decompose<F: FloatOps>(&self, m: &Matrix<F>) -> MatrixResult<SvdDecomposition<F>> {
        let eigen = Eigen::new(self.config.eigen.clone());
        let (left, right) = gram_matrices(m)?;

        let (left, right) = if self.config.parallel {
            rayon::join(|| eigen.decompose(&left), || {
                let mut rng = eigen.config().rng(1);
                eigen.decompose_with_source(&right, &mut rng)
            })
        } else {
            let mut rng = eigen.config().rng(1);
            (
                eigen.decompose(&left),
                eigen.decompose_with_source(&right, &mut rng),
            )
        };

        let mut rng = self.config.eigen.rng(2);
        assemble(m, left?, right?, &self.config.eigen, &mut rng)
    }

    /// Sequential decomposition with every random draw taken from `source`.
    pub fn decompose_with_source<F, S>(
        &self,
        m: &Matrix<F>,
        source: &mut S,
    ) -> MatrixResult<SvdDecomposition<F>>
    where
        F: FloatOps,
        S: RandomVectorSource + ?Sized,
    {
        let eigen = Eigen::new(self.config.eigen.clone());
        let (left, right) = gram_matrices(m)?;
        let left = eigen.decompose_with_source(&left, source)?;
        let right = eigen.decompose_with_source(&right, source)?;
        assemble(m, left, right, &self.config.eigen, source)
    }
}

fn gram_matrices<F: FloatOps>(m: &Matrix<F>) -> MatrixResult<(Matrix<F>, Matrix<F>)> {
    let mt = m.transpose();
    Ok((m.multiply(&mt)?, mt.multiply(m)?))
}

fn assemble<F, S>(
    m: &Matrix<F>,
    left: EigenDecomposition<F>,
    right: EigenDecomposition<F>,
    config: &EigenConfig,
    source: &mut S,
) -> MatrixResult<SvdDecomposition<F>>
where
    F: FloatOps,
    S: RandomVectorSource + ?Sized,
{
    let v = right.v().clone();
    // Inside a repeated eigenvalue the two calls pick unrelated bases; derive
    // U from V so that S stays diagonal.
    let u = if left.is_degenerate() || right.is_degenerate() {
        debug!("degenerate Gram spectrum, deriving U from V");
        left_vectors_from_right(m, &v, config, source)?
    } else {
        left.v().clone()
    };

    let s = u.transpose().multiply(m)?.multiply(&v)?;

    let k = s.rows().min(s.cols());
    let mut u = u.into_array();
    let mut s = s.into_array();
    for i in 0..k {
        if s[[i, i]] < F::zero() {
            debug!("flipping sign of singular value {}", i);
            u.column_mut(i).mapv_inplace(|x| -x);
            s.row_mut(i).mapv_inplace(|x| -x);
        }
    }

    Ok(SvdDecomposition {
        u: Matrix::from_array(u)?,
        s: Matrix::from_array(s)?,
        v,
    })
}

/// `uᵢ = M·vᵢ / ‖M·vᵢ‖` for every non-negligible singular value, the rest of
/// `U` completed to an orthonormal basis.
fn left_vectors_from_right<F, S>(
    m: &Matrix<F>,
    v: &Matrix<F>,
    config: &EigenConfig,
    source: &mut S,
) -> MatrixResult<Matrix<F>>
where
    F: FloatOps,
    S: RandomVectorSource + ?Sized,
{
    let rows = m.rows();
    let floor = F::lit(config.zero_tolerance).sqrt() * m.frobenius_norm();
    let mv = m.as_array().dot(v.as_array());

    let mut basis: Vec<Array1<F>> = Vec::with_capacity(rows);
    for column in mv.columns().into_iter().take(rows) {
        let norm = column.dot(&column).sqrt();
        if norm > floor {
            basis.push(column.to_owned() / norm);
        } else {
            basis.push(power::orthogonal_completion(&basis, rows, config, source)?);
        }
    }
    while basis.len() < rows {
        basis.push(power::orthogonal_completion(&basis, rows, config, source)?);
    }

    let mut u = ndarray::Array2::zeros((rows, rows));
    for (j, column) in basis.iter().enumerate() {
        u.column_mut(j).assign(column);
    }
    Matrix::from_array(u)
}

impl<F: FloatOps> Matrix<F> {
    /// Singular value decomposition with the default [`SvdConfig`].
    pub fn svd(&self) -> MatrixResult<SvdDecomposition<F>> {
        Svd::default().decompose(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::MatrixFactory;
    use crate::error::MatrixError;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> Svd {
        Svd::new(
            SvdConfig::builder()
                .eigen(EigenConfig::builder().seed(42).build())
                .build(),
        )
    }

    fn m(rows: Vec<Vec<f64>>) -> Matrix<f64> {
        Matrix::from_rows(rows).unwrap()
    }

    fn assert_orthogonal(q: &Matrix<f64>, epsilon: f64) {
        let gram = q.transpose().multiply(q).unwrap();
        assert!(gram.approx_eq(&MatrixFactory::identity(q.cols()).unwrap(), epsilon));
    }

    fn sorted_desc(values: &Vector<f64>) -> Vec<f64> {
        let mut out = values.to_vec();
        out.sort_by(|a, b| b.partial_cmp(a).unwrap());
        out
    }

    #[test]
    fn test_tall_rectangular() {
        let a = m(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        let svd = seeded().decompose(&a).unwrap();

        assert_eq!(svd.u().shape(), (3, 3));
        assert_eq!(svd.v().shape(), (2, 2));
        assert_eq!(svd.s().shape(), (3, 2));
        assert_orthogonal(svd.u(), 1e-6);
        assert_orthogonal(svd.v(), 1e-6);

        let values = svd.singular_values();
        assert!(values.iter().all(|&x| x >= 0.0));
        let values = sorted_desc(&values);
        assert_abs_diff_eq!(values[0], 3.0_f64.sqrt(), epsilon = 1e-6);
        assert_abs_diff_eq!(values[1], 1.0, epsilon = 1e-6);

        assert!(svd.reconstruct().unwrap().approx_eq(&a, 1e-6));
    }

    #[test]
    fn test_square_2x2() {
        let a = m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let svd = seeded().decompose(&a).unwrap();
        let values = svd.singular_values();
        assert_abs_diff_eq!(values[0], 5.4649857, epsilon = 1e-6);
        assert_abs_diff_eq!(values[1], 0.3659662, epsilon = 1e-6);
        assert!(svd.reconstruct().unwrap().approx_eq(&a, 1e-6));
        assert_eq!(svd.vt(), svd.v().transpose());
    }

    #[test]
    fn test_wide_matches_nalgebra() {
        let mut rng = StdRng::seed_from_u64(11);
        let a: Matrix<f64> = MatrixFactory::random(3, 5, &mut rng).unwrap();
        let svd = seeded().decompose(&a).unwrap();

        let reference = nalgebra::DMatrix::from_row_slice(3, 5, a.as_array().as_slice().unwrap())
            .singular_values();
        let mut expected: Vec<f64> = reference.iter().copied().collect();
        expected.sort_by(|x, y| y.partial_cmp(x).unwrap());

        for (got, want) in sorted_desc(&svd.singular_values()).iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
        assert_orthogonal(svd.u(), 1e-6);
        assert_orthogonal(svd.v(), 1e-6);
        assert!(svd.reconstruct().unwrap().approx_eq(&a, 1e-6));
    }

    #[test]
    fn test_repeated_singular_values() {
        let a = m(vec![vec![2.0, 0.0], vec![0.0, 2.0], vec![0.0, 0.0]]);
        let svd = seeded().decompose(&a).unwrap();
        let values = svd.singular_values();
        assert_abs_diff_eq!(values[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(values[1], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(svd.s()[(0, 1)], 0.0, epsilon = 1e-9);
        assert_orthogonal(svd.u(), 1e-9);
        assert!(svd.reconstruct().unwrap().approx_eq(&a, 1e-9));
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let a = m(vec![vec![3.0, 1.0, 0.5], vec![1.0, -2.0, 4.0]]);
        let parallel = seeded().decompose(&a).unwrap();
        let sequential = Svd::new(SvdConfig {
            parallel: false,
            ..seeded().config().clone()
        })
        .decompose(&a)
        .unwrap();
        assert_eq!(parallel.u(), sequential.u());
        assert_eq!(parallel.s(), sequential.s());
        assert_eq!(parallel.v(), sequential.v());
    }

    #[test]
    fn test_injected_source() {
        let a = m(vec![vec![0.0, 2.0], vec![1.0, 0.0]]);
        let mut rng = StdRng::seed_from_u64(3);
        let svd = Svd::default().decompose_with_source(&a, &mut rng).unwrap();
        let values = sorted_desc(&svd.singular_values());
        assert_abs_diff_eq!(values[0], 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(values[1], 1.0, epsilon = 1e-9);
        assert!(svd.reconstruct().unwrap().approx_eq(&a, 1e-9));
    }

    #[test]
    fn test_zero_matrix_error_propagates() {
        let zero = MatrixFactory::zeros::<f64>(2, 3).unwrap();
        assert!(matches!(
            zero.svd(),
            Err(MatrixError::NotDiagonalizable(_))
        ));
    }
}
