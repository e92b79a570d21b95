//! # Eigendecomposition
//!
//! Eigenpairs of a square real matrix by power iteration with Hotelling
//! deflation. Each step extracts the dominant eigenpair of the current matrix
//! and subtracts `λ·v·vᵗ`; the last eigenvalue comes from the trace. Symmetric
//! input is additionally projected onto the complement of every found vector.
//! Each vector is then sharpened by shifted inverse iteration: on the projected
//! remainder for symmetric input, on `A` itself otherwise, since the deflated
//! matrix shares `A`'s eigenvalues but not its eigenvectors.
//!
//! The result is exact in the sense `sum(D) == trace(A)`. For symmetric input
//! the columns of `V` are orthonormal. Repeated eigenvalues are not rejected:
//! they are reported as [`DegenerateSpectrumWarning`]s on the result, since `V`
//! may be singular for a defective matrix.

use std::fmt;

use log::{debug, warn};
use ndarray::{Array1, Array2};

use crate::dense::{Matrix, MatrixFactory, Vector};
use crate::error::{MatrixError, MatrixResult};
use crate::utils::{FloatOps, RandomVectorSource};

mod config;
pub(crate) mod power;

pub use config::{EigenConfig, EigenConfigBuilder};

/// Two eigenvalues closer than [`EigenConfig::degeneracy_tolerance`].
#[derive(Debug, Clone, PartialEq)]
pub struct DegenerateSpectrumWarning {
    pub first: usize,
    pub second: usize,
    pub first_value: f64,
    pub second_value: f64,
}

impl fmt::Display for DegenerateSpectrumWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eigenvalues {} ({:e}) and {} ({:e}) coincide; eigenvectors may be unreliable",
            self.first, self.first_value, self.second, self.second_value
        )
    }
}

/// Eigenvectors `V` (as columns) paired positionally with eigenvalues `D`, in
/// extraction order: largest magnitude first, the trace-derived value last.
#[derive(Debug, Clone)]
pub struct EigenDecomposition<F> {
    v: Matrix<F>,
    d: Vector<F>,
    warnings: Vec<DegenerateSpectrumWarning>,
}

impl<F: FloatOps> EigenDecomposition<F> {
    pub fn v(&self) -> &Matrix<F> {
        &self.v
    }

    pub fn d(&self) -> &Vector<F> {
        &self.d
    }

    pub fn warnings(&self) -> &[DegenerateSpectrumWarning] {
        &self.warnings
    }

    pub fn is_degenerate(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_parts(self) -> (Matrix<F>, Vector<F>) {
        (self.v, self.d)
    }

    /// `V · diag(D) · Vᵗ`; equals the source matrix when it was symmetric.
    pub fn reconstruct(&self) -> MatrixResult<Matrix<F>> {
        self.v
            .multiply(&MatrixFactory::diagonal(&self.d)?)?
            .multiply(&self.v.transpose())
    }
}

/// Power-iteration eigen solver.
#[derive(Debug, Clone, Default)]
pub struct Eigen {
    config: EigenConfig,
}

impl Eigen {
    pub fn new(config: EigenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EigenConfig {
        &self.config
    }

    /// Decomposes `a` using the configured random source.
    pub fn decompose<F: FloatOps>(&self, a: &Matrix<F>) -> MatrixResult<EigenDecomposition<F>> {
        let mut rng = self.config.rng(0);
        self.decompose_with_source(a, &mut rng)
    }

    /// Decomposes `a`, seeding every power iteration from `source`.
    ///
    /// # Errors
    /// - [`MatrixError::NotDiagonalizable`] when `a` is not square or is nilpotent
    /// - [`MatrixError::ConvergenceFailure`] when an iteration exhausts its budget
    pub fn decompose_with_source<F, S>(
        &self,
        a: &Matrix<F>,
        source: &mut S,
    ) -> MatrixResult<EigenDecomposition<F>>
    where
        F: FloatOps,
        S: RandomVectorSource + ?Sized,
    {
        let config = &self.config;
        check_matrix(a, config)?;

        let m = a.rows();
        let scale = a.frobenius_norm();
        // A remainder this small is deflation error, not spectrum.
        let exhausted = (F::lit(config.zero_tolerance) * scale).max(
            F::lit(config.residual_tolerance) * scale.max(F::one()) * F::lit((m as f64).sqrt()),
        );
        let symmetric = a.is_symmetric(F::lit(config.zero_tolerance) * scale.max(F::one()));
        let trace = a.trace()?;

        let mut current = a.clone();
        let mut values: Vec<F> = Vec::with_capacity(m);
        let mut vectors: Vec<Array1<F>> = Vec::with_capacity(m);

        for step in 0..m - 1 {
            let (value, vector) = if current.frobenius_norm() <= exhausted {
                debug!("deflated matrix vanished at step {}, completing basis", step);
                (
                    F::zero(),
                    power::orthogonal_completion(&vectors, m, config, source)?,
                )
            } else {
                let pair = power::dominant_pair(&current, scale, config, source)?;
                let vector = if symmetric {
                    // The projected remainder keeps later vectors orthogonal to
                    // the ones already found.
                    let refined =
                        power::refine(&current, pair.value, pair.vector.clone(), scale, config)?;
                    power::orthonormalize(&vectors, refined, F::lit(config.zero_tolerance).sqrt())
                        .unwrap_or(pair.vector)
                } else {
                    // Deflation keeps A's eigenvalues but not its eigenvectors.
                    power::refine(a, pair.value, pair.vector, scale, config)?
                };
                (pair.value, vector)
            };
            debug!("eigenpair {}: {:e}", step, value);

            let column = MatrixFactory::column(&Vector::from_array(vector.clone()))?;
            let outer = column.multiply(&column.transpose())?;
            current = current.subtract(&outer.scalar_multiply(&value)?)?;
            if symmetric {
                // Restrict the remainder to the complement of v. The plain
                // rank-one update leaves an error with eigenvalues ±|λ|·‖δv‖.
                let complement = MatrixFactory::identity::<F>(m)?.subtract(&outer)?;
                current = complement.multiply(&current)?.multiply(&complement)?;
            }

            values.push(value);
            vectors.push(vector);
        }

        let last = trace - values.iter().copied().sum::<F>();
        // Eigenvectors of a symmetric matrix are orthogonal, so the last one is
        // fixed by the others.
        let last_vector = if symmetric || current.frobenius_norm() <= exhausted {
            power::orthogonal_completion(&vectors, m, config, source)?
        } else {
            let start = power::random_unit::<F, S>(m, config, source)?;
            power::refine(a, last, start, scale, config)?
        };
        values.push(last);
        vectors.push(last_vector);

        // Eigenvectors were collected as rows.
        let mut rows = Array2::zeros((m, m));
        for (i, vector) in vectors.iter().enumerate() {
            rows.row_mut(i).assign(vector);
        }
        let v = Matrix::from_array(rows)?.transpose();
        let d = Vector::new(values);

        let warnings = degenerate_pairs(&d, config);
        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(EigenDecomposition { v, d, warnings })
    }

    /// Dominant eigenvalue and unit eigenvector of `a`.
    pub fn power_iteration<F, S>(&self, a: &Matrix<F>, source: &mut S) -> MatrixResult<(F, Vector<F>)>
    where
        F: FloatOps,
        S: RandomVectorSource + ?Sized,
    {
        check_matrix(a, &self.config)?;
        let scale = a.frobenius_norm();
        let pair = power::dominant_pair(a, scale, &self.config, source)?;
        let vector = power::refine(a, pair.value, pair.vector, scale, &self.config)?;
        Ok((pair.value, Vector::from_array(vector)))
    }
}

/// Rejects non-square and nilpotent input before any iteration starts.
fn check_matrix<F: FloatOps>(a: &Matrix<F>, config: &EigenConfig) -> MatrixResult<()> {
    if !a.is_square() {
        return Err(MatrixError::NotDiagonalizable(format!(
            "matrix is {}x{}, not square",
            a.rows(),
            a.cols()
        )));
    }

    let norm = a.frobenius_norm();
    if !norm.is_finite() {
        return Err(MatrixError::NotDiagonalizable(
            "matrix has non-finite entries".to_string(),
        ));
    }
    if norm == F::zero() {
        return Err(MatrixError::NotDiagonalizable(
            "zero matrix is nilpotent".to_string(),
        ));
    }

    // A is nilpotent iff A^k = 0 for k >= m. Square a unit-norm power until the
    // exponent reaches m; a vanishing square means the next power is zero.
    let m = a.rows();
    let mut power = a.scalar_divide(norm);
    let mut exponent = 1;
    while exponent < m {
        let squared = power.multiply(&power)?;
        let squared_norm = squared.frobenius_norm();
        if squared_norm <= F::lit(config.zero_tolerance) {
            return Err(MatrixError::NotDiagonalizable(format!(
                "matrix is nilpotent (A^{} vanishes), no nonzero dominant eigenvalue",
                exponent * 2
            )));
        }
        power = squared.scalar_divide(squared_norm);
        exponent *= 2;
    }
    Ok(())
}

fn degenerate_pairs<F: FloatOps>(d: &Vector<F>, config: &EigenConfig) -> Vec<DegenerateSpectrumWarning> {
    let tolerance = F::lit(config.degeneracy_tolerance);
    let mut warnings = Vec::new();
    for i in 0..d.len() {
        for j in i + 1..d.len() {
            let (a, b) = (d[i], d[j]);
            let scale = F::one().max(a.abs()).max(b.abs());
            if (a - b).abs() <= tolerance * scale {
                warnings.push(DegenerateSpectrumWarning {
                    first: i,
                    second: j,
                    first_value: a.to_f64().unwrap_or(f64::NAN),
                    second_value: b.to_f64().unwrap_or(f64::NAN),
                });
            }
        }
    }
    warnings
}

impl<F: FloatOps> Matrix<F> {
    /// Eigendecomposition with the default [`EigenConfig`].
    pub fn eigen_decomposition(&self) -> MatrixResult<EigenDecomposition<F>> {
        Eigen::default().decompose(self)
    }

    pub fn eigenvalues(&self) -> MatrixResult<Vector<F>> {
        Ok(self.eigen_decomposition()?.d)
    }

    pub fn eigenvectors(&self) -> MatrixResult<Matrix<F>> {
        Ok(self.eigen_decomposition()?.v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn seeded() -> Eigen {
        Eigen::new(EigenConfig::builder().seed(42).build())
    }

    fn m(rows: Vec<Vec<f64>>) -> Matrix<f64> {
        Matrix::from_rows(rows).unwrap()
    }

    fn assert_orthonormal(v: &Matrix<f64>, epsilon: f64) {
        let gram = v.transpose().multiply(v).unwrap();
        let identity = MatrixFactory::identity(v.cols()).unwrap();
        assert!(
            gram.approx_eq(&identity, epsilon),
            "VᵗV is not the identity: {:?}",
            gram
        );
    }

    fn assert_eigenpairs(a: &Matrix<f64>, eigen: &EigenDecomposition<f64>, epsilon: f64) {
        let av = a.multiply(eigen.v()).unwrap();
        for j in 0..a.cols() {
            let v = eigen.v().column(j).unwrap();
            let lambda = eigen.d()[j];
            for i in 0..a.rows() {
                assert_abs_diff_eq!(av[(i, j)], lambda * v[i], epsilon = epsilon);
            }
        }
    }

    fn sorted(values: &Vector<f64>) -> Vec<f64> {
        let mut out = values.to_vec();
        out.sort_by(|a, b| a.partial_cmp(b).unwrap());
        out
    }

    #[test]
    fn test_known_symmetric_3x3() {
        init();
        let a = m(vec![
            vec![4.0, 1.0, -1.0],
            vec![1.0, 2.0, 1.0],
            vec![-1.0, 1.0, 2.0],
        ]);
        let eigen = seeded().decompose(&a).unwrap();

        assert_abs_diff_eq!(eigen.d().sum(), 8.0, epsilon = 1e-10);
        let values = sorted(eigen.d());
        assert_abs_diff_eq!(values[0], 0.5948, epsilon = 1e-3);
        assert_abs_diff_eq!(values[1], 2.5321, epsilon = 1e-3);
        assert_abs_diff_eq!(values[2], 4.8730, epsilon = 1e-3);

        assert!(eigen.reconstruct().unwrap().approx_eq(&a, 1e-6));
        assert_orthonormal(eigen.v(), 1e-6);
        assert!(!eigen.is_degenerate());
    }

    #[test]
    fn test_extraction_order_is_by_magnitude() {
        let a = m(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, -6.0, 0.0],
            vec![0.0, 0.0, 3.0],
        ]);
        let eigen = seeded().decompose(&a).unwrap();
        assert_abs_diff_eq!(eigen.d()[0], -6.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[1], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[2], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.v()[(1, 0)].abs(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_matches_nalgebra_on_random_symmetric() {
        let mut rng = StdRng::seed_from_u64(2024);
        let r: Matrix<f64> = MatrixFactory::random(5, 5, &mut rng).unwrap();
        let a = r.add(&r.transpose()).unwrap();

        let eigen = seeded().decompose(&a).unwrap();
        let reference = nalgebra::DMatrix::from_row_slice(5, 5, a.as_array().as_slice().unwrap())
            .symmetric_eigen();
        let mut expected: Vec<f64> = reference.eigenvalues.iter().copied().collect();
        expected.sort_by(|x, y| x.partial_cmp(y).unwrap());

        for (got, want) in sorted(eigen.d()).iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(eigen.d().sum(), a.trace().unwrap(), epsilon = 1e-10);
        assert!(eigen.reconstruct().unwrap().approx_eq(&a, 1e-6));
        assert_orthonormal(eigen.v(), 1e-6);
    }

    #[test]
    fn test_small_gap_symmetric_converges() {
        init();
        // Q·diag(1, 0.9999, 0.5)·Qᵗ with Q a rotation by 0.3 rad. The Rayleigh
        // quotient settles long before the residual reaches 1e-10.
        let (c, s) = (0.3_f64.cos(), 0.3_f64.sin());
        let q = m(vec![vec![c, -s, 0.0], vec![s, c, 0.0], vec![0.0, 0.0, 1.0]]);
        let lambda = MatrixFactory::diagonal(&Vector::new(vec![1.0, 0.9999, 0.5])).unwrap();
        let a = q.multiply(&lambda).unwrap().multiply(&q.transpose()).unwrap();

        let eigen = seeded().decompose(&a).unwrap();
        let values = sorted(eigen.d());
        assert_abs_diff_eq!(values[0], 0.5, epsilon = 1e-8);
        assert_abs_diff_eq!(values[1], 0.9999, epsilon = 1e-8);
        assert_abs_diff_eq!(values[2], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(eigen.d().sum(), a.trace().unwrap(), epsilon = 1e-12);
        assert!(eigen.reconstruct().unwrap().approx_eq(&a, 1e-8));
        assert_orthonormal(eigen.v(), 1e-10);
        assert!(!eigen.is_degenerate());
    }

    #[test]
    fn test_non_symmetric_eigenvectors() {
        init();
        let a = m(vec![vec![4.0, 1.0], vec![2.0, 3.0]]);
        let eigen = seeded().decompose(&a).unwrap();
        assert_abs_diff_eq!(eigen.d()[0], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[1], 2.0, epsilon = 1e-9);
        assert_eigenpairs(&a, &eigen, 1e-8);
        let v = eigen.v();
        assert_abs_diff_eq!(v[(1, 0)] / v[(0, 0)], 1.0, epsilon = 1e-8);
        assert_abs_diff_eq!(v[(1, 1)] / v[(0, 1)], -2.0, epsilon = 1e-8);

        let upper = m(vec![
            vec![2.0, 1.0, 0.0],
            vec![0.0, 3.0, 1.0],
            vec![0.0, 0.0, 5.0],
        ]);
        let eigen = seeded().decompose(&upper).unwrap();
        assert_abs_diff_eq!(eigen.d()[0], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[1], 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[2], 2.0, epsilon = 1e-9);
        assert_eigenpairs(&upper, &eigen, 1e-8);
        for j in 0..3 {
            let column = eigen.v().column(j).unwrap();
            assert_abs_diff_eq!(column.dot(&column), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rank_deficient_completes_basis() {
        // Rank one: eigenvalues 14, 0, 0.
        let u = [1.0, 2.0, 3.0];
        let a = m((0..3).map(|i| (0..3).map(|j| u[i] * u[j]).collect()).collect());
        let eigen = seeded().decompose(&a).unwrap();

        assert_abs_diff_eq!(eigen.d()[0], 14.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(eigen.d()[2], 0.0, epsilon = 1e-9);
        assert_orthonormal(eigen.v(), 1e-8);
        assert!(eigen.reconstruct().unwrap().approx_eq(&a, 1e-8));
        assert!(eigen.is_degenerate());
    }

    #[test]
    fn test_repeated_eigenvalue_is_flagged() {
        let a = MatrixFactory::identity::<f64>(2).unwrap();
        let eigen = seeded().decompose(&a).unwrap();
        assert_abs_diff_eq!(eigen.d()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(eigen.d()[1], 1.0, epsilon = 1e-12);
        assert_eq!(eigen.warnings().len(), 1);
        assert_eq!(eigen.warnings()[0].first, 0);
        assert_eq!(eigen.warnings()[0].second, 1);
    }

    #[test]
    fn test_non_square_is_rejected() {
        let a = m(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert!(matches!(
            a.eigen_decomposition(),
            Err(MatrixError::NotDiagonalizable(_))
        ));
    }

    #[test]
    fn test_nilpotent_is_rejected() {
        let a = m(vec![vec![0.0, 1.0], vec![0.0, 0.0]]);
        assert!(matches!(
            a.eigen_decomposition(),
            Err(MatrixError::NotDiagonalizable(_))
        ));

        let strictly_upper = m(vec![
            vec![0.0, 2.0, 5.0],
            vec![0.0, 0.0, 3.0],
            vec![0.0, 0.0, 0.0],
        ]);
        assert!(matches!(
            seeded().decompose(&strictly_upper),
            Err(MatrixError::NotDiagonalizable(_))
        ));
        assert!(matches!(
            m(vec![vec![0.0]]).eigenvalues(),
            Err(MatrixError::NotDiagonalizable(_))
        ));
    }

    #[test]
    fn test_one_by_one() {
        let eigen = seeded().decompose(&m(vec![vec![-3.5]])).unwrap();
        assert_eq!(eigen.d().to_vec(), vec![-3.5]);
        assert_abs_diff_eq!(eigen.v()[(0, 0)].abs(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_seeded_decomposition_is_reproducible() {
        let a = m(vec![vec![2.0, 1.0], vec![1.0, 3.0]]);
        let first = seeded().decompose(&a).unwrap();
        let second = seeded().decompose(&a).unwrap();
        assert_eq!(first.v(), second.v());
        assert_eq!(first.d(), second.d());
    }

    #[test]
    fn test_injected_source() {
        let a = m(vec![vec![2.0, 0.0], vec![0.0, 0.5]]);
        let mut rng = StdRng::seed_from_u64(5);
        let (value, vector) = Eigen::default().power_iteration(&a, &mut rng).unwrap();
        assert_abs_diff_eq!(value, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(vector[0].abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_convergence_failure_propagates() {
        let a = m(vec![vec![1.0, 1.0], vec![0.0, 1.0]]);
        let eigen = Eigen::new(EigenConfig::builder().seed(1).max_iterations(200).build());
        assert!(matches!(
            eigen.decompose(&a),
            Err(MatrixError::ConvergenceFailure { .. })
        ));
    }

    #[test]
    fn test_f32_decomposition() {
        let a = Matrix::from_rows(vec![vec![3.0_f32, 1.0], vec![1.0, 3.0]]).unwrap();
        let eigen = Eigen::new(
            EigenConfig::builder()
                .seed(3)
                .tolerance(1e-6)
                .residual_tolerance(1e-5)
                .build(),
        )
        .decompose(&a)
        .unwrap();
        assert_abs_diff_eq!(eigen.d()[0], 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(eigen.d()[1], 2.0, epsilon = 1e-4);
    }
}
