//! Partial least squares regression (NIPALS) for one or several responses.

use anyhow::{anyhow, bail};
use log::{debug, trace};
use ndarray::{Array1, Array2, Axis};

use crate::dense::{Matrix, Vector};

pub struct PlsBuilder {
    n_components: Option<usize>,
    scale: bool,
    tolerance: f64,
    max_iterations: usize,
}

impl PlsBuilder {
    pub fn new() -> Self {
        PlsBuilder {
            n_components: None,
            scale: true,
            tolerance: 1e-10,
            max_iterations: 10_000,
        }
    }

    /// Latent components to extract; defaults to the number of X columns.
    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Fits the model on predictors `x` and responses `y`, both with one
    /// observation per row.
    pub fn fit(self, x: &Matrix<f64>, y: &Matrix<f64>) -> anyhow::Result<Pls> {
        if x.rows() != y.rows() {
            bail!(
                "X and Y must have the same number of rows ({} vs {})",
                x.rows(),
                y.rows()
            );
        }
        if x.rows() < 2 {
            bail!("PLS needs at least two observations");
        }
        let n_components = self.n_components.unwrap_or(x.cols());
        if n_components == 0 || n_components > x.cols() {
            bail!(
                "n_components must be between 1 and {}, got {}",
                x.cols(),
                n_components
            );
        }

        let (x_center, x_scale) = self.statistics(x, "X")?;
        let (y_center, y_scale) = self.statistics(y, "Y")?;
        let mut e = x.standardize(&x_center, &x_scale)?.into_array();
        let mut f = y.standardize(&y_center, &y_scale)?.into_array();

        let (n, px, py) = (x.rows(), x.cols(), y.cols());
        let mut w_all = Array2::zeros((px, n_components));
        let mut p_all = Array2::zeros((px, n_components));
        let mut c_all = Array2::zeros((py, n_components));
        let mut t_all = Array2::zeros((n, n_components));
        let mut u_all = Array2::zeros((n, n_components));

        for k in 0..n_components {
            let component = self.component(&e, &f, k)?;
            let tt = component.t.dot(&component.t);
            let p = e.t().dot(&component.t) / tt;

            e -= &outer(&component.t, &p);
            f -= &outer(&component.t, &component.c);

            w_all.column_mut(k).assign(&component.w);
            p_all.column_mut(k).assign(&p);
            c_all.column_mut(k).assign(&component.c);
            t_all.column_mut(k).assign(&component.t);
            u_all.column_mut(k).assign(&component.u);
        }

        let w = Matrix::from_array(w_all)?;
        let p = Matrix::from_array(p_all)?;
        let c = Matrix::from_array(c_all)?;
        let rotation = w.multiply(&p.transpose().multiply(&w)?.inverse()?)?;
        let coefficients = rotation.multiply(&c.transpose())?;

        Ok(Pls {
            x_center,
            x_scale,
            y_center,
            y_scale,
            w,
            p,
            c,
            t: Matrix::from_array(t_all)?,
            u: Matrix::from_array(u_all)?,
            coefficients,
        })
    }

    fn statistics(
        &self,
        data: &Matrix<f64>,
        name: &str,
    ) -> anyhow::Result<(Vector<f64>, Vector<f64>)> {
        let center = data.column_means();
        let scale = if self.scale {
            let sd = data.column_std_devs();
            if let Some(j) = sd.iter().position(|&v| v == 0.0) {
                bail!("{} column {} has zero variance and cannot be scaled", name, j);
            }
            sd
        } else {
            Vector::new(vec![1.0; data.cols()])
        };
        Ok((center, scale))
    }

    /// One NIPALS component of the deflated blocks `e` and `f`.
    fn component(&self, e: &Array2<f64>, f: &Array2<f64>, k: usize) -> anyhow::Result<Component> {
        let start = f
            .axis_iter(Axis(1))
            .max_by(|a, b| {
                a.dot(a)
                    .partial_cmp(&b.dot(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| anyhow!("Y has no columns"))?;
        let mut u = start.to_owned();
        if u.dot(&u) == 0.0 {
            bail!("Y is fully explained after {} components", k);
        }

        for iteration in 1..=self.max_iterations {
            let mut w = e.t().dot(&u);
            let w_norm = w.dot(&w).sqrt();
            if w_norm == 0.0 {
                bail!("X carries no information left for component {}", k);
            }
            w /= w_norm;

            let t = e.dot(&w);
            let tt = t.dot(&t);
            let c = f.t().dot(&t) / tt;
            let next = f.dot(&c) / c.dot(&c);

            let change = (&next - &u).mapv(|v| v * v).sum().sqrt();
            let size = next.dot(&next).sqrt();
            trace!("component {} iteration {}: change {:e}", k, iteration, change);
            u = next;

            if change <= self.tolerance * size.max(1.0) {
                debug!("component {} converged after {} iterations", k, iteration);
                return Ok(Component { w, t, c, u });
            }
        }
        Err(anyhow!(
            "component {} did not converge within {} iterations",
            k,
            self.max_iterations
        ))
    }
}

impl Default for PlsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Component {
    w: Array1<f64>,
    t: Array1<f64>,
    c: Array1<f64>,
    u: Array1<f64>,
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let column = a.view().insert_axis(Axis(1));
    let row = b.view().insert_axis(Axis(0));
    column.dot(&row)
}

/// A fitted PLS model. All factor matrices are in standardised units.
#[derive(Debug, Clone)]
pub struct Pls {
    x_center: Vector<f64>,
    x_scale: Vector<f64>,
    y_center: Vector<f64>,
    y_scale: Vector<f64>,
    w: Matrix<f64>,
    p: Matrix<f64>,
    c: Matrix<f64>,
    t: Matrix<f64>,
    u: Matrix<f64>,
    coefficients: Matrix<f64>,
}

impl Pls {
    pub fn builder() -> PlsBuilder {
        PlsBuilder::new()
    }

    /// Fits `n_components` latent components with centering and scaling.
    pub fn fit(x: &Matrix<f64>, y: &Matrix<f64>, n_components: usize) -> anyhow::Result<Self> {
        PlsBuilder::new().n_components(n_components).fit(x, y)
    }

    /// Regression coefficients `B = W (PᵗW)⁻¹ Cᵗ`.
    pub fn coefficients(&self) -> &Matrix<f64> {
        &self.coefficients
    }

    pub fn x_weights(&self) -> &Matrix<f64> {
        &self.w
    }

    pub fn x_loadings(&self) -> &Matrix<f64> {
        &self.p
    }

    pub fn y_loadings(&self) -> &Matrix<f64> {
        &self.c
    }

    pub fn x_scores(&self) -> &Matrix<f64> {
        &self.t
    }

    pub fn y_scores(&self) -> &Matrix<f64> {
        &self.u
    }

    /// Predicts responses for new observations, in the units of Y.
    pub fn predict(&self, x: &Matrix<f64>) -> anyhow::Result<Matrix<f64>> {
        if x.cols() != self.x_center.len() {
            bail!(
                "expected {} predictor columns, got {}",
                self.x_center.len(),
                x.cols()
            );
        }
        let standardized = x.standardize(&self.x_center, &self.x_scale)?;
        let mut y = standardized.multiply(&self.coefficients)?.into_array();
        let (mu, sigma) = (self.y_center.as_array(), self.y_scale.as_array());
        for mut row in y.axis_iter_mut(Axis(0)) {
            row *= sigma;
            row += mu;
        }
        Ok(Matrix::from_array(y)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dense::MatrixFactory;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn predictors() -> Matrix<f64> {
        let mut rng = StdRng::seed_from_u64(99);
        MatrixFactory::random(10, 3, &mut rng).unwrap()
    }

    #[test]
    fn test_exact_linear_single_response() {
        let x = predictors();
        let beta = Matrix::from_rows(vec![vec![2.0], vec![-1.0], vec![0.5]]).unwrap();
        let y = x.multiply(&beta).unwrap().mapv(|v| v + 3.0);

        let pls = Pls::fit(&x, &y, 3).unwrap();
        let predicted = pls.predict(&x).unwrap();
        assert!(predicted.approx_eq(&y, 1e-8));
        assert_eq!(pls.coefficients().shape(), (3, 1));
    }

    #[test]
    fn test_exact_linear_multiple_responses() {
        let x = predictors();
        let beta = Matrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![-2.0, 1.5],
            vec![0.3, -0.7],
        ])
        .unwrap();
        let y = x.multiply(&beta).unwrap();

        let pls = Pls::builder().scale(false).fit(&x, &y).unwrap();
        assert!(pls.predict(&x).unwrap().approx_eq(&y, 1e-8));
        // Without scaling the coefficients are the least squares solution.
        assert!(pls.coefficients().approx_eq(&beta, 1e-8));
    }

    #[test]
    fn test_weights_are_orthonormal() {
        let x = predictors();
        let y = x.multiply(&MatrixFactory::ones(3, 1).unwrap()).unwrap();
        let pls = Pls::fit(&x, &y, 2).unwrap();

        let w = pls.x_weights();
        let gram = w.transpose().multiply(w).unwrap();
        assert!(gram.approx_eq(&MatrixFactory::identity(2).unwrap(), 1e-10));

        let t = pls.x_scores();
        assert_abs_diff_eq!(
            t.column(0).unwrap().dot(&t.column(1).unwrap()),
            0.0,
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_row_mismatch() {
        let x = predictors();
        let y = MatrixFactory::ones::<f64>(4, 1).unwrap();
        let err = Pls::fit(&x, &y, 1).unwrap_err();
        assert!(err.to_string().contains("same number of rows"));
    }

    #[test]
    fn test_invalid_components() {
        let x = predictors();
        let y = x.column_vector(0).map(|c| MatrixFactory::column(&c).unwrap()).unwrap();
        assert!(Pls::fit(&x, &y, 0).is_err());
        assert!(Pls::fit(&x, &y, 4).is_err());
        assert!(Pls::fit(&x, &y, 1).unwrap().predict(&y).is_err());
    }
}
