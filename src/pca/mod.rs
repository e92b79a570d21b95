use anyhow::{anyhow, bail};
use log::debug;
use ndarray::{s, Array1, Array2, Axis};

use crate::dense::{Matrix, Vector};
use crate::eigen::{Eigen, EigenConfig};
use crate::svd::{Svd, SvdConfig};

/// How the principal axes are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcaMethod {
    /// Eigendecomposition of the covariance (or correlation) matrix.
    #[default]
    Eigen,
    /// SVD of the standardised data matrix.
    Svd,
}

pub struct PcaBuilder {
    n_components: Option<usize>,
    center: bool,
    scale: bool,
    method: PcaMethod,
    eigen_config: EigenConfig,
}

impl PcaBuilder {
    pub fn new() -> Self {
        PcaBuilder {
            n_components: None,
            center: true,
            scale: true,
            method: PcaMethod::default(),
            eigen_config: EigenConfig::default(),
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    pub fn method(mut self, method: PcaMethod) -> Self {
        self.method = method;
        self
    }

    pub fn eigen_config(mut self, eigen_config: EigenConfig) -> Self {
        self.eigen_config = eigen_config;
        self
    }

    pub fn build(self) -> Pca {
        Pca {
            n_components: self.n_components,
            center: self.center,
            scale: self.scale,
            method: self.method,
            eigen_config: self.eigen_config,
            fitted: None,
        }
    }
}

impl Default for PcaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Fitted {
    data: Matrix<f64>,
    mean: Vector<f64>,
    std_dev: Vector<f64>,
    loadings: Matrix<f64>,
    eigenvalues: Vector<f64>,
    inertia: f64,
}

/// Principal component analysis on top of the power-iteration eigen engine.
///
/// Data is standardised column by column (centering and scaling are both on
/// by default, giving a correlation PCA). Components are ordered by
/// decreasing eigenvalue and each loading vector is signed so that its
/// largest-magnitude entry is positive.
pub struct Pca {
    n_components: Option<usize>,
    center: bool,
    scale: bool,
    method: PcaMethod,
    eigen_config: EigenConfig,
    fitted: Option<Fitted>,
}

impl Pca {
    pub fn builder() -> PcaBuilder {
        PcaBuilder::new()
    }

    pub fn fit(&mut self, x: &Matrix<f64>) -> anyhow::Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples < 2 {
            bail!("PCA needs at least two samples, got {}", n_samples);
        }
        let n_components = self.n_components.unwrap_or(n_features);
        if n_components == 0 || n_components > n_features {
            bail!(
                "n_components must be between 1 and {}, got {}",
                n_features,
                n_components
            );
        }

        let mean = if self.center {
            x.column_means()
        } else {
            Vector::zeros(n_features)
        };
        let std_dev = if self.scale {
            let sd = x.column_std_devs();
            if let Some(j) = sd.iter().position(|&v| v == 0.0) {
                bail!("column {} has zero variance and cannot be scaled", j);
            }
            sd
        } else {
            Vector::new(vec![1.0; n_features])
        };
        let data = x.standardize(&mean, &std_dev)?;

        let denominator = (n_samples - 1) as f64;
        let (axes, values) = match self.method {
            PcaMethod::Eigen => {
                let covariance = data.transpose().multiply(&data)?.scalar_divide(denominator);
                let eigen = Eigen::new(self.eigen_config.clone()).decompose(&covariance)?;
                let (v, d) = eigen.into_parts();
                (v.into_array(), d.into_array())
            }
            PcaMethod::Svd => {
                let svd = Svd::new(
                    SvdConfig::builder()
                        .eigen(self.eigen_config.clone())
                        .build(),
                )
                .decompose(&data)?;
                let singular = svd.singular_values();
                let values = Array1::from_shape_fn(n_features, |i| {
                    singular.get(i).map_or(0.0, |s| s * s / denominator)
                });
                let (_, _, v) = svd.into_parts();
                (v.into_array(), values)
            }
        };

        let (loadings, eigenvalues) = order_components(axes, values);
        let inertia = eigenvalues.sum();
        debug!(
            "PCA fitted on {}x{} data, inertia {:e}",
            n_samples, n_features, inertia
        );

        self.fitted = Some(Fitted {
            data,
            mean,
            std_dev,
            loadings: Matrix::from_array(loadings.slice(s![.., ..n_components]).to_owned())?,
            eigenvalues: Vector::from_array(eigenvalues),
            inertia,
        });
        Ok(())
    }

    fn fitted(&self) -> anyhow::Result<&Fitted> {
        self.fitted
            .as_ref()
            .ok_or_else(|| anyhow!("PCA has not been fitted yet"))
    }

    fn prepare(&self, x: Option<&Matrix<f64>>) -> anyhow::Result<Matrix<f64>> {
        let fitted = self.fitted()?;
        match x {
            None => Ok(fitted.data.clone()),
            Some(x) => {
                if x.cols() != fitted.mean.len() {
                    bail!(
                        "expected {} columns, got {}",
                        fitted.mean.len(),
                        x.cols()
                    );
                }
                Ok(x.standardize(&fitted.mean, &fitted.std_dev)?)
            }
        }
    }

    /// Scores of the training data.
    pub fn scores(&self) -> anyhow::Result<Matrix<f64>> {
        let fitted = self.fitted()?;
        Ok(fitted.data.multiply(&fitted.loadings)?)
    }

    /// Standardises `x` with the training statistics and projects it.
    pub fn transform(&self, x: &Matrix<f64>) -> anyhow::Result<Matrix<f64>> {
        let fitted = self.fitted()?;
        let data = self.prepare(Some(x))?;
        Ok(data.multiply(&fitted.loadings)?)
    }

    pub fn fit_transform(&mut self, x: &Matrix<f64>) -> anyhow::Result<Matrix<f64>> {
        self.fit(x)?;
        self.scores()
    }

    /// Principal axes as columns, `n_features x n_components`.
    pub fn loadings(&self) -> Option<&Matrix<f64>> {
        self.fitted.as_ref().map(|f| &f.loadings)
    }

    /// Every eigenvalue, in decreasing order.
    pub fn eigenvalues(&self) -> Option<&Vector<f64>> {
        self.fitted.as_ref().map(|f| &f.eigenvalues)
    }

    pub fn total_variance(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.inertia)
    }

    /// Share of the total variance carried by each component.
    pub fn r_squared(&self) -> Option<Vector<f64>> {
        self.fitted
            .as_ref()
            .map(|f| f.eigenvalues.scalar_divide(f.inertia))
    }

    pub fn cumulative_r_squared(&self) -> Option<Vector<f64>> {
        self.r_squared().map(|r| {
            let mut running = 0.0;
            Vector::new(
                r.iter()
                    .map(|&v| {
                        running += v;
                        running
                    })
                    .collect(),
            )
        })
    }

    /// Squared reconstruction error per sample. Column `c` holds the residual
    /// after keeping the first `c + 1` components. `None` scores the training
    /// data.
    pub fn q_residuals(&self, x: Option<&Matrix<f64>>) -> anyhow::Result<Matrix<f64>> {
        let fitted = self.fitted()?;
        let data = self.prepare(x)?;
        let scores = data.multiply(&fitted.loadings)?.into_array();
        let norms = data.as_array().map_axis(Axis(1), |row| row.dot(&row));

        let mut q = Array2::zeros(scores.dim());
        for (i, row) in scores.axis_iter(Axis(0)).enumerate() {
            let mut remaining = norms[i];
            for (c, t) in row.iter().enumerate() {
                remaining -= t * t;
                q[[i, c]] = remaining.max(0.0);
            }
        }
        Ok(Matrix::from_array(q)?)
    }

    /// Hotelling's T² per sample, cumulative over components like
    /// [`Pca::q_residuals`]. Components with a zero eigenvalue add nothing.
    pub fn t2_distances(&self, x: Option<&Matrix<f64>>) -> anyhow::Result<Matrix<f64>> {
        let fitted = self.fitted()?;
        let data = self.prepare(x)?;
        let scores = data.multiply(&fitted.loadings)?.into_array();
        let floor = f64::EPSILON * fitted.inertia.max(1.0);

        let mut t2 = Array2::zeros(scores.dim());
        for (i, row) in scores.axis_iter(Axis(0)).enumerate() {
            let mut total = 0.0;
            for (c, t) in row.iter().enumerate() {
                let lambda = fitted.eigenvalues[c];
                if lambda > floor {
                    total += t * t / lambda;
                }
                t2[[i, c]] = total;
            }
        }
        Ok(Matrix::from_array(t2)?)
    }
}

/// Sorts axes by decreasing eigenvalue and fixes each axis's sign.
fn order_components(axes: Array2<f64>, values: Array1<f64>) -> (Array2<f64>, Array1<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut sorted_axes = Array2::zeros(axes.dim());
    let mut sorted_values = Array1::zeros(values.len());
    for (target, &source) in order.iter().enumerate() {
        let column = axes.column(source);
        let pivot = column
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        sorted_axes.column_mut(target).assign(&(&column * sign));
        sorted_values[target] = values[source];
    }
    (sorted_axes, sorted_values)
}
