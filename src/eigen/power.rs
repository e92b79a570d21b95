use log::{debug, trace, warn};
use ndarray::{Array1, Array2};

use super::EigenConfig;
use crate::dense::Matrix;
use crate::error::{MatrixError, MatrixResult};
use crate::utils::{FloatOps, RandomVectorSource};

/// One converged eigenpair; `vector` has unit length.
#[derive(Debug, Clone)]
pub(crate) struct Eigenpair<F> {
    pub value: F,
    pub vector: Array1<F>,
}

fn l2<F: FloatOps>(v: &Array1<F>) -> F {
    v.dot(v).sqrt()
}

/// Draws a random unit vector, redrawing zero-norm candidates.
pub(crate) fn random_unit<F, S>(
    len: usize,
    config: &EigenConfig,
    source: &mut S,
) -> MatrixResult<Array1<F>>
where
    F: FloatOps,
    S: RandomVectorSource + ?Sized,
{
    for _ in 0..=config.max_reseeds {
        let candidate: Array1<F> = source.draw(len).into_iter().map(F::lit).collect();
        let norm = l2(&candidate);
        if norm > F::zero() && norm.is_finite() {
            return Ok(candidate / norm);
        }
    }
    Err(MatrixError::ConvergenceFailure {
        iterations: 0,
        last_change: f64::NAN,
    })
}

/// Dominant eigenpair of `a` by power iteration.
///
/// Runs `config.restarts` independent iterations, each from the previous
/// result perturbed by fresh noise, and keeps the largest-magnitude Rayleigh
/// quotient. `scale` is the norm that tolerances are measured against; during
/// deflation it stays the norm of the undeflated matrix.
pub(crate) fn dominant_pair<F, S>(
    a: &Matrix<F>,
    scale: F,
    config: &EigenConfig,
    source: &mut S,
) -> MatrixResult<Eigenpair<F>>
where
    F: FloatOps,
    S: RandomVectorSource + ?Sized,
{
    let n = a.rows();
    let arr = a.as_array();
    let mut start = random_unit::<F, S>(n, config, source)?;
    let mut best: Option<Eigenpair<F>> = None;

    for run in 0..config.restarts.max(1) {
        let (pair, iterations) = iterate(arr, start, scale, config, source)?;
        debug!(
            "power iteration run {} converged to {:e} after {} iterations",
            run, pair.value, iterations
        );

        let noise = random_unit::<F, S>(n, config, source)?;
        start = {
            let perturbed = &pair.vector + &(noise.clone() * F::lit(0.5));
            let norm = l2(&perturbed);
            if norm > F::zero() {
                perturbed / norm
            } else {
                noise
            }
        };

        let replace = match &best {
            Some(current) => current.value.abs() < pair.value.abs(),
            None => true,
        };
        if replace {
            best = Some(pair);
        }
    }

    best.ok_or(MatrixError::ConvergenceFailure {
        iterations: 0,
        last_change: f64::NAN,
    })
}

fn iterate<F, S>(
    a: &Array2<F>,
    start: Array1<F>,
    scale: F,
    config: &EigenConfig,
    source: &mut S,
) -> MatrixResult<(Eigenpair<F>, usize)>
where
    F: FloatOps,
    S: RandomVectorSource + ?Sized,
{
    let n = a.nrows();
    let scale = scale.max(F::one());
    let tolerance = F::lit(config.tolerance) * scale;
    let residual_tolerance = F::lit(config.residual_tolerance) * scale;

    let mut b = start;
    let mut previous: Option<F> = None;
    let mut last_change = F::infinity();

    for iteration in 1..=config.max_iterations {
        let mut ab = a.dot(&b);
        let mut norm = l2(&ab);
        let mut reseeds = 0;
        while !(norm > F::zero() && norm.is_finite()) {
            if reseeds >= config.max_reseeds {
                return Err(MatrixError::ConvergenceFailure {
                    iterations: iteration,
                    last_change: last_change.to_f64().unwrap_or(f64::NAN),
                });
            }
            reseeds += 1;
            warn!("iterate collapsed to zero at iteration {}, re-seeding", iteration);
            ab = random_unit::<F, S>(n, config, source)?;
            norm = l2(&ab);
        }
        b = ab / norm;

        let ab = a.dot(&b);
        let mu = b.dot(&ab);
        let residual = l2(&(ab - &b * mu));
        trace!("iteration {}: rayleigh {:e}, residual {:e}", iteration, mu, residual);

        if let Some(prev) = previous {
            last_change = (mu - prev).abs();
            if last_change <= tolerance {
                if residual > residual_tolerance {
                    debug!(
                        "rayleigh quotient settled at iteration {} with residual {:e}",
                        iteration, residual
                    );
                }
                return Ok((Eigenpair { value: mu, vector: b }, iteration));
            }
        }
        previous = Some(mu);
    }

    Err(MatrixError::ConvergenceFailure {
        iterations: config.max_iterations,
        last_change: last_change.to_f64().unwrap_or(f64::NAN),
    })
}

/// Removes the components of `w` along the orthonormal `basis` (classical
/// Gram-Schmidt, applied twice) and renormalises. `None` when nothing above
/// `floor` is left.
pub(crate) fn orthonormalize<F: FloatOps>(
    basis: &[Array1<F>],
    mut w: Array1<F>,
    floor: F,
) -> Option<Array1<F>> {
    for _ in 0..2 {
        for v in basis {
            let projection = v.dot(&w);
            w = w - v * projection;
        }
    }
    let norm = l2(&w);
    if norm > floor {
        Some(w / norm)
    } else {
        None
    }
}

/// Unit vector orthogonal to every vector in `basis`.
pub(crate) fn orthogonal_completion<F, S>(
    basis: &[Array1<F>],
    len: usize,
    config: &EigenConfig,
    source: &mut S,
) -> MatrixResult<Array1<F>>
where
    F: FloatOps,
    S: RandomVectorSource + ?Sized,
{
    let floor = F::lit(config.zero_tolerance).sqrt();
    for _ in 0..=config.max_reseeds {
        let w = random_unit::<F, S>(len, config, source)?;
        if let Some(w) = orthonormalize(basis, w, floor) {
            return Ok(w);
        }
    }
    Err(MatrixError::ConvergenceFailure {
        iterations: config.max_reseeds,
        last_change: f64::NAN,
    })
}

/// Eigenvector of `a` for the known eigenvalue `value`, by inverse iteration
/// with `A - σI` from `start`.
///
/// The shift sits `sqrt(zero_tolerance)·max(1, scale)` away from `value`, so
/// the shifted matrix stays invertible while every other eigenvector is damped
/// by `offset / gap` per step. Falls back to `start` when `A - σI` is singular
/// on both sides of `value`.
pub(crate) fn refine<F: FloatOps>(
    a: &Matrix<F>,
    value: F,
    start: Array1<F>,
    scale: F,
    config: &EigenConfig,
) -> MatrixResult<Array1<F>> {
    let offset = F::lit(config.zero_tolerance).sqrt() * scale.max(F::one());
    let inverse = match shifted_inverse(a, value + offset) {
        Err(MatrixError::Singular) => shifted_inverse(a, value - offset),
        other => other,
    };
    let inverse = match inverse {
        Ok(inverse) => inverse.into_array(),
        Err(MatrixError::Singular) => {
            warn!("shifted matrix is singular near {:e}, keeping the iterated vector", value);
            return Ok(start);
        }
        Err(err) => return Err(err),
    };

    let threshold = F::lit(config.residual_tolerance)
        .max(F::epsilon() * F::lit(16.0 * a.rows() as f64));
    let mut b = start;
    for step in 1..=config.max_iterations {
        let mut x = inverse.dot(&b);
        let norm = l2(&x);
        if !(norm > F::zero() && norm.is_finite()) {
            warn!("inverse iteration for {:e} lost its iterate at step {}", value, step);
            return Ok(b);
        }
        x /= norm;
        if x.dot(&b) < F::zero() {
            x.mapv_inplace(|v| -v);
        }
        let change = l2(&(&x - &b));
        b = x;
        if change <= threshold {
            trace!("eigenvector for {:e} refined in {} steps", value, step);
            return Ok(b);
        }
    }
    debug!("inverse iteration for {:e} used its whole budget", value);
    Ok(b)
}

fn shifted_inverse<F: FloatOps>(a: &Matrix<F>, shift: F) -> MatrixResult<Matrix<F>> {
    let mut shifted = a.as_array().to_owned();
    shifted.diag_mut().mapv_inplace(|v| v - shift);
    Matrix::from_array(shifted)?.inverse()
}
