use std::fmt::{Debug, Display, LowerExp};
use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

use ndarray::ScalarOperand;
use num_traits::{Float, FromPrimitive, NumCast, ToPrimitive};
use rand::Rng;

/// Bound shared by every real-valued routine in the crate (`f32`, `f64`).
pub trait FloatOps:
    Float
    + FromPrimitive
    + ToPrimitive
    + NumCast
    + ScalarOperand
    + Sum
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Debug
    + Display
    + LowerExp
    + Send
    + Sync
    + 'static
{
    /// Lossy conversion from an `f64` constant.
    fn lit(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::nan)
    }
}

impl<T> FloatOps for T where
    T: Float
        + FromPrimitive
        + ToPrimitive
        + NumCast
        + ScalarOperand
        + Sum
        + AddAssign
        + SubAssign
        + MulAssign
        + DivAssign
        + Debug
        + Display
        + LowerExp
        + Send
        + Sync
        + 'static
{
}

/// Axis along which a reduction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// One result per row.
    Row,
    /// One result per column.
    Column,
}

/// Supplies candidate vectors for seeding and re-seeding power iteration.
///
/// Every [`rand::Rng`] is a source. Tests inject a seeded generator so that
/// decompositions are reproducible.
pub trait RandomVectorSource {
    /// Draws `len` values uniformly from `[-1, 1)`. The result may be the zero
    /// vector; callers redraw in that case.
    fn draw(&mut self, len: usize) -> Vec<f64>;
}

impl<R: Rng> RandomVectorSource for R {
    fn draw(&mut self, len: usize) -> Vec<f64> {
        (0..len).map(|_| self.random_range(-1.0..1.0)).collect()
    }
}
