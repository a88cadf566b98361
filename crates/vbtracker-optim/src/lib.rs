//! Derivative-free minimization.
//!
//! [`DerivativeFreeMinimizer`] is the backend seam: any trust-region,
//! model-based black-box minimizer can sit behind it. [`ModelTrustRegion`]
//! is the built-in backend. [`minimize_with_radius`] is the entry point the
//! parameter finder uses; it accepts the radius pair in either order.

mod trust_region;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

pub use trust_region::ModelTrustRegion;

/// Objective evaluated at a candidate point.
pub type Objective<'a> = dyn FnMut(&DVector<f64>) -> f64 + 'a;

/// Trust-region radius schedule: start wide, stop once the radius falls below `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusBounds {
    pub begin: f64,
    pub end: f64,
}

impl RadiusBounds {
    /// Order a radius pair so the larger value comes first.
    pub fn from_pair((a, b): (f64, f64)) -> Self {
        if b > a {
            Self { begin: b, end: a }
        } else {
            Self { begin: a, end: b }
        }
    }
}

/// Black-box minimizer building a local model from sampled points.
pub trait DerivativeFreeMinimizer {
    /// Minimize `f` starting at `x`, leaving the best point found in `x`.
    ///
    /// `npt` is the number of interpolation points used for the local model;
    /// `max_evals` bounds the number of objective evaluations. Returns the
    /// objective value at the returned `x`.
    fn minimize(
        &self,
        npt: usize,
        x: &mut DVector<f64>,
        radius: RadiusBounds,
        max_evals: usize,
        f: &mut Objective<'_>,
    ) -> f64;
}

/// Run `minimizer` with the radius pair normalised to `(larger, smaller)`.
pub fn minimize_with_radius<M, F>(
    minimizer: &M,
    npt: usize,
    x: &mut DVector<f64>,
    radius: (f64, f64),
    max_evals: usize,
    mut f: F,
) -> f64
where
    M: DerivativeFreeMinimizer + ?Sized,
    F: FnMut(&DVector<f64>) -> f64,
{
    minimizer.minimize(npt, x, RadiusBounds::from_pair(radius), max_evals, &mut f)
}
