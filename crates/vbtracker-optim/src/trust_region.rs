use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::{DerivativeFreeMinimizer, Objective, RadiusBounds};

/// Trust-region minimizer over a separable quadratic model.
///
/// Each iteration samples the objective at `x + rho e_i` for every axis and
/// at `x - rho e_i` for as many axes as the interpolation budget allows
/// (`npt` counts the base point, clamped to `n + 1 ..= 2n + 1`). Axes with
/// both samples get a central gradient and curvature; the rest get a forward
/// gradient and zero curvature. The model step is clipped to `rho`. Good
/// agreement between predicted and actual decrease widens the radius (up to
/// `begin`), poor agreement shrinks it; the search stops when the radius
/// drops below `end` or the evaluation budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTrustRegion {
    pub shrink: f64,
    pub expand: f64,
    /// Ratio of actual to predicted decrease below which the radius shrinks.
    pub poor_ratio: f64,
    /// Ratio above which the radius expands.
    pub good_ratio: f64,
}

impl Default for ModelTrustRegion {
    fn default() -> Self {
        Self {
            shrink: 0.5,
            expand: 2.0,
            poor_ratio: 0.1,
            good_ratio: 0.7,
        }
    }
}

/// Budgeted objective wrapper remembering the best point seen.
struct Evaluator<'f, 'a> {
    f: &'f mut Objective<'a>,
    evals: usize,
    max_evals: usize,
    best_x: DVector<f64>,
    best_f: f64,
}

impl Evaluator<'_, '_> {
    fn eval(&mut self, x: &DVector<f64>) -> Option<f64> {
        if self.evals >= self.max_evals {
            return None;
        }
        self.evals += 1;
        let v = (self.f)(x);
        if v < self.best_f {
            self.best_f = v;
            self.best_x.copy_from(x);
        }
        Some(v)
    }
}

impl DerivativeFreeMinimizer for ModelTrustRegion {
    fn minimize(
        &self,
        npt: usize,
        x: &mut DVector<f64>,
        radius: RadiusBounds,
        max_evals: usize,
        f: &mut Objective<'_>,
    ) -> f64 {
        let n = x.len();
        let paired_axes = npt.clamp(n + 1, 2 * n + 1) - 1 - n;
        let mut ev = Evaluator {
            f,
            evals: 0,
            max_evals: max_evals.max(1),
            best_x: x.clone(),
            best_f: f64::INFINITY,
        };

        let Some(f0) = ev.eval(x) else {
            return f64::INFINITY;
        };
        let mut base = x.clone();
        let mut f_base = f0;
        let mut rho = radius.begin;

        'search: while rho >= radius.end && rho > 0.0 {
            let mut plus = DVector::zeros(n);
            let mut minus = DVector::zeros(paired_axes);
            for i in 0..n {
                let mut p = base.clone();
                p[i] += rho;
                let Some(v) = ev.eval(&p) else { break 'search };
                plus[i] = v;
            }
            for i in 0..paired_axes {
                let mut p = base.clone();
                p[i] -= rho;
                let Some(v) = ev.eval(&p) else { break 'search };
                minus[i] = v;
            }

            let mut g = DVector::zeros(n);
            let mut h = DVector::zeros(n);
            for i in 0..n {
                if i < paired_axes {
                    g[i] = (plus[i] - minus[i]) / (2.0 * rho);
                    h[i] = (plus[i] - 2.0 * f_base + minus[i]) / (rho * rho);
                } else {
                    g[i] = (plus[i] - f_base) / rho;
                }
            }

            let mut step = DVector::from_fn(n, |i, _| {
                if h[i] > 0.0 {
                    -g[i] / h[i]
                } else if g[i] != 0.0 {
                    -g[i].signum() * rho
                } else {
                    0.0
                }
            });
            let len = step.norm();
            if len > rho {
                step *= rho / len;
            }
            let predicted = -(g.dot(&step) + 0.5 * h.component_mul(&step).dot(&step));
            if !(predicted > 0.0) {
                rho *= self.shrink;
                debug!("flat model, radius -> {:.3e}", rho);
                continue;
            }

            let trial = &base + &step;
            let Some(f_trial) = ev.eval(&trial) else { break 'search };
            let ratio = (f_base - f_trial) / predicted;

            // Move to the best point seen, which may be one of the samples.
            if ev.best_f < f_base {
                base.copy_from(&ev.best_x);
                f_base = ev.best_f;
            }

            if ratio >= self.good_ratio {
                rho = (rho * self.expand).min(radius.begin);
            } else if !(ratio >= self.poor_ratio) {
                rho *= self.shrink;
            }
            debug!(
                "eval {}: f={:.6e} ratio={:.3} radius={:.3e}",
                ev.evals, f_base, ratio, rho
            );
        }

        x.copy_from(&ev.best_x);
        ev.best_f
    }
}
