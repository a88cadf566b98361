//! Generic, model-agnostic RANSAC.
//!
//! Implement [`Estimator`] for a model and call [`ransac`] with the data
//! slice. The estimator is passed by reference so it can carry context such
//! as camera parameters. Failure to reach consensus is reported through
//! [`RansacResult::model`] being `None`, never by panicking.

use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration parameters for the RANSAC engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacOptions {
    /// Maximum number of hypotheses.
    pub max_iters: usize,
    /// Inlier residual threshold.
    pub thresh: f64,
    /// Minimum number of inliers required to accept a model.
    pub min_inliers: usize,
    /// Desired probability in `[0, 1]` of drawing at least one clean sample.
    pub confidence: f64,
    /// Seed of the sampling RNG, so runs are reproducible.
    pub seed: u64,
    /// Refit the best hypothesis on its inliers before scoring.
    pub refit_on_inliers: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            thresh: 4.0,
            min_inliers: 6,
            confidence: 0.99,
            seed: 1_234_567,
            refit_on_inliers: true,
        }
    }
}

/// Output of a RANSAC run.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    /// Best model found, `None` without consensus.
    pub model: Option<M>,
    /// Indices of inlier data points.
    pub inliers: Vec<usize>,
    /// Root-mean-square residual over inliers.
    pub inlier_rms: f64,
    /// Number of hypotheses drawn.
    pub iters: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            inlier_rms: f64::INFINITY,
            iters: 0,
        }
    }
}

impl<M> RansacResult<M> {
    pub fn success(&self) -> bool {
        self.model.is_some()
    }
}

/// Hypothesis generator and scorer used by [`ransac`].
pub trait Estimator {
    type Datum;
    type Model;

    /// Minimal number of samples needed to fit a model.
    const MIN_SAMPLES: usize;

    /// Fit a model from the sampled indices, `None` if the sample is unusable.
    fn fit(&self, data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual in the units of [`RansacOptions::thresh`].
    fn residual(&self, model: &Self::Model, datum: &Self::Datum) -> f64;

    /// Refit on a full inlier set. Default: keep the hypothesis.
    fn refit(&self, _data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

fn score<E: Estimator>(
    est: &E,
    model: &E::Model,
    data: &[E::Datum],
    thresh: f64,
) -> (Vec<usize>, f64) {
    let mut inliers = Vec::with_capacity(data.len());
    let mut ss = 0.0;
    for (i, datum) in data.iter().enumerate() {
        let r = est.residual(model, datum);
        if r <= thresh {
            inliers.push(i);
            ss += r * r;
        }
    }
    let rms = if inliers.is_empty() {
        f64::INFINITY
    } else {
        (ss / inliers.len() as f64).sqrt()
    };
    (inliers, rms)
}

/// Adaptive iteration bound from the current inlier ratio.
fn required_iterations(opts: &RansacOptions, inlier_ratio: f64, min_samples: usize, done: usize) -> usize {
    if opts.confidence <= 0.0 || inlier_ratio <= 0.0 {
        return opts.max_iters;
    }
    let denom = (1.0 - inlier_ratio.powi(min_samples as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return opts.max_iters;
    }
    let n = ((1.0 - opts.confidence).ln() / denom).ceil() as usize;
    n.clamp(done, opts.max_iters)
}

/// Run RANSAC for the given estimator.
///
/// Returns an empty result when there are fewer than `E::MIN_SAMPLES` data
/// points or no hypothesis gathers `opts.min_inliers` inliers.
pub fn ransac<E: Estimator>(est: &E, data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let mut best = RansacResult::default();
    if data.len() < E::MIN_SAMPLES {
        return best;
    }

    let indices: Vec<usize> = (0..data.len()).collect();
    let mut sample = vec![0usize; E::MIN_SAMPLES];
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut budget = opts.max_iters;
    let mut iters = 0;

    while iters < budget {
        iters += 1;
        for (slot, &idx) in sample
            .iter_mut()
            .zip(indices.choose_multiple(&mut rng, E::MIN_SAMPLES))
        {
            *slot = idx;
        }

        let Some(mut model) = est.fit(data, &sample) else {
            continue;
        };
        let (mut inliers, mut rms) = score(est, &model, data, opts.thresh);
        if inliers.len() < opts.min_inliers {
            continue;
        }

        if opts.refit_on_inliers {
            if let Some(refined) = est.refit(data, &inliers) {
                let (refined_inliers, refined_rms) = score(est, &refined, data, opts.thresh);
                if refined_inliers.len() >= inliers.len() {
                    model = refined;
                    inliers = refined_inliers;
                    rms = refined_rms;
                }
            }
        }

        let better = best.model.is_none()
            || inliers.len() > best.inliers.len()
            || (inliers.len() == best.inliers.len() && rms < best.inlier_rms);
        if better {
            let ratio = inliers.len() as f64 / data.len() as f64;
            best = RansacResult {
                model: Some(model),
                inliers,
                inlier_rms: rms,
                iters,
            };
            budget = required_iterations(opts, ratio, E::MIN_SAMPLES, iters);
        }
    }

    best
}
