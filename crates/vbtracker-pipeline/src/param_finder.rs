//! Search over the tracker tuning space.
//!
//! A 4-vector `[positional noise, rotational noise, beacon process noise,
//! measurement variance scale]` is expanded into [`ConfigParams`], a fresh
//! tracking system is built for every evaluation, and a caller-supplied
//! [`ReplayObjective`] scores it. No error metric is defined yet:
//! [`placeholder_objective`] always scores zero.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use nalgebra::{DVector, Vector4};
use serde::{Deserialize, Serialize};
use vbtracker_core::Real;
use vbtracker_optim::{minimize_with_radius, ModelTrustRegion};
use vbtracker_system::{ConfigParams, TargetHandle, TrackingSystem, TrackingSystemFactory};

use crate::MeasurementLog;

pub type ParamVec = Vector4<Real>;

/// Starting point of every search.
pub const INITIAL_PARAMS: [Real; 4] = [4.14e-6, 1e-2, 0.0, 5e-2];

/// Interpolation points per parameter handed to the minimizer.
const INTERPOLATION_POINTS_PER_DIM: usize = 2;

/// Write a parameter vector into the matching [`ConfigParams`] fields.
pub fn apply_param_vec(params: &mut ConfigParams, v: &ParamVec) {
    let [pos, rot, beacon, scale] = [v[0], v[1], v[2], v[3]];
    params.process_noise_autocorrelation[..3].fill(pos);
    params.process_noise_autocorrelation[3..].fill(rot);
    params.beacon_process_noise = beacon;
    params.measurement_variance_scale_factor = scale;
}

/// Copy of `base` with the parameter vector applied.
pub fn config_from_param_vec(base: &ConfigParams, v: &ParamVec) -> ConfigParams {
    let mut params = base.clone();
    apply_param_vec(&mut params, v);
    params
}

/// Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerOptions {
    /// Trust-region radius pair; accepted in either order.
    pub radius: (Real, Real),
    pub max_evals: usize,
    pub trust_region: ModelTrustRegion,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self {
            radius: (1e-8, 1e-4),
            max_evals: 10,
            trust_region: ModelTrustRegion::default(),
        }
    }
}

/// What an objective sees for one candidate.
pub struct Evaluation<'a> {
    pub params: &'a ConfigParams,
    pub system: &'a mut dyn TrackingSystem,
    pub target: TargetHandle,
    pub log: &'a MeasurementLog,
}

/// Scores one candidate tracking system; lower is better.
pub trait ReplayObjective {
    fn evaluate(&mut self, eval: Evaluation<'_>) -> Real;
}

impl<F> ReplayObjective for F
where
    F: FnMut(Evaluation<'_>) -> Real,
{
    fn evaluate(&mut self, eval: Evaluation<'_>) -> Real {
        self(eval)
    }
}

/// Caller-supplied objective slot, currently a placeholder scoring zero.
pub fn placeholder_objective(_eval: Evaluation<'_>) -> Real {
    0.0
}

/// Outcome of a parameter search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub params: ParamVec,
    pub final_value: Real,
    pub evaluations: usize,
}

/// Search the tuning space around [`INITIAL_PARAMS`].
///
/// `base` supplies every [`ConfigParams`] field the vector does not cover.
/// Optimizer non-convergence is not reported separately: the best point seen
/// within the budget is returned.
pub fn run_optimizer(
    log: &MeasurementLog,
    base: &ConfigParams,
    factory: &dyn TrackingSystemFactory,
    mut objective: impl ReplayObjective,
    opts: &OptimizerOptions,
) -> Result<OptimizationReport> {
    let mut x = DVector::from_column_slice(&INITIAL_PARAMS);
    let npt = INTERPOLATION_POINTS_PER_DIM * x.len();
    let mut evaluations = 0usize;
    let mut failure: Option<anyhow::Error> = None;

    let final_value = minimize_with_radius(
        &opts.trust_region,
        npt,
        &mut x,
        opts.radius,
        opts.max_evals,
        |candidate| {
            if failure.is_some() {
                return Real::INFINITY;
            }
            evaluations += 1;
            let params = config_from_param_vec(base, &ParamVec::from_column_slice(candidate.as_slice()));
            let target = factory.primary_target();
            let mut system = match factory.build(&params) {
                Ok(system) => system,
                Err(err) => {
                    failure = Some(err.context(format!("building tracking system for {:?}", candidate.as_slice())));
                    return Real::INFINITY;
                }
            };
            if system.target(target).is_none() {
                failure = Some(anyhow!("tracking system has no target {:?}", target));
                return Real::INFINITY;
            }
            let value = objective.evaluate(Evaluation {
                params: &params,
                system: system.as_mut(),
                target,
                log,
            });
            debug!("evaluation {}: {:?} -> {}", evaluations, candidate.as_slice(), value);
            value
        },
    );

    if let Some(err) = failure {
        return Err(err);
    }

    let params = ParamVec::from_column_slice(x.as_slice());
    info!(
        "optimizer returned {} after {} evaluations with parameters {:?}",
        final_value,
        evaluations,
        params.as_slice()
    );
    Ok(OptimizationReport {
        params,
        final_value,
        evaluations,
    })
}

/// Load `log_path` and run [`run_optimizer`] on it.
pub fn run_optimizer_from_file(
    log_path: impl AsRef<Path>,
    delimiter: u8,
    base: &ConfigParams,
    factory: &dyn TrackingSystemFactory,
    objective: impl ReplayObjective,
    opts: &OptimizerOptions,
) -> Result<OptimizationReport> {
    let log_path = log_path.as_ref();
    let log = MeasurementLog::try_load(log_path, delimiter)
        .with_context(|| format!("loading {}", log_path.display()))?;
    if log.is_empty() {
        bail!("{} contains no usable rows", log_path.display());
    }
    run_optimizer(&log, base, factory, objective, opts)
}
