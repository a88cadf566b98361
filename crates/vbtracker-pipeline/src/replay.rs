use std::fmt;

use anyhow::{Context, Result};
use log::info;
use vbtracker_core::{CameraParameters, TimeValue};
use vbtracker_system::{
    ReferenceSystemFactory, TargetHandle, TrackingSystem, TrackingSystemFactory,
};

use crate::{
    FinderConfig, FullSystemStrategy, MeasurementLog, PoseEstimate, PoseStrategy,
    RansacOneEuroStrategy,
};

/// One strategy's result for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    pub strategy: String,
    pub estimate: PoseEstimate,
}

/// Results of every strategy for one row of the log.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFrame {
    pub row_index: usize,
    pub timestamp: TimeValue,
    pub outputs: Vec<StrategyOutput>,
}

impl fmt::Display for ReplayFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>5}] t={}", self.row_index, self.timestamp)?;
        for out in &self.outputs {
            match out.estimate.pose {
                Some(pose) => {
                    let t = pose.translation.vector;
                    let q = pose.rotation;
                    write!(
                        f,
                        "  {}: pos=({:.5}, {:.5}, {:.5}) rot=({:.5}, {:.5}, {:.5}, {:.5})",
                        out.strategy, t.x, t.y, t.z, q.w, q.i, q.j, q.k
                    )?;
                }
                None => write!(f, "  {}: no pose", out.strategy)?,
            }
        }
        Ok(())
    }
}

/// Feed every row of `log`, in order, to every strategy, in order.
///
/// Row-level decisions belong to the strategies: every row yields exactly one
/// frame with one output per strategy.
pub fn replay_log(
    log: &MeasurementLog,
    camera: &CameraParameters,
    system: &mut dyn TrackingSystem,
    target: TargetHandle,
    strategies: &mut [Box<dyn PoseStrategy>],
) -> Vec<ReplayFrame> {
    let mut frames = Vec::with_capacity(log.len());
    for (row_index, row) in log.iter().enumerate() {
        let mut outputs = Vec::with_capacity(strategies.len());
        for strategy in strategies.iter_mut() {
            let estimate = strategy.estimate(camera, system, target, row);
            outputs.push(StrategyOutput {
                strategy: strategy.name().to_string(),
                estimate,
            });
        }
        frames.push(ReplayFrame {
            row_index,
            timestamp: row.timestamp,
            outputs,
        });
    }
    frames
}

/// Number of frames with a pose, per strategy, in strategy order.
pub fn availability(frames: &[ReplayFrame]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for frame in frames {
        for (i, out) in frame.outputs.iter().enumerate() {
            if counts.len() <= i {
                counts.push((out.strategy.clone(), 0));
            }
            if out.estimate.is_available() {
                counts[i].1 += 1;
            }
        }
    }
    counts
}

/// The two strategies under study, in their fixed replay order.
pub fn default_strategies(config: &FinderConfig) -> Vec<Box<dyn PoseStrategy>> {
    vec![
        Box::new(FullSystemStrategy),
        Box::new(RansacOneEuroStrategy::new(
            config.position_filter,
            config.orientation_filter,
        )),
    ]
}

/// Replay `log` through both strategies on a reference tracking system built from `config`.
pub fn replay_with_config(log: &MeasurementLog, config: &FinderConfig) -> Result<Vec<ReplayFrame>> {
    let factory = ReferenceSystemFactory::new(config.target.clone());
    let mut system = factory
        .build(&config.tracker)
        .context("building tracking system")?;
    let camera = config.effective_camera();
    let mut strategies = default_strategies(config);
    let frames = replay_log(
        log,
        &camera,
        system.as_mut(),
        factory.primary_target(),
        &mut strategies,
    );
    for (name, count) in availability(&frames) {
        info!("{}: pose on {}/{} frames", name, count, frames.len());
    }
    Ok(frames)
}
