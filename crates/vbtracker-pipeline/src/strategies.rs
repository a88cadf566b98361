use log::debug;
use vbtracker_core::{CameraParameters, Iso3, OneEuroParams, Real, TimeValue};
use vbtracker_system::{TargetHandle, TrackingSystem, VideoFrame};

use crate::{MeasurementRow, PoseFilter};

/// Output of one strategy for one row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseEstimate {
    pub pose: Option<Iso3>,
}

impl PoseEstimate {
    pub fn none() -> Self {
        Self { pose: None }
    }

    pub fn available(pose: Iso3) -> Self {
        Self { pose: Some(pose) }
    }

    pub fn is_available(&self) -> bool {
        self.pose.is_some()
    }
}

/// A way of turning a recorded row into a pose.
///
/// Implementations may keep state across rows of one replay; a fresh
/// instance is needed for each independent run.
pub trait PoseStrategy {
    fn name(&self) -> &str;

    fn estimate(
        &mut self,
        camera: &CameraParameters,
        system: &mut dyn TrackingSystem,
        target: TargetHandle,
        row: &MeasurementRow,
    ) -> PoseEstimate;
}

/// Runs the full tracking system and reports the owning body's pose as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullSystemStrategy;

impl PoseStrategy for FullSystemStrategy {
    fn name(&self) -> &str {
        "full-system"
    }

    fn estimate(
        &mut self,
        camera: &CameraParameters,
        system: &mut dyn TrackingSystem,
        target: TargetHandle,
        row: &MeasurementRow,
    ) -> PoseEstimate {
        system.update_bodies_from_video_data(VideoFrame {
            timestamp: row.timestamp,
            camera: camera.clone(),
            measurements: row.measurements.clone(),
        });
        match system.body(target.body) {
            Some(body) if body.has_pose_estimate() => PoseEstimate::available(body.pose()),
            _ => PoseEstimate::none(),
        }
    }
}

/// Per-frame RANSAC solve smoothed by a [`PoseFilter`].
///
/// The filter time step is measured from the last row that produced a
/// RANSAC pose; rows where RANSAC fails do not advance it.
#[derive(Debug, Clone)]
pub struct RansacOneEuroStrategy {
    filter: PoseFilter,
    last: TimeValue,
    is_first: bool,
}

impl Default for RansacOneEuroStrategy {
    fn default() -> Self {
        Self::new(OneEuroParams::default(), OneEuroParams::default())
    }
}

impl RansacOneEuroStrategy {
    pub fn new(position_params: OneEuroParams, orientation_params: OneEuroParams) -> Self {
        Self {
            filter: PoseFilter::new(position_params, orientation_params),
            last: TimeValue::default(),
            is_first: true,
        }
    }

    pub fn filter(&self) -> &PoseFilter {
        &self.filter
    }

    /// Time stamp of the last row with a RANSAC pose, if any.
    pub fn last_success(&self) -> Option<TimeValue> {
        (!self.is_first).then_some(self.last)
    }
}

impl PoseStrategy for RansacOneEuroStrategy {
    fn name(&self) -> &str {
        "ransac-one-euro"
    }

    fn estimate(
        &mut self,
        camera: &CameraParameters,
        system: &mut dyn TrackingSystem,
        target: TargetHandle,
        row: &MeasurementRow,
    ) -> PoseEstimate {
        let Some(target) = system.target(target) else {
            return PoseEstimate::none();
        };
        let Some(ransac) = target.uncalibrated_ransac_pose_estimate(camera, &row.measurements) else {
            return PoseEstimate::none();
        };

        let dt: Real = if self.is_first {
            self.is_first = false;
            1.0
        } else {
            row.timestamp.duration_since(&self.last)
        };
        self.filter.filter(dt, &ransac.position, &ransac.orientation);
        self.last = row.timestamp;
        debug!(
            "ransac-one-euro dt={:.6} position={:?}",
            dt,
            self.filter.position().as_slice()
        );
        PoseEstimate::available(self.filter.isometry())
    }
}
